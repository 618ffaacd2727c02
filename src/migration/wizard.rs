//! Wizard State Machine
//!
//! Governs which configuration pane is visible and when a launch is allowed.
//! The wizard owns the handle of the (single) stream session so that a new
//! launch or a reset can be refused while a stream is still in flight.

use crate::error::{MigratorError, Result};
use uuid::Uuid;

/// Current pane of the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WizardStep {
    SourceConfig,
    DestinationConfig,
    Executing,
}

impl WizardStep {
    /// Step number (1-based)
    pub fn number(&self) -> usize {
        match self {
            Self::SourceConfig => 1,
            Self::DestinationConfig => 2,
            Self::Executing => 3,
        }
    }

    pub fn total() -> usize {
        3
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SourceConfig => "Source Settings",
            Self::DestinationConfig => "Rocket.net Settings",
            Self::Executing => "Execution",
        }
    }

    fn id(&self) -> &'static str {
        match self {
            Self::SourceConfig => "source",
            Self::DestinationConfig => "destination",
            Self::Executing => "executing",
        }
    }
}

/// Identity and completion state of one launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: Uuid,
    pub finished: bool,
}

impl SessionHandle {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            finished: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    session: Option<SessionHandle>,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::SourceConfig,
            session: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// A launch is running and has not finished yet
    pub fn is_loading(&self) -> bool {
        self.session.is_some_and(|s| !s.finished)
    }

    /// Whether the "Start New Migration" affordance may be offered
    pub fn can_reset(&self) -> bool {
        self.step == WizardStep::Executing && !self.is_loading()
    }

    /// SourceConfig -> DestinationConfig
    pub fn next(&mut self) -> Result<()> {
        match self.step {
            WizardStep::SourceConfig => {
                self.step = WizardStep::DestinationConfig;
                Ok(())
            }
            step => Err(invalid("advance", step)),
        }
    }

    /// DestinationConfig -> SourceConfig
    pub fn back(&mut self) -> Result<()> {
        match self.step {
            WizardStep::DestinationConfig => {
                self.step = WizardStep::SourceConfig;
                Ok(())
            }
            step => Err(invalid("go back", step)),
        }
    }

    /// DestinationConfig -> Executing. Opens a new session handle.
    pub fn launch(&mut self) -> Result<SessionHandle> {
        if self.is_loading() {
            return Err(MigratorError::SessionInFlight);
        }
        if self.step != WizardStep::DestinationConfig {
            return Err(invalid("launch", self.step));
        }

        let handle = SessionHandle::new();
        self.session = Some(handle);
        self.step = WizardStep::Executing;
        tracing::info!(session = %handle.id, "migration session opened");
        Ok(handle)
    }

    /// Record that the stream of session `id` has ended. Returns false for
    /// ids that do not match the current session.
    pub fn mark_finished(&mut self, id: Uuid) -> bool {
        match self.session.as_mut() {
            Some(handle) if handle.id == id => {
                handle.finished = true;
                true
            }
            _ => {
                tracing::debug!(session = %id, "ignoring completion of stale session");
                false
            }
        }
    }

    /// Executing -> SourceConfig, only once the stream has finished
    pub fn reset(&mut self) -> Result<()> {
        if self.is_loading() {
            return Err(MigratorError::SessionInFlight);
        }
        if self.step != WizardStep::Executing {
            return Err(invalid("reset", self.step));
        }

        self.session = None;
        self.step = WizardStep::SourceConfig;
        Ok(())
    }
}

fn invalid(action: &'static str, step: WizardStep) -> MigratorError {
    MigratorError::InvalidTransition {
        action,
        step: step.id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executing() -> (Wizard, SessionHandle) {
        let mut wizard = Wizard::new();
        wizard.next().unwrap();
        let handle = wizard.launch().unwrap();
        (wizard, handle)
    }

    #[test]
    fn test_initial_state() {
        let wizard = Wizard::new();
        assert_eq!(wizard.step(), WizardStep::SourceConfig);
        assert!(wizard.session().is_none());
        assert!(!wizard.is_loading());
        assert!(!wizard.can_reset());
    }

    #[test]
    fn test_next_and_back() {
        let mut wizard = Wizard::new();
        wizard.next().unwrap();
        assert_eq!(wizard.step(), WizardStep::DestinationConfig);
        wizard.back().unwrap();
        assert_eq!(wizard.step(), WizardStep::SourceConfig);
    }

    #[test]
    fn test_undefined_transitions_rejected() {
        let mut wizard = Wizard::new();
        assert!(wizard.back().is_err());
        assert!(matches!(
            wizard.launch(),
            Err(MigratorError::InvalidTransition { action: "launch", step: "source" })
        ));

        wizard.next().unwrap();
        assert!(wizard.next().is_err());
        assert!(wizard.reset().is_err());
        assert_eq!(wizard.step(), WizardStep::DestinationConfig);
    }

    #[test]
    fn test_launch_opens_session() {
        let (wizard, handle) = executing();
        assert_eq!(wizard.step(), WizardStep::Executing);
        assert!(wizard.is_loading());
        assert!(!handle.finished);
        assert_eq!(wizard.session().unwrap().id, handle.id);
    }

    #[test]
    fn test_no_navigation_while_executing() {
        let (mut wizard, _) = executing();
        assert!(wizard.next().is_err());
        assert!(wizard.back().is_err());
        assert_eq!(wizard.step(), WizardStep::Executing);
    }

    #[test]
    fn test_launch_rejected_while_in_flight() {
        let (mut wizard, _) = executing();
        assert!(matches!(wizard.launch(), Err(MigratorError::SessionInFlight)));
    }

    #[test]
    fn test_reset_rejected_while_in_flight() {
        let (mut wizard, _) = executing();
        assert!(matches!(wizard.reset(), Err(MigratorError::SessionInFlight)));
        assert_eq!(wizard.step(), WizardStep::Executing);
        assert!(!wizard.can_reset());
    }

    #[test]
    fn test_reset_after_finish() {
        let (mut wizard, handle) = executing();
        assert!(wizard.mark_finished(handle.id));
        assert!(!wizard.is_loading());
        assert!(wizard.can_reset());

        wizard.reset().unwrap();
        assert_eq!(wizard.step(), WizardStep::SourceConfig);
        assert!(wizard.session().is_none());
    }

    #[test]
    fn test_stale_session_ignored() {
        let (mut wizard, _) = executing();
        assert!(!wizard.mark_finished(Uuid::new_v4()));
        assert!(wizard.is_loading());
    }

    #[test]
    fn test_second_session_after_reset_has_new_id() {
        let (mut wizard, first) = executing();
        wizard.mark_finished(first.id);
        wizard.reset().unwrap();
        wizard.next().unwrap();
        let second = wizard.launch().unwrap();
        assert_ne!(first.id, second.id);

        // A late completion from the first session changes nothing
        assert!(!wizard.mark_finished(first.id));
        assert!(wizard.is_loading());
    }

    #[test]
    fn test_step_metadata() {
        assert_eq!(WizardStep::SourceConfig.number(), 1);
        assert_eq!(WizardStep::Executing.number(), WizardStep::total());
        assert_eq!(WizardStep::DestinationConfig.title(), "Rocket.net Settings");
        assert!(WizardStep::SourceConfig < WizardStep::Executing);
    }
}
