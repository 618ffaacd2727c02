//! Session controller
//!
//! Ties the form, the wizard and the log console together. All mutation
//! happens on the owner's task; a running stream only talks back through
//! [`SessionEvent`]s tagged with the id of the session that produced them,
//! so late events from an earlier launch can be recognized and dropped.

use super::client::MigrationClient;
use super::console::{ConsoleEvent, LogConsole};
use super::consumer::{RecordSink, START_MESSAGE, StreamOutcome, launch_and_consume};
use super::form::{FieldKey, FieldValue, FormStore, MigrationConfig};
use super::wizard::{Wizard, WizardStep};
use crate::config::FormDefaults;
use crate::error::{MigratorError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Message from a running stream task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEventKind {
    Record(String),
    Finished(StreamOutcome),
}

impl SessionEvent {
    pub fn record(session_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            session_id,
            kind: SessionEventKind::Record(text.into()),
        }
    }

    pub fn finished(session_id: Uuid, outcome: StreamOutcome) -> Self {
        Self {
            session_id,
            kind: SessionEventKind::Finished(outcome),
        }
    }
}

/// Forwards records of one session over a channel
pub struct SessionSink<E> {
    session_id: Uuid,
    tx: mpsc::UnboundedSender<E>,
}

impl<E> SessionSink<E> {
    pub fn new(session_id: Uuid, tx: mpsc::UnboundedSender<E>) -> Self {
        Self { session_id, tx }
    }
}

impl<E: From<SessionEvent>> RecordSink for SessionSink<E> {
    fn push(&mut self, text: String) {
        if self
            .tx
            .send(SessionEvent::record(self.session_id, text).into())
            .is_err()
        {
            tracing::trace!(session = %self.session_id, "record dropped, receiver closed");
        }
    }
}

/// Everything a stream task needs to run one launch
#[derive(Debug, Clone)]
pub struct LaunchTicket {
    pub session_id: Uuid,
    pub snapshot: MigrationConfig,
}

/// Run a launch in the background. Records and the final outcome arrive on
/// `tx` as [`SessionEvent`]s.
pub fn spawn_session<E>(
    client: Arc<dyn MigrationClient>,
    ticket: LaunchTicket,
    tx: mpsc::UnboundedSender<E>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    E: From<SessionEvent> + Send + 'static,
{
    tokio::spawn(async move {
        let LaunchTicket {
            session_id,
            snapshot,
        } = ticket;
        let mut sink = SessionSink::new(session_id, tx.clone());
        let outcome = launch_and_consume(client.as_ref(), &snapshot, &mut sink, &cancel).await;
        tracing::info!(session = %session_id, "session ended: {}", outcome.describe());
        let _ = tx.send(SessionEvent::finished(session_id, outcome).into());
    })
}

#[derive(Debug)]
pub struct SessionController {
    wizard: Wizard,
    form: FormStore,
    console: LogConsole,
    last_outcome: Option<StreamOutcome>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(FormDefaults::default())
    }
}

impl SessionController {
    pub fn new(defaults: FormDefaults) -> Self {
        Self {
            wizard: Wizard::new(),
            form: FormStore::new(defaults),
            console: LogConsole::new(),
            last_outcome: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.wizard.step()
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn form(&self) -> &FormStore {
        &self.form
    }

    pub fn console(&self) -> &LogConsole {
        &self.console
    }

    pub fn is_loading(&self) -> bool {
        self.wizard.is_loading()
    }

    /// Outcome of the most recent finished session
    pub fn last_outcome(&self) -> Option<&StreamOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConsoleEvent> {
        self.console.subscribe()
    }

    /// Edit a field. The form is frozen once a launch has been made.
    pub fn update_field(&mut self, key: FieldKey, value: FieldValue) -> Result<()> {
        self.ensure_editable()?;
        self.form.update(key, value)
    }

    pub fn cycle_location(&mut self, forward: bool) -> Result<()> {
        self.ensure_editable()?;
        self.form.cycle_location(forward);
        Ok(())
    }

    pub fn next(&mut self) -> Result<()> {
        self.wizard.next()
    }

    pub fn back(&mut self) -> Result<()> {
        self.wizard.back()
    }

    /// Open a session: freeze a snapshot of the form, clear the console and
    /// seed it with the start record.
    pub fn launch(&mut self) -> Result<LaunchTicket> {
        let handle = self.wizard.launch()?;

        let missing = self.form.missing_fields();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|k| k.name()).collect();
            tracing::warn!(session = %handle.id, "launching with empty fields: {}", names.join(", "));
        }

        self.last_outcome = None;
        self.console.reset();
        self.console.append(START_MESSAGE);

        Ok(LaunchTicket {
            session_id: handle.id,
            snapshot: self.form.snapshot(),
        })
    }

    /// Apply a stream event. Returns false when the event was dropped
    /// because it belongs to another (or an already finished) session.
    pub fn apply(&mut self, event: SessionEvent) -> bool {
        let current = self.wizard.session().filter(|s| !s.finished).map(|s| s.id);
        if current != Some(event.session_id) {
            tracing::debug!(session = %event.session_id, "dropping event of inactive session");
            return false;
        }

        match event.kind {
            SessionEventKind::Record(text) => {
                self.console.append(text);
            }
            SessionEventKind::Finished(outcome) => {
                self.wizard.mark_finished(event.session_id);
                self.last_outcome = Some(outcome);
            }
        }
        true
    }

    /// Back to a blank first step after a finished session
    pub fn reset(&mut self) -> Result<()> {
        self.wizard.reset()?;
        self.form.reset();
        self.console.reset();
        self.last_outcome = None;
        Ok(())
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.wizard.step() == WizardStep::Executing {
            return Err(MigratorError::InvalidTransition {
                action: "edit fields",
                step: "executing",
            });
        }
        Ok(())
    }
}
