//! TUI Application State
//!
//! Maps keys onto controller operations and keeps the view state (focus,
//! console scroll position, spinner) that the controller does not care about.

use super::events::keys;
use crate::error::Result;
use crate::migration::{
    ConsoleEvent, FieldGroup, FieldKey, FieldKind, FieldValue, LaunchTicket, MigrationClient,
    SessionController, SessionEvent, WizardStep, spawn_session,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lines moved by one PageUp/PageDown
const PAGE_SIZE: usize = 10;

/// What the event loop should do after a key was handled
#[derive(Debug)]
pub enum AppAction {
    /// Nothing special
    None,
    /// A session was opened; start streaming it
    Launch(LaunchTicket),
    /// Cancel the running session
    Abort,
    /// Leave the TUI
    Quit,
}

pub struct App {
    controller: SessionController,
    console_rx: mpsc::UnboundedReceiver<ConsoleEvent>,
    endpoint: String,
    cancel: Option<CancellationToken>,

    /// Index into the current pane's fields; `fields.len()` is the action button
    pub focused_field: usize,
    /// Console lines scrolled up from the newest record
    pub scroll_offset: usize,
    /// Keep the newest record in view
    pub follow_tail: bool,
    /// Feedback for the last rejected action
    pub status_message: Option<String>,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(mut controller: SessionController, endpoint: impl Into<String>) -> Self {
        let console_rx = controller.subscribe();
        Self {
            controller,
            console_rx,
            endpoint: endpoint.into(),
            cancel: None,
            focused_field: 0,
            scroll_offset: 0,
            follow_tail: true,
            status_message: None,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fields shown on the current pane, in display order
    pub fn current_fields(&self) -> Vec<FieldKey> {
        match self.controller.step() {
            WizardStep::SourceConfig => FieldKey::in_group(FieldGroup::Source),
            WizardStep::DestinationConfig => FieldKey::in_group(FieldGroup::Destination),
            WizardStep::Executing => Vec::new(),
        }
    }

    pub fn focused_key(&self) -> Option<FieldKey> {
        self.current_fields().get(self.focused_field).copied()
    }

    pub fn is_button_focused(&self) -> bool {
        self.focused_field == self.current_fields().len()
    }

    /// Handle key events for the current step
    pub fn handle_key(&mut self, event: KeyEvent) -> AppAction {
        if keys::is_quit(&event) {
            self.abort();
            self.should_quit = true;
            return AppAction::Quit;
        }

        self.status_message = None;
        match self.controller.step() {
            WizardStep::Executing => self.handle_executing_key(event),
            _ => self.handle_form_key(event),
        }
    }

    fn handle_form_key(&mut self, event: KeyEvent) -> AppAction {
        let slots = self.current_fields().len() + 1;

        if keys::is_cancel(&event) {
            if self.controller.step() == WizardStep::SourceConfig {
                self.should_quit = true;
                return AppAction::Quit;
            }
            let result = self.controller.back();
            self.report(result);
            self.focused_field = 0;
            return AppAction::None;
        }

        if keys::is_next_field(&event) {
            self.focused_field = (self.focused_field + 1) % slots;
            return AppAction::None;
        }
        if keys::is_prev_field(&event) {
            self.focused_field = (self.focused_field + slots - 1) % slots;
            return AppAction::None;
        }

        if keys::is_enter(&event) {
            return self.submit_step();
        }

        let Some(key) = self.focused_key() else {
            return AppAction::None;
        };

        match key.kind() {
            FieldKind::Text | FieldKind::Secret => match event.code {
                KeyCode::Char(c) if !has_command_modifier(&event) => {
                    let mut value = self.controller.form().value_of(key);
                    value.push(c);
                    self.set_field(key, value.into());
                }
                KeyCode::Backspace => {
                    let mut value = self.controller.form().value_of(key);
                    if value.pop().is_some() {
                        self.set_field(key, value.into());
                    }
                }
                _ => {}
            },
            FieldKind::Select => {
                if keys::is_left(&event) || keys::is_right(&event) {
                    let result = self.controller.cycle_location(keys::is_right(&event));
                    self.report(result);
                }
            }
            FieldKind::Checkbox => {
                if event.code == KeyCode::Char(' ') {
                    let checked = self.controller.form().config().visual;
                    self.set_field(key, (!checked).into());
                }
            }
        }

        AppAction::None
    }

    /// Enter on a form pane: Next, or Launch on the last pane
    fn submit_step(&mut self) -> AppAction {
        match self.controller.step() {
            WizardStep::SourceConfig => {
                let result = self.controller.next();
                self.report(result);
                self.focused_field = 0;
                AppAction::None
            }
            WizardStep::DestinationConfig => match self.controller.launch() {
                Ok(ticket) => {
                    self.focused_field = 0;
                    self.scroll_to_end();
                    self.drain_console_events();
                    AppAction::Launch(ticket)
                }
                Err(e) => {
                    self.status_message = Some(e.to_string());
                    AppAction::None
                }
            },
            WizardStep::Executing => AppAction::None,
        }
    }

    fn handle_executing_key(&mut self, event: KeyEvent) -> AppAction {
        let loading = self.controller.is_loading();

        if keys::is_abort(&event) && loading {
            return AppAction::Abort;
        }

        if keys::is_enter(&event) {
            if self.controller.wizard().can_reset() {
                let result = self.controller.reset();
                self.report(result);
                self.focused_field = 0;
                self.drain_console_events();
            } else {
                self.status_message = Some("Migration still running (Ctrl+X to abort)".to_string());
            }
            return AppAction::None;
        }

        if keys::is_cancel(&event) {
            if loading {
                self.status_message = Some("Migration still running (Ctrl+X to abort)".to_string());
                return AppAction::None;
            }
            self.should_quit = true;
            return AppAction::Quit;
        }

        match event.code {
            KeyCode::Up => self.scroll_up(1),
            KeyCode::Down => self.scroll_down(1),
            _ if keys::is_page_up(&event) => self.scroll_up(PAGE_SIZE),
            _ if keys::is_page_down(&event) => self.scroll_down(PAGE_SIZE),
            _ if keys::is_end(&event) => self.scroll_to_end(),
            _ => {}
        }
        AppAction::None
    }

    /// Bracketed paste into the focused text field. Line breaks are dropped.
    pub fn handle_paste(&mut self, text: &str) {
        let Some(key) = self.focused_key() else {
            return;
        };
        if !matches!(key.kind(), FieldKind::Text | FieldKind::Secret) {
            return;
        }
        let mut value = self.controller.form().value_of(key);
        value.extend(text.chars().filter(|c| *c != '\n' && *c != '\r'));
        self.set_field(key, value.into());
    }

    /// Feed a stream event into the controller
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        if self.controller.apply(event) && !self.controller.is_loading() {
            self.cancel = None;
            if let Some(outcome) = self.controller.last_outcome() {
                self.status_message = Some(outcome.describe());
            }
        }
        self.drain_console_events();
    }

    /// Spawn the stream task for a freshly opened session
    pub fn start_session<E>(
        &mut self,
        ticket: LaunchTicket,
        client: Arc<dyn MigrationClient>,
        tx: mpsc::UnboundedSender<E>,
    ) -> JoinHandle<()>
    where
        E: From<SessionEvent> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());
        spawn_session(client, ticket, tx, cancel)
    }

    /// Cancel the running session, if any. Its final records still arrive
    /// through the event channel.
    pub fn abort(&mut self) {
        if let Some(cancel) = &self.cancel {
            tracing::info!("operator aborted the running migration");
            cancel.cancel();
        }
    }

    pub fn on_tick(&mut self) {
        if self.controller.is_loading() {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.controller.console().len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + lines).min(max);
        self.follow_tail = self.scroll_offset == 0;
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
        self.follow_tail = self.scroll_offset == 0;
    }

    pub fn scroll_to_end(&mut self) {
        self.scroll_offset = 0;
        self.follow_tail = true;
    }

    fn set_field(&mut self, key: FieldKey, value: FieldValue) {
        let result = self.controller.update_field(key, value);
        self.report(result);
    }

    fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            tracing::debug!("action rejected: {}", e);
            self.status_message = Some(e.to_string());
        }
    }

    fn drain_console_events(&mut self) {
        while let Ok(event) = self.console_rx.try_recv() {
            match event {
                ConsoleEvent::Appended { .. } => {
                    // Keep the viewport still while the operator reads back
                    if !self.follow_tail {
                        self.scroll_offset += 1;
                    }
                }
                ConsoleEvent::Cleared => self.scroll_to_end(),
            }
        }
    }
}

fn has_command_modifier(event: &KeyEvent) -> bool {
    event.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}
