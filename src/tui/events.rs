//! TUI Event System
//!
//! Handles user input and stream events for the terminal interface.

use crate::migration::SessionEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc;

/// Events that can occur in the TUI
#[derive(Debug, Clone)]
pub enum TuiEvent {
    /// User pressed a key
    Key(KeyEvent),

    /// Mouse scroll event
    MouseScroll(i8), // positive = up, negative = down

    /// User pasted text
    Paste(String),

    /// Terminal was resized
    Resize(u16, u16),

    /// A running migration produced a record or ended
    Session(SessionEvent),

    /// Request to quit
    Quit,

    /// Tick event for animations/updates
    Tick,
}

impl From<SessionEvent> for TuiEvent {
    fn from(event: SessionEvent) -> Self {
        Self::Session(event)
    }
}

/// Event handler for the TUI
pub struct EventHandler {
    /// Event sender
    tx: mpsc::UnboundedSender<TuiEvent>,

    /// Event receiver
    rx: mpsc::UnboundedReceiver<TuiEvent>,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Get a sender for sending events
    pub fn sender(&self) -> mpsc::UnboundedSender<TuiEvent> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available)
    pub async fn next(&mut self) -> Option<TuiEvent> {
        self.rx.recv().await
    }

    /// Try to receive the next event without blocking
    pub fn try_next(&mut self) -> Option<TuiEvent> {
        self.rx.try_recv().ok()
    }

    /// Start listening for terminal events
    ///
    /// Uses crossterm's async EventStream instead of blocking poll/read so
    /// stream chunks keep flowing while the terminal is idle.
    pub fn start_terminal_listener(tx: mpsc::UnboundedSender<TuiEvent>) {
        use crossterm::event::EventStream;
        use futures::StreamExt;

        tokio::spawn(async move {
            let mut reader = EventStream::new();
            let tick_interval = std::time::Duration::from_millis(100);

            loop {
                // Race: next terminal event vs tick timer
                let event = tokio::select! {
                    maybe_event = reader.next() => {
                        match maybe_event {
                            Some(Ok(event)) => Some(event),
                            Some(Err(_)) => None,
                            None => break, // Stream closed
                        }
                    }
                    _ = tokio::time::sleep(tick_interval) => None,
                };

                if let Some(event) = event {
                    let should_break = match event {
                        crossterm::event::Event::Key(key) => {
                            // Only process key press events to avoid duplicates
                            if key.kind == crossterm::event::KeyEventKind::Press {
                                tx.send(TuiEvent::Key(key)).is_err()
                            } else {
                                false
                            }
                        }
                        crossterm::event::Event::Mouse(mouse) => {
                            use crossterm::event::MouseEventKind;
                            match mouse.kind {
                                MouseEventKind::ScrollUp => tx.send(TuiEvent::MouseScroll(1)).is_err(),
                                MouseEventKind::ScrollDown => {
                                    tx.send(TuiEvent::MouseScroll(-1)).is_err()
                                }
                                _ => false,
                            }
                        }
                        crossterm::event::Event::Resize(w, h) => {
                            tx.send(TuiEvent::Resize(w, h)).is_err()
                        }
                        crossterm::event::Event::Paste(text) => {
                            tx.send(TuiEvent::Paste(text)).is_err()
                        }
                        crossterm::event::Event::FocusGained | crossterm::event::Event::FocusLost => {
                            false
                        }
                    };
                    if should_break {
                        break;
                    }
                }

                // Send tick event for the spinner
                if tx.send(TuiEvent::Tick).is_err() {
                    break;
                }
            }
        });
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper function to check if a key event matches
pub fn key_matches(event: &KeyEvent, code: KeyCode, modifiers: KeyModifiers) -> bool {
    event.code == code && event.modifiers == modifiers
}

/// Common key bindings
pub mod keys {
    use super::*;

    /// Ctrl+C - Quit
    pub fn is_quit(event: &KeyEvent) -> bool {
        key_matches(event, KeyCode::Char('c'), KeyModifiers::CONTROL)
    }

    /// Ctrl+X - Abort the running migration
    pub fn is_abort(event: &KeyEvent) -> bool {
        key_matches(event, KeyCode::Char('x'), KeyModifiers::CONTROL)
    }

    /// Escape - Cancel/Back
    pub fn is_cancel(event: &KeyEvent) -> bool {
        event.code == KeyCode::Esc
    }

    /// Enter - Select/Confirm
    pub fn is_enter(event: &KeyEvent) -> bool {
        event.code == KeyCode::Enter && event.modifiers.is_empty()
    }

    /// Tab or Down - next field
    pub fn is_next_field(event: &KeyEvent) -> bool {
        (event.code == KeyCode::Tab && event.modifiers.is_empty())
            || (event.code == KeyCode::Down && event.modifiers.is_empty())
    }

    /// Shift+Tab or Up - previous field
    pub fn is_prev_field(event: &KeyEvent) -> bool {
        event.code == KeyCode::BackTab || (event.code == KeyCode::Up && event.modifiers.is_empty())
    }

    /// Left arrow
    pub fn is_left(event: &KeyEvent) -> bool {
        event.code == KeyCode::Left && event.modifiers.is_empty()
    }

    /// Right arrow
    pub fn is_right(event: &KeyEvent) -> bool {
        event.code == KeyCode::Right && event.modifiers.is_empty()
    }

    /// Page up
    pub fn is_page_up(event: &KeyEvent) -> bool {
        event.code == KeyCode::PageUp
    }

    /// Page down
    pub fn is_page_down(event: &KeyEvent) -> bool {
        event.code == KeyCode::PageDown
    }

    /// End - jump back to the newest record
    pub fn is_end(event: &KeyEvent) -> bool {
        event.code == KeyCode::End
    }
}
