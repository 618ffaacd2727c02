//! Terminal User Interface
//!
//! Full-screen migration wizard built on ratatui and crossterm.

pub mod app;
pub mod events;
pub mod render;

pub use app::{App, AppAction};
pub use events::{EventHandler, TuiEvent};

use crate::config::Config;
use crate::migration::{FieldKey, FieldValue, HttpMigrationClient, MigrationClient, SessionController};
use anyhow::{Context, Result};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::sync::Arc;

type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Run the interactive wizard until the operator quits
pub async fn run(config: &Config, prefill: Vec<(FieldKey, FieldValue)>) -> Result<()> {
    let client: Arc<dyn MigrationClient> = Arc::new(HttpMigrationClient::new(&config.service)?);

    let mut controller = SessionController::new(config.defaults.clone());
    for (key, value) in prefill {
        controller
            .update_field(key, value)
            .with_context(|| format!("Invalid value for {}", key.label()))?;
    }
    let mut app = App::new(controller, client.endpoint());

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app, client).await;
    restore_terminal(&mut terminal)?;

    result
}

fn setup_terminal() -> Result<Tui> {
    // Restore the terminal before the panic message is printed
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(
            io::stdout(),
            LeaveAlternateScreen,
            DisableBracketedPaste,
            DisableMouseCapture,
            crossterm::cursor::Show,
        );
        original_hook(info);
    }));

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, EnableBracketedPaste, EnableMouseCapture)?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop(terminal: &mut Tui, app: &mut App, client: Arc<dyn MigrationClient>) -> Result<()> {
    let mut events = EventHandler::new();
    EventHandler::start_terminal_listener(events.sender());

    loop {
        terminal.draw(|f| render::render(f, app))?;

        let Some(event) = events.next().await else {
            break;
        };

        match event {
            TuiEvent::Key(key) => match app.handle_key(key) {
                AppAction::Launch(ticket) => {
                    tracing::info!(session = %ticket.session_id, "migration launched from wizard");
                    app.start_session(ticket, client.clone(), events.sender());
                }
                AppAction::Abort => app.abort(),
                AppAction::Quit => break,
                AppAction::None => {}
            },
            TuiEvent::MouseScroll(delta) if delta > 0 => app.scroll_up(3),
            TuiEvent::MouseScroll(_) => app.scroll_down(3),
            TuiEvent::Paste(text) => app.handle_paste(&text),
            TuiEvent::Resize(_, _) => {}
            TuiEvent::Session(event) => app.handle_session_event(event),
            TuiEvent::Tick => app.on_tick(),
            TuiEvent::Quit => break,
        }

        if app.should_quit {
            break;
        }
    }

    app.abort();
    Ok(())
}
