//! TUI Rendering
//!
//! Draws the stepper, the active form pane or the execution console, and the
//! key hints.

use super::app::App;
use crate::migration::form::location_label;
use crate::migration::{FieldKey, FieldKind, LogRecord, WizardStep};
use crate::utils::{mask, wrap_anywhere};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

const BRAND_BLUE: Color = Color::Rgb(70, 130, 180);
const BRAND_GOLD: Color = Color::Rgb(218, 165, 32);
const ACCENT_GOLD: Color = Color::Rgb(184, 134, 11);

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const STEPS: [WizardStep; 3] = [
    WizardStep::SourceConfig,
    WizardStep::DestinationConfig,
    WizardStep::Executing,
];

/// Render the entire UI
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Stepper
            Constraint::Min(6),    // Pane
            Constraint::Length(2), // Status + hints
        ])
        .split(f.area());

    render_stepper(f, app, chunks[0]);
    match app.controller().step() {
        WizardStep::Executing => render_console(f, app, chunks[1]),
        _ => render_form(f, app, chunks[1]),
    }
    render_footer(f, app, chunks[2]);
}

fn render_stepper(f: &mut Frame, app: &App, area: Rect) {
    let current = app.controller().step();
    let mut spans: Vec<Span<'static>> = vec![Span::raw(" ")];

    for (i, step) in STEPS.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ›  ", Style::default().fg(Color::DarkGray)));
        }
        let marker = if *step < current { "●" } else if *step == current { "◉" } else { "○" };
        let style = if *step == current {
            Style::default().fg(BRAND_GOLD).add_modifier(Modifier::BOLD)
        } else if *step < current {
            Style::default().fg(BRAND_BLUE)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(
            format!("{} {}. {}", marker, step.number(), step.title()),
            style,
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BRAND_BLUE))
            .title(Span::styled(
                " WordPress → Rocket.net Migration ",
                Style::default().fg(BRAND_BLUE).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(header, area);
}

fn render_form(f: &mut Frame, app: &App, area: Rect) {
    let step = app.controller().step();
    let mut lines: Vec<Line<'static>> = vec![Line::from("")];

    for (i, key) in app.current_fields().into_iter().enumerate() {
        let focused = i == app.focused_field;
        lines.push(field_line(app, key, focused));
        lines.push(Line::from(""));
    }

    let button = if step == WizardStep::DestinationConfig {
        " Start Migration "
    } else {
        " Next "
    };
    let button_style = if app.is_button_focused() {
        Style::default()
            .fg(Color::Black)
            .bg(ACCENT_GOLD)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("[{}]", button), button_style),
    ]));

    let pane = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(BRAND_BLUE))
                .title(format!(" {} ", step.title())),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(pane, area);
}

fn field_line(app: &App, key: FieldKey, focused: bool) -> Line<'static> {
    let form = app.controller().form();
    let label_style = if focused {
        Style::default().fg(BRAND_BLUE).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let prefix = if focused { " > " } else { "   " };

    let mut spans = vec![
        Span::styled(prefix, Style::default().fg(ACCENT_GOLD)),
        Span::styled(format!("{:<22}", key.label()), label_style),
    ];

    match key.kind() {
        FieldKind::Text | FieldKind::Secret => {
            let len = form.value_len(key);
            if len == 0 && !focused {
                let hint = key.placeholder().unwrap_or("");
                spans.push(Span::styled(hint.to_string(), Style::default().fg(Color::DarkGray)));
            } else {
                let shown = if key.kind() == FieldKind::Secret {
                    mask(len)
                } else {
                    form.value_of(key)
                };
                spans.push(Span::styled(shown, Style::default().fg(Color::White)));
            }
            if focused {
                spans.push(Span::styled("_", Style::default().fg(BRAND_GOLD)));
            }
        }
        FieldKind::Select => {
            let code = form.config().rocket_location;
            spans.push(Span::styled(
                format!("◀ {} ▶", location_label(code)),
                Style::default().fg(Color::White),
            ));
        }
        FieldKind::Checkbox => {
            let checked = form.config().visual;
            spans.push(Span::styled(
                if checked { "[x]" } else { "[ ]" },
                Style::default().fg(if checked { BRAND_GOLD } else { Color::DarkGray }),
            ));
        }
    }

    Line::from(spans)
}

fn render_console(f: &mut Frame, app: &App, area: Rect) {
    let controller = app.controller();
    let records = controller.console().records();
    let height = area.height.saturating_sub(2) as usize;
    let width = area.width.saturating_sub(2) as usize;

    // Walk back from the newest visible record until the pane is full
    let end = records.len().saturating_sub(app.scroll_offset);
    let mut lines: Vec<Line<'static>> = Vec::new();
    for record in records[..end].iter().rev() {
        if lines.len() >= height {
            break;
        }
        let mut rows = record_lines(record, width);
        rows.append(&mut lines);
        lines = rows;
    }
    let overflow = lines.len().saturating_sub(height);
    lines.drain(..overflow);

    let title = if controller.is_loading() {
        let frame = SPINNER[app.spinner_frame % SPINNER.len()];
        format!(" {} Migrating… ", frame)
    } else {
        " Execution Log ".to_string()
    };
    let position = if app.follow_tail {
        String::new()
    } else {
        format!(" {} more below ", app.scroll_offset)
    };

    let console = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BRAND_BLUE))
            .title(Span::styled(title, Style::default().fg(BRAND_GOLD)))
            .title_bottom(Line::from(position).alignment(Alignment::Right)),
    );
    f.render_widget(console, area);
}

/// Width of the `HH:MM:SS ` gutter
const TIMESTAMP_WIDTH: usize = 9;

/// Rows of one record, wrapped to `width` columns. Continuation rows are
/// indented past the timestamp gutter.
fn record_lines(record: &LogRecord, width: usize) -> Vec<Line<'static>> {
    let style = if record.is_error {
        Style::default().fg(Color::Red)
    } else if record.text.starts_with("[SYSTEM]") {
        Style::default().fg(BRAND_BLUE)
    } else {
        Style::default().fg(Color::Gray)
    };

    let text_width = width.saturating_sub(TIMESTAMP_WIDTH);
    wrap_anywhere(&record.text, text_width)
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let gutter = if i == 0 {
                Span::styled(
                    format!("{} ", record.timestamp.format("%H:%M:%S")),
                    Style::default().fg(Color::DarkGray),
                )
            } else {
                Span::raw(" ".repeat(TIMESTAMP_WIDTH))
            };
            Line::from(vec![gutter, Span::styled(row, style)])
        })
        .collect()
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let status = match &app.status_message {
        Some(msg) => Line::from(Span::styled(
            format!(" ! {}", msg),
            Style::default().fg(Color::Yellow),
        )),
        None => Line::from(Span::styled(
            format!(" {}", app.endpoint()),
            Style::default().fg(Color::DarkGray),
        )),
    };

    let hints: &[(&str, &str)] = match app.controller().step() {
        WizardStep::SourceConfig => &[("Tab", "Next Field"), ("Enter", "Next"), ("Esc", "Quit")],
        WizardStep::DestinationConfig => &[
            ("Tab", "Next Field"),
            ("←/→", "Region"),
            ("Space", "Toggle"),
            ("Enter", "Start Migration"),
            ("Esc", "Back"),
        ],
        WizardStep::Executing if app.controller().is_loading() => {
            &[("PgUp/PgDn", "Scroll"), ("End", "Follow"), ("Ctrl+X", "Abort")]
        }
        WizardStep::Executing => &[
            ("PgUp/PgDn", "Scroll"),
            ("Enter", "Start New Migration"),
            ("Esc", "Quit"),
        ],
    };

    let mut spans: Vec<Span<'static>> = vec![Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(
            format!("[{}] ", key),
            Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!("{}  ", label), Style::default().fg(Color::White)));
    }

    f.render_widget(Paragraph::new(vec![status, Line::from(spans)]), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{FieldValue, SessionController, SessionEvent};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(app: &App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn enter() -> KeyEvent {
        KeyEvent::new(KeyCode::Enter, KeyModifiers::empty())
    }

    #[test]
    fn test_source_pane_masks_password() {
        let mut controller = SessionController::default();
        controller
            .update_field(FieldKey::Password, FieldValue::from("hunter2"))
            .unwrap();
        let app = App::new(controller, "http://127.0.0.1:8000/migrate");

        let text = screen(&app);
        assert!(text.contains("Source Settings"));
        assert!(text.contains("WP Admin URL"));
        assert!(text.contains("•••••••"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_destination_pane_shows_region() {
        let mut app = App::new(SessionController::default(), "http://127.0.0.1:8000/migrate");
        app.handle_key(enter());
        let text = screen(&app);
        assert!(text.contains("US - East"));
        assert!(text.contains("Start Migration"));
    }

    #[test]
    fn test_console_shows_records() {
        let mut app = App::new(SessionController::default(), "http://127.0.0.1:8000/migrate");
        app.handle_key(enter());
        let ticket = match app.handle_key(enter()) {
            crate::tui::app::AppAction::Launch(ticket) => ticket,
            other => panic!("expected launch, got {:?}", other),
        };
        app.handle_session_event(SessionEvent::record(ticket.session_id, "[ERROR] Login failed"));

        let text = screen(&app);
        assert!(text.contains("Starting migration process"));
        assert!(text.contains("[ERROR] Login failed"));
        assert!(text.contains("Ctrl+X"));
    }

    #[test]
    fn test_long_records_wrap_instead_of_clipping() {
        let mut app = App::new(SessionController::default(), "http://127.0.0.1:8000/migrate");
        app.handle_key(enter());
        let ticket = match app.handle_key(enter()) {
            crate::tui::app::AppAction::Launch(ticket) => ticket,
            other => panic!("expected launch, got {:?}", other),
        };
        // Wider than the 98-column console pane
        let long = format!("{}TAILMARK", "x".repeat(120));
        app.handle_session_event(SessionEvent::record(ticket.session_id, long));

        let text = screen(&app);
        assert!(text.contains("TAILMARK"));
    }

    #[test]
    fn test_record_lines_indent_continuations() {
        let mut console = crate::migration::LogConsole::new();
        let record = console.append("abcdefghij").clone();

        let rows = record_lines(&record, TIMESTAMP_WIDTH + 4);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].spans[0].content, " ".repeat(TIMESTAMP_WIDTH));
        assert_eq!(rows[2].spans[1].content, "ij");
    }
}
