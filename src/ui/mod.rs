//! Terminal kiosk surface
//!
//! Renders whatever the controller last published: the overlay over a
//! playing stream, the offline screen for a failed one, or the
//! nothing-configured card. The actual video lives in the player window;
//! this is the operator's view of it.

pub mod offline;
pub mod overlay;
pub mod theme;

pub use theme::Theme;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Flex, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};
use tokio::time::Instant;

use crate::app::{App, Screen};

/// Draw the whole surface
pub fn render(frame: &mut Frame, app: &App, now: Instant) {
    let area = frame.area();

    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(Theme::text()), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    match app.screen() {
        Screen::NothingConfigured => render_nothing_configured(frame, chunks[0]),
        Screen::Playing => overlay::render(frame, chunks[0], &app.view),
        Screen::Offline => {
            offline::render(frame, chunks[0], &app.view, app.countdown(now));
            overlay::render(frame, chunks[0], &app.view);
        }
    }

    render_status_bar(frame, chunks[1], app);
}

fn render_nothing_configured(frame: &mut Frame, area: Rect) {
    let card = centered(area, 60, 6);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border());

    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("No streams configured", Theme::title())),
        Line::from(vec![
            Span::styled("Add one with ", Theme::muted()),
            Span::styled("camkiosk add", Theme::accent()),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(block);

    frame.render_widget(Clear, card);
    frame.render_widget(text, card);
}

fn render_status_bar(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(" CAMKIOSK ", Theme::status_bar().patch(Theme::title()))];

    if app.view.total > 0 {
        spans.push(Span::styled(
            format!(" {}/{} ", app.view.index + 1, app.view.total),
            Theme::muted(),
        ));
    }

    if app.show_stats {
        let m = &app.metrics;
        spans.push(Span::styled(
            format!(
                " load {}  ready {}  skip {}  error {} ",
                m.load_total, m.ready_total, m.skip_total, m.error_total
            ),
            Theme::muted(),
        ));
    }

    spans.push(Span::raw(" │ "));
    spans.push(Span::styled("s", Theme::keybind()));
    spans.push(Span::styled(":skip  ", Theme::keybind_desc()));
    spans.push(Span::styled("i", Theme::keybind()));
    spans.push(Span::styled(":stats  ", Theme::keybind_desc()));
    spans.push(Span::styled("q", Theme::keybind()));
    spans.push(Span::styled(":quit", Theme::keybind_desc()));

    let bar = Paragraph::new(Line::from(spans)).style(Theme::status_bar());
    frame.render_widget(bar, area);
}

/// Rect of at most `width` x `height` centered in `area`
pub(crate) fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height.min(area.height))])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}
