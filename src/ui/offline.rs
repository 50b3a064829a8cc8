//! Offline screen
//!
//! Shown while a failed stream waits out its auto-skip countdown.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use crate::kiosk::KioskView;
use crate::ui::{centered, Theme};

/// Detail used when the session failed without one
pub const DEFAULT_DETAIL: &str = "The stream did not become ready.";

pub fn lines(view: &KioskView, countdown: Option<u64>) -> Vec<Line<'static>> {
    let name = view
        .stream
        .as_ref()
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "This stream".to_string());

    let mut lines = vec![
        Line::from(Span::styled("⚠ This stream is offline", Theme::error())),
        Line::from(Span::styled(
            format!("{} couldn't be loaded right now.", name),
            Theme::muted(),
        )),
        Line::from(""),
    ];

    if let Some(stream) = &view.stream {
        lines.push(Line::from(vec![
            Span::styled(stream.name.clone(), Theme::title()),
            Span::styled(format!("  [{}]", stream.kind), Theme::accent()),
        ]));
        lines.push(Line::from(Span::styled(format!("id: {}", stream.id), Theme::muted())));
        lines.push(Line::from(Span::styled(stream.url.clone(), Theme::muted())));
    }

    let detail = view
        .detail
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| DEFAULT_DETAIL.to_string());
    lines.push(Line::from(vec![
        Span::styled("Details: ", Theme::text()),
        Span::styled(detail, Theme::muted()),
    ]));
    lines.push(Line::from(""));

    if let Some(left) = countdown {
        lines.push(Line::from(vec![
            Span::styled("Switching to the next stream in ", Theme::muted()),
            Span::styled(format!("{}s", left), Theme::accent()),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("[s]", Theme::keybind()),
        Span::styled(" Skip now", Theme::keybind_desc()),
    ]));

    lines
}

pub fn render(frame: &mut Frame, area: Rect, view: &KioskView, countdown: Option<u64>) {
    let lines = lines(view, countdown);
    let card = centered(area, 76, lines.len() as u16 + 2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border_issue());

    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(Clear, card);
    frame.render_widget(body, card);
}
