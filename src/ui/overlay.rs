//! Stream overlay
//!
//! Small card in the bottom-left corner: stream name, status badge, the
//! rotation period (or the failure detail) and attribution.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};

use crate::kiosk::{format_secs, KioskView};
use crate::models::PlaybackStatus;
use crate::ui::Theme;

const WIDTH: u16 = 52;

/// Lines of the overlay card, without the border
pub fn lines(view: &KioskView) -> Vec<Line<'static>> {
    let Some(stream) = &view.stream else {
        return vec![Line::from(Span::styled("No streams configured", Theme::title()))];
    };
    let status = view.status.unwrap_or(PlaybackStatus::Loading);

    let mut lines = vec![Line::from(vec![
        Span::styled(stream.name.clone(), Theme::title()),
        Span::raw(" "),
        Span::styled(format!(" {} ", status.label()), Theme::status(status)),
    ])];

    if status == PlaybackStatus::Failed {
        let detail = view.detail.clone().unwrap_or_default();
        lines.push(Line::from(Span::styled(detail, Theme::error())));
    } else {
        lines.push(Line::from(Span::styled(
            format!("Cycling every {}", format_secs(view.dwell)),
            Theme::muted(),
        )));
    }

    if let Some(attribution) = &stream.attribution {
        lines.push(Line::from(Span::styled(attribution.clone(), Theme::muted())));
    }

    lines
}

pub fn render(frame: &mut Frame, area: Rect, view: &KioskView) {
    let lines = lines(view);
    let height = (lines.len() as u16 + 2).min(area.height);
    let width = WIDTH.min(area.width);

    let card = Rect {
        x: area.x + 1.min(area.width.saturating_sub(width)),
        y: area.y + area.height.saturating_sub(height),
        width,
        height,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border());

    frame.render_widget(Clear, card);
    frame.render_widget(Paragraph::new(lines).block(block), card);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamDescriptor, StreamKind};
    use std::time::Duration;

    fn text(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_playing_overlay() {
        let mut stream = StreamDescriptor::new("a", "Osprey Nest", StreamKind::Embedded, "u");
        stream.attribution = Some("Audubon".into());
        let view = KioskView {
            stream: Some(stream),
            total: 1,
            status: Some(PlaybackStatus::Ready),
            dwell: Duration::from_secs(90),
            ..KioskView::default()
        };

        let text = text(&lines(&view));
        assert_eq!(text[0], "Osprey Nest  Playing ");
        assert_eq!(text[1], "Cycling every 90s");
        assert_eq!(text[2], "Audubon");
    }

    #[test]
    fn test_failed_overlay_shows_detail() {
        let view = KioskView {
            stream: Some(StreamDescriptor::new("b", "Feeder", StreamKind::Adaptive, "u")),
            total: 1,
            status: Some(PlaybackStatus::Failed),
            detail: Some("Not ready within 15s".into()),
            ..KioskView::default()
        };

        let text = text(&lines(&view));
        assert!(text[0].contains("Issue"));
        assert_eq!(text[1], "Not ready within 15s");
        assert_eq!(text.len(), 2);
    }
}
