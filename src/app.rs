//! App state for the kiosk surface
//!
//! Holds the latest [`KioskView`] published by the controller and the
//! metrics snapshot shown in the status bar, and turns key presses into
//! actions for the controller.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::time::Instant;

use crate::kiosk::KioskView;
use crate::models::PlaybackStatus;
use crate::telemetry::MetricsSnapshot;

/// Something the main loop must forward to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    SkipNow,
}

// =============================================================================
// Screen
// =============================================================================

/// Which screen the current view calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Empty stream list
    NothingConfigured,
    /// Stream loading or playing; overlay only
    Playing,
    /// Stream failed; offline screen with countdown
    Offline,
}

impl Screen {
    pub fn for_view(view: &KioskView) -> Self {
        match view.status {
            _ if view.is_idle() => Screen::NothingConfigured,
            Some(PlaybackStatus::Failed) => Screen::Offline,
            _ => Screen::Playing,
        }
    }
}

// =============================================================================
// App
// =============================================================================

#[derive(Debug)]
pub struct App {
    pub running: bool,
    pub view: KioskView,
    pub metrics: MetricsSnapshot,
    /// Show the metrics status bar
    pub show_stats: bool,
}

impl Default for App {
    fn default() -> Self {
        Self {
            running: true,
            view: KioskView::default(),
            metrics: MetricsSnapshot::default(),
            show_stats: true,
        }
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn set_view(&mut self, view: KioskView) {
        self.view = view;
    }

    pub fn set_metrics(&mut self, metrics: MetricsSnapshot) {
        self.metrics = metrics;
    }

    pub fn screen(&self) -> Screen {
        Screen::for_view(&self.view)
    }

    /// Whole seconds left before the offline screen moves on, rounded up
    pub fn countdown(&self, now: Instant) -> Option<u64> {
        if self.screen() != Screen::Offline {
            return None;
        }
        self.view.skip_remaining(now).map(|left| {
            let secs = left.as_secs();
            if left.subsec_nanos() > 0 {
                secs + 1
            } else {
                secs
            }
        })
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<KeyAction> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.quit();
                None
            }
            KeyCode::Char('s') | KeyCode::Char('n') | KeyCode::Right | KeyCode::Enter => {
                if self.view.is_idle() {
                    None
                } else {
                    Some(KeyAction::SkipNow)
                }
            }
            KeyCode::Char('i') => {
                self.show_stats = !self.show_stats;
                None
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StreamDescriptor, StreamKind};
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    fn active_view(status: PlaybackStatus) -> KioskView {
        KioskView {
            stream: Some(StreamDescriptor::new("a", "A", StreamKind::Page, "https://a.example")),
            total: 1,
            status: Some(status),
            ..KioskView::default()
        }
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.running);

        let mut app = App::new();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.running);
    }

    #[test]
    fn test_skip_keys() {
        let mut app = App::new();
        // Nothing to skip while idle
        assert_eq!(app.handle_key(key(KeyCode::Char('s'))), None);

        app.set_view(active_view(PlaybackStatus::Loading));
        assert_eq!(app.handle_key(key(KeyCode::Char('s'))), Some(KeyAction::SkipNow));
        assert_eq!(app.handle_key(key(KeyCode::Right)), Some(KeyAction::SkipNow));
        assert!(app.running);
    }

    #[test]
    fn test_screen_for_view() {
        assert_eq!(Screen::for_view(&KioskView::default()), Screen::NothingConfigured);
        assert_eq!(Screen::for_view(&active_view(PlaybackStatus::Loading)), Screen::Playing);
        assert_eq!(Screen::for_view(&active_view(PlaybackStatus::Ready)), Screen::Playing);
        assert_eq!(Screen::for_view(&active_view(PlaybackStatus::Failed)), Screen::Offline);
    }

    #[test]
    fn test_countdown_rounds_up() {
        let now = Instant::now();
        let mut app = App::new();
        let mut view = active_view(PlaybackStatus::Failed);
        view.skip_deadline = Some(now + Duration::from_millis(7200));
        app.set_view(view);
        assert_eq!(app.countdown(now), Some(8));

        app.set_view(active_view(PlaybackStatus::Ready));
        assert_eq!(app.countdown(now), None);
    }
}
