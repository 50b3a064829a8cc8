//! Playback lifecycle controller
//!
//! The controller is the only owner of the active [`PlaybackSession`]. All
//! input arrives as [`ControlEvent`]s on one channel and is handled one at a
//! time, so the session is never mutated concurrently:
//!
//! ```text
//! Idle ──list──▶ Loading ──ready──▶ Ready ──dwell──▶ advance
//!                   │                  │
//!                   ├─timeout/fatal────┴──▶ Failed ──auto-skip──▶ advance
//!                   └─gate rejects─────────▶ Failed
//! ```
//!
//! Player bindings and timers report back with the generation of the
//! session they belong to. Anything carrying an older generation is dropped.

pub mod gate;
pub mod session;

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::KioskConfig;
use crate::models::{EventKind, PlaybackStatus, StreamDescriptor, StreamList, TelemetryEvent};
use crate::player::PlayerContext;
use crate::telemetry::TelemetrySink;

pub use gate::{should_attempt, GateVerdict};
pub use session::PlaybackSession;

// =============================================================================
// Events
// =============================================================================

/// Everything that can move the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// New snapshot from the list source
    ListRefreshed(StreamList),
    /// Player binding observed playback
    Ready { generation: u64 },
    /// Player binding gave up
    Fatal { generation: u64, detail: String },
    ReadyTimeout { generation: u64 },
    DwellElapsed { generation: u64 },
    /// Offline countdown finished
    AutoSkip { generation: u64 },
    /// Operator asked to move on
    SkipNow,
    Shutdown,
}

/// Timing knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KioskSettings {
    pub default_dwell: Duration,
    pub ready_timeout: Duration,
    pub auto_skip: Duration,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self::from(&KioskConfig::default())
    }
}

impl From<&KioskConfig> for KioskSettings {
    fn from(config: &KioskConfig) -> Self {
        Self {
            default_dwell: config.default_dwell(),
            ready_timeout: config.ready_timeout(),
            auto_skip: config.auto_skip(),
        }
    }
}

// =============================================================================
// Selection
// =============================================================================

/// Map an unbounded rotation index onto the list, wrapping in both directions.
/// An empty list has no current stream.
pub fn select_current(list: &StreamList, index: i64) -> Option<(usize, &StreamDescriptor)> {
    if list.is_empty() {
        return None;
    }
    let n = list.len() as i64;
    let i = index.rem_euclid(n) as usize;
    list.streams.get(i).map(|s| (i, s))
}

/// Whole seconds print as "15s", anything finer keeps one decimal ("0.5s")
pub fn format_secs(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

// =============================================================================
// View
// =============================================================================

/// What the rendering surface needs to know, published after every change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KioskView {
    pub stream: Option<StreamDescriptor>,
    pub index: usize,
    pub total: usize,
    pub status: Option<PlaybackStatus>,
    pub detail: Option<String>,
    pub dwell: Duration,
    pub skip_deadline: Option<Instant>,
    pub generation: u64,
}

impl KioskView {
    /// Nothing configured
    pub fn is_idle(&self) -> bool {
        self.stream.is_none()
    }

    /// Time left on the offline countdown
    pub fn skip_remaining(&self, now: Instant) -> Option<Duration> {
        self.skip_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

// =============================================================================
// Controller
// =============================================================================

pub struct Controller {
    settings: KioskSettings,
    list: StreamList,
    rotation: i64,
    generation: u64,
    session: Option<PlaybackSession>,
    events_tx: mpsc::UnboundedSender<ControlEvent>,
    telemetry: TelemetrySink,
    players: PlayerContext,
    view_tx: watch::Sender<KioskView>,
}

impl Controller {
    /// Create an idle controller and the receiving end of its event channel
    pub fn new(
        settings: KioskSettings,
        players: PlayerContext,
        telemetry: TelemetrySink,
    ) -> (Self, mpsc::UnboundedReceiver<ControlEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(KioskView::default());
        let controller = Self {
            settings,
            list: StreamList::empty(),
            rotation: 0,
            generation: 0,
            session: None,
            events_tx,
            telemetry,
            players,
            view_tx,
        };
        (controller, events_rx)
    }

    /// Sender for list sources, key handlers and tests
    pub fn sender(&self) -> mpsc::UnboundedSender<ControlEvent> {
        self.events_tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<KioskView> {
        self.view_tx.subscribe()
    }

    pub fn view(&self) -> KioskView {
        self.view_tx.borrow().clone()
    }

    pub fn rotation(&self) -> i64 {
        self.rotation
    }

    pub fn list(&self) -> &StreamList {
        &self.list
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Drive the controller until shutdown or until every sender is gone
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ControlEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        self.stop();
    }

    /// Apply one event. Returns false once the controller should stop.
    pub fn handle(&mut self, event: ControlEvent) -> bool {
        match event {
            ControlEvent::ListRefreshed(list) => self.on_list_refreshed(list),
            ControlEvent::Ready { generation } => self.on_ready(generation),
            ControlEvent::Fatal { generation, detail } => self.on_fatal(generation, detail),
            ControlEvent::ReadyTimeout { generation } => self.on_ready_timeout(generation),
            ControlEvent::DwellElapsed { generation } => self.on_dwell(generation),
            ControlEvent::AutoSkip { generation } => {
                if self.is_current(generation) {
                    self.advance();
                }
            }
            ControlEvent::SkipNow => {
                if !self.list.is_empty() {
                    info!("manual skip");
                    self.advance();
                }
            }
            ControlEvent::Shutdown => return false,
        }
        true
    }

    /// Tear down the current session and start the next stream in rotation
    pub fn advance(&mut self) {
        self.teardown();
        self.rotation += 1;
        self.start_session();
    }

    /// Release everything and publish the idle view
    pub fn stop(&mut self) {
        self.teardown();
        self.publish();
    }

    fn is_current(&self, generation: u64) -> bool {
        let current = self
            .session
            .as_ref()
            .is_some_and(|s| s.generation() == generation);
        if !current {
            debug!(generation, "stale event ignored");
        }
        current
    }

    fn start_session(&mut self) {
        self.teardown();

        let Some((index, stream)) = select_current(&self.list, self.rotation) else {
            info!("no streams configured");
            self.publish();
            return;
        };
        let stream = stream.clone();
        self.generation += 1;

        let dwell = stream.dwell(self.settings.default_dwell);
        let mut session = PlaybackSession::new(self.generation, index, stream.clone(), dwell);

        let verdict = should_attempt(&stream);
        if !verdict.attempt {
            let reason = verdict
                .reason
                .unwrap_or_else(|| gate::OFFLINE_FALLBACK.to_string());
            info!(stream = %stream.id, reason = %reason, "health gate rejected stream");
            session.fail(reason.clone(), self.settings.auto_skip, &self.events_tx);
            self.emit(&stream, EventKind::Skip, Some(reason));
            self.session = Some(session);
            self.publish();
            return;
        }

        info!(
            stream = %stream.id,
            kind = %stream.kind,
            index,
            generation = self.generation,
            "loading stream"
        );
        self.emit(&stream, EventKind::Load, None);
        session.arm(self.settings.ready_timeout, &self.events_tx);
        session.attach(&self.players, &self.events_tx);
        self.session = Some(session);
        self.publish();
    }

    fn on_ready(&mut self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.mark_ready() {
            return;
        }
        let stream = session.stream().clone();
        info!(stream = %stream.id, "stream ready");
        self.emit(&stream, EventKind::Ready, None);
        self.publish();
    }

    /// A timeout already queued when readiness arrived must not fail the session
    fn on_ready_timeout(&mut self, generation: u64) {
        if !self.is_current(generation) || self.status() != Some(PlaybackStatus::Loading) {
            return;
        }
        let detail = format!("Not ready within {}", format_secs(self.settings.ready_timeout));
        self.fail(detail);
    }

    fn on_fatal(&mut self, generation: u64, detail: String) {
        if !self.is_current(generation) {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.status() == PlaybackStatus::Failed {
            return;
        }
        let stream = session.stream().clone();
        self.emit(&stream, EventKind::Error, Some(detail.clone()));
        self.fail(detail);
    }

    fn on_dwell(&mut self, generation: u64) {
        if !self.is_current(generation) {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        // Failed sessions leave only through the offline countdown
        if session.status() == PlaybackStatus::Failed {
            return;
        }
        let stream = session.stream().clone();
        let detail = format!("Dwell reached ({})", format_secs(session.dwell()));
        info!(stream = %stream.id, "dwell reached");
        self.emit(&stream, EventKind::Skip, Some(detail));
        self.advance();
    }

    /// Common failure path: Failed, player released, skip emitted, advance scheduled
    fn fail(&mut self, detail: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.fail(detail.clone(), self.settings.auto_skip, &self.events_tx) {
            return;
        }
        let stream = session.stream().clone();
        warn!(stream = %stream.id, detail = %detail, "stream failed");
        self.emit(&stream, EventKind::Skip, Some(detail));
        self.publish();
    }

    fn on_list_refreshed(&mut self, list: StreamList) {
        debug!(count = list.len(), version = list.version, "stream list refreshed");
        self.list = list;

        if self.list.is_empty() {
            if self.session.is_some() {
                info!("stream list is empty, going idle");
            }
            self.stop();
            return;
        }

        let Some(current) = self.session.as_ref().map(|s| s.stream().clone()) else {
            self.start_session();
            return;
        };

        let Some(position) = self.list.position(&current.id) else {
            info!(stream = %current.id, "current stream removed");
            self.start_session();
            return;
        };

        self.rotation = position as i64;
        let fresh = self.list.streams[position].clone();

        if fresh.kind != current.kind || fresh.url != current.url {
            info!(stream = %fresh.id, "current stream changed, restarting");
            self.start_session();
            return;
        }

        let verdict = should_attempt(&fresh);
        if let Some(session) = self.session.as_mut() {
            session.repoint(position, fresh);
        }

        if !verdict.attempt && self.status() != Some(PlaybackStatus::Failed) {
            let reason = verdict
                .reason
                .unwrap_or_else(|| gate::OFFLINE_FALLBACK.to_string());
            info!(stream = %current.id, reason = %reason, "current stream went unhealthy");
            self.fail(reason);
            return;
        }

        self.publish();
    }

    fn status(&self) -> Option<PlaybackStatus> {
        self.session.as_ref().map(|s| s.status())
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown();
        }
    }

    fn emit(&self, stream: &StreamDescriptor, kind: EventKind, detail: Option<String>) {
        self.telemetry
            .emit(TelemetryEvent::for_stream(stream, kind, detail));
    }

    fn publish(&self) {
        let view = match &self.session {
            Some(s) => KioskView {
                stream: Some(s.stream().clone()),
                index: s.index(),
                total: self.list.len(),
                status: Some(s.status()),
                detail: s.detail().map(str::to_string),
                dwell: s.dwell(),
                skip_deadline: s.skip_deadline(),
                generation: s.generation(),
            },
            None => KioskView {
                total: self.list.len(),
                generation: self.generation,
                ..KioskView::default()
            },
        };
        self.view_tx.send_replace(view);
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamKind;

    fn list(ids: &[&str]) -> StreamList {
        StreamList::new(
            ids.iter()
                .map(|id| StreamDescriptor::new(*id, *id, StreamKind::Page, "https://x.example"))
                .collect(),
        )
    }

    #[test]
    fn test_select_current_wraps() {
        let l = list(&["a", "b", "c"]);
        for i in -10i64..10 {
            let (idx, s) = select_current(&l, i).unwrap();
            assert_eq!(idx, (((i % 3) + 3) % 3) as usize);
            assert_eq!(s.id, l.streams[idx].id);
        }
        assert_eq!(select_current(&l, -1).unwrap().1.id, "c");
        assert_eq!(select_current(&l, i64::MIN).map(|(i, _)| i), Some(((i64::MIN % 3 + 3) % 3) as usize));
    }

    #[test]
    fn test_select_current_empty() {
        assert!(select_current(&StreamList::empty(), 0).is_none());
        assert!(select_current(&StreamList::empty(), -7).is_none());
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(Duration::from_secs(15)), "15s");
        assert_eq!(format_secs(Duration::from_millis(500)), "0.5s");
        assert_eq!(format_secs(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_secs(Duration::ZERO), "0s");
    }

    #[test]
    fn test_view_remaining() {
        let now = Instant::now();
        let view = KioskView {
            skip_deadline: Some(now + Duration::from_secs(8)),
            ..KioskView::default()
        };
        assert!(view.is_idle());
        assert_eq!(view.skip_remaining(now), Some(Duration::from_secs(8)));
        assert_eq!(
            view.skip_remaining(now + Duration::from_secs(20)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_settings_from_config() {
        let settings = KioskSettings::default();
        assert_eq!(settings.default_dwell, Duration::from_secs(90));
        assert_eq!(settings.ready_timeout, Duration::from_secs(15));
        assert_eq!(settings.auto_skip, Duration::from_secs(8));
    }
}
