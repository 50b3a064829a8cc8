//! Playback session - one attempt at showing one stream
//!
//! A session owns its player binding and its timers. Timers are plain tokio
//! tasks that post a [`ControlEvent`] stamped with the session generation;
//! teardown aborts all of them and releases the player in one synchronous
//! step, so nothing from a finished session outlives it except events already
//! queued, which the controller drops by generation.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::models::{PlaybackStatus, StreamDescriptor};
use crate::player::{PlayerBinding, PlayerContext, PlayerSignal};

use super::ControlEvent;

#[derive(Debug)]
pub struct PlaybackSession {
    generation: u64,
    index: usize,
    stream: StreamDescriptor,
    status: PlaybackStatus,
    detail: Option<String>,
    dwell: Duration,
    ready_deadline: Option<Instant>,
    dwell_deadline: Option<Instant>,
    skip_deadline: Option<Instant>,
    ready_timer: Option<JoinHandle<()>>,
    dwell_timer: Option<JoinHandle<()>>,
    skip_timer: Option<JoinHandle<()>>,
    player: Option<PlayerBinding>,
}

impl PlaybackSession {
    pub fn new(generation: u64, index: usize, stream: StreamDescriptor, dwell: Duration) -> Self {
        Self {
            generation,
            index,
            stream,
            status: PlaybackStatus::Loading,
            detail: None,
            dwell,
            ready_deadline: None,
            dwell_deadline: None,
            skip_deadline: None,
            ready_timer: None,
            dwell_timer: None,
            skip_timer: None,
            player: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn ready_deadline(&self) -> Option<Instant> {
        self.ready_deadline
    }

    pub fn dwell_deadline(&self) -> Option<Instant> {
        self.dwell_deadline
    }

    pub fn skip_deadline(&self) -> Option<Instant> {
        self.skip_deadline
    }

    pub fn is_attached(&self) -> bool {
        self.player.as_ref().is_some_and(|p| p.is_attached())
    }

    /// Same stream index and descriptor, seen by a later list snapshot
    pub(crate) fn repoint(&mut self, index: usize, stream: StreamDescriptor) {
        self.index = index;
        self.stream = stream;
    }

    /// Arm the ready-timeout and dwell deadlines together
    pub fn arm(&mut self, ready_timeout: Duration, tx: &mpsc::UnboundedSender<ControlEvent>) {
        let now = Instant::now();
        let ready_at = now + ready_timeout;
        let dwell_at = now + self.dwell;
        let generation = self.generation;

        self.ready_deadline = Some(ready_at);
        self.dwell_deadline = Some(dwell_at);
        self.ready_timer = Some(timer(ready_at, tx, ControlEvent::ReadyTimeout { generation }));
        self.dwell_timer = Some(timer(dwell_at, tx, ControlEvent::DwellElapsed { generation }));
    }

    /// Attach the player for this session's stream
    pub fn attach(&mut self, ctx: &PlayerContext, tx: &mpsc::UnboundedSender<ControlEvent>) {
        let mut binding = PlayerBinding::for_kind(self.stream.kind);
        binding.attach(&self.stream, ctx, PlayerSignal::new(tx.clone(), self.generation));
        self.player = Some(binding);
    }

    /// Loading -> Ready. Returns false if the session wasn't loading.
    pub fn mark_ready(&mut self) -> bool {
        if self.status != PlaybackStatus::Loading {
            return false;
        }
        self.status = PlaybackStatus::Ready;
        self.detail = None;
        self.ready_deadline = None;
        if let Some(t) = self.ready_timer.take() {
            t.abort();
        }
        true
    }

    /// Enter Failed, release the player and schedule the advance.
    /// Returns false if the session had already failed.
    pub fn fail(
        &mut self,
        detail: impl Into<String>,
        auto_skip: Duration,
        tx: &mpsc::UnboundedSender<ControlEvent>,
    ) -> bool {
        if self.status == PlaybackStatus::Failed {
            return false;
        }
        self.status = PlaybackStatus::Failed;
        self.detail = Some(detail.into());
        self.cancel_timers();
        self.release_player();

        let skip_at = Instant::now() + auto_skip;
        self.skip_deadline = Some(skip_at);
        self.skip_timer = Some(timer(
            skip_at,
            tx,
            ControlEvent::AutoSkip {
                generation: self.generation,
            },
        ));
        true
    }

    fn cancel_timers(&mut self) {
        for t in [
            self.ready_timer.take(),
            self.dwell_timer.take(),
            self.skip_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            t.abort();
        }
        self.ready_deadline = None;
        self.dwell_deadline = None;
        self.skip_deadline = None;
    }

    fn release_player(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.teardown();
        }
    }

    /// Cancel every timer and release the player. Idempotent.
    pub fn teardown(&mut self) {
        self.cancel_timers();
        self.release_player();
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn timer(
    deadline: Instant,
    tx: &mpsc::UnboundedSender<ControlEvent>,
    event: ControlEvent,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline).await;
        let _ = tx.send(event);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamKind;

    fn session() -> PlaybackSession {
        let stream = StreamDescriptor::new("a", "A", StreamKind::Page, "https://a.example");
        PlaybackSession::new(1, 0, stream, Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = session();
        s.arm(Duration::from_secs(3), &tx);
        assert!(s.ready_deadline().is_some());
        assert!(s.dwell_deadline().is_some());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(matches!(rx.try_recv(), Ok(ControlEvent::ReadyTimeout { generation: 1 })));
        assert!(matches!(rx.try_recv(), Ok(ControlEvent::DwellElapsed { generation: 1 })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_cancels_only_ready_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = session();
        s.arm(Duration::from_secs(3), &tx);

        assert!(s.mark_ready());
        assert!(!s.mark_ready());
        assert_eq!(s.status(), PlaybackStatus::Ready);
        assert!(s.ready_deadline().is_none());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(matches!(rx.try_recv(), Ok(ControlEvent::DwellElapsed { generation: 1 })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_everything() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = session();
        s.arm(Duration::from_secs(3), &tx);
        s.teardown();
        s.teardown();

        assert!(s.ready_deadline().is_none());
        assert!(s.dwell_deadline().is_none());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_once_schedules_auto_skip() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut s = session();
        s.arm(Duration::from_secs(3), &tx);

        assert!(s.fail("boom", Duration::from_secs(1), &tx));
        assert!(!s.fail("again", Duration::from_secs(1), &tx));
        assert_eq!(s.detail(), Some("boom"));
        assert!(s.skip_deadline().is_some());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(matches!(rx.try_recv(), Ok(ControlEvent::AutoSkip { generation: 1 })));
        // Ready and dwell timers were cancelled on failure
        assert!(rx.try_recv().is_err());
    }
}
