//! Player bindings
//!
//! One presentation strategy per stream kind, dispatched through the flat
//! [`PlayerBinding`] enum:
//!
//! - `embedded` - third-party embeds, readiness declared after a short delay
//! - `adaptive` - HLS, native playback or the manifest client in [`hls`]
//! - `page` - generic web pages, bound only by the controller's timers
//!
//! Bindings never block. Readiness and fatal errors reach the controller as
//! [`ControlEvent`]s stamped with the session generation they belong to.

pub mod adaptive;
pub mod embedded;
pub mod hls;
pub mod launcher;
pub mod page;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::kiosk::ControlEvent;
use crate::models::{StreamDescriptor, StreamKind};

pub use adaptive::AdaptivePlayer;
pub use embedded::EmbeddedPlayer;
pub use hls::{HlsClient, HlsError};
pub use launcher::ProcessLauncher;
pub use page::PagePlayer;

// =============================================================================
// Presentation Surfaces
// =============================================================================

/// What a surface shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTarget {
    /// Embed page in a kiosk browser
    Frame,
    /// Media URL in a video player
    Video,
    /// Arbitrary web page in a kiosk browser
    Page,
}

/// Request to open a presentation surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceRequest {
    pub target: SurfaceTarget,
    pub url: String,
    pub title: String,
}

impl SurfaceRequest {
    pub fn new(target: SurfaceTarget, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            target,
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Events reported by an open surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Playback started
    Playing,
    /// Unrecoverable playback error (decode failure and the like)
    Error(String),
    /// The surface went away on its own
    Exited(Option<i32>),
}

/// An open presentation surface.
///
/// Dropping it runs its release hook, so ownership is the only handle needed
/// to guarantee the underlying process and decoder go away.
pub struct Surface {
    events: Option<mpsc::UnboundedReceiver<SurfaceEvent>>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Surface {
    pub fn new(events: mpsc::UnboundedReceiver<SurfaceEvent>) -> Self {
        Self {
            events: Some(events),
            release: None,
        }
    }

    /// Hook run exactly once when the surface is released
    pub fn on_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SurfaceEvent>> {
        self.events.take()
    }

    pub fn release(&mut self) {
        self.events = None;
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Errors from opening surfaces
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
}

/// Opens presentation surfaces. The process-backed implementation lives in
/// [`launcher`]; tests supply their own.
pub trait Launcher: Send + Sync {
    /// Whether the video surface plays this mime type natively
    fn can_play_type(&self, mime: &str) -> bool;

    /// Whether manifests may be resolved by the adaptive client when native
    /// playback is unavailable
    fn adaptive_client(&self) -> bool;

    fn open(&self, request: SurfaceRequest) -> Result<Surface, PlayerError>;
}

// =============================================================================
// Controller Callbacks
// =============================================================================

/// Callback handle given to a binding, stamped with its session generation
#[derive(Debug, Clone)]
pub struct PlayerSignal {
    tx: mpsc::UnboundedSender<ControlEvent>,
    generation: u64,
}

impl PlayerSignal {
    pub fn new(tx: mpsc::UnboundedSender<ControlEvent>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ready(&self) {
        let _ = self.tx.send(ControlEvent::Ready {
            generation: self.generation,
        });
    }

    pub fn fatal(&self, detail: impl Into<String>) {
        let _ = self.tx.send(ControlEvent::Fatal {
            generation: self.generation,
            detail: detail.into(),
        });
    }
}

/// Shared collaborators every binding needs
#[derive(Clone)]
pub struct PlayerContext {
    pub launcher: Arc<dyn Launcher>,
    pub hls: HlsClient,
    pub embed_ready_delay: Duration,
}

impl PlayerContext {
    pub fn new(launcher: Arc<dyn Launcher>, embed_ready_delay: Duration) -> Self {
        Self {
            launcher,
            hls: HlsClient::new(),
            embed_ready_delay,
        }
    }
}

// =============================================================================
// Binding Resources
// =============================================================================

#[derive(Default)]
struct SlotState {
    surface: Option<Surface>,
    closed: bool,
}

/// Holds the surface of one binding. Background tasks install into it; once
/// released it refuses new surfaces, dropping them on the spot.
#[derive(Clone, Default)]
pub(crate) struct SurfaceSlot(Arc<Mutex<SlotState>>);

impl SurfaceSlot {
    /// Returns false (and releases the surface) if the slot is already closed
    pub(crate) fn install(&self, surface: Surface) -> bool {
        let Ok(mut state) = self.0.lock() else {
            return false;
        };
        if state.closed {
            return false;
        }
        state.surface = Some(surface);
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.0.lock().map(|s| s.closed).unwrap_or(true)
    }

    pub(crate) fn release(&self) {
        let surface = match self.0.lock() {
            Ok(mut state) => {
                state.closed = true;
                state.surface.take()
            }
            Err(_) => None,
        };
        drop(surface);
    }
}

/// Everything one attached binding owns: its surface and background tasks
#[derive(Default)]
pub(crate) struct Attachment {
    slot: SurfaceSlot,
    tasks: Vec<JoinHandle<()>>,
}

impl Attachment {
    pub(crate) fn slot(&self) -> &SurfaceSlot {
        &self.slot
    }

    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push(tokio::spawn(task));
    }

    /// Open a surface now and forward its events
    pub(crate) fn open(
        &mut self,
        launcher: &dyn Launcher,
        request: SurfaceRequest,
        signal: &PlayerSignal,
        describe_error: fn(&str) -> String,
    ) -> Result<(), PlayerError> {
        let mut surface = launcher.open(request)?;
        let events = surface.take_events();
        if self.slot.install(surface) {
            if let Some(events) = events {
                self.spawn(forward(events, signal.clone(), describe_error));
            }
        }
        Ok(())
    }

    pub(crate) fn is_attached(&self) -> bool {
        !self.slot.is_closed() && (!self.tasks.is_empty() || self.has_surface())
    }

    fn has_surface(&self) -> bool {
        self.slot
            .0
            .lock()
            .map(|s| s.surface.is_some())
            .unwrap_or(false)
    }

    /// Idempotent
    pub(crate) fn release(&mut self) {
        self.slot.release();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.release();
    }
}

/// Relay surface events into controller callbacks until the surface ends
pub(crate) async fn forward(
    mut events: mpsc::UnboundedReceiver<SurfaceEvent>,
    signal: PlayerSignal,
    describe_error: fn(&str) -> String,
) {
    while let Some(event) = events.recv().await {
        match event {
            SurfaceEvent::Playing => signal.ready(),
            SurfaceEvent::Error(msg) => {
                signal.fatal(describe_error(&msg));
                break;
            }
            SurfaceEvent::Exited(code) => {
                let code = code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into());
                signal.fatal(format!("Player exited ({})", code));
                break;
            }
        }
    }
}

// =============================================================================
// Binding Dispatch
// =============================================================================

/// Player binding for the active stream, one variant per [`StreamKind`]
pub enum PlayerBinding {
    Embedded(EmbeddedPlayer),
    Adaptive(AdaptivePlayer),
    Page(PagePlayer),
}

impl PlayerBinding {
    pub fn for_kind(kind: StreamKind) -> Self {
        match kind {
            StreamKind::Embedded => PlayerBinding::Embedded(EmbeddedPlayer::default()),
            StreamKind::Adaptive => PlayerBinding::Adaptive(AdaptivePlayer::default()),
            StreamKind::Page => PlayerBinding::Page(PagePlayer::default()),
        }
    }

    pub fn kind(&self) -> StreamKind {
        match self {
            PlayerBinding::Embedded(_) => StreamKind::Embedded,
            PlayerBinding::Adaptive(_) => StreamKind::Adaptive,
            PlayerBinding::Page(_) => StreamKind::Page,
        }
    }

    /// Start loading. Returns immediately; outcomes arrive through `signal`.
    pub fn attach(&mut self, stream: &StreamDescriptor, ctx: &PlayerContext, signal: PlayerSignal) {
        match self {
            PlayerBinding::Embedded(p) => p.attach(stream, ctx, signal),
            PlayerBinding::Adaptive(p) => p.attach(stream, ctx, signal),
            PlayerBinding::Page(p) => p.attach(stream, ctx, signal),
        }
    }

    /// Release everything. Safe on a torn-down or never-attached binding.
    pub fn teardown(&mut self) {
        match self {
            PlayerBinding::Embedded(p) => p.teardown(),
            PlayerBinding::Adaptive(p) => p.teardown(),
            PlayerBinding::Page(p) => p.teardown(),
        }
    }

    pub fn is_attached(&self) -> bool {
        match self {
            PlayerBinding::Embedded(p) => p.is_attached(),
            PlayerBinding::Adaptive(p) => p.is_attached(),
            PlayerBinding::Page(p) => p.is_attached(),
        }
    }
}

impl std::fmt::Debug for PlayerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerBinding")
            .field("kind", &self.kind())
            .field("attached", &self.is_attached())
            .finish()
    }
}
