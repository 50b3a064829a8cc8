//! Embedded-frame binding
//!
//! Third-party embeds expose no reliable "playing" signal, so readiness is
//! declared a fixed delay after the frame opens. A frame still buffering at
//! that point is caught by the dwell and ready-timeout timers.

use tracing::debug;

use super::{Attachment, PlayerContext, PlayerSignal, SurfaceRequest, SurfaceTarget};
use crate::models::StreamDescriptor;

#[derive(Default)]
pub struct EmbeddedPlayer {
    attachment: Attachment,
}

impl EmbeddedPlayer {
    pub fn attach(&mut self, stream: &StreamDescriptor, ctx: &PlayerContext, signal: PlayerSignal) {
        let request = SurfaceRequest::new(SurfaceTarget::Frame, &stream.url, &stream.name);
        if let Err(e) = self
            .attachment
            .open(ctx.launcher.as_ref(), request, &signal, |m| format!("Embed error: {}", m))
        {
            signal.fatal(format!("Embed failed to open: {}", e));
            return;
        }

        let delay = ctx.embed_ready_delay;
        debug!(stream = %stream.id, ?delay, "embed readiness assumed after delay");
        self.attachment.spawn(async move {
            tokio::time::sleep(delay).await;
            signal.ready();
        });
    }

    pub fn teardown(&mut self) {
        self.attachment.release();
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_attached()
    }
}
