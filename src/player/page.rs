//! Generic-page binding
//!
//! Pages have no readiness wiring of their own. The page counts as ready only
//! if its surface reports playback; otherwise the controller's ready-timeout
//! decides.

use super::{Attachment, PlayerContext, PlayerSignal, SurfaceRequest, SurfaceTarget};
use crate::models::StreamDescriptor;

#[derive(Default)]
pub struct PagePlayer {
    attachment: Attachment,
}

impl PagePlayer {
    pub fn attach(&mut self, stream: &StreamDescriptor, ctx: &PlayerContext, signal: PlayerSignal) {
        let request = SurfaceRequest::new(SurfaceTarget::Page, &stream.url, &stream.name);
        if let Err(e) = self
            .attachment
            .open(ctx.launcher.as_ref(), request, &signal, |m| format!("Page error: {}", m))
        {
            signal.fatal(format!("Page failed to open: {}", e));
        }
    }

    pub fn teardown(&mut self) {
        self.attachment.release();
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_attached()
    }
}
