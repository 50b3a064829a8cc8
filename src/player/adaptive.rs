//! Adaptive-stream binding
//!
//! Plays HLS through the video surface. If the surface advertises native
//! support for the stream's mime type the URL goes straight to it; otherwise
//! the manifest is resolved by [`HlsClient`](super::HlsClient) first and the
//! chosen variant is handed over. Readiness comes from the surface's
//! "playing" event.

use tracing::debug;

use super::{
    forward, Attachment, PlayerContext, PlayerSignal, SurfaceRequest, SurfaceTarget,
};
use crate::models::StreamDescriptor;

pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";
pub const DASH_MIME: &str = "application/dash+xml";
pub const MP4_MIME: &str = "video/mp4";

fn video_error(msg: &str) -> String {
    format!("Video element error: {}", msg)
}

/// Guess the container mime type from the URL path
pub fn mime_for_url(url: &str) -> &'static str {
    let path = reqwest::Url::parse(url)
        .map(|u| u.path().to_lowercase())
        .unwrap_or_else(|_| url.to_lowercase());

    if path.ends_with(".mpd") {
        DASH_MIME
    } else if path.ends_with(".mp4") {
        MP4_MIME
    } else {
        HLS_MIME
    }
}

#[derive(Default)]
pub struct AdaptivePlayer {
    attachment: Attachment,
}

impl AdaptivePlayer {
    pub fn attach(&mut self, stream: &StreamDescriptor, ctx: &PlayerContext, signal: PlayerSignal) {
        let mime = mime_for_url(&stream.url);

        if ctx.launcher.can_play_type(mime) {
            debug!(stream = %stream.id, mime, "native playback");
            let request = SurfaceRequest::new(SurfaceTarget::Video, &stream.url, &stream.name);
            if let Err(e) =
                self.attachment
                    .open(ctx.launcher.as_ref(), request, &signal, video_error)
            {
                signal.fatal(format!("HLS play failed: {}", e));
            }
            return;
        }

        if !ctx.launcher.adaptive_client() {
            signal.fatal("HLS not supported by this player");
            return;
        }

        debug!(stream = %stream.id, mime, "resolving manifest with adaptive client");
        let slot = self.attachment.slot().clone();
        let launcher = ctx.launcher.clone();
        let hls = ctx.hls.clone();
        let url = stream.url.clone();
        let title = stream.name.clone();

        self.attachment.spawn(async move {
            let media_url = match hls.resolve(&url).await {
                Ok(media_url) => media_url,
                Err(e) => {
                    signal.fatal(format!("HLS fatal: {}", e));
                    return;
                }
            };
            if slot.is_closed() {
                return;
            }

            let request = SurfaceRequest::new(SurfaceTarget::Video, media_url, title);
            let mut surface = match launcher.open(request) {
                Ok(surface) => surface,
                Err(e) => {
                    signal.fatal(format!("HLS play failed: {}", e));
                    return;
                }
            };
            let events = surface.take_events();
            if !slot.install(surface) {
                return;
            }
            if let Some(events) = events {
                forward(events, signal, video_error).await;
            }
        });
    }

    pub fn teardown(&mut self) {
        self.attachment.release();
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_attached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for_url() {
        assert_eq!(mime_for_url("https://cams.example.org/live/index.m3u8"), HLS_MIME);
        assert_eq!(mime_for_url("https://cams.example.org/live/INDEX.M3U8?token=x"), HLS_MIME);
        assert_eq!(mime_for_url("https://cams.example.org/manifest.mpd"), DASH_MIME);
        assert_eq!(mime_for_url("https://cams.example.org/loop.mp4"), MP4_MIME);
        // Adaptive streams default to HLS
        assert_eq!(mime_for_url("https://cams.example.org/stream"), HLS_MIME);
        assert_eq!(mime_for_url("not a url.mpd"), DASH_MIME);
    }
}
