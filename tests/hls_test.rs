//! Adaptive-stream client tests
//!
//! Manifest loading against a mock server, retry exhaustion, and the
//! adaptive binding handing the resolved variant to the video surface.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use mockito::Server;
use tokio::sync::mpsc;

use camkiosk::player::hls::{HlsErrorDetails, HlsErrorType};
use camkiosk::player::{
    HlsClient, Launcher, PlayerContext, PlayerError, Surface, SurfaceRequest, SurfaceTarget,
};
use camkiosk::telemetry::TelemetrySink;
use camkiosk::{
    ControlEvent, Controller, KioskSettings, PlaybackStatus, StreamDescriptor, StreamKind,
    StreamList,
};

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
low/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=6000000,RESOLUTION=1920x1080
high/index.m3u8
";

const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:6
#EXT-X-MEDIA-SEQUENCE:100
#EXTINF:6.0,
seg100.ts
#EXTINF:6.0,
seg101.ts
";

fn client() -> HlsClient {
    HlsClient::new().with_retries(3, Duration::from_millis(10))
}

// =============================================================================
// Manifest Resolution
// =============================================================================

#[tokio::test]
async fn test_master_playlist_resolves_best_variant() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/osprey/master.m3u8")
        .with_status(200)
        .with_header("content-type", "application/vnd.apple.mpegurl")
        .with_body(MASTER)
        .create_async()
        .await;

    let url = format!("{}/osprey/master.m3u8", server.url());
    let resolved = client().resolve(&url).await.unwrap();

    assert_eq!(resolved, format!("{}/osprey/high/index.m3u8", server.url()));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_media_playlist_plays_as_is() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/feeder/live.m3u8")
        .with_status(200)
        .with_body(MEDIA)
        .create_async()
        .await;

    let url = format!("{}/feeder/live.m3u8", server.url());
    assert_eq!(client().resolve(&url).await.unwrap(), url);
}

#[tokio::test]
async fn test_retries_then_fatal() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/down.m3u8")
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let url = format!("{}/down.m3u8", server.url());
    let err = client().resolve(&url).await.unwrap_err();

    assert!(err.fatal);
    assert_eq!(err.kind, HlsErrorType::Network);
    assert_eq!(err.details, HlsErrorDetails::ManifestLoadError);
    assert_eq!(err.to_string(), "networkError/manifestLoadError");
    assert!(err.reason.contains("503"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_html_body_is_parsing_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/portal.m3u8")
        .with_status(200)
        .with_body("<html><body>Sign in</body></html>")
        .create_async()
        .await;

    let url = format!("{}/portal.m3u8", server.url());
    let err = client().resolve(&url).await.unwrap_err();
    assert!(err.fatal);
    assert_eq!(err.details, HlsErrorDetails::ManifestParsingError);
}

#[tokio::test]
async fn test_invalid_url_is_fatal_without_request() {
    let err = client().resolve("not a url").await.unwrap_err();
    assert!(err.fatal);
    assert_eq!(err.details, HlsErrorDetails::ManifestLoadError);
}

// =============================================================================
// Adaptive Binding
// =============================================================================

/// Video surface without native HLS, so the manifest client kicks in
#[derive(Default)]
struct NoNativeLauncher {
    requests: Mutex<Vec<SurfaceRequest>>,
}

impl Launcher for NoNativeLauncher {
    fn can_play_type(&self, _mime: &str) -> bool {
        false
    }

    fn adaptive_client(&self) -> bool {
        true
    }

    fn open(&self, request: SurfaceRequest) -> Result<Surface, PlayerError> {
        self.requests.lock().unwrap().push(request);
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(Surface::new(rx))
    }
}

fn adaptive(url: String) -> StreamList {
    StreamList::new(vec![StreamDescriptor::new(
        "feeder",
        "Feeder",
        StreamKind::Adaptive,
        url,
    )])
}

#[tokio::test]
async fn test_adaptive_binding_opens_resolved_variant() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/osprey/master.m3u8")
        .with_status(200)
        .with_body(MASTER)
        .create_async()
        .await;

    let launcher = Arc::new(NoNativeLauncher::default());
    let mut players = PlayerContext::new(launcher.clone(), Duration::from_secs(2));
    players.hls = client();
    let (sink, _telemetry) = TelemetrySink::channel();
    let (mut ctl, _rx) = Controller::new(KioskSettings::default(), players, sink);

    ctl.handle(ControlEvent::ListRefreshed(adaptive(format!(
        "{}/osprey/master.m3u8",
        server.url()
    ))));

    let mut opened = None;
    for _ in 0..100 {
        if let Some(request) = launcher.requests.lock().unwrap().first().cloned() {
            opened = Some(request);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let request = opened.expect("variant opened");
    assert_eq!(request.target, SurfaceTarget::Video);
    assert_eq!(request.url, format!("{}/osprey/high/index.m3u8", server.url()));
    assert_eq!(request.title, "Feeder");
}

#[tokio::test]
async fn test_adaptive_binding_reports_manifest_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/gone.m3u8")
        .with_status(404)
        .create_async()
        .await;

    let launcher = Arc::new(NoNativeLauncher::default());
    let mut players = PlayerContext::new(launcher.clone(), Duration::from_secs(2));
    players.hls = HlsClient::new().with_retries(1, Duration::ZERO);
    let (sink, _telemetry) = TelemetrySink::channel();
    let (mut ctl, mut rx) = Controller::new(KioskSettings::default(), players, sink);

    ctl.handle(ControlEvent::ListRefreshed(adaptive(format!("{}/gone.m3u8", server.url()))));

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("fatal reported in time")
        .unwrap();
    assert!(matches!(event, ControlEvent::Fatal { .. }));
    ctl.handle(event);

    let view = ctl.view();
    assert_eq!(view.status, Some(PlaybackStatus::Failed));
    assert_eq!(
        view.detail.as_deref(),
        Some("HLS fatal: networkError/manifestLoadError")
    );
    assert!(launcher.requests.lock().unwrap().is_empty());
}
