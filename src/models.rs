//! Data structures and types for camkiosk
//!
//! Contains the shared models used across the kiosk, organized by domain:
//! - **Streams**: descriptors, kinds and precomputed health
//! - **Lists**: versioned snapshots delivered by the list source
//! - **Playback**: session status exposed to the rendering surface
//! - **Telemetry**: fire-and-forget lifecycle events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Stream Models
// =============================================================================

/// Kind of stream, selects the player binding used to present it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Third-party video embed (YouTube and friends)
    #[serde(alias = "youtube")]
    Embedded,
    /// Segmented HTTP streaming (HLS)
    #[serde(alias = "hls")]
    Adaptive,
    /// Generic web page
    #[serde(alias = "web")]
    Page,
}

impl StreamKind {
    /// Short lowercase tag used in telemetry and cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Embedded => "embedded",
            StreamKind::Adaptive => "adaptive",
            StreamKind::Page => "page",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StreamKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedded" | "youtube" => Ok(StreamKind::Embedded),
            "adaptive" | "hls" => Ok(StreamKind::Adaptive),
            "page" | "web" => Ok(StreamKind::Page),
            other => Err(format!("unknown stream kind '{}'", other)),
        }
    }
}

/// Precomputed reachability verdict attached by the list source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl Health {
    pub fn up(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: Some(detail.into()),
            checked_at: Utc::now(),
        }
    }

    pub fn down(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
            checked_at: Utc::now(),
        }
    }
}

/// One configured stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub id: String,
    pub name: String,
    pub kind: StreamKind,
    pub url: String,
    #[serde(default, alias = "dwellSec", skip_serializing_if = "Option::is_none")]
    pub dwell_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Health>,
}

impl StreamDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: StreamKind,
        url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            url: url.into(),
            dwell_seconds: None,
            attribution: None,
            health: None,
        }
    }

    pub fn with_dwell(mut self, seconds: u64) -> Self {
        self.dwell_seconds = Some(seconds);
        self
    }

    pub fn with_health(mut self, health: Health) -> Self {
        self.health = Some(health);
        self
    }

    /// Dwell period for this stream, falling back to the configured default.
    /// Zero is not a valid dwell and also falls back.
    pub fn dwell(&self, default: Duration) -> Duration {
        match self.dwell_seconds {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => default,
        }
    }

    /// Check the fields an operator must supply
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("id must not be empty".into());
        }
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.url.trim().is_empty() {
            return Err("url must not be empty".into());
        }
        if self.dwell_seconds == Some(0) {
            return Err("dwell must be positive".into());
        }
        Ok(())
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.name, self.kind, self.url)
    }
}

// =============================================================================
// Stream List
// =============================================================================

/// Versioned snapshot of the configured streams, replaced wholesale on refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamList {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, rename = "cams", alias = "streams")]
    pub streams: Vec<StreamDescriptor>,
}

fn default_version() -> u32 {
    1
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

impl StreamList {
    /// Empty snapshot, meaning "nothing to play"
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn new(streams: Vec<StreamDescriptor>) -> Self {
        Self {
            version: 1,
            updated_at: Utc::now(),
            streams,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.streams.iter().position(|s| s.id == id)
    }

    /// Same streams in the same order, ignoring snapshot metadata
    pub fn same_streams(&self, other: &StreamList) -> bool {
        self.streams == other.streams
    }
}

impl Default for StreamList {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Playback Models
// =============================================================================

/// Status of the active playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Loading,
    Ready,
    Failed,
}

impl PlaybackStatus {
    /// Badge text shown on the overlay
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackStatus::Loading => "Loading",
            PlaybackStatus::Ready => "Playing",
            PlaybackStatus::Failed => "Issue",
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Telemetry Models
// =============================================================================

/// Lifecycle event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Load,
    Ready,
    Skip,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Load => "load",
            EventKind::Ready => "ready",
            EventKind::Skip => "skip",
            EventKind::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Observational event emitted by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    pub ts: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cam_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cam_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub event: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TelemetryEvent {
    /// Event about a specific stream, timestamped now
    pub fn for_stream(stream: &StreamDescriptor, event: EventKind, detail: Option<String>) -> Self {
        Self {
            ts: Utc::now(),
            cam_id: Some(stream.id.clone()),
            cam_name: Some(stream.name.clone()),
            kind: Some(stream.kind.as_str().to_string()),
            event,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_original_cams_file() {
        let json = r#"{
            "version": 3,
            "updatedAt": "2025-04-01T10:00:00Z",
            "cams": [
                {"id": "osprey", "name": "Osprey Nest", "kind": "youtube", "url": "https://www.youtube.com/embed/abc", "dwellSec": 60},
                {"id": "feeder", "name": "Feeder", "kind": "hls", "url": "https://cams.example.org/feeder.m3u8", "attribution": "Audubon"},
                {"id": "map", "name": "Migration Map", "kind": "web", "url": "https://example.org/map"}
            ]
        }"#;

        let list: StreamList = serde_json::from_str(json).unwrap();
        assert_eq!(list.version, 3);
        assert_eq!(list.len(), 3);
        assert_eq!(list.streams[0].kind, StreamKind::Embedded);
        assert_eq!(list.streams[0].dwell_seconds, Some(60));
        assert_eq!(list.streams[1].kind, StreamKind::Adaptive);
        assert_eq!(list.streams[1].attribution.as_deref(), Some("Audubon"));
        assert_eq!(list.streams[2].kind, StreamKind::Page);
        assert!(list.streams[2].health.is_none());
    }

    #[test]
    fn test_parse_health_annotation() {
        let json = r#"{
            "id": "a", "name": "A", "kind": "adaptive", "url": "https://a.example/live.m3u8",
            "health": {"ok": false, "detail": "DNS lookup failed", "checkedAt": "2025-04-01T10:00:00Z"}
        }"#;
        let stream: StreamDescriptor = serde_json::from_str(json).unwrap();
        let health = stream.health.unwrap();
        assert!(!health.ok);
        assert_eq!(health.detail.as_deref(), Some("DNS lookup failed"));
    }

    #[test]
    fn test_missing_cams_defaults_to_empty() {
        let list: StreamList = serde_json::from_str(r#"{"version": 1}"#).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_dwell_fallback() {
        let default = Duration::from_secs(90);
        let stream = StreamDescriptor::new("a", "A", StreamKind::Page, "https://a.example");
        assert_eq!(stream.dwell(default), default);
        assert_eq!(stream.clone().with_dwell(5).dwell(default), Duration::from_secs(5));
        assert_eq!(stream.with_dwell(0).dwell(default), default);
    }

    #[test]
    fn test_validate() {
        let ok = StreamDescriptor::new("a", "A", StreamKind::Page, "https://a.example");
        assert!(ok.validate().is_ok());
        assert!(StreamDescriptor::new(" ", "A", StreamKind::Page, "u").validate().is_err());
        assert!(StreamDescriptor::new("a", "", StreamKind::Page, "u").validate().is_err());
        assert!(StreamDescriptor::new("a", "A", StreamKind::Page, "").validate().is_err());
        assert!(ok.with_dwell(0).validate().is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("hls".parse::<StreamKind>(), Ok(StreamKind::Adaptive));
        assert_eq!("YouTube".parse::<StreamKind>(), Ok(StreamKind::Embedded));
        assert_eq!("page".parse::<StreamKind>(), Ok(StreamKind::Page));
        assert!("rtsp".parse::<StreamKind>().is_err());
    }

    #[test]
    fn test_telemetry_serialization() {
        let stream = StreamDescriptor::new("a", "Alpha", StreamKind::Adaptive, "u");
        let event = TelemetryEvent::for_stream(&stream, EventKind::Skip, Some("boom".into()));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["camId"], "a");
        assert_eq!(json["camName"], "Alpha");
        assert_eq!(json["kind"], "adaptive");
        assert_eq!(json["event"], "skip");
        assert_eq!(json["detail"], "boom");
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(PlaybackStatus::Loading.to_string(), "Loading");
        assert_eq!(PlaybackStatus::Ready.to_string(), "Playing");
        assert_eq!(PlaybackStatus::Failed.to_string(), "Issue");
    }
}
