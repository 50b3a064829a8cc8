//! Adaptive-stream client
//!
//! Loads an HLS manifest and decides what the video surface should open:
//! for a master playlist the highest-bandwidth variant, for a media playlist
//! the URL itself. Failed loads are retried; errors on intermediate attempts
//! are recoverable and swallowed, only the last one is fatal.

use std::fmt;
use std::time::Duration;

use hls_m3u8::tags::VariantStream;
use hls_m3u8::{MasterPlaylist, MediaPlaylist};
use reqwest::Url;
use thiserror::Error;
use tracing::debug;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlsErrorType {
    Network,
    Media,
}

impl fmt::Display for HlsErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HlsErrorType::Network => write!(f, "networkError"),
            HlsErrorType::Media => write!(f, "mediaError"),
        }
    }
}

/// Specific failure within a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HlsErrorDetails {
    ManifestLoadError,
    ManifestLoadTimeOut,
    ManifestParsingError,
    ManifestIncompatibleCodecsError,
}

impl fmt::Display for HlsErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HlsErrorDetails::ManifestLoadError => "manifestLoadError",
            HlsErrorDetails::ManifestLoadTimeOut => "manifestLoadTimeOut",
            HlsErrorDetails::ManifestParsingError => "manifestParsingError",
            HlsErrorDetails::ManifestIncompatibleCodecsError => "manifestIncompatibleCodecsError",
        };
        write!(f, "{}", s)
    }
}

/// Client error; `fatal` separates give-up errors from retryable ones
#[derive(Debug, Clone, Error)]
#[error("{kind}/{details}")]
pub struct HlsError {
    pub kind: HlsErrorType,
    pub details: HlsErrorDetails,
    pub fatal: bool,
    pub reason: String,
}

impl HlsError {
    fn fatal(kind: HlsErrorType, details: HlsErrorDetails, reason: impl Into<String>) -> Self {
        Self {
            kind,
            details,
            fatal: true,
            reason: reason.into(),
        }
    }

    fn recoverable(kind: HlsErrorType, details: HlsErrorDetails, reason: impl Into<String>) -> Self {
        Self {
            kind,
            details,
            fatal: false,
            reason: reason.into(),
        }
    }
}

/// HLS manifest client
#[derive(Debug, Clone)]
pub struct HlsClient {
    client: reqwest::Client,
    max_attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
}

impl HlsClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(5),
        }
    }

    /// Override the retry policy (attempts is clamped to at least one)
    pub fn with_retries(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Resolve the URL the video surface should open
    pub async fn resolve(&self, url: &str) -> Result<String, HlsError> {
        let base = Url::parse(url).map_err(|e| {
            HlsError::fatal(HlsErrorType::Network, HlsErrorDetails::ManifestLoadError, e.to_string())
        })?;
        let body = self.load_manifest(&base).await?;
        resolve_playlist(&base, &body)
    }

    async fn load_manifest(&self, url: &Url) -> Result<String, HlsError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(mut e) if attempt >= self.max_attempts => {
                    e.fatal = true;
                    return Err(e);
                }
                Err(e) => {
                    debug!(attempt, error = %e, reason = %e.reason, "recoverable manifest error");
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String, HlsError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                let details = if e.is_timeout() {
                    HlsErrorDetails::ManifestLoadTimeOut
                } else {
                    HlsErrorDetails::ManifestLoadError
                };
                HlsError::recoverable(HlsErrorType::Network, details, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HlsError::recoverable(
                HlsErrorType::Network,
                HlsErrorDetails::ManifestLoadError,
                format!("HTTP {}", status),
            ));
        }

        response.text().await.map_err(|e| {
            HlsError::recoverable(HlsErrorType::Network, HlsErrorDetails::ManifestLoadError, e.to_string())
        })
    }
}

impl Default for HlsClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the playable URL out of a manifest body
pub fn resolve_playlist(base: &Url, body: &str) -> Result<String, HlsError> {
    let body = body.trim_start_matches('\u{feff}').trim_start();
    if !body.starts_with("#EXTM3U") {
        return Err(HlsError::fatal(
            HlsErrorType::Network,
            HlsErrorDetails::ManifestParsingError,
            "no EXTM3U delimiter",
        ));
    }

    if body.contains("#EXT-X-STREAM-INF") {
        let master = MasterPlaylist::try_from(body).map_err(|e| {
            HlsError::fatal(HlsErrorType::Network, HlsErrorDetails::ManifestParsingError, e.to_string())
        })?;

        let best = master
            .variant_streams
            .iter()
            .filter_map(|vs| match vs {
                VariantStream::ExtXStreamInf {
                    uri, stream_data, ..
                } => Some((stream_data.bandwidth(), uri.to_string())),
                VariantStream::ExtXIFrame { .. } => None,
            })
            .max_by_key(|(bandwidth, _)| *bandwidth);

        let (_, uri) = best.ok_or_else(|| {
            HlsError::fatal(
                HlsErrorType::Media,
                HlsErrorDetails::ManifestIncompatibleCodecsError,
                "no playable variants",
            )
        })?;

        return base.join(&uri).map(|u| u.to_string()).map_err(|e| {
            HlsError::fatal(HlsErrorType::Network, HlsErrorDetails::ManifestParsingError, e.to_string())
        });
    }

    MediaPlaylist::try_from(body).map_err(|e| {
        HlsError::fatal(HlsErrorType::Network, HlsErrorDetails::ManifestParsingError, e.to_string())
    })?;
    Ok(base.to_string())
}
