//! Reachability prober
//!
//! Precomputes the advisory health verdict attached to each descriptor:
//! DNS resolution first, then a short HEAD request. Any HTTP response counts
//! as reachable since plenty of hosts answer HEAD with 403 or 405. Verdicts
//! are cached per `kind:host`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::join_all;
use reqwest::Url;
use tokio::time::Instant;
use tracing::debug;

use crate::models::{Health, StreamDescriptor, StreamList};

#[derive(Debug)]
pub struct HealthProber {
    client: reqwest::Client,
    ttl: Duration,
    timeout: Duration,
    cache: Mutex<HashMap<String, (Instant, Health)>>,
}

impl HealthProber {
    pub fn new(ttl: Duration, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            ttl,
            timeout,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Probe one descriptor, consulting the cache first
    pub async fn check(&self, stream: &StreamDescriptor) -> Health {
        let Some(host) = Url::parse(&stream.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
        else {
            return Health::down("Invalid URL");
        };

        let key = format!("{}:{}", stream.kind.as_str(), host);
        if let Some(health) = self.cached(&key) {
            return health;
        }

        let health = self.probe(&stream.url, &host).await;
        debug!(key = %key, ok = health.ok, detail = ?health.detail, "probed stream");
        self.remember(key, health.clone());
        health
    }

    /// Attach a fresh verdict to every descriptor in the list
    pub async fn annotate(&self, list: StreamList) -> StreamList {
        let StreamList {
            version,
            updated_at,
            streams,
        } = list;

        let checks = streams.iter().map(|s| self.check(s));
        let verdicts = join_all(checks).await;

        let streams = streams
            .into_iter()
            .zip(verdicts)
            .map(|(s, h)| s.with_health(h))
            .collect();

        StreamList {
            version,
            updated_at,
            streams,
        }
    }

    fn cached(&self, key: &str) -> Option<Health> {
        let cache = self.cache.lock().ok()?;
        let (at, health) = cache.get(key)?;
        (at.elapsed() < self.ttl).then(|| health.clone())
    }

    /// Insert a verdict and drop every entry past its TTL
    fn remember(&self, key: String, health: Health) {
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        let ttl = self.ttl;
        cache.retain(|_, (at, _)| at.elapsed() < ttl);
        cache.insert(key, (Instant::now(), health));
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    async fn probe(&self, url: &str, host: &str) -> Health {
        let target = host.trim_start_matches('[').trim_end_matches(']');
        if let Err(e) = tokio::net::lookup_host((target, 80)).await {
            return Health::down(format!("DNS lookup failed for {}: {}", host, e));
        }

        match self.client.head(url).timeout(self.timeout).send().await {
            Ok(resp) => Health::up(format!("HTTP {} (reachable)", resp.status().as_u16())),
            Err(e) if e.is_timeout() => Health::down("Reachability failed: HTTP check timed out"),
            Err(e) => Health::down(format!("Reachability failed: {}", e)),
        }
    }
}

impl Default for HealthProber {
    fn default() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_millis(2500))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StreamKind;

    #[tokio::test]
    async fn test_invalid_url() {
        let prober = HealthProber::default();
        let stream = StreamDescriptor::new("a", "A", StreamKind::Page, "not a url");
        let health = prober.check(&stream).await;
        assert!(!health.ok);
        assert_eq!(health.detail.as_deref(), Some("Invalid URL"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_pruned() {
        let prober = HealthProber::new(Duration::from_secs(30), Duration::from_secs(2));
        prober.remember("page:old.example".into(), Health::up("HTTP 200 (reachable)"));
        prober.remember("hls:kept.example".into(), Health::up("HTTP 200 (reachable)"));
        assert_eq!(prober.cache_len(), 2);

        tokio::time::advance(Duration::from_secs(31)).await;
        prober.remember("page:new.example".into(), Health::down("Invalid URL"));

        assert_eq!(prober.cache_len(), 1);
        assert!(prober.cached("page:old.example").is_none());
        assert!(prober.cached("page:new.example").is_some());
    }

    #[tokio::test]
    async fn test_any_status_is_reachable() {
        let mut server = mockito::Server::new_async().await;
        let _m = server.mock("HEAD", "/live.m3u8").with_status(405).create_async().await;

        let prober = HealthProber::default();
        let url = format!("{}/live.m3u8", server.url());
        let stream = StreamDescriptor::new("a", "A", StreamKind::Adaptive, url);
        let health = prober.check(&stream).await;

        assert!(health.ok);
        assert_eq!(health.detail.as_deref(), Some("HTTP 405 (reachable)"));
    }
}
