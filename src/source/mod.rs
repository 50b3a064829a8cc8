//! Stream list source
//!
//! Supplies [`StreamList`] snapshots from the local cams.json (optionally
//! annotated by the [`HealthProber`]) or from a remote endpoint serving the
//! same document. The poller feeds changed snapshots to the controller and
//! never waits on it.

pub mod probe;
pub mod store;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::kiosk::ControlEvent;
use crate::models::StreamList;

pub use probe::HealthProber;
pub use store::{CamStore, StoreError};

/// Where snapshots come from
#[derive(Debug)]
pub enum ListSource {
    File {
        store: CamStore,
        prober: Option<HealthProber>,
    },
    Http {
        client: reqwest::Client,
        url: String,
    },
}

impl ListSource {
    pub fn file(store: CamStore, prober: Option<HealthProber>) -> Self {
        ListSource::File { store, prober }
    }

    pub fn http(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        ListSource::Http {
            client,
            url: url.into(),
        }
    }

    /// Remote endpoint when configured, the local file otherwise
    pub fn from_config(config: &Config) -> Self {
        if let Some(url) = &config.source.url {
            return Self::http(url.clone());
        }
        let prober = config
            .source
            .probe_health
            .then(|| HealthProber::new(config.source.health_ttl(), config.source.probe_timeout()));
        Self::file(CamStore::new(config.cams_path()), prober)
    }

    /// Fetch one snapshot
    pub async fn fetch(&self) -> Result<StreamList> {
        match self {
            ListSource::File { store, prober } => {
                let list = store.read_cached();
                match prober {
                    Some(prober) => Ok(prober.annotate(list).await),
                    None => Ok(list),
                }
            }
            ListSource::Http { client, url } => {
                let list = client
                    .get(url)
                    .header("cache-control", "no-store")
                    .send()
                    .await
                    .with_context(|| format!("Failed to reach {}", url))?
                    .error_for_status()
                    .with_context(|| format!("List endpoint {} returned an error", url))?
                    .json::<StreamList>()
                    .await
                    .with_context(|| format!("Malformed stream list from {}", url))?;
                Ok(list)
            }
        }
    }

    /// Fetch, substituting an empty list on failure
    pub async fn load(&self) -> StreamList {
        match self.fetch().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "stream list unavailable, using empty list");
                StreamList::empty()
            }
        }
    }
}

/// Poll the source and feed changed snapshots to the controller.
///
/// The first snapshot is always delivered (an unreachable source delivers an
/// empty list). Later fetch failures keep the last good snapshot.
pub fn spawn_poller(
    source: ListSource,
    interval: Duration,
    tx: mpsc::UnboundedSender<ControlEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = source.load().await;
        info!(count = last.len(), "initial stream list loaded");
        if tx.send(ControlEvent::ListRefreshed(last.clone())).is_err() {
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let list = match source.fetch().await {
                Ok(list) => list,
                Err(e) => {
                    warn!(error = %format!("{:#}", e), "stream list refresh failed");
                    continue;
                }
            };

            if list.same_streams(&last) {
                continue;
            }

            debug!(count = list.len(), "stream list changed");
            last = list.clone();
            if tx.send(ControlEvent::ListRefreshed(list)).is_err() {
                break;
            }
        }
    })
}
