//! Telemetry - fire-and-forget lifecycle events
//!
//! The controller pushes events into an unbounded channel and never waits on
//! it. A background worker folds them into [`Metrics`] and optionally forwards
//! them to an HTTP endpoint; delivery failures are dropped.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::{EventKind, TelemetryEvent};

/// How many recent error events are retained
pub const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// Sink
// =============================================================================

/// Cheap, cloneable handle for emitting events
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    tx: mpsc::UnboundedSender<TelemetryEvent>,
}

impl TelemetrySink {
    /// Bare channel, for callers that consume events themselves
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TelemetryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit an event. Never blocks and never fails.
    pub fn emit(&self, event: TelemetryEvent) {
        let _ = self.tx.send(event);
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// Append-only counters plus a ring of recent errors.
///
/// Created once at process start and shared by `Arc`; tests build their own.
#[derive(Debug, Default)]
pub struct Metrics {
    telemetry_total: AtomicU64,
    load_total: AtomicU64,
    ready_total: AtomicU64,
    skip_total: AtomicU64,
    error_total: AtomicU64,
    last_errors: Mutex<VecDeque<TelemetryEvent>>,
}

/// Point-in-time copy of [`Metrics`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub telemetry_total: u64,
    pub load_total: u64,
    pub ready_total: u64,
    pub skip_total: u64,
    pub error_total: u64,
    pub last_errors: Vec<TelemetryEvent>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: &TelemetryEvent) {
        self.telemetry_total.fetch_add(1, Ordering::Relaxed);

        let counter = match event.event {
            EventKind::Load => &self.load_total,
            EventKind::Ready => &self.ready_total,
            EventKind::Skip => &self.skip_total,
            EventKind::Error => &self.error_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if event.event == EventKind::Error {
            if let Ok(mut errors) = self.last_errors.lock() {
                errors.push_front(event.clone());
                errors.truncate(MAX_RECENT_ERRORS);
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            telemetry_total: self.telemetry_total.load(Ordering::Relaxed),
            load_total: self.load_total.load(Ordering::Relaxed),
            ready_total: self.ready_total.load(Ordering::Relaxed),
            skip_total: self.skip_total.load(Ordering::Relaxed),
            error_total: self.error_total.load(Ordering::Relaxed),
            last_errors: self
                .last_errors
                .lock()
                .map(|e| e.iter().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Spawn the telemetry worker and return the sink feeding it
pub fn spawn(metrics: Arc<Metrics>, endpoint: Option<String>) -> (TelemetrySink, JoinHandle<()>) {
    let (sink, mut rx) = TelemetrySink::channel();
    let client = reqwest::Client::new();

    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            metrics.record(&event);

            if let Some(url) = endpoint.as_deref() {
                if let Err(e) = client.post(url).json(&event).send().await {
                    debug!(error = %e, "telemetry delivery failed");
                }
            }
        }
    });

    (sink, handle)
}
