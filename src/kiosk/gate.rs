//! Health gate
//!
//! Decides from a descriptor's precomputed health whether it is worth
//! attaching a player at all. Pure: no I/O, no clock.

use crate::models::StreamDescriptor;

/// Reason used when a failing health verdict carries no detail
pub const OFFLINE_FALLBACK: &str = "Stream is offline";

/// Outcome of [`should_attempt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateVerdict {
    pub attempt: bool,
    pub reason: Option<String>,
}

impl GateVerdict {
    fn pass() -> Self {
        Self {
            attempt: true,
            reason: None,
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            attempt: false,
            reason: Some(reason.into()),
        }
    }
}

/// Missing health means unknown, and unknown streams are attempted
pub fn should_attempt(stream: &StreamDescriptor) -> GateVerdict {
    match &stream.health {
        Some(health) if !health.ok => {
            let reason = health
                .detail
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(OFFLINE_FALLBACK);
            GateVerdict::reject(reason)
        }
        _ => GateVerdict::pass(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Health, StreamKind};

    fn stream() -> StreamDescriptor {
        StreamDescriptor::new("a", "A", StreamKind::Adaptive, "https://a.example/live.m3u8")
    }

    #[test]
    fn test_unknown_health_is_attempted() {
        assert_eq!(should_attempt(&stream()), GateVerdict::pass());
    }

    #[test]
    fn test_healthy_is_attempted() {
        let s = stream().with_health(Health::up("HTTP 200 (reachable)"));
        assert!(should_attempt(&s).attempt);
    }

    #[test]
    fn test_failing_health_is_rejected_with_detail() {
        let s = stream().with_health(Health::down("DNS lookup failed"));
        let verdict = should_attempt(&s);
        assert!(!verdict.attempt);
        assert_eq!(verdict.reason.as_deref(), Some("DNS lookup failed"));
    }

    #[test]
    fn test_failing_health_without_detail_uses_fallback() {
        let mut health = Health::down("");
        let s = stream().with_health(health.clone());
        assert_eq!(should_attempt(&s).reason.as_deref(), Some(OFFLINE_FALLBACK));

        health.detail = None;
        let s = stream().with_health(health);
        assert_eq!(should_attempt(&s).reason.as_deref(), Some(OFFLINE_FALLBACK));
    }
}
