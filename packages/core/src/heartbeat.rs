//! Heartbeat publisher: decides when this context writes its descriptor.

use std::fmt;

use crate::model::Shape;

/// Why a tick publishes. Ordered by precedence for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishReason {
    /// First write after `init`.
    Registering,
    /// Own shape differs from what was last published.
    ShapeChanged,
    /// The shared copy of own descriptor is missing or out of date.
    SelfHeal,
    /// Stale peers were pruned that the medium still lists.
    Pruned,
    /// Nothing changed but the heartbeat interval elapsed.
    Keepalive,
}

impl fmt::Display for PublishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishReason::Registering => "registering",
            PublishReason::ShapeChanged => "shape changed",
            PublishReason::SelfHeal => "self-heal",
            PublishReason::Pruned => "pruned stale peers",
            PublishReason::Keepalive => "keepalive",
        };
        f.write_str(name)
    }
}

/// What the tick observed, as input to [`HeartbeatPublisher::decide`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Observation {
    pub registering: bool,
    /// The shared registry's copy of own descriptor matches the local one.
    pub remote_in_sync: bool,
    /// The reaper removed peers that the shared registry still listed.
    pub pruned_remote: bool,
}

/// Tracks the last successful publish of this context's descriptor.
#[derive(Debug, Clone)]
pub struct HeartbeatPublisher {
    interval_ms: u64,
    last_shape: Option<Shape>,
    last_publish: Option<u64>,
}

impl HeartbeatPublisher {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_shape: None,
            last_publish: None,
        }
    }

    /// Whether `shape` has not been published yet.
    pub fn is_unpublished(&self, shape: &Shape) -> bool {
        self.last_shape.as_ref() != Some(shape)
    }

    pub fn keepalive_due(&self, now: u64) -> bool {
        match self.last_publish {
            Some(last) => now.saturating_sub(last) >= self.interval_ms,
            None => true,
        }
    }

    /// Pick the reason to publish `shape` this tick, if there is one.
    pub fn decide(&self, shape: &Shape, now: u64, seen: Observation) -> Option<PublishReason> {
        if seen.registering {
            Some(PublishReason::Registering)
        } else if self.is_unpublished(shape) {
            Some(PublishReason::ShapeChanged)
        } else if !seen.remote_in_sync {
            Some(PublishReason::SelfHeal)
        } else if seen.pruned_remote {
            Some(PublishReason::Pruned)
        } else if self.keepalive_due(now) {
            Some(PublishReason::Keepalive)
        } else {
            None
        }
    }

    /// Record a successful write of `shape` at `now`.
    pub fn record(&mut self, shape: Shape, now: u64) {
        self.last_shape = Some(shape);
        self.last_publish = Some(now);
    }
}
