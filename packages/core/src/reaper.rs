//! Staleness reaping.
//!
//! Liveness is a pure function of `(now, last_seen, threshold)`; nothing here
//! reads a clock.

use tracing::info;

use crate::model::{Registry, WindowId};

/// Whether a descriptor last stamped at `last_seen` has outlived `threshold`.
///
/// Descriptors that were never stamped are not stale: the merge step stamps
/// every peer before reaping runs.
pub fn is_stale(now: u64, last_seen: Option<u64>, threshold: u64) -> bool {
    match last_seen {
        Some(last_seen) => now.saturating_sub(last_seen) > threshold,
        None => false,
    }
}

/// Drops peers whose heartbeat is older than the liveness timeout.
#[derive(Debug, Clone, Copy)]
pub struct StalenessReaper {
    threshold_ms: u64,
}

impl StalenessReaper {
    pub fn new(threshold_ms: u64) -> Self {
        Self { threshold_ms }
    }

    pub fn threshold_ms(&self) -> u64 {
        self.threshold_ms
    }

    /// Remove stale peers in place, returning their ids. `own` is never
    /// removed.
    pub fn reap(&self, registry: &mut Registry, now: u64, own: &WindowId) -> Vec<WindowId> {
        let stale: Vec<WindowId> = registry
            .iter()
            .filter(|d| &d.id != own && is_stale(now, d.last_seen, self.threshold_ms))
            .map(|d| d.id.clone())
            .collect();

        for id in &stale {
            registry.remove(id);
            info!("Window {} timed out after {}ms without a heartbeat", id, self.threshold_ms);
        }

        stale
    }
}
