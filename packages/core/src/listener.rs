//! Peer change listener: notification queue plus polling fallback.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::traits::{ChangeSink, Notifier};

/// Why the next tick should look at the medium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wake {
    /// Another context rewrote the registry key.
    pub registry: bool,
    /// Another context touched the reset marker.
    pub reset: bool,
    /// The poll interval elapsed since the last read.
    pub poll: bool,
}

impl Wake {
    pub fn any(&self) -> bool {
        self.registry || self.reset || self.poll
    }
}

/// Collects change notifications between ticks and decides when to re-read.
///
/// Notifications may arrive on any thread; they only land in a queue. The
/// owning context drains it from its own tick, so all merging stays on the
/// context's loop.
pub struct PeerChangeListener {
    pending: Arc<Mutex<VecDeque<String>>>,
    poll_interval_ms: u64,
    last_read: Option<u64>,
}

impl PeerChangeListener {
    pub fn new(poll_interval_ms: u64) -> Self {
        Self {
            pending: Arc::new(Mutex::new(VecDeque::new())),
            poll_interval_ms,
            last_read: None,
        }
    }

    /// A sink that queues changed keys for the next tick.
    pub fn sink(&self) -> ChangeSink {
        let pending = self.pending.clone();
        Arc::new(move |key: &str| {
            pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push_back(key.to_string());
        })
    }

    pub fn attach(&self, notifier: &mut dyn Notifier) {
        notifier.subscribe(self.sink());
    }

    /// Drain queued notifications and check the poll timer.
    pub fn wake(&mut self, now: u64, registry_key: &str, reset_key: &str) -> Wake {
        let keys: Vec<String> = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();

        let mut wake = Wake::default();
        for key in &keys {
            if key == registry_key {
                wake.registry = true;
            } else if key == reset_key {
                wake.reset = true;
            } else {
                trace!("Ignoring change notification for '{}'", key);
            }
        }

        wake.poll = match self.last_read {
            Some(last_read) => now.saturating_sub(last_read) >= self.poll_interval_ms,
            None => true,
        };

        wake
    }

    /// Record that the medium was read at `now`, restarting the poll timer.
    pub fn mark_read(&mut self, now: u64) {
        self.last_read = Some(now);
    }
}
