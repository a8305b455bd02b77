//! In-process shared medium.
//!
//! Every handle returned by [`MemoryMedium::connect`] behaves like a separate
//! context attached to the same storage: writes through one handle notify
//! the subscribers of every *other* handle, never the writer's own.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::{validate_key, ChangeSink, Notifier, Reader, Writer};
use crate::Error;

#[derive(Default)]
struct Shared {
    data: BTreeMap<String, String>,
    next_origin: usize,
    subscribers: Vec<(usize, ChangeSink)>,
}

/// A shared key-value medium living in process memory.
///
/// # Example
///
/// ```rust
/// use winsync_core::{MemoryMedium, Reader, Writer};
///
/// let mut a = MemoryMedium::new();
/// let mut b = a.connect();
///
/// a.set("windows", "[]".to_string()).unwrap();
/// assert_eq!(b.get("windows").unwrap().as_deref(), Some("[]"));
/// ```
///
/// `clone()` yields another handle for the *same* context (same origin), which
/// is how a context hands its medium to both a store and a notifier slot.
#[derive(Clone)]
pub struct MemoryMedium {
    shared: Arc<Mutex<Shared>>,
    origin: usize,
}

impl MemoryMedium {
    /// Create an empty medium and the first handle onto it.
    pub fn new() -> Self {
        let shared = Shared {
            next_origin: 1,
            ..Shared::default()
        };
        Self {
            shared: Arc::new(Mutex::new(shared)),
            origin: 0,
        }
    }

    /// Attach another context to the same storage.
    pub fn connect(&self) -> Self {
        let origin = {
            let mut shared = self.lock();
            let origin = shared.next_origin;
            shared.next_origin += 1;
            origin
        };
        Self {
            shared: self.shared.clone(),
            origin,
        }
    }

    /// Raw snapshot of every key, for assertions.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().data.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify_others(&self, key: &str) {
        let sinks: Vec<ChangeSink> = self
            .lock()
            .subscribers
            .iter()
            .filter(|(origin, _)| *origin != self.origin)
            .map(|(_, sink)| sink.clone())
            .collect();

        // Sinks run outside the lock so they may touch the medium themselves.
        for sink in sinks {
            sink(key);
        }
    }
}

impl Default for MemoryMedium {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for MemoryMedium {
    fn get(&mut self, key: &str) -> Result<Option<String>, Error> {
        validate_key(key)?;
        Ok(self.lock().data.get(key).cloned())
    }
}

impl Writer for MemoryMedium {
    fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        validate_key(key)?;
        self.lock().data.insert(key.to_string(), value);
        self.notify_others(key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        validate_key(key)?;
        let existed = self.lock().data.remove(key).is_some();
        if existed {
            self.notify_others(key);
        }
        Ok(())
    }
}

impl Notifier for MemoryMedium {
    fn subscribe(&mut self, sink: ChangeSink) {
        self.lock().subscribers.push((self.origin, sink));
    }
}
