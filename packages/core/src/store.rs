//! Registry store adapter: one serialized registry blob on a shared medium.

use tracing::{debug, warn};

use crate::model::Registry;
use crate::traits::{validate_key, Medium};
use crate::Error;

/// Reads and writes the whole registry under a single key.
///
/// A second key, `<key>_reset`, carries the reset marker: a timestamp bumped
/// whenever some context wipes the registry.
pub struct RegistryStore<M: Medium> {
    medium: M,
    key: String,
    reset_key: String,
}

impl<M: Medium> RegistryStore<M> {
    pub fn new(medium: M, key: impl Into<String>) -> Result<Self, Error> {
        let key = key.into();
        validate_key(&key)?;
        let reset_key = format!("{}_reset", key);
        Ok(Self {
            medium,
            key,
            reset_key,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn reset_key(&self) -> &str {
        &self.reset_key
    }

    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    /// Read the registry, reporting corruption and medium failures.
    ///
    /// A missing key is an empty registry, not an error.
    pub fn try_load(&mut self) -> Result<Registry, Error> {
        let Some(raw) = self.medium.get(&self.key)? else {
            return Ok(Registry::new());
        };

        serde_json::from_str(&raw).map_err(|err| Error::Corruption {
            key: self.key.clone(),
            message: err.to_string(),
        })
    }

    /// Read the registry, substituting an empty one for anything unreadable.
    pub fn load(&mut self) -> Registry {
        match self.try_load() {
            Ok(registry) => registry,
            Err(err @ Error::Corruption { .. }) => {
                warn!("{}; continuing with an empty registry", err);
                Registry::new()
            }
            Err(err) => {
                warn!("Failed to read registry: {}", err);
                Registry::new()
            }
        }
    }

    /// Serialize and write the full registry in one `set`.
    pub fn save(&mut self, registry: &Registry) -> Result<(), Error> {
        let raw = serde_json::to_string(registry)?;
        debug!("Writing {} window(s) to '{}'", registry.len(), self.key);
        self.medium.set(&self.key, raw)
    }

    /// Current reset marker, if any context ever broadcast one.
    pub fn reset_marker(&mut self) -> Option<u64> {
        match self.medium.get(&self.reset_key) {
            Ok(Some(raw)) => match raw.trim().parse::<u64>() {
                Ok(stamp) => Some(stamp),
                Err(err) => {
                    warn!("Ignoring malformed reset marker '{}': {}", raw, err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("Failed to read reset marker: {}", err);
                None
            }
        }
    }

    /// Clear the registry and publish a new reset marker.
    pub fn broadcast_reset(&mut self, stamp: u64) -> Result<(), Error> {
        self.medium.remove(&self.key)?;
        self.medium.set(&self.reset_key, stamp.to_string())
    }
}
