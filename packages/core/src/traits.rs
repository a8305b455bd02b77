//! Core traits: Reader, Writer, Medium, Notifier.
//!
//! A medium is the shared key-value space every context can reach. It has
//! no transactions and no locking: a `set` replaces the whole value.

use std::sync::Arc;

use crate::Error;

/// Read string values from keys.
///
/// # Returns
///
/// * `Ok(None)` - The key has never been written or was removed.
/// * `Ok(Some(value))` - The raw value at the key.
/// * `Err(Error)` - The medium itself failed.
pub trait Reader: Send {
    fn get(&mut self, key: &str) -> Result<Option<String>, Error>;
}

/// Write string values to keys.
pub trait Writer: Send {
    /// Replace the value at `key` in a single write.
    fn set(&mut self, key: &str, value: String) -> Result<(), Error>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), Error>;
}

/// Combined read/write access to a shared medium.
pub trait Medium: Reader + Writer {}
impl<T: Reader + Writer> Medium for T {}

/// Callback invoked with the key another context changed.
pub type ChangeSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Source of "another context changed the medium" notifications.
///
/// Sinks are never called for the subscribing context's own writes. Calls
/// may arrive from any thread, so a sink should only record the key and
/// leave the re-read to the owner's next tick.
pub trait Notifier: Send {
    fn subscribe(&mut self, sink: ChangeSink);
}

/// Check that `key` is a plain name usable by every medium.
pub fn validate_key(key: &str) -> Result<(), Error> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && key != "."
        && key != "..";

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey {
            key: key.to_string(),
        })
    }
}

// Blanket implementations for references and boxes

impl<T: Reader + ?Sized> Reader for &mut T {
    fn get(&mut self, key: &str) -> Result<Option<String>, Error> {
        (**self).get(key)
    }
}

impl<T: Writer + ?Sized> Writer for &mut T {
    fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        (**self).remove(key)
    }
}

impl<T: Reader + ?Sized> Reader for Box<T> {
    fn get(&mut self, key: &str) -> Result<Option<String>, Error> {
        self.as_mut().get(key)
    }
}

impl<T: Writer + ?Sized> Writer for Box<T> {
    fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        self.as_mut().set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.as_mut().remove(key)
    }
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn subscribe(&mut self, sink: ChangeSink) {
        self.as_mut().subscribe(sink)
    }
}
