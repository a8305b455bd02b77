//! Error types for the registry core.
//!
//! None of these escape the [`Coordinator`](crate::Coordinator) facade: every
//! failure during a tick is logged and retried on the next tick. They are
//! returned by the lower layers (media, store adapter, configuration) so that
//! callers composing those layers directly can still inspect them.

/// Errors raised below the coordinator facade.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The shared blob under `key` could not be parsed.
    #[error("Shared value at '{key}' is corrupted: {message}")]
    Corruption { key: String, message: String },

    /// A freshly assigned id is already present in the shared registry.
    #[error("Window id '{id}' is already registered")]
    DuplicateIdentity { id: String },

    /// A caller-supplied callback panicked.
    #[error("Callback '{callback}' failed: {message}")]
    CallbackFailure {
        callback: &'static str,
        message: String,
    },

    /// A medium key contained characters outside `[A-Za-z0-9_.-]`.
    #[error("Invalid medium key: '{key}'")]
    InvalidKey { key: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("An error occurred while serializing the registry: {message}")]
    Serialization { message: String },

    /// The backing medium failed to read or write.
    #[error("Shared medium failure: {message}")]
    Medium { message: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization {
            message: err.to_string(),
        }
    }
}
