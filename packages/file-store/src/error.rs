use std::{io, path};

#[derive(thiserror::Error, Debug)]
pub enum FileMediumError {
    #[error("An error occurred trying to use the root path {path}: {error}")]
    RootPathInvalid { path: path::PathBuf, error: io::Error },

    #[error("I/O failure on {path}: {error}")]
    Io { path: path::PathBuf, error: io::Error },

    #[error("{0}")]
    Core(#[from] winsync_core::Error),
}

impl From<FileMediumError> for winsync_core::Error {
    fn from(error: FileMediumError) -> Self {
        match error {
            FileMediumError::Core(core_error) => core_error,
            other => winsync_core::Error::Medium {
                message: other.to_string(),
            },
        }
    }
}
