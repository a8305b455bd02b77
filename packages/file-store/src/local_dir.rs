use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path;
use std::sync::{Arc, Mutex};

use notify::RecommendedWatcher;
use tracing::debug;
use winsync_core::{validate_key, ChangeSink, Notifier, Reader, Writer};

use crate::watcher::{self, Sinks};
use crate::FileMediumError;

/// Last value this context wrote per key; `None` records a removal.
pub(crate) type OwnWrites = Arc<Mutex<HashMap<String, Option<String>>>>;

/// Directory-backed medium. Each key is a `<key>.json` file.
///
/// Writes go to a temporary file in the same directory and are renamed over
/// the target, so readers in other processes never see a half-written blob.
/// Clones are handles for the same context and share its notifier.
#[derive(Clone)]
pub struct FileMedium {
    root: path::PathBuf,
    own_writes: OwnWrites,
    sinks: Sinks,
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
}

impl FileMedium {
    /// Open the shared directory at `root`, creating it when missing.
    pub fn open(root: path::PathBuf) -> Result<FileMedium, FileMediumError> {
        let invalid = |error: io::Error| FileMediumError::RootPathInvalid {
            path: root.clone(),
            error,
        };

        fs::create_dir_all(&root).map_err(invalid)?;
        let canonical = root.canonicalize().map_err(invalid)?;

        Ok(FileMedium {
            root: canonical,
            own_writes: Arc::default(),
            sinks: Arc::default(),
            watcher: Arc::default(),
        })
    }

    pub fn root(&self) -> &path::Path {
        &self.root
    }

    pub(crate) fn key_to_file_path(root: &path::Path, key: &str) -> path::PathBuf {
        root.join(format!("{}.json", key))
    }

    fn read_key(&self, key: &str) -> Result<Option<String>, FileMediumError> {
        validate_key(key)?;
        let file_path = Self::key_to_file_path(&self.root, key);
        debug!("Reading {}...", file_path.display());

        match fs::read_to_string(&file_path) {
            Ok(raw) => Ok(Some(raw)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(FileMediumError::Io {
                path: file_path,
                error,
            }),
        }
    }

    fn write_key(&self, key: &str, value: &str) -> Result<(), FileMediumError> {
        validate_key(key)?;
        let file_path = Self::key_to_file_path(&self.root, key);
        debug!("Writing {}...", file_path.display());

        let io_error = |error: io::Error| FileMediumError::Io {
            path: file_path.clone(),
            error,
        };

        let mut staged = tempfile::NamedTempFile::new_in(&self.root).map_err(io_error)?;
        staged.write_all(value.as_bytes()).map_err(io_error)?;
        staged.as_file().sync_all().map_err(io_error)?;

        // Recorded before the rename so the watcher never sees the new file
        // without it.
        self.record_own_write(key, Some(value.to_string()));
        staged
            .persist(&file_path)
            .map_err(|persist_error| io_error(persist_error.error))?;
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<(), FileMediumError> {
        validate_key(key)?;
        let file_path = Self::key_to_file_path(&self.root, key);

        self.record_own_write(key, None);
        match fs::remove_file(&file_path) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(FileMediumError::Io {
                    path: file_path,
                    error,
                })
            }
        }
        Ok(())
    }

    fn record_own_write(&self, key: &str, value: Option<String>) {
        self.own_writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value);
    }
}

impl Reader for FileMedium {
    fn get(&mut self, key: &str) -> Result<Option<String>, winsync_core::Error> {
        Ok(self.read_key(key)?)
    }
}

impl Writer for FileMedium {
    fn set(&mut self, key: &str, value: String) -> Result<(), winsync_core::Error> {
        Ok(self.write_key(key, &value)?)
    }

    fn remove(&mut self, key: &str) -> Result<(), winsync_core::Error> {
        Ok(self.remove_key(key)?)
    }
}

impl Notifier for FileMedium {
    /// Register `sink`. The first subscription starts watching the
    /// directory for keys other processes change.
    fn subscribe(&mut self, sink: ChangeSink) {
        self.sinks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(sink);

        let mut watcher = self
            .watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if watcher.is_none() {
            *watcher = watcher::spawn(
                self.root.clone(),
                self.sinks.clone(),
                self.own_writes.clone(),
            );
        }
    }
}
