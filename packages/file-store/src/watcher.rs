//! File-system events under the medium's root, turned into change
//! notifications.
//!
//! An event whose file content equals this context's own last write is
//! dropped, which keeps a context from being notified about itself. Delivery
//! is best effort: the coordinator's poll fallback covers missed events and
//! platforms where no watcher can be started.

use std::sync::{Arc, Mutex};
use std::{fs, path};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};
use winsync_core::{validate_key, ChangeSink};

use crate::local_dir::{FileMedium, OwnWrites};

pub(crate) type Sinks = Arc<Mutex<Vec<ChangeSink>>>;

/// Start watching `root`. Delivery stops when the returned watcher drops.
pub(crate) fn spawn(
    root: path::PathBuf,
    sinks: Sinks,
    own_writes: OwnWrites,
) -> Option<RecommendedWatcher> {
    let event_root = root.clone();
    let handler = move |result: notify::Result<Event>| match result {
        Ok(event) => dispatch(&event_root, &event, &sinks, &own_writes),
        Err(error) => warn!("File watcher error: {}", error),
    };

    let mut watcher = match notify::recommended_watcher(handler) {
        Ok(watcher) => watcher,
        Err(error) => {
            warn!("Failed to start file watcher, relying on polling: {}", error);
            return None;
        }
    };

    if let Err(error) = watcher.watch(&root, RecursiveMode::NonRecursive) {
        warn!(
            "Failed to watch {}, relying on polling: {}",
            root.display(),
            error
        );
        return None;
    }

    debug!("Watching {} for changes", root.display());
    Some(watcher)
}

fn dispatch(root: &path::Path, event: &Event, sinks: &Sinks, own_writes: &OwnWrites) {
    for key in changed_keys(event) {
        if is_own_write(root, &key, own_writes) {
            trace!("Skipping own write to '{}'", key);
            continue;
        }

        let sinks: Vec<ChangeSink> = sinks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for sink in sinks {
            sink(&key);
        }
    }
}

/// Keys whose `<key>.json` file `event` touched, sorted and without repeats.
fn changed_keys(event: &Event) -> Vec<String> {
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }

    let mut keys: Vec<String> = event.paths.iter().filter_map(|p| key_of(p)).collect();
    keys.sort();
    keys.dedup();
    keys
}

fn key_of(file_path: &path::Path) -> Option<String> {
    let key = file_path.file_name()?.to_str()?.strip_suffix(".json")?;
    validate_key(key).ok()?;
    Some(key.to_string())
}

fn is_own_write(root: &path::Path, key: &str, own_writes: &OwnWrites) -> bool {
    let own = own_writes
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(key)
        .cloned();

    let Some(own) = own else {
        return false;
    };

    let on_disk = fs::read_to_string(FileMedium::key_to_file_path(root, key)).ok();
    on_disk == own
}
