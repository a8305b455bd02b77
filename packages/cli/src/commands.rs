use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tracing::info;

use winsync_core::{
    is_stale, Clock, Coordinator, FixedShape, RegistryConfig, RegistryStore, Shape, SystemClock,
    WindowDescriptor,
};
use winsync_file_store::FileMedium;

use crate::CliError;

/// How a joined window's loop ended.
#[derive(Debug, PartialEq, Eq)]
enum Exit {
    Done,
    Rejoin,
}

pub struct JoinOptions {
    pub shape: Shape,
    pub meta: JsonValue,
    pub tick: Duration,
    pub drift: f64,
    pub ticks: Option<u64>,
}

/// Join the registry and keep heartbeating. A reset from any window makes
/// this one re-register under a fresh id.
pub async fn join(dir: &Path, config: RegistryConfig, options: JoinOptions) -> Result<(), CliError> {
    let mut shape = options.shape;
    loop {
        match join_once(dir, &config, &options, &mut shape).await? {
            Exit::Done => return Ok(()),
            Exit::Rejoin => info!("Registry was reset; joining again"),
        }
    }
}

async fn join_once(
    dir: &Path,
    config: &RegistryConfig,
    options: &JoinOptions,
    shape: &mut Shape,
) -> Result<Exit, CliError> {
    let medium = FileMedium::open(dir.to_path_buf())?;
    let source = FixedShape::new(*shape);

    let mut window = Coordinator::new(medium.clone(), source.clone(), config.clone())?
        .with_notifier(medium);

    let was_reset = Arc::new(AtomicBool::new(false));
    let flag = was_reset.clone();
    window.set_reset_callback(move || flag.store(true, Ordering::SeqCst));
    window.set_shape_change_callback(|shape| info!("Moved to {}", shape));
    window.set_windows_change_callback(|windows| println!("{}", render(windows)));

    window.init(options.meta.clone());
    if let Some(id) = window.id() {
        info!("Joined {} as {}", dir.display(), id);
    }

    let mut interval = tokio::time::interval(options.tick);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if options.drift != 0.0 {
                    shape.x += options.drift;
                    source.set(*shape);
                }

                window.update();
                if was_reset.load(Ordering::SeqCst) {
                    return Ok(Exit::Rejoin);
                }

                ticks += 1;
                if options.ticks.is_some_and(|limit| ticks >= limit) {
                    window.depart();
                    return Ok(Exit::Done);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                window.depart();
                return Ok(Exit::Done);
            }
        }
    }
}

/// Print what is stored right now, marking entries past the liveness timeout.
pub fn list(dir: &Path, config: &RegistryConfig) -> Result<String, CliError> {
    let medium = FileMedium::open(dir.to_path_buf())?;
    let mut store = RegistryStore::new(medium, config.registry_key.clone())?;
    let registry = store.try_load()?;
    let now = SystemClock.now_millis();

    let mut out = render(registry.as_slice());
    let stale: Vec<String> = registry
        .iter()
        .filter(|d| is_stale(now, d.last_seen, config.liveness_timeout_ms))
        .map(|d| d.id.to_string())
        .collect();
    if !stale.is_empty() {
        out.push_str(&format!("\nstale: {}", stale.join(", ")));
    }
    Ok(out)
}

pub fn reset(dir: &Path, config: &RegistryConfig) -> Result<(), CliError> {
    let medium = FileMedium::open(dir.to_path_buf())?;
    let mut store = RegistryStore::new(medium, config.registry_key.clone())?;
    store.broadcast_reset(SystemClock.now_millis())?;
    info!("Reset registry '{}' in {}", config.registry_key, dir.display());
    Ok(())
}

/// One line per window, in registry order.
pub fn render(windows: &[WindowDescriptor]) -> String {
    if windows.is_empty() {
        return "(no windows)".to_string();
    }

    windows
        .iter()
        .enumerate()
        .map(|(index, window)| {
            format!(
                "{:>2}  {}  {}  {}",
                index, window.id, window.shape, window.meta_data
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
