//! # winsync-cli
//!
//! Command-line front end for a file-backed window registry.
//!
//! ## Usage
//!
//! ```bash
//! # Terminal 1
//! winsync join --x 0 --meta '{"foo": "bar"}'
//!
//! # Terminal 2: appears in terminal 1's listing within one poll interval
//! winsync join --x 900 --drift 2
//!
//! # Inspect or wipe the shared state
//! winsync list
//! winsync reset
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

pub mod args;
pub mod commands;

use std::path::PathBuf;

pub use args::{Args, Command};

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Failed to read {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid config file {path}: {error}")]
    Config {
        path: PathBuf,
        error: serde_json::Error,
    },

    #[error("--meta must be valid JSON: {0}")]
    Meta(serde_json::Error),

    #[error("{0}")]
    Registry(#[from] winsync_core::Error),

    #[error("{0}")]
    Medium(#[from] winsync_file_store::FileMediumError),
}

/// Execute the parsed command line.
pub async fn run(args: Args) -> Result<(), CliError> {
    let dir = args.shared_dir();
    let config = args.registry_config()?;

    match &args.command {
        Command::Join {
            x,
            y,
            width,
            height,
            meta,
            tick_ms,
            drift,
            ticks,
        } => {
            let options = commands::JoinOptions {
                shape: winsync_core::Shape::new(*x, *y, *width, *height),
                meta: args::parse_meta(meta)?,
                tick: std::time::Duration::from_millis((*tick_ms).max(1)),
                drift: *drift,
                ticks: *ticks,
            };
            commands::join(&dir, config, options).await
        }
        Command::List => {
            println!("{}", commands::list(&dir, &config)?);
            Ok(())
        }
        Command::Reset => commands::reset(&dir, &config),
    }
}
