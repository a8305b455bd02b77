use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;

use winsync_core::RegistryConfig;

use crate::CliError;

/// winsync - share a registry of windows between processes on one host
#[derive(Parser, Debug)]
#[command(name = "winsync")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the shared registry files
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// JSON file with registry settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Key of the registry blob
    #[arg(long, global = true)]
    pub key: Option<String>,

    /// Keepalive interval in milliseconds
    #[arg(long, global = true)]
    pub heartbeat_ms: Option<u64>,

    /// Drop peers silent for longer than this many milliseconds
    #[arg(long, global = true)]
    pub liveness_ms: Option<u64>,

    /// Re-read the registry at least this often, in milliseconds
    #[arg(long, global = true)]
    pub poll_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Register as a window and keep heartbeating until Ctrl-C
    Join {
        #[arg(long, default_value_t = 0.0)]
        x: f64,
        #[arg(long, default_value_t = 0.0)]
        y: f64,
        #[arg(long, default_value_t = 800.0)]
        width: f64,
        #[arg(long, default_value_t = 600.0)]
        height: f64,
        /// Metadata attached to this window, as JSON
        #[arg(long, default_value = "null")]
        meta: String,
        /// Milliseconds between ticks
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
        /// Move right by this many pixels every tick
        #[arg(long, default_value_t = 0.0)]
        drift: f64,
        /// Depart after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Print the registry as currently stored
    List,
    /// Wipe the registry and make every joined window start over
    Reset,
}

impl Args {
    pub fn shared_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("winsync")
        })
    }

    /// Settings from `--config`, then individual flags on top.
    pub fn registry_config(&self) -> Result<RegistryConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|error| CliError::Io {
                    path: path.clone(),
                    error,
                })?;
                serde_json::from_str(&raw).map_err(|error| CliError::Config {
                    path: path.clone(),
                    error,
                })?
            }
            None => RegistryConfig::default(),
        };

        if let Some(key) = &self.key {
            config.registry_key = key.clone();
        }
        if let Some(ms) = self.heartbeat_ms {
            config.heartbeat_interval_ms = ms;
        }
        if let Some(ms) = self.liveness_ms {
            config.liveness_timeout_ms = ms;
        }
        if let Some(ms) = self.poll_ms {
            config.poll_interval_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn parse_meta(raw: &str) -> Result<JsonValue, CliError> {
    serde_json::from_str(raw).map_err(CliError::Meta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_defaults() {
        let args = Args::try_parse_from(["winsync", "join"]).unwrap();
        match args.command {
            Command::Join {
                width,
                height,
                tick_ms,
                ticks,
                ..
            } => {
                assert_eq!((width, height), (800.0, 600.0));
                assert_eq!(tick_ms, 100);
                assert_eq!(ticks, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["winsync", "list", "--dir", "/tmp/reg", "--key", "panes"]).unwrap();
        assert_eq!(args.command, Command::List);
        assert_eq!(args.shared_dir(), PathBuf::from("/tmp/reg"));
        assert_eq!(args.registry_config().unwrap().registry_key, "panes");
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winsync.json");
        std::fs::write(&path, r#"{"heartbeat_interval_ms": 200, "liveness_timeout_ms": 1000}"#)
            .unwrap();

        let args = Args::try_parse_from([
            "winsync",
            "--config",
            path.to_str().unwrap(),
            "--liveness-ms",
            "2000",
            "reset",
        ])
        .unwrap();

        let config = args.registry_config().unwrap();
        assert_eq!(config.heartbeat_interval_ms, 200);
        assert_eq!(config.liveness_timeout_ms, 2000);
        assert_eq!(config.poll_interval_ms, RegistryConfig::default().poll_interval_ms);
    }

    #[test]
    fn invalid_settings_are_reported() {
        let args = Args::try_parse_from([
            "winsync",
            "--heartbeat-ms",
            "1000",
            "--liveness-ms",
            "500",
            "list",
        ])
        .unwrap();
        assert!(matches!(
            args.registry_config(),
            Err(CliError::Registry(winsync_core::Error::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn meta_must_be_json() {
        assert_eq!(parse_meta(r#"{"foo": "bar"}"#).unwrap()["foo"], "bar");
        assert!(parse_meta("{foo").is_err());
    }
}
