use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

pub const LOG_ENV: &str = "RECRUIT_BOARD_LOG";

pub enum Target<'a> {
    /// Append to the configured file; stays off the terminal while the UI
    /// owns the screen.
    File(&'a Path),
    Stderr,
}

fn filter(cfg: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(cfg.level.trim()))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init(cfg: &LogConfig, target: Target<'_>) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(filter(cfg));
    match target {
        Target::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("logging: create directory {}", parent.display())
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("logging: open {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| anyhow::anyhow!("logging: install subscriber: {err}"))?;
        }
        Target::Stderr => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|err| anyhow::anyhow!("logging: install subscriber: {err}"))?;
        }
    }
    Ok(())
}
