use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};
use env_logger::{Builder, Target, WriteStyle};
use log::LevelFilter;

/// Route `log` output to a file. The terminal belongs to the TUI, so nothing
/// may be written to stdout/stderr while it runs. `RUST_LOG` still overrides
/// the default `info` level.
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("hyper_util", LevelFilter::Warn)
        .parse_default_env()
        .write_style(WriteStyle::Never)
        .target(Target::Pipe(Box::new(file)))
        .try_init()
        .context("logger already initialized")?;

    Ok(())
}
