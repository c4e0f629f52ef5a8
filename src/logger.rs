use anyhow::Result;
use std::{
    fs::{self, File, OpenOptions},
    path::Path,
    sync::Mutex,
};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use crate::config::Config;

/// Opens the log file for appending, creating parent directories on the way.
pub fn open_log_file(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Full log to the file at `LOG_LEVEL` (or `RUST_LOG`); only warnings and errors
/// reach stderr so the interactive prompt stays readable.
pub fn init_tracing(cfg: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cfg.log_level))?;
    let file = Mutex::new(open_log_file(&cfg.log_file)?);
    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    if cfg.log_json {
        tracing_subscriber::registry()
            .with(stderr)
            .with(fmt::layer().json().with_writer(file).with_filter(filter))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(stderr)
            .with(fmt::layer().with_ansi(false).with_writer(file).with_filter(filter))
            .try_init()?;
    }
    Ok(())
}
