use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Maps `-q` and the `-v` count to the console level.
pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn open_log_file(path: &Path) -> Result<Mutex<File>> {
    Ok(Mutex::new(File::create(path)?))
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();
    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(open_log_file(path)?)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_target(true),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(level_filter(verbosity, quiet))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install the logger: {}", e)))
}
