//! Tracing subscriber setup for the binary

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::error::{DistribError, ErrorCode, Result};

/// Filter directive for a `-v` count
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,tungstenite=debug,sqlx=debug",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the verbosity count.
///
/// Events go to stderr, or are appended to `log_file` without colours.
pub fn init(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3);

    let installed = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| DistribError::config(format!("cannot install logger: {e}")))
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            DistribError::config_with_source(
                ErrorCode::CONFIG_INVALID_VALUE,
                format!("cannot open log file {}", path.display()),
                e,
            )
        })
}
