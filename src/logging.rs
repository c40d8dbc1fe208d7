use std::{fs, path::PathBuf};

use color_eyre::eyre::{Context, Result, eyre};
use directories::BaseDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "CIRRUS_LOG";
const LOG_FILE: &str = "debug.log";

/// `<data dir>/cirrus`
pub fn log_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| eyre!("could not determine the home directory"))?;
    Ok(base_dirs.data_local_dir().join("cirrus"))
}

/// Filter used when `CIRRUS_LOG` is unset: `info`, raised by each `-v`.
pub fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Route all tracing output to the diagnostic log file. The terminal is owned
/// by the UI, so nothing is written to stdout or stderr. Keep the returned
/// guard alive until exit so buffered lines are flushed.
pub fn init(verbose: u8) -> Result<WorkerGuard> {
    let dir = log_dir()?;
    fs::create_dir_all(&dir).wrap_err_with(|| format!("creating {}", dir.display()))?;
    let appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
        .wrap_err("installing the tracing subscriber")?;
    tracing::info!(path = %dir.join(LOG_FILE).display(), "Logging initialised");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_level() {
        assert_eq!(default_directive(0), "info");
        assert_eq!(default_directive(1), "debug");
        assert_eq!(default_directive(4), "trace");
    }
}
