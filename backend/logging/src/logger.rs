//! Structured Logger
//!
//! Wraps `tracing` with a console layer, an optional daily-rolling NDJSON
//! file, and environment-based level control (`RUST_LOG` wins over the
//! configured level).

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file prefix inside the log directory.
pub const LOG_FILE_PREFIX: &str = "skuforge.log";

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    /// Directory for the rolling NDJSON file; `None` logs to the console only.
    pub dir: Option<PathBuf>,
    /// Emit JSON on the console instead of human-readable lines.
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

/// Initialize the global structured logger. Safe to call more than once;
/// later calls are no-ops.
pub fn init_logger(settings: &LogSettings) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.level))?;

    // Rolling file appender: writes NDJSON to `<dir>/skuforge.log.YYYY-MM-DD`
    let file_layer = match &settings.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    // Console goes to stderr so command output on stdout stays clean
    let (json_console, plain_console) = if settings.json {
        (Some(fmt::layer().json().with_writer(std::io::stderr)), None)
    } else {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(true);
        (None, Some(layer))
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            dir: Some(dir.path().join("logs")),
            ..LogSettings::default()
        };
        init_logger(&settings).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }
}
