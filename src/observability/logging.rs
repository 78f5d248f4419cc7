use anyhow::{Context, Result};
use std::backtrace::Backtrace;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "cert-manager.log";

/// Log files untouched for this long are deleted at startup
pub const LOG_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub log_dir: PathBuf,
}

/// Console plus append-only file logging. Keep the guard alive until exit.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create log dir: {}", config.log_dir.display()))?;
    let log_file = config.log_dir.join(LOG_FILE_NAME);
    let removed = remove_stale_log(&log_file, LOG_RETENTION, SystemTime::now())?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(match config.level.as_str() {
            "trace" => Level::TRACE.into(),
            "debug" => Level::DEBUG.into(),
            "info" => Level::INFO.into(),
            "warn" => Level::WARN.into(),
            "error" => Level::ERROR.into(),
            _ => Level::INFO.into(),
        })
        .from_env_lossy();

    let file_appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let installed = match config.format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stdout))
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stdout))
            .with(fmt::layer().json().with_writer(non_blocking))
            .try_init(),
    };
    installed.context("failed to initialize tracing subscriber")?;

    if removed {
        tracing::info!("Removed log file older than {} days", LOG_RETENTION.as_secs() / 86_400);
    }
    Ok(guard)
}

/// Route panic reports through tracing so they reach the log file with
/// their location and a captured backtrace. Replaces the default stderr hook.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string());
        let backtrace = Backtrace::force_capture();
        tracing::error!(
            target: "panic",
            thread = std::thread::current().name().unwrap_or("unnamed"),
            "panicked at {}: {}\nbacktrace:\n{}",
            location,
            message,
            backtrace
        );
    }));
}

/// Delete `path` if it was last modified more than `retention` before `now`
pub fn remove_stale_log(path: &Path, retention: Duration, now: SystemTime) -> Result<bool> {
    let Ok(meta) = std::fs::metadata(path) else {
        return Ok(false);
    };
    let modified = meta
        .modified()
        .with_context(|| format!("failed to read mtime of {}", path.display()))?;
    let age = now.duration_since(modified).unwrap_or_default();
    if age <= retention {
        return Ok(false);
    }
    std::fs::remove_file(path)
        .with_context(|| format!("failed to remove old log file: {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_log_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        std::fs::write(&path, "line\n").unwrap();

        assert!(!remove_stale_log(&path, LOG_RETENTION, SystemTime::now()).unwrap());
        assert!(path.exists());
    }

    #[test]
    fn test_untouched_log_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOG_FILE_NAME);
        std::fs::write(&path, "line\n").unwrap();

        let later = SystemTime::now() + LOG_RETENTION + Duration::from_secs(60);
        assert!(remove_stale_log(&path, LOG_RETENTION, later).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_log_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.log");
        assert!(!remove_stale_log(&path, LOG_RETENTION, SystemTime::now()).unwrap());
    }
}
