//! Logging system configuration and initialization
//!
//! - Console output on stderr (stdout is reserved for results)
//! - Optional daily rolling file output, plain or JSON
//! - `RUST_LOG` overrides the configured level
//! - ICT (Indochina Time, UTC+7) timestamps

use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Utc};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::subscriber::DefaultGuard;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::infrastructure::config::{defaults, ConfigManager};

const ICT_OFFSET_SECONDS: i32 = 7 * 3600;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Time formatter for ICT (UTC+7)
struct IctTimeFormatter;

impl FormatTime for IctTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Utc::now();
        match FixedOffset::east_opt(ICT_OFFSET_SECONDS) {
            Some(ict) => write!(w, "{}", now.with_timezone(&ict).format("%Y-%m-%d %H:%M:%S%.3f %:z")),
            None => write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f UTC")),
        }
    }
}

/// Log directory: the configured one, else `<data_local_dir>/price-scout/logs`
pub fn get_log_directory(config: &LoggingConfig) -> Result<PathBuf> {
    match &config.log_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(ConfigManager::get_app_data_dir()?.join("logs")),
    }
}

/// Warn-level console logging scoped to the calling thread.
///
/// Covers startup work that runs before the configured subscriber exists,
/// such as loading (and possibly recovering) the config file. Dropping the
/// guard restores the previous default.
pub fn bootstrap_logging() -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_timer(IctTimeFormatter)
        .with_target(false)
        .with_env_filter(EnvFilter::new("warn"))
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Initialize logging with custom configuration
///
/// Dependency noise (`reqwest`, `hyper`, `h2`, `html5ever`) is held at `warn`
/// unless the level is `trace`. `RUST_LOG` replaces the whole filter:
/// ```bash
/// RUST_LOG="debug,reqwest=debug" price-scout "Tivi LG 65UQ7550"
/// ```
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    if !config.console_output && !config.file_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| build_filter(&config.level))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.console_output {
        layers.push(
            fmt::Layer::new()
                .with_writer(std::io::stderr)
                .with_timer(IctTimeFormatter)
                .with_target(false)
                .boxed(),
        );
    }

    let mut log_dir = None;
    if config.file_output {
        let dir = get_log_directory(&config)?;
        std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory {:?}", dir))?;
        cleanup_old_logs(&dir, config.max_files)?;

        let (file_writer, file_guard) = non_blocking(rolling::daily(&dir, defaults::LOG_FILE_PREFIX));
        // guard가 drop되면 파일 기록이 중단됨
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(IctTimeFormatter)
            .with_ansi(false);
        layers.push(if config.json_format {
            file_layer
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            file_layer.with_target(false).boxed()
        });
        log_dir = Some(dir);
    }

    Registry::default()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized (level: {}, json: {})", config.level, config.json_format);
    if let Some(dir) = log_dir {
        info!("Log directory: {:?}", dir);
    }
    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{level}'"))?;

    if !level.to_lowercase().contains("trace") {
        for directive in ["reqwest=warn", "hyper=warn", "hyper_util=warn", "h2=warn", "html5ever=warn", "selectors=warn"] {
            filter = filter.add_directive(directive.parse()?);
        }
    }

    Ok(filter)
}

/// Keep only the newest `max_files` log files
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files = Vec::new();

    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(defaults::LOG_FILE_PREFIX));

        if path.is_file() && is_log {
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                log_files.push((path, modified));
            }
        }
    }

    // Sort by modification time (newest first)
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(max_files as usize) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove old log file {:?}: {}", path, e);
        } else {
            info!("Removed old log file: {:?}", path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn default_config_logs_to_console_only() {
        let config = LoggingConfig::default();
        assert!(config.console_output);
        assert!(!config.file_output);
    }

    #[test]
    fn configured_log_dir_wins() {
        let config = LoggingConfig {
            log_dir: Some(PathBuf::from("/tmp/price-scout-logs")),
            ..LoggingConfig::default()
        };
        assert_eq!(get_log_directory(&config).unwrap(), PathBuf::from("/tmp/price-scout-logs"));
    }

    #[test]
    fn bootstrap_logging_passes_warnings_only() {
        let guard = bootstrap_logging();
        assert!(tracing::enabled!(tracing::Level::WARN));
        assert!(!tracing::enabled!(tracing::Level::INFO));
        drop(guard);
    }

    #[test]
    fn no_output_is_rejected() {
        let config = LoggingConfig {
            console_output: false,
            file_output: false,
            ..LoggingConfig::default()
        };
        assert!(init_logging_with_config(config).is_err());
    }

    #[test]
    fn invalid_level_is_rejected() {
        assert!(build_filter("reqwest=loud").is_err());
        assert!(build_filter("debug").is_ok());
    }

    #[test]
    fn cleanup_keeps_newest_log_files() {
        let dir = TempDir::new().unwrap();
        let now = SystemTime::now();
        for (i, day) in ["2026-10-01", "2026-10-02", "2026-10-03"].iter().enumerate() {
            let path = dir.path().join(format!("{}.{day}", defaults::LOG_FILE_PREFIX));
            let file = std::fs::File::create(&path).unwrap();
            file.set_modified(now - Duration::from_secs(3600 * (3 - i as u64))).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        cleanup_old_logs(dir.path(), 2).unwrap();

        let mut remaining: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec!["notes.txt", "price-scout.log.2026-10-02", "price-scout.log.2026-10-03"]
        );
    }
}
