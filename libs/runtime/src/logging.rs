use std::{
    io::{IsTerminal, Write},
    path::Path,
    sync::{Arc, Mutex},
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use tracing::{level_filters::LevelFilter, Level};
use tracing_subscriber::{
    filter::Targets, fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt,
    Layer, Registry,
};

use crate::config::{LoggingConfig, Section};
use crate::paths::resolve_against;

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

fn level_filter(s: &str) -> LevelFilter {
    parse_tracing_level(s).map_or(LevelFilter::OFF, LevelFilter::from_level)
}

/// Per-target filter: the "default" section sets the catch-all level,
/// every other section names a target prefix (e.g. `users`, `sea_orm`).
fn build_targets(cfg: &LoggingConfig, level_of: impl Fn(&Section) -> &str) -> Targets {
    let default = cfg
        .get(DEFAULT_SECTION)
        .map_or(LevelFilter::INFO, |s| level_filter(level_of(s)));

    cfg.iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .fold(Targets::new().with_default(default), |targets, (name, s)| {
            targets.with_target(name.clone(), level_filter(level_of(s)))
        })
}

fn file_level_of(section: &Section) -> &str {
    if section.file_level.trim().is_empty() {
        &section.console_level
    } else {
        &section.file_level
    }
}

// -------- rotating writer for files --------
#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriter;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer poisoned"))?
            .flush()
    }
}

/// Create a rotating writer, ensuring the parent directory exists.
fn create_rotating_writer_at_path(
    log_path: &Path,
    max_bytes: usize,
    max_backups: usize,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(max_backups)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None, // file permissions (Unix only)
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

/// Writer for the "default" section's `file`, if one is configured.
fn default_file_writer(cfg: &LoggingConfig, base_dir: &Path) -> Option<RotWriter> {
    let section = cfg.get(DEFAULT_SECTION)?;
    if section.file.trim().is_empty() {
        return None;
    }

    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let max_backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let log_path = resolve_against(&section.file, base_dir);

    match create_rotating_writer_at_path(&log_path, max_bytes as usize, max_backups) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!(
                "Failed to initialize log file '{}': {e}",
                log_path.to_string_lossy()
            );
            None
        }
    }
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: subsystem → section map; an empty map means plain console logging
/// - `base_dir`: directory relative log file paths are resolved against (server.home_dir)
///
/// Console output is human-readable; the optional file output is JSON lines.
/// Calling this more than once is a no-op.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = tracing_subscriber::fmt()
            .with_target(true)
            .with_timer(UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let console_layer = fmt::layer()
        .with_ansi(std::io::stdout().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(UtcTime::rfc_3339())
        .with_filter(build_targets(cfg, |s| &s.console_level));

    let file_layer = default_file_writer(cfg, base_dir).map(|writer| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(writer)
            .with_filter(build_targets(cfg, file_level_of))
    });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

// =================== tests ===================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: String::new(),
            file_level: file_level.into(),
            max_backups: None,
            max_size_mb: None,
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Info"), Some(Level::INFO));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("invalid"), Some(Level::INFO)); // defaults to INFO
    }

    #[test]
    fn test_console_targets_honor_subsystem_sections() {
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section("warn", ""));
        cfg.insert("users".into(), section("debug", ""));
        cfg.insert("sea_orm".into(), section("off", ""));

        let targets = build_targets(&cfg, |s| &s.console_level);

        assert!(targets.would_enable("users::domain::service", &Level::DEBUG));
        assert!(!targets.would_enable("users", &Level::TRACE));
        assert!(!targets.would_enable("sea_orm::driver", &Level::ERROR));
        assert!(targets.would_enable("api_ingress", &Level::WARN));
        assert!(!targets.would_enable("api_ingress", &Level::INFO));
    }

    #[test]
    fn test_file_level_falls_back_to_console_level() {
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section("info", "debug"));
        cfg.insert("users".into(), section("error", ""));

        let targets = build_targets(&cfg, file_level_of);

        assert!(targets.would_enable("runtime", &Level::DEBUG));
        assert!(targets.would_enable("users", &Level::ERROR));
        assert!(!targets.would_enable("users", &Level::WARN));
    }

    #[test]
    fn test_create_rotating_writer_at_path_creates_parent() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");

        let mut writer = create_rotating_writer_at_path(&p, 128 * 1024, 2).unwrap();
        writer.write_all(b"{\"message\":\"hello\"}\n").unwrap();
        writer.flush().unwrap();

        assert!(p.parent().unwrap().exists(), "parent dir must be created");
        let written = std::fs::read_to_string(&p).unwrap();
        assert!(written.contains("hello"));
    }

    #[test]
    fn test_default_file_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let cfg = default_logging_config();

        assert!(default_file_writer(&cfg, tmp.path()).is_some());
        assert!(tmp.path().join("logs").is_dir());
    }

    #[test]
    fn test_no_file_writer_without_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert(DEFAULT_SECTION.into(), section("info", "debug"));

        assert!(default_file_writer(&cfg, tmp.path()).is_none());
    }
}
