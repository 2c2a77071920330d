use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use url::Url;

use crate::config::DatabaseConfig;

const MEMORY_DSN: &str = "sqlite::memory:";
const DEFAULT_MAX_CONNS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SEC: u64 = 5;
// In-memory SQLite lives exactly as long as its single connection.
const MEMORY_CONN_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Detect DB backend from URL scheme. Only SQLite is compiled in.
pub fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("Database URL not configured"));
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;

    match url.scheme() {
        "sqlite" | "sqlite3" => Ok("sqlite"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

fn is_memory_dsn(dsn: &str) -> bool {
    dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:")
}

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Normalizes backslashes into forward slashes (important on Windows).
/// - Adds `mode=rwc` so a missing database file is created.
pub fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if is_memory_dsn(dsn) {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite3://"))
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("Empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if let Some(dir) = p.parent() {
        if create_dirs {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create database dir {}", dir.display()))?;
        }
    }

    // Rebuild DSN with absolute path and normalized slashes
    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    match query {
        Some(q) if q.split('&').any(|kv| kv.starts_with("mode=")) => {
            out.push('?');
            out.push_str(q);
        }
        Some(q) if !q.is_empty() => {
            out.push('?');
            out.push_str(q);
            out.push_str("&mode=rwc");
        }
        _ => out.push_str("?mode=rwc"),
    }
    Ok(out)
}

/// Open the users database.
/// - `base_dir`: directory relative SQLite paths are resolved against (server.home_dir)
/// - `mock`: ignore the configured URL and use a private in-memory database
pub async fn connect(
    cfg: &DatabaseConfig,
    base_dir: &Path,
    mock: bool,
) -> Result<DatabaseConnection> {
    let mut opts = if mock || is_memory_dsn(cfg.url.trim()) {
        tracing::info!("Using in-memory database");
        let mut opts = ConnectOptions::new(MEMORY_DSN);
        opts.max_connections(1)
            .min_connections(1)
            .idle_timeout(MEMORY_CONN_LIFETIME)
            .max_lifetime(MEMORY_CONN_LIFETIME);
        opts
    } else {
        detect_from_dsn(cfg)?;
        let dsn = absolutize_sqlite_dsn(cfg.url.trim(), base_dir, true)?;
        tracing::info!("Connecting to database: {}", dsn);
        let mut opts = ConnectOptions::new(dsn);
        opts.max_connections(cfg.max_conns.unwrap_or(DEFAULT_MAX_CONNS));
        opts
    };

    opts.acquire_timeout(Duration::from_secs(
        cfg.acquire_timeout_sec.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SEC),
    ))
    .sqlx_logging(false);

    let conn = Database::connect(opts)
        .await
        .context("failed to connect to database")?;
    tracing::info!("Connected DB backend: {:?}", conn.get_database_backend());
    Ok(conn)
}
