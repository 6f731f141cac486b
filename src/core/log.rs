use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init_logging(verbose: bool) {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::INFO, "info")
    };
    let app_filter = Targets::new()
        .with_target("tripcraft", level_filter)
        .with_target("tower_http", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(app_filter)
        .with(env_filter)
        .init();
}

#[derive(Debug, Serialize)]
struct ErrorEntry<'a> {
    ts: DateTime<Utc>,
    scope: &'a str,
    message: String,
}

/// Development aid: appends one JSON object per line for every degraded
/// request, e.g. `{"ts":"...","scope":"fx","message":"..."}`.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails; a broken log file is reported through tracing.
    pub async fn append(&self, scope: &str, err: &(dyn Display + Sync)) {
        let entry = ErrorEntry {
            ts: Utc::now(),
            scope,
            message: format!("{err:#}"),
        };
        if let Err(e) = self.write(&entry).await {
            warn!("Failed to write error log {}: {e}", self.path.display());
        }
    }

    async fn write(&self, entry: &ErrorEntry<'_>) -> std::io::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
