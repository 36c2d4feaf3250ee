use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use crate::constants::{self, Env};

/// Limits applied to every intake operation, whatever the upload category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_file_size_mb: u64,
    pub max_file_size: u64,
    pub max_files: usize,
    pub max_fields: usize,
    pub max_field_value_size: usize,
}

impl UploadLimits {
    pub fn with_max_file_size_mb(max_file_size_mb: u64) -> Self {
        Self {
            max_file_size_mb,
            max_file_size: max_file_size_mb.saturating_mul(1024 * 1024),
            max_files: constants::MAX_FILES,
            max_fields: constants::MAX_FIELDS,
            max_field_value_size: constants::MAX_FIELD_VALUE_SIZE,
        }
    }

    pub fn from_env(env: &Env) -> Self {
        Self::with_max_file_size_mb(env.max_file_size_mb)
    }

    pub fn max_size_label(&self) -> String {
        format!("{}MB", self.max_file_size_mb)
    }
}

/// Creates the temp directory. A failure is logged and startup continues;
/// intake reports its own write errors if the directory stays unusable.
pub async fn ensure_temp_dir(dir: &Path) {
    match tokio::fs::create_dir_all(dir).await {
        Ok(()) => tracing::info!(path = %dir.display(), "Temp upload directory ready"),
        Err(err) => {
            tracing::error!(path = %dir.display(), error = %err, "Failed to create temp upload directory")
        }
    }
}

async fn is_stale(entry: &tokio::fs::DirEntry, ttl: Duration, now: SystemTime) -> bool {
    let Ok(metadata) = entry.metadata().await else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    metadata
        .modified()
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .is_some_and(|age| age > ttl)
}

/// Removes regular files in `dir` older than `ttl`. Left-overs from aborted
/// uploads never reach the per-request cleanup hook, so this is their only
/// way out. Returns how many files were removed.
pub async fn sweep_stale_temp_files(dir: &Path, ttl: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(path = %dir.display(), error = %err, "Cannot read temp upload directory");
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(path = %dir.display(), error = %err, "Temp directory scan aborted");
                break;
            }
        };

        if !is_stale(&entry, ttl, now).await {
            continue;
        }

        let path = entry.path();
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                removed += 1;
                tracing::debug!(path = %path.display(), "Removed stale temp upload");
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Failed to remove stale temp upload")
            }
        }
    }

    if removed > 0 {
        tracing::info!(removed, path = %dir.display(), "Swept stale temp uploads");
    }
    removed
}

/// Runs the sweep now and then every `interval`. A zero TTL or interval
/// disables it.
pub fn spawn_sweeper(dir: PathBuf, ttl: Duration, interval: Duration) {
    if ttl.is_zero() || interval.is_zero() {
        tracing::info!("Stale temp upload sweep disabled");
        return;
    }

    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(interval);
        loop {
            ticker.tick().await;
            sweep_stale_temp_files(&dir, ttl).await;
        }
    });
}
