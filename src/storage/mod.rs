// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ephemeral file storage for uploads and rendered results
//!
//! Two flat directories on local disk. Nothing here is durable: a
//! background sweeper removes anything older than the configured age.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;

/// Upload and result directories with age-based expiry.
#[derive(Debug)]
pub struct FileStore {
    upload_dir: PathBuf,
    results_dir: PathBuf,
    max_file_age: Duration,
}

impl FileStore {
    /// Create the store, ensuring both directories exist.
    pub fn new(config: &StorageConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.upload_dir)?;
        std::fs::create_dir_all(&config.results_dir)?;
        Ok(Self {
            upload_dir: config.upload_dir.clone(),
            results_dir: config.results_dir.clone(),
            max_file_age: config.max_file_age,
        })
    }

    /// Write an uploaded file into the upload directory.
    ///
    /// `filename` must already be sanitized.
    pub fn save_upload(&self, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.upload_dir.join(filename);
        std::fs::write(&path, bytes)?;
        debug!("Saved upload to {}", path.display());
        Ok(path)
    }

    /// Destination path for the rendered result of an upload.
    pub fn result_path(&self, filename: &str) -> PathBuf {
        self.results_dir.join(format!("detected_{}", filename))
    }

    /// Resolve a result file by client-supplied name, sanitizing it first.
    pub fn resolve_result(&self, filename: &str) -> PathBuf {
        self.results_dir.join(sanitize_filename(filename))
    }

    /// Delete files older than the configured age from both directories.
    ///
    /// Best-effort: every failure is logged and swallowed. Returns the
    /// number of files removed.
    pub fn sweep_expired(&self) -> usize {
        let mut removed = 0;
        for dir in [&self.upload_dir, &self.results_dir] {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Cleanup: failed to read {}: {}", dir.display(), e);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                let expired = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| modified.elapsed().ok())
                    .map(|age| age > self.max_file_age)
                    .unwrap_or(false);
                if expired {
                    match std::fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) => warn!("Cleanup: failed to remove {}: {}", path.display(), e),
                    }
                }
            }
        }
        removed
    }
}

/// Strip a client-supplied filename down to a safe flat name: the final
/// path component with anything outside `[A-Za-z0-9._-]` replaced and
/// leading dots removed.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Run the expiry sweep on a fixed interval off the request path.
pub fn spawn_sweeper(store: Arc<FileStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.sweep_expired();
            if removed > 0 {
                info!("Cleanup removed {} expired file(s)", removed);
            }
        }
    })
}
