//! Debug-only snapshots of identity-provider responses.
//!
//! Snapshots are written once to fresh files and never read back by the live
//! flow. Write failures are logged and swallowed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use glycodash_config::Config;

#[derive(Debug, Clone, Default)]
pub struct DiagnosticCache {
    dir: Option<PathBuf>,
}

impl DiagnosticCache {
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: Some(dir.into()) }
    }

    /// Enabled only when the process runs with the debug flag.
    pub fn from_config(config: &Config) -> Self {
        if config.debug {
            Self::new(&config.diagnostics.dir)
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Persist `value` as `{label}-{timestamp}-{uuid}.json`. Returns the path
    /// written, or `None` when disabled or the write failed.
    pub async fn record<T: Serialize>(&self, label: &str, value: &T) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        match write_snapshot(dir, label, value).await {
            Ok(path) => {
                debug!(path = %path.display(), label, "Diagnostic snapshot written");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, label, "Failed to write diagnostic snapshot");
                None
            }
        }
    }
}

async fn write_snapshot<T: Serialize>(
    dir: &Path,
    label: &str,
    value: &T,
) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let name = format!(
        "{label}-{}-{}.json",
        Utc::now().format("%Y%m%dT%H%M%S"),
        Uuid::new_v4().simple()
    );
    let path = dir.join(name);
    let body = serde_json::to_vec_pretty(value)?;

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await?;
    file.write_all(&body).await?;
    file.flush().await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_disabled_cache_writes_nothing() {
        let cache = DiagnosticCache::disabled();
        assert!(cache.record("token", &json!({"a": 1})).await.is_none());
    }

    #[tokio::test]
    async fn test_snapshots_are_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiagnosticCache::new(dir.path().join("diag"));

        let first = cache.record("token", &json!({"n": 1})).await.unwrap();
        let second = cache.record("token", &json!({"n": 2})).await.unwrap();
        assert_ne!(first, second);

        let content = std::fs::read_to_string(&first).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["n"], 1);
    }

    #[test]
    fn test_enabled_only_in_debug() {
        let mut config = Config::default();
        assert!(!DiagnosticCache::from_config(&config).is_enabled());
        config.debug = true;
        assert!(DiagnosticCache::from_config(&config).is_enabled());
    }
}
