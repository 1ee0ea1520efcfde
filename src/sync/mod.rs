pub mod snapshot;

pub use snapshot::{RuleSnapshot, SNAPSHOT_SCHEMA_VERSION};

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{compile::CompiledRule, error::HearthError};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Publishes compiled snapshots to the shared hand-off location.
///
/// Publication is atomic from the reader's point of view: the snapshot is
/// written to a temporary file in the same directory and then renamed into
/// the well-known path in one step. A reader sees either the fully-old or
/// the fully-new content. On any failure the previous snapshot stays
/// authoritative.
#[derive(Debug, Clone)]
pub struct SyncChannel {
    path: PathBuf,
}

impl SyncChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically publish a snapshot, returning the number of rules written.
    pub fn publish(&self, rules: &[CompiledRule]) -> Result<usize, HearthError> {
        let dir = self.handoff_dir()?;

        let snapshot = RuleSnapshot::new(rules.to_vec());
        let encoded = serde_json::to_vec_pretty(&snapshot)
            .map_err(|source| HearthError::EncodingFailure { source })?;

        // Unique temp name per write: concurrent publishers must not step on
        // each other's staging file. The rename below is the serialization point.
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = dir.join(format!(".rules.{}.{seq}.tmp", std::process::id()));

        fs::write(&tmp, &encoded).map_err(|source| HearthError::WriteFailure {
            path: tmp.clone(),
            source,
        })?;

        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(HearthError::WriteFailure {
                path: self.path.clone(),
                source,
            });
        }

        log::debug!(
            "published snapshot with {} rules to {}",
            snapshot.rules.len(),
            self.path.display()
        );
        Ok(snapshot.rules.len())
    }

    fn handoff_dir(&self) -> Result<PathBuf, HearthError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(dir),
            _ => Err(HearthError::NoSharedStorage {
                path: self.path.clone(),
            }),
        }
    }
}
