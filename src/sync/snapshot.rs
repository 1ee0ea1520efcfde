use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::compile::CompiledRule;

/// Current snapshot schema. Readers must reject any other value.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// The unit of hand-off between the monitoring daemon and the sandboxed
/// enforcement point: a self-describing, versioned, ordered set of
/// enforcement-ready rules. Superseded whole on every sync cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub schema: u32,
    pub rules: Vec<CompiledRule>,
}

impl RuleSnapshot {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA_VERSION,
            rules,
        }
    }

    /// Read the snapshot at `path`.
    ///
    /// Returns `None` for a missing file, unparsable content, or an unknown
    /// schema version. The enforcement side treats all three the same way:
    /// no usable snapshot, fail open.
    pub fn read(path: &Path) -> Option<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no snapshot at {}", path.display());
                return None;
            }
            Err(e) => {
                log::warn!("failed to read snapshot at {}: {e}", path.display());
                return None;
            }
        };

        let snapshot: Self = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("malformed snapshot at {}: {e}", path.display());
                return None;
            }
        };

        if snapshot.schema != SNAPSHOT_SCHEMA_VERSION {
            log::warn!(
                "snapshot at {} has unknown schema {} (expected {}), ignoring",
                path.display(),
                snapshot.schema,
                SNAPSHOT_SCHEMA_VERSION
            );
            return None;
        }

        Some(snapshot)
    }
}
