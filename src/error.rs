use thiserror::Error;

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Error)]
pub enum HearthError {
    #[error("classifier runtime is not reachable: {reason}")]
    ClassifierUnavailable { reason: String },

    #[error("classifier call exceeded {timeout:?}")]
    ClassifierTimeout { timeout: Duration },

    #[error("rule storage at {path} cannot be read: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule {id} already exists")]
    RuleExists { id: String },

    #[error("no rule with id {id}")]
    UnknownRule { id: String },

    #[error("snapshot hand-off location {path} is not accessible")]
    NoSharedStorage { path: PathBuf },

    #[error("failed to encode snapshot: {source}")]
    EncodingFailure {
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write snapshot at {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("monitoring daemon is already running")]
    AlreadyRunning,

    #[error("failed to submit {operation} request to approval service: {reason}")]
    ApprovalSubmit { operation: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse rules file {path}: {source}")]
    RulesParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
