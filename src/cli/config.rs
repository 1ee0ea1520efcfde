use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::HearthError;

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub rules: RulesSection,
    #[serde(default)]
    pub enforcement: EnforcementSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct DaemonSection {
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    #[serde(default = "default_classifier_timeout_ms")]
    pub classifier_timeout_ms: u64,
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval_secs(),
            classifier_timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SyncSection {
    /// Well-known hand-off location readable from the enforcement sandbox.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RulesSection {
    #[serde(default = "default_rules_path")]
    pub path: PathBuf,
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            path: default_rules_path(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct EnforcementSection {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Block page shown instead of a plain connection reset, if set.
    #[serde(default)]
    pub redirect_url: Option<String>,
}

impl Default for EnforcementSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            redirect_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ClassifierSection {
    /// Keyword -> category table for the built-in lexicon classifier.
    #[serde(default = "default_lexicon")]
    pub lexicon: HashMap<String, String>,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            lexicon: default_lexicon(),
        }
    }
}

fn default_sync_interval_secs() -> u64 {
    60
}

fn default_classifier_timeout_ms() -> u64 {
    2000
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("/var/lib/hearthguard/shared/rules.json")
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("/etc/hearthguard/rules.toml")
}

fn default_lexicon() -> HashMap<String, String> {
    HashMap::from([
        ("facebook".to_string(), "social".to_string()),
        ("instagram".to_string(), "social".to_string()),
        ("tiktok".to_string(), "social".to_string()),
        ("casino".to_string(), "gambling".to_string()),
        ("poker".to_string(), "gambling".to_string()),
        ("slots".to_string(), "gambling".to_string()),
    ])
}

impl ConfigFile {
    /// Load configuration file
    pub fn load(path: &Path) -> Result<Self, HearthError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| HearthError::ConfigParse {
            path: PathBuf::from(path),
            source,
        })
    }
}
