use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::HearthError;

use super::model::{Rule, RuleId};

/// On-disk shape of the rules file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Canonical, versioned store of user-authored rules.
///
/// Backed by a TOML file when opened with a path; a missing file is an
/// empty store, an unreadable one is `StorageUnavailable`. Mutations
/// persist before returning, so a later read observes the change.
#[derive(Debug)]
pub struct RuleStore {
    path: Option<PathBuf>,
    rules: Vec<Rule>,
}

impl RuleStore {
    /// Create a store with no backing file. Reads always succeed.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            rules: Vec::new(),
        }
    }

    /// Open a file-backed store, loading any existing rules.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HearthError> {
        let path = path.into();
        let rules = match read_rules_file(&path)? {
            Some(file) => file.rules,
            None => Vec::new(),
        };
        Ok(Self {
            path: Some(path),
            rules,
        })
    }

    /// All rules, active or not, re-read from the backing file.
    pub fn list_rules(&mut self) -> Result<Vec<Rule>, HearthError> {
        self.reload()?;
        Ok(self.rules.clone())
    }

    /// Rules eligible for compilation. Inactive rules never leave the store.
    pub fn list_active_rules(&mut self) -> Result<Vec<Rule>, HearthError> {
        self.reload()?;
        Ok(self.rules.iter().filter(|r| r.active).cloned().collect())
    }

    /// Add a rule. Fails if the id is already taken; persisted before returning.
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), HearthError> {
        self.reload()?;
        if self.rules.iter().any(|r| r.id == rule.id) {
            return Err(HearthError::RuleExists {
                id: rule.id.raw().to_string(),
            });
        }
        self.rules.push(rule);
        self.persist()
    }

    /// Remove a rule by id, returning it. Persisted before returning.
    pub fn remove_rule(&mut self, id: &RuleId) -> Result<Rule, HearthError> {
        self.reload()?;
        let index = self.rules.iter().position(|r| &r.id == id).ok_or_else(|| {
            HearthError::UnknownRule {
                id: id.raw().to_string(),
            }
        })?;
        let removed = self.rules.remove(index);
        self.persist()?;
        Ok(removed)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn reload(&mut self) -> Result<(), HearthError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(file) = read_rules_file(path)? {
            self.rules = file.rules;
        }
        Ok(())
    }

    fn persist(&self) -> Result<(), HearthError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let file = RulesFile {
            rules: self.rules.clone(),
        };
        let encoded = toml::to_string_pretty(&file)
            .map_err(|e| std::io::Error::other(e.to_string()))?;

        // Same temp-file + rename discipline as the snapshot channel, so a
        // crashed write never leaves a half-written canonical store.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Read and parse the rules file. `None` when the file does not exist.
fn read_rules_file(path: &Path) -> Result<Option<RulesFile>, HearthError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(HearthError::StorageUnavailable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let file = toml::from_str(&content).map_err(|source| HearthError::RulesParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(file))
}
