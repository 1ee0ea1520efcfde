use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Strongly-typed rule identifier. Unique and immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Enforcement actions a rule can request. A rule may carry several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Block,
    Alert,
    Log,
    Redirect,
}

/// Severity ordering: Low < Medium < High < Critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Canonical user-authored monitoring rule.
///
/// Rules are read-only outside the store: the compiler and sync channel
/// never mutate them, only project them into enforcement-ready form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    pub severity: Severity,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "SystemTime::now")]
    pub created_at: SystemTime,
}

fn default_active() -> bool {
    true
}

impl Rule {
    /// Whether the rule's action set requests blocking.
    pub fn should_block(&self) -> bool {
        self.actions.contains(&RuleAction::Block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule(id: &str, actions: Vec<RuleAction>) -> Rule {
        Rule {
            id: RuleId::new(id),
            description: format!("rule {id}"),
            categories: vec!["social".to_string()],
            actions,
            severity: Severity::Medium,
            active: true,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn block_action_implies_should_block() {
        let rule = sample_rule("r1", vec![RuleAction::Log, RuleAction::Block]);
        assert!(rule.should_block());
    }

    #[test]
    fn no_block_action_means_no_block() {
        let rule = sample_rule("r2", vec![RuleAction::Alert]);
        assert!(!rule.should_block());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn rule_deserializes_with_defaults() {
        let toml_rule = r#"
id = "r3"
description = "block gambling sites"
categories = ["gambling"]
actions = ["block", "alert"]
severity = "high"
"#;
        let rule: Rule = toml::from_str(toml_rule).unwrap();
        assert!(rule.active);
        assert_eq!(rule.actions, vec![RuleAction::Block, RuleAction::Alert]);
    }
}
