use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    classify::{Classifier, classify_with_timeout},
    error::HearthError,
    rules::Rule,
};

/// Enforcement-ready projection of a single rule.
///
/// Carries no rule identity: the sandboxed enforcement point has no need to
/// resolve a verdict back to the canonical rule, and identity does not cross
/// the sandbox boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledRule {
    pub description: String,
    pub categories: Vec<String>,
    pub should_block: bool,
    pub active: bool,
}

/// Simple compilation tier. Pure and total: no external calls, never fails,
/// yields exactly one compiled rule per active input rule.
pub fn compile(rules: &[Rule]) -> Vec<CompiledRule> {
    rules.iter().filter(|r| r.active).map(project).collect()
}

/// AI-enhanced compilation tier.
///
/// Enriches category tags with the classifier's label for each rule
/// description. Any classifier error or timeout fails the whole tier with no
/// partial output; the caller falls back to [`compile`].
pub async fn compile_enhanced<C>(
    rules: &[Rule],
    classifier: &C,
    timeout: Duration,
) -> Result<Vec<CompiledRule>, HearthError>
where
    C: Classifier + ?Sized,
{
    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules.iter().filter(|r| r.active) {
        let label = classify_with_timeout(classifier, &rule.description, timeout).await?;
        let mut projected = project(rule);
        if !label.is_generic()
            && !projected
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&label.category))
        {
            projected.categories.push(label.category);
        }
        compiled.push(projected);
    }
    Ok(compiled)
}

fn project(rule: &Rule) -> CompiledRule {
    CompiledRule {
        description: rule.description.clone(),
        categories: rule.categories.clone(),
        should_block: rule.should_block(),
        active: rule.active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Label, MockClassifier};
    use crate::rules::{RuleAction, RuleId, Severity};
    use rstest::rstest;
    use std::time::SystemTime;

    fn rule(id: &str, actions: Vec<RuleAction>, active: bool) -> Rule {
        Rule {
            id: RuleId::new(id),
            description: format!("rule {id}"),
            categories: vec!["social".to_string()],
            actions,
            severity: Severity::Medium,
            active,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn compiles_one_output_per_active_rule() {
        let rules = vec![
            rule("a", vec![RuleAction::Block], true),
            rule("b", vec![RuleAction::Alert], false),
            rule("c", vec![RuleAction::Log], true),
        ];
        let compiled = compile(&rules);
        assert_eq!(
            compiled.len(),
            rules.iter().filter(|r| r.active).count()
        );
    }

    #[rstest]
    #[case(vec![RuleAction::Block], true)]
    #[case(vec![RuleAction::Alert, RuleAction::Block], true)]
    #[case(vec![RuleAction::Alert], false)]
    #[case(vec![], false)]
    fn block_action_collapses_to_should_block(
        #[case] actions: Vec<RuleAction>,
        #[case] expected: bool,
    ) {
        let compiled = compile(&[rule("r", actions, true)]);
        assert_eq!(compiled[0].should_block, expected);
    }

    #[test]
    fn empty_input_compiles_to_empty_output() {
        assert!(compile(&[]).is_empty());
    }

    #[tokio::test]
    async fn enhanced_tier_enriches_categories() {
        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify()
            .returning(|_| Ok(Label::new("messaging")));

        let compiled = compile_enhanced(
            &[rule("r", vec![RuleAction::Block], true)],
            &classifier,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(compiled[0].categories, vec!["social", "messaging"]);
        assert!(compiled[0].should_block);
    }

    #[tokio::test]
    async fn enhanced_tier_skips_generic_and_duplicate_labels() {
        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify()
            .returning(|_| Ok(Label::new("Social")));

        let compiled = compile_enhanced(
            &[rule("r", vec![RuleAction::Block], true)],
            &classifier,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        // Case-insensitive duplicate is not appended again
        assert_eq!(compiled[0].categories, vec!["social"]);
    }

    #[tokio::test]
    async fn enhanced_tier_fails_whole_on_classifier_error() {
        let mut classifier = MockClassifier::new();
        classifier.expect_classify().returning(|_| {
            Err(HearthError::ClassifierUnavailable {
                reason: "engine restarting".to_string(),
            })
        });

        let result = compile_enhanced(
            &[rule("r", vec![RuleAction::Block], true)],
            &classifier,
            Duration::from_secs(1),
        )
        .await;
        assert!(result.is_err());
    }
}
