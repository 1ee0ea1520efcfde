use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::HearthError;

use super::{Classifier, GENERIC_CATEGORY, Label};

/// Lexicon-based classifier used when no external model runtime is wired in.
///
/// Matches content against a keyword-to-category table and labels with the
/// first hit. A real AI engine replaces this by implementing [`Classifier`].
pub struct KeywordClassifier {
    lexicon: Vec<(String, String)>,
}

impl KeywordClassifier {
    /// Build from a keyword -> category table. Keywords are matched
    /// case-insensitively as substrings of the content.
    pub fn new(lexicon: HashMap<String, String>) -> Self {
        let mut lexicon: Vec<(String, String)> = lexicon
            .into_iter()
            .map(|(keyword, category)| (keyword.to_lowercase(), category))
            .collect();
        // Longest keyword first so "chat roulette" beats "chat"
        lexicon.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        Self { lexicon }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn probe(&self) -> Result<(), HearthError> {
        if self.lexicon.is_empty() {
            return Err(HearthError::ClassifierUnavailable {
                reason: "keyword lexicon is empty".to_string(),
            });
        }
        Ok(())
    }

    async fn classify(&self, content: &str) -> Result<Label, HearthError> {
        let haystack = content.to_lowercase();
        let category = self
            .lexicon
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword))
            .map(|(_, category)| category.clone())
            .unwrap_or_else(|| GENERIC_CATEGORY.to_string());
        Ok(Label { category })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::new(HashMap::from([
            ("facebook".to_string(), "social".to_string()),
            ("poker".to_string(), "gambling".to_string()),
        ]))
    }

    #[rstest]
    #[case("visiting Facebook.com today", "social")]
    #[case("late night POKER stream", "gambling")]
    #[case("weather forecast", "general")]
    #[tokio::test]
    async fn labels_by_lexicon(#[case] content: &str, #[case] expected: &str) {
        let label = classifier().classify(content).await.unwrap();
        assert_eq!(label.category, expected);
    }

    #[tokio::test]
    async fn empty_lexicon_fails_probe() {
        let classifier = KeywordClassifier::new(HashMap::new());
        let err = classifier.probe().await.unwrap_err();
        assert!(matches!(err, HearthError::ClassifierUnavailable { .. }));
    }

    #[tokio::test]
    async fn populated_lexicon_probes_ok() {
        assert!(classifier().probe().await.is_ok());
    }
}
