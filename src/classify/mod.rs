mod keyword;

pub use keyword::KeywordClassifier;

use std::time::Duration;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::HearthError;

/// Non-committal answer a classifier gives when content fits no specific
/// category. Carries no enforcement signal.
pub const GENERIC_CATEGORY: &str = "general";

/// Category label produced for a piece of observed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub category: String,
}

impl Label {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }

    pub fn is_generic(&self) -> bool {
        self.category.is_empty() || self.category.eq_ignore_ascii_case(GENERIC_CATEGORY)
    }
}

/// Content classifier abstraction.
///
/// The actual model runtime is an external collaborator; this crate only
/// depends on its contract. Implementations must be safe to call
/// concurrently and may be briefly unavailable.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Classifier: Send + Sync + 'static {
    /// Check that the classifier runtime is reachable.
    async fn probe(&self) -> Result<(), HearthError>;

    /// Classify a piece of content into a category label.
    async fn classify(&self, content: &str) -> Result<Label, HearthError>;
}

/// Classify with a bounded wait. An elapsed timeout is reported as
/// `ClassifierTimeout` so callers can treat it as a tier failure.
pub async fn classify_with_timeout<C>(
    classifier: &C,
    content: &str,
    timeout: Duration,
) -> Result<Label, HearthError>
where
    C: Classifier + ?Sized,
{
    tokio::time::timeout(timeout, classifier.classify(content))
        .await
        .map_err(|_| HearthError::ClassifierTimeout { timeout })?
}
