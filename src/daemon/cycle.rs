use std::time::Duration;

use crate::{
    classify::Classifier,
    compile::{CompiledRule, compile, compile_enhanced},
    rules::Rule,
    sync::SyncChannel,
};

/// Result of one compilation tier within a sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Published { rules: usize },
    Failed { reason: String },
}

impl TierOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, TierOutcome::Published { .. })
    }
}

/// Result of one full two-tier sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    pub enhanced: TierOutcome,
    pub simple: TierOutcome,
}

impl CycleOutcome {
    /// Whether at least one tier put a valid snapshot in place this cycle.
    pub fn snapshot_published(&self) -> bool {
        self.enhanced.is_published() || self.simple.is_published()
    }
}

/// Run the two-tier publish cycle.
///
/// The enhanced tier is attempted first; whatever happens to it, the simple
/// tier compiles and publishes unconditionally afterwards, so a classifier
/// outage can never leave the enforcement point without a correctness-
/// guaranteed snapshot. Both tiers write the same slot; the later
/// successful write wins.
pub async fn run_sync_cycle<C>(
    rules: &[Rule],
    classifier: &C,
    channel: &SyncChannel,
    classifier_timeout: Duration,
) -> CycleOutcome
where
    C: Classifier + ?Sized,
{
    let enhanced = match compile_enhanced(rules, classifier, classifier_timeout).await {
        Ok(compiled) => publish_tier("enhanced", channel, &compiled),
        Err(e) => {
            log::warn!("enhanced compilation tier failed, relying on simple tier: {e}");
            TierOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };

    let compiled = compile(rules);
    let simple = publish_tier("simple", channel, &compiled);

    if let TierOutcome::Failed { reason } = &simple
        && !enhanced.is_published()
    {
        log::warn!("sync cycle left no new snapshot, previous one stays authoritative: {reason}");
    }

    CycleOutcome { enhanced, simple }
}

fn publish_tier(tier: &str, channel: &SyncChannel, compiled: &[CompiledRule]) -> TierOutcome {
    match channel.publish(compiled) {
        Ok(rules) => {
            log::debug!("{tier} tier published {rules} rules");
            TierOutcome::Published { rules }
        }
        Err(e) => {
            log::warn!("{tier} tier publish failed: {e}");
            TierOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
