mod flow;

pub use flow::{Flow, FlowKind};

use std::{
    path::PathBuf,
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{compile::CompiledRule, sync::RuleSnapshot};

/// Decision applied to a live flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Block,
    Redirect(String),
}

#[derive(Debug)]
struct Loaded {
    snapshot: Option<RuleSnapshot>,
    at: Instant,
}

/// The sandboxed consumer of published rule snapshots.
///
/// Reads the snapshot lazily: at construction, on an explicit [`reload`],
/// and when the poll interval has elapsed at decision time; there is no
/// push channel across the trust boundary. A missing, malformed, or
/// unknown-schema snapshot means every flow is allowed (fail-open):
/// transient under-blocking beats a filter that blocks everything on first
/// boot. This component never reaches out to the classifier or the rule
/// store.
///
/// [`reload`]: EnforcementPoint::reload
pub struct EnforcementPoint {
    snapshot_path: PathBuf,
    poll_interval: Duration,
    redirect_target: Option<String>,
    loaded: Mutex<Loaded>,
}

impl EnforcementPoint {
    pub fn new(
        snapshot_path: impl Into<PathBuf>,
        poll_interval: Duration,
        redirect_target: Option<String>,
    ) -> Self {
        let snapshot_path = snapshot_path.into();
        let snapshot = RuleSnapshot::read(&snapshot_path);
        Self {
            snapshot_path,
            poll_interval,
            redirect_target,
            loaded: Mutex::new(Loaded {
                snapshot,
                at: Instant::now(),
            }),
        }
    }

    /// Re-read the snapshot now, regardless of the poll interval.
    pub fn reload(&self) {
        let snapshot = RuleSnapshot::read(&self.snapshot_path);
        let mut loaded = self.loaded.lock().unwrap();
        loaded.snapshot = snapshot;
        loaded.at = Instant::now();
    }

    /// Decide on a flow against the last usable snapshot.
    pub fn decide(&self, flow: &Flow) -> Verdict {
        let mut loaded = self.loaded.lock().unwrap();
        if loaded.at.elapsed() >= self.poll_interval {
            loaded.snapshot = RuleSnapshot::read(&self.snapshot_path);
            loaded.at = Instant::now();
        }

        let Some(snapshot) = loaded.snapshot.as_ref() else {
            return Verdict::Allow;
        };

        let blocked = snapshot
            .rules
            .iter()
            .any(|rule| rule.active && rule.should_block && rule_matches(rule, flow));
        if !blocked {
            return Verdict::Allow;
        }

        match &self.redirect_target {
            Some(target) => Verdict::Redirect(target.clone()),
            None => Verdict::Block,
        }
    }
}

/// A compiled rule applies to a flow when their category tags intersect or
/// a tag occurs in the flow's URL.
fn rule_matches(rule: &CompiledRule, flow: &Flow) -> bool {
    let url = flow.url.as_deref().map(str::to_lowercase);
    rule.categories.iter().any(|category| {
        flow.categories
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(category))
            || url
                .as_deref()
                .is_some_and(|url| url.contains(&category.to_lowercase()))
    })
}
