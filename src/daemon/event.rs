use std::time::SystemTime;

use crate::enforce::{Flow, FlowKind};
use crate::rules::{Rule, RuleAction, RuleId, Severity};

/// Process-local monitoring event identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

impl EventId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Observation record produced when a flow matches an active rule.
///
/// Events are the pipeline's output artifact, not part of its control
/// path: reporting consumes them and flips `processed`; the core never
/// deletes them.
#[derive(Debug, Clone)]
pub struct MonitoringEvent {
    pub id: EventId,
    pub timestamp: SystemTime,
    pub kind: FlowKind,
    pub url: Option<String>,
    pub content_ref: Option<String>,
    pub screenshot_ref: Option<String>,
    /// Identity of the violated rule, valid at evaluation time.
    pub rule_violated: Option<RuleId>,
    pub action_taken: RuleAction,
    pub severity: Severity,
    pub processed: bool,
}

/// In-memory event log owned by the daemon.
#[derive(Debug, Default)]
pub struct EventLog {
    next_id: u64,
    events: Vec<MonitoringEvent>,
}

impl EventLog {
    /// Record that `flow` violated `rule`, returning the new event's id.
    pub fn record_violation(&mut self, flow: &Flow, rule: &Rule) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(MonitoringEvent {
            id,
            timestamp: SystemTime::now(),
            kind: flow.kind,
            url: flow.url.clone(),
            content_ref: flow.content.clone(),
            screenshot_ref: flow.screenshot_ref.clone(),
            rule_violated: Some(rule.id.clone()),
            action_taken: action_taken(rule),
            severity: rule.severity,
            processed: false,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn unprocessed_count(&self) -> usize {
        self.events.iter().filter(|e| !e.processed).count()
    }

    /// Hand unprocessed events to reporting, marking them processed.
    pub fn take_unprocessed(&mut self) -> Vec<MonitoringEvent> {
        let mut taken = Vec::new();
        for event in self.events.iter_mut().filter(|e| !e.processed) {
            event.processed = true;
            taken.push(event.clone());
        }
        taken
    }
}

/// The single action reported for a matched rule, strongest first.
fn action_taken(rule: &Rule) -> RuleAction {
    for action in [
        RuleAction::Block,
        RuleAction::Redirect,
        RuleAction::Alert,
        RuleAction::Log,
    ] {
        if rule.actions.contains(&action) {
            return action;
        }
    }
    RuleAction::Log
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(actions: Vec<RuleAction>) -> Rule {
        Rule {
            id: RuleId::new("r1"),
            description: "block social media".to_string(),
            categories: vec!["social".to_string()],
            actions,
            severity: Severity::High,
            active: true,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn records_reference_the_violated_rule() {
        let mut log = EventLog::default();
        let flow = Flow::web_request("https://chat.example");
        let id = log.record_violation(&flow, &rule(vec![RuleAction::Block]));

        assert_eq!(log.len(), 1);
        assert_eq!(id.raw(), 0);
        let taken = log.take_unprocessed();
        assert_eq!(taken[0].rule_violated, Some(RuleId::new("r1")));
        assert_eq!(taken[0].action_taken, RuleAction::Block);
        assert_eq!(taken[0].severity, Severity::High);
    }

    #[test]
    fn event_ids_are_unique_and_monotonic() {
        let mut log = EventLog::default();
        let flow = Flow::web_request("https://a.example");
        let first = log.record_violation(&flow, &rule(vec![RuleAction::Alert]));
        let second = log.record_violation(&flow, &rule(vec![RuleAction::Alert]));
        assert!(second.raw() > first.raw());
    }

    #[test]
    fn take_unprocessed_flips_but_keeps_events() {
        let mut log = EventLog::default();
        let flow = Flow::web_request("https://a.example");
        log.record_violation(&flow, &rule(vec![RuleAction::Alert]));

        assert_eq!(log.unprocessed_count(), 1);
        assert_eq!(log.take_unprocessed().len(), 1);
        assert_eq!(log.unprocessed_count(), 0);
        // Consumed, not deleted
        assert_eq!(log.len(), 1);
        assert!(log.take_unprocessed().is_empty());
    }

    #[test]
    fn strongest_action_wins_the_report() {
        let mut log = EventLog::default();
        let flow = Flow::web_request("https://a.example");
        log.record_violation(&flow, &rule(vec![RuleAction::Log, RuleAction::Alert]));
        let taken = log.take_unprocessed();
        assert_eq!(taken[0].action_taken, RuleAction::Alert);
    }
}
