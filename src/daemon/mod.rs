mod cycle;
mod event;
mod signal;

pub use cycle::{CycleOutcome, TierOutcome, run_sync_cycle};
pub use event::{EventId, EventLog, MonitoringEvent};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;

#[cfg(test)]
use mockall::automock;

use crate::{
    classify::{Classifier, classify_with_timeout},
    enforce::Flow,
    error::HearthError,
    lifecycle::{ExtensionLifecycleManager, ExtensionState, LifecycleFailure},
    rules::{Rule, RuleId, RuleStore},
    sync::SyncChannel,
};

use signal::ShutdownSignal;

/// How often worker loops re-check the shutdown flag while idle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);
const FLOW_BUFFER: usize = 64;
const COMMAND_BUFFER: usize = 16;

/// Live traffic interception seam.
///
/// The packet/socket-level mechanism is an external collaborator; an
/// implementation delivers observed flows into the provided channel until
/// stopped. `stop` must be safe to call more than once.
#[cfg_attr(test, automock)]
pub trait TrafficInterceptor: Send + Sync + 'static {
    fn start(&self, flows: mpsc::Sender<Flow>) -> Result<(), HearthError>;
    fn stop(&self);
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Period of the snapshot publish cycle.
    pub sync_interval: Duration,
    /// Upper bound on any single classifier call.
    pub classifier_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(60),
            classifier_timeout: Duration::from_secs(2),
        }
    }
}

/// Requests the external IPC layer feeds into the daemon's command loop.
pub enum DaemonCommand {
    AddRule {
        rule: Rule,
        reply: oneshot::Sender<Result<(), HearthError>>,
    },
    RemoveRule {
        id: RuleId,
        reply: oneshot::Sender<Result<Rule, HearthError>>,
    },
    ListRules {
        reply: oneshot::Sender<Result<Vec<Rule>, HearthError>>,
    },
    Status {
        reply: oneshot::Sender<DaemonStatus>,
    },
    SyncNow {
        reply: oneshot::Sender<CycleOutcome>,
    },
    Stop,
}

#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub running: bool,
    pub rule_count: usize,
    pub active_rule_count: usize,
    pub event_count: usize,
    pub unprocessed_event_count: usize,
    pub last_cycle: Option<CycleOutcome>,
    pub extension_state: ExtensionState,
    pub last_lifecycle_failure: Option<LifecycleFailure>,
}

struct RunState {
    shutdown: Arc<ShutdownSignal>,
    tasks: Vec<JoinHandle<()>>,
}

/// Process-level orchestrator.
///
/// Owns the rule store, the sync channel, the event log, and the extension
/// lifecycle manager; drives the two-tier publish cycle and evaluates
/// intercepted flows against the active rules. All components are injected
/// at construction; nothing here is process-global.
pub struct MonitoringDaemon<C: Classifier> {
    classifier: Arc<C>,
    interceptor: Arc<dyn TrafficInterceptor>,
    lifecycle: Arc<ExtensionLifecycleManager>,
    store: Arc<Mutex<RuleStore>>,
    channel: SyncChannel,
    config: DaemonConfig,
    events: Arc<Mutex<EventLog>>,
    last_cycle: Arc<Mutex<Option<CycleOutcome>>>,
    sync_trigger: Arc<Notify>,
    run: Mutex<Option<RunState>>,
}

impl<C: Classifier> MonitoringDaemon<C> {
    pub fn new(
        classifier: Arc<C>,
        interceptor: Arc<dyn TrafficInterceptor>,
        lifecycle: Arc<ExtensionLifecycleManager>,
        store: Arc<Mutex<RuleStore>>,
        channel: SyncChannel,
        config: DaemonConfig,
    ) -> Self {
        Self {
            classifier,
            interceptor,
            lifecycle,
            store,
            channel,
            config,
            events: Arc::new(Mutex::new(EventLog::default())),
            last_cycle: Arc::new(Mutex::new(None)),
            sync_trigger: Arc::new(Notify::new()),
            run: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.run
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|run| !run.shutdown.is_shutdown())
    }

    pub fn lifecycle(&self) -> &ExtensionLifecycleManager {
        &self.lifecycle
    }

    /// Start monitoring. Verifies the classifier runtime, starts traffic
    /// interception, and opens the command channel, in that order; any
    /// failure aborts startup with nothing left running. Returns the
    /// command sender for the IPC layer.
    pub async fn start(&self) -> Result<mpsc::Sender<DaemonCommand>, HearthError> {
        let shutdown = {
            let mut run = self.run.lock().unwrap();
            // A run stopped via the command channel leaves its workers
            // winding down; only a live one blocks a new start.
            if run.as_ref().is_some_and(|r| r.shutdown.is_shutdown()) {
                *run = None;
            }
            if run.is_some() {
                return Err(HearthError::AlreadyRunning);
            }
            let shutdown = ShutdownSignal::new();
            *run = Some(RunState {
                shutdown: Arc::clone(&shutdown),
                tasks: Vec::new(),
            });
            shutdown
        };

        if let Err(e) = self.classifier.probe().await {
            self.clear_run();
            return Err(match e {
                HearthError::ClassifierUnavailable { .. } => e,
                other => HearthError::ClassifierUnavailable {
                    reason: other.to_string(),
                },
            });
        }

        let (flow_tx, flow_rx) = mpsc::channel(FLOW_BUFFER);
        if let Err(e) = self.interceptor.start(flow_tx) {
            self.clear_run();
            return Err(e);
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

        let eval_task = self.spawn_eval_loop(Arc::clone(&shutdown), flow_rx);
        let sync_task = self.spawn_sync_loop(Arc::clone(&shutdown));
        let command_task = self.spawn_command_loop(Arc::clone(&shutdown), cmd_rx);

        {
            let mut run = self.run.lock().unwrap();
            if let Some(run) = run.as_mut() {
                run.tasks = vec![eval_task, sync_task, command_task];
            }
        }

        log::info!("monitoring daemon started");
        Ok(cmd_tx)
    }

    /// Stop monitoring. Idempotent; waits a bounded time for workers so an
    /// in-flight classifier call cannot wedge shutdown.
    pub async fn stop(&self) {
        let Some(run) = self.run.lock().unwrap().take() else {
            log::debug!("stop requested but the daemon is not running");
            return;
        };
        run.shutdown.shutdown();
        self.interceptor.stop();

        let grace = self.config.classifier_timeout + Duration::from_secs(1);
        for task in run.tasks {
            let abort = task.abort_handle();
            if tokio::time::timeout(grace, task).await.is_err() {
                log::warn!("daemon worker did not stop within {grace:?}, aborting it");
                abort.abort();
            }
        }
        log::info!("monitoring daemon stopped");
    }

    /// Run one two-tier publish cycle immediately.
    pub async fn sync_now(&self) -> CycleOutcome {
        cycle_once(
            &self.store,
            self.classifier.as_ref(),
            &self.channel,
            self.config.classifier_timeout,
            &self.last_cycle,
        )
        .await
    }

    pub fn status(&self) -> DaemonStatus {
        build_status(
            self.is_running(),
            &self.store,
            &self.events,
            &self.last_cycle,
            &self.lifecycle,
        )
    }

    /// Drain events for reporting, marking them processed.
    pub fn take_unprocessed_events(&self) -> Vec<MonitoringEvent> {
        self.events.lock().unwrap().take_unprocessed()
    }

    fn clear_run(&self) {
        self.run.lock().unwrap().take();
    }

    fn spawn_eval_loop(
        &self,
        shutdown: Arc<ShutdownSignal>,
        mut flow_rx: mpsc::Receiver<Flow>,
    ) -> JoinHandle<()> {
        let classifier = Arc::clone(&self.classifier);
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        let timeout = self.config.classifier_timeout;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    stop = shutdown.wait_timeout_or_shutdown(SHUTDOWN_POLL) => {
                        if stop {
                            break;
                        }
                    }
                    flow = flow_rx.recv() => {
                        let Some(flow) = flow else { break };
                        evaluate_flow(classifier.as_ref(), &store, &events, &flow, timeout).await;
                    }
                }
            }
        })
    }

    fn spawn_sync_loop(&self, shutdown: Arc<ShutdownSignal>) -> JoinHandle<()> {
        let classifier = Arc::clone(&self.classifier);
        let store = Arc::clone(&self.store);
        let channel = self.channel.clone();
        let last_cycle = Arc::clone(&self.last_cycle);
        let trigger = Arc::clone(&self.sync_trigger);
        let interval = self.config.sync_interval;
        let timeout = self.config.classifier_timeout;
        tokio::spawn(async move {
            loop {
                cycle_once(&store, classifier.as_ref(), &channel, timeout, &last_cycle).await;

                if shutdown.is_shutdown() {
                    break;
                }
                tokio::select! {
                    _ = trigger.notified() => {}
                    stop = shutdown.wait_timeout_or_shutdown(interval) => {
                        if stop {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn spawn_command_loop(
        &self,
        shutdown: Arc<ShutdownSignal>,
        mut cmd_rx: mpsc::Receiver<DaemonCommand>,
    ) -> JoinHandle<()> {
        let classifier = Arc::clone(&self.classifier);
        let interceptor = Arc::clone(&self.interceptor);
        let lifecycle = Arc::clone(&self.lifecycle);
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        let channel = self.channel.clone();
        let last_cycle = Arc::clone(&self.last_cycle);
        let trigger = Arc::clone(&self.sync_trigger);
        let timeout = self.config.classifier_timeout;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    stop = shutdown.wait_timeout_or_shutdown(SHUTDOWN_POLL) => {
                        if stop {
                            break;
                        }
                    }
                    cmd = cmd_rx.recv() => {
                        let Some(cmd) = cmd else { break };
                        match cmd {
                            DaemonCommand::AddRule { rule, reply } => {
                                let result = store.lock().unwrap().add_rule(rule);
                                if result.is_ok() {
                                    trigger.notify_one();
                                }
                                let _ = reply.send(result);
                            }
                            DaemonCommand::RemoveRule { id, reply } => {
                                let result = store.lock().unwrap().remove_rule(&id);
                                if result.is_ok() {
                                    trigger.notify_one();
                                }
                                let _ = reply.send(result);
                            }
                            DaemonCommand::ListRules { reply } => {
                                let _ = reply.send(store.lock().unwrap().list_rules());
                            }
                            DaemonCommand::Status { reply } => {
                                let status = build_status(
                                    !shutdown.is_shutdown(),
                                    &store,
                                    &events,
                                    &last_cycle,
                                    &lifecycle,
                                );
                                let _ = reply.send(status);
                            }
                            DaemonCommand::SyncNow { reply } => {
                                let outcome = cycle_once(
                                    &store,
                                    classifier.as_ref(),
                                    &channel,
                                    timeout,
                                    &last_cycle,
                                )
                                .await;
                                let _ = reply.send(outcome);
                            }
                            DaemonCommand::Stop => {
                                shutdown.shutdown();
                                interceptor.stop();
                                break;
                            }
                        }
                    }
                }
            }
        })
    }
}

/// One publish cycle: read active rules, run both tiers, record the outcome.
/// A store read failure skips publishing entirely so the previous snapshot
/// stays authoritative.
async fn cycle_once<C>(
    store: &Mutex<RuleStore>,
    classifier: &C,
    channel: &SyncChannel,
    timeout: Duration,
    last_cycle: &Mutex<Option<CycleOutcome>>,
) -> CycleOutcome
where
    C: Classifier + ?Sized,
{
    let rules = store.lock().unwrap().list_active_rules();
    let outcome = match rules {
        Ok(rules) => run_sync_cycle(&rules, classifier, channel, timeout).await,
        Err(e) => {
            log::warn!("sync cycle skipped, rule store unavailable: {e}");
            let reason = format!("rule store unavailable: {e}");
            CycleOutcome {
                enhanced: TierOutcome::Failed {
                    reason: reason.clone(),
                },
                simple: TierOutcome::Failed { reason },
            }
        }
    };
    *last_cycle.lock().unwrap() = Some(outcome.clone());
    outcome
}

/// Evaluate one intercepted flow against the active rules, recording a
/// monitoring event for the strongest match. Classifier trouble degrades
/// to the observer-supplied category tags.
async fn evaluate_flow<C>(
    classifier: &C,
    store: &Mutex<RuleStore>,
    events: &Mutex<EventLog>,
    flow: &Flow,
    timeout: Duration,
) where
    C: Classifier + ?Sized,
{
    let rules = match store.lock().unwrap().list_active_rules() {
        Ok(rules) => rules,
        Err(e) => {
            log::warn!("flow evaluation skipped, rule store unavailable: {e}");
            return;
        }
    };
    if rules.is_empty() {
        return;
    }

    let mut categories = flow.categories.clone();
    if let Some(content) = flow.content.as_deref() {
        match classify_with_timeout(classifier, content, timeout).await {
            Ok(label) if !label.is_generic() => categories.push(label.category),
            Ok(_) => {}
            Err(e) => log::warn!("classifier skipped for this flow: {e}"),
        }
    }

    let matched = rules
        .iter()
        .filter(|rule| rule_applies(rule, &categories, flow.url.as_deref()))
        .max_by_key(|rule| rule.severity);
    if let Some(rule) = matched {
        let id = events.lock().unwrap().record_violation(flow, rule);
        log::info!("flow violates rule {} (event {})", rule.id, id.raw());
    }
}

fn rule_applies(rule: &Rule, categories: &[String], url: Option<&str>) -> bool {
    let url = url.map(str::to_lowercase);
    rule.categories.iter().any(|category| {
        categories
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(category))
            || url
                .as_deref()
                .is_some_and(|u| u.contains(&category.to_lowercase()))
    })
}

fn build_status(
    running: bool,
    store: &Mutex<RuleStore>,
    events: &Mutex<EventLog>,
    last_cycle: &Mutex<Option<CycleOutcome>>,
    lifecycle: &ExtensionLifecycleManager,
) -> DaemonStatus {
    let (rule_count, active_rule_count) = match store.lock().unwrap().list_rules() {
        Ok(rules) => (rules.len(), rules.iter().filter(|r| r.active).count()),
        Err(e) => {
            log::warn!("status: rule store unavailable: {e}");
            (0, 0)
        }
    };
    let events = events.lock().unwrap();
    DaemonStatus {
        running,
        rule_count,
        active_rule_count,
        event_count: events.len(),
        unprocessed_event_count: events.unprocessed_count(),
        last_cycle: last_cycle.lock().unwrap().clone(),
        extension_state: lifecycle.current_state(),
        last_lifecycle_failure: lifecycle.last_failure(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Label, MockClassifier};
    use crate::enforce::{EnforcementPoint, Verdict};
    use crate::lifecycle::MockApprovalTransport;
    use crate::rules::{RuleAction, Severity};
    use crate::sync::RuleSnapshot;
    use std::path::Path;
    use std::time::SystemTime;

    fn social_rule() -> Rule {
        Rule {
            id: RuleId::new("social"),
            description: "block social media".to_string(),
            categories: vec!["social".to_string()],
            actions: vec![RuleAction::Block],
            severity: Severity::High,
            created_at: SystemTime::now(),
            active: true,
        }
    }

    fn healthy_classifier() -> MockClassifier {
        let mut classifier = MockClassifier::new();
        classifier.expect_probe().returning(|| Ok(()));
        classifier
            .expect_classify()
            .returning(|_| Ok(Label::new("social")));
        classifier
    }

    fn idle_interceptor() -> MockTrafficInterceptor {
        let mut interceptor = MockTrafficInterceptor::new();
        interceptor.expect_start().returning(|_| Ok(()));
        interceptor.expect_stop().returning(|| ());
        interceptor
    }

    fn lifecycle() -> Arc<ExtensionLifecycleManager> {
        Arc::new(ExtensionLifecycleManager::new(
            Box::new(MockApprovalTransport::new()),
            "net.hearthguard.filter",
        ))
    }

    fn daemon(
        classifier: MockClassifier,
        interceptor: MockTrafficInterceptor,
        store: RuleStore,
        snapshot_dir: &Path,
    ) -> MonitoringDaemon<MockClassifier> {
        MonitoringDaemon::new(
            Arc::new(classifier),
            Arc::new(interceptor),
            lifecycle(),
            Arc::new(Mutex::new(store)),
            SyncChannel::new(snapshot_dir.join("rules.json")),
            DaemonConfig {
                sync_interval: Duration::from_secs(3600),
                classifier_timeout: Duration::from_millis(500),
            },
        )
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn start_twice_without_stop_fails() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = daemon(
            healthy_classifier(),
            idle_interceptor(),
            RuleStore::in_memory(),
            dir.path(),
        );

        daemon.start().await.unwrap();
        let err = daemon.start().await.unwrap_err();
        assert!(matches!(err, HearthError::AlreadyRunning));

        daemon.stop().await;
        assert!(!daemon.is_running());
    }

    #[tokio::test]
    async fn unreachable_classifier_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut classifier = MockClassifier::new();
        classifier.expect_probe().returning(|| {
            Err(HearthError::ClassifierUnavailable {
                reason: "runtime missing".to_string(),
            })
        });
        let mut interceptor = MockTrafficInterceptor::new();
        interceptor.expect_start().times(0);

        let daemon = daemon(classifier, interceptor, RuleStore::in_memory(), dir.path());
        let err = daemon.start().await.unwrap_err();
        assert!(matches!(err, HearthError::ClassifierUnavailable { .. }));
        assert!(!daemon.is_running());
    }

    #[tokio::test]
    async fn interception_failure_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut interceptor = MockTrafficInterceptor::new();
        interceptor
            .expect_start()
            .returning(|_| Err(HearthError::Io(std::io::Error::other("capture failed"))));

        let daemon = daemon(
            healthy_classifier(),
            interceptor,
            RuleStore::in_memory(),
            dir.path(),
        );
        assert!(daemon.start().await.is_err());
        assert!(!daemon.is_running());
    }

    #[tokio::test]
    async fn startup_publishes_an_initial_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::in_memory();
        store.add_rule(social_rule()).unwrap();

        let daemon = daemon(healthy_classifier(), idle_interceptor(), store, dir.path());
        daemon.start().await.unwrap();

        let path = dir.path().join("rules.json");
        wait_until(|| RuleSnapshot::read(&path).is_some()).await;
        let snapshot = RuleSnapshot::read(&path).unwrap();
        assert_eq!(snapshot.rules.len(), 1);
        assert!(snapshot.rules[0].should_block);

        daemon.stop().await;
    }

    #[tokio::test]
    async fn classifier_timeout_is_not_fatal_to_the_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let mut classifier = MockClassifier::new();
        classifier.expect_probe().returning(|| Ok(()));
        classifier.expect_classify().returning(|_| {
            Err(HearthError::ClassifierTimeout {
                timeout: Duration::from_millis(500),
            })
        });
        let mut store = RuleStore::in_memory();
        store.add_rule(social_rule()).unwrap();

        let daemon = daemon(classifier, idle_interceptor(), store, dir.path());
        daemon.start().await.unwrap();
        let outcome = daemon.sync_now().await;

        assert!(matches!(outcome.enhanced, TierOutcome::Failed { .. }));
        assert_eq!(outcome.simple, TierOutcome::Published { rules: 1 });

        let status = daemon.status();
        assert!(status.running);
        assert!(status.last_cycle.unwrap().snapshot_published());

        daemon.stop().await;
    }

    #[tokio::test]
    async fn intercepted_flow_matching_a_rule_emits_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::in_memory();
        store.add_rule(social_rule()).unwrap();

        let flow_tx: Arc<Mutex<Option<mpsc::Sender<Flow>>>> = Arc::new(Mutex::new(None));
        let mut interceptor = MockTrafficInterceptor::new();
        {
            let flow_tx = Arc::clone(&flow_tx);
            interceptor.expect_start().returning(move |tx| {
                *flow_tx.lock().unwrap() = Some(tx);
                Ok(())
            });
        }
        interceptor.expect_stop().returning(|| ());

        let daemon = daemon(healthy_classifier(), interceptor, store, dir.path());
        daemon.start().await.unwrap();

        let tx = flow_tx.lock().unwrap().clone().unwrap();
        let flow = Flow::web_request("https://chat.example").with_content("endless facebook feed");
        tx.send(flow).await.unwrap();

        wait_until(|| daemon.status().event_count == 1).await;
        let events = daemon.take_unprocessed_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule_violated, Some(RuleId::new("social")));
        assert_eq!(events[0].action_taken, RuleAction::Block);

        daemon.stop().await;
    }

    #[tokio::test]
    async fn non_matching_flow_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::in_memory();
        store.add_rule(social_rule()).unwrap();

        let flow_tx: Arc<Mutex<Option<mpsc::Sender<Flow>>>> = Arc::new(Mutex::new(None));
        let mut interceptor = MockTrafficInterceptor::new();
        {
            let flow_tx = Arc::clone(&flow_tx);
            interceptor.expect_start().returning(move |tx| {
                *flow_tx.lock().unwrap() = Some(tx);
                Ok(())
            });
        }
        interceptor.expect_stop().returning(|| ());

        let mut classifier = MockClassifier::new();
        classifier.expect_probe().returning(|| Ok(()));
        classifier
            .expect_classify()
            .returning(|_| Ok(Label::new("general")));

        let daemon = daemon(classifier, interceptor, store, dir.path());
        daemon.start().await.unwrap();

        let tx = flow_tx.lock().unwrap().clone().unwrap();
        tx.send(Flow::web_request("https://news.example").with_content("weather report"))
            .await
            .unwrap();

        // Give the evaluation loop a moment, then confirm nothing was recorded.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(daemon.status().event_count, 0);

        daemon.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_allows_restart() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = daemon(
            healthy_classifier(),
            idle_interceptor(),
            RuleStore::in_memory(),
            dir.path(),
        );

        daemon.start().await.unwrap();
        daemon.stop().await;
        daemon.stop().await;
        assert!(!daemon.is_running());

        daemon.start().await.unwrap();
        assert!(daemon.is_running());
        daemon.stop().await;
    }

    #[tokio::test]
    async fn command_channel_drives_rules_status_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let daemon = daemon(
            healthy_classifier(),
            idle_interceptor(),
            RuleStore::in_memory(),
            dir.path(),
        );
        let commands = daemon.start().await.unwrap();

        let (reply, rx) = oneshot::channel();
        commands
            .send(DaemonCommand::AddRule {
                rule: social_rule(),
                reply,
            })
            .await
            .unwrap();
        rx.await.unwrap().unwrap();

        let (reply, rx) = oneshot::channel();
        commands
            .send(DaemonCommand::ListRules { reply })
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap().unwrap().len(), 1);

        let (reply, rx) = oneshot::channel();
        commands
            .send(DaemonCommand::SyncNow { reply })
            .await
            .unwrap();
        assert!(rx.await.unwrap().snapshot_published());

        let (reply, rx) = oneshot::channel();
        commands
            .send(DaemonCommand::Status { reply })
            .await
            .unwrap();
        let status = rx.await.unwrap();
        assert!(status.running);
        assert_eq!(status.rule_count, 1);
        assert_eq!(status.extension_state, ExtensionState::NotInstalled);

        commands.send(DaemonCommand::Stop).await.unwrap();
        wait_until(|| !daemon.is_running()).await;
        daemon.stop().await;
    }

    // One active block rule flows from the store through compile+publish to
    // an enforcement-point Block verdict.
    #[tokio::test]
    async fn block_rule_reaches_the_enforcement_point() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RuleStore::in_memory();
        store.add_rule(social_rule()).unwrap();

        let daemon = daemon(healthy_classifier(), idle_interceptor(), store, dir.path());
        daemon.start().await.unwrap();
        let outcome = daemon.sync_now().await;
        assert!(outcome.snapshot_published());

        let point = EnforcementPoint::new(
            dir.path().join("rules.json"),
            Duration::from_secs(3600),
            None,
        );
        let flow = Flow::web_request("https://chat.example")
            .with_categories(vec!["social".to_string()]);
        assert_eq!(point.decide(&flow), Verdict::Block);

        daemon.stop().await;
    }
}
