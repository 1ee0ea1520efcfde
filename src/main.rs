use std::sync::{Arc, Mutex};

use clap::Parser;
use hearthguard::{
    classify::KeywordClassifier,
    cli::{Args, SettingsLoader},
    daemon::{DaemonCommand, MonitoringDaemon, TrafficInterceptor},
    enforce::Flow,
    error::HearthError,
    lifecycle::{ApprovalRequest, ApprovalTransport, ExtensionLifecycleManager},
    rules::RuleStore,
    sync::SyncChannel,
};
use tokio::sync::mpsc;

/// Stable identifier the host uses to track our enforcement extension.
const EXTENSION_ID: &str = "net.hearthguard.filter";

/// Approval transport placeholder until the host integration is wired in.
/// Requests are logged; responses arrive through the host adapter, never
/// synthesized here.
struct LoggedApproval;

impl ApprovalTransport for LoggedApproval {
    fn submit(&self, request: ApprovalRequest) -> Result<(), HearthError> {
        log::info!(
            "approval request {} for {}: {:?}",
            request.seq,
            request.extension_id,
            request.operation
        );
        Ok(())
    }
}

/// Interception placeholder: the platform capture integration feeds flows
/// into the channel it receives here.
struct UnwiredInterceptor;

impl TrafficInterceptor for UnwiredInterceptor {
    fn start(&self, _flows: mpsc::Sender<Flow>) -> Result<(), HearthError> {
        log::warn!("no traffic capture integration wired in, monitoring events will be empty");
        Ok(())
    }

    fn stop(&self) {}
}

#[tokio::main]
async fn main() -> Result<(), HearthError> {
    env_logger::init();

    let args = Args::parse();
    let settings = SettingsLoader::load(&args)?;

    let classifier = Arc::new(KeywordClassifier::new(settings.lexicon.clone()));
    let store = Arc::new(Mutex::new(RuleStore::open(&settings.rules_path)?));
    let channel = SyncChannel::new(&settings.snapshot_path);
    let lifecycle = Arc::new(ExtensionLifecycleManager::new(
        Box::new(LoggedApproval),
        EXTENSION_ID,
    ));
    if lifecycle.needs_reverification() {
        log::info!("extension state is pending a reboot outcome, re-verification required");
    }

    let daemon = MonitoringDaemon::new(
        classifier,
        Arc::new(UnwiredInterceptor),
        lifecycle,
        store,
        channel,
        settings.daemon.clone(),
    );

    let commands = daemon.start().await?;
    log::info!(
        "hearthguard monitoring {} rules, publishing to {}",
        daemon.status().rule_count,
        settings.snapshot_path.display()
    );

    tokio::signal::ctrl_c().await?;
    log::info!("shutting down");
    let _ = commands.send(DaemonCommand::Stop).await;
    daemon.stop().await;
    Ok(())
}
