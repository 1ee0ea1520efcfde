use std::sync::Mutex;

#[cfg(test)]
use mockall::automock;

use crate::error::HearthError;

/// Lifecycle of the sandboxed enforcement extension, as granted by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionState {
    NotInstalled,
    Installing,
    WaitingForApproval,
    Installed { enabled: bool },
    Uninstalling,
    /// The host will finish the operation on next reboot. Must be
    /// re-verified on the next process start.
    PendingReboot(Operation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Uninstall,
    Enable,
    Disable,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Uninstall => "uninstall",
            Operation::Enable => "enable",
            Operation::Disable => "disable",
        }
    }

    fn terminal_state(self) -> ExtensionState {
        match self {
            Operation::Install | Operation::Enable => ExtensionState::Installed { enabled: true },
            Operation::Disable => ExtensionState::Installed { enabled: false },
            Operation::Uninstall => ExtensionState::NotInstalled,
        }
    }
}

/// Request sent to the host's approval workflow. The sequence number is
/// monotonic per manager; responses carrying any other number are stale
/// and get discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub seq: u64,
    pub extension_id: String,
    pub operation: Operation,
}

/// Asynchronous outcome delivered by the host for a submitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalResponse {
    Completed,
    WillCompleteAfterReboot,
    NeedsUserApproval,
    Failed(String),
}

/// Answer to the host asking what to do with an already-present extension
/// version. Only one enforcement point version may be active, so the answer
/// is always replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementDecision {
    Replace,
}

/// User-visible record of the most recent lifecycle failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleFailure {
    pub operation: Operation,
    pub reason: String,
    /// True when the failure text indicates an authorization problem, so the
    /// UI can steer the user to the host's permission settings.
    pub permission_required: bool,
}

/// Channel through which activation requests reach the host.
#[cfg_attr(test, automock)]
pub trait ApprovalTransport: Send + Sync + 'static {
    /// Hand a request to the host. Must not block on the host's decision;
    /// the outcome arrives later via `handle_response`.
    fn submit(&self, request: ApprovalRequest) -> Result<(), HearthError>;
}

#[derive(Debug)]
struct Inner {
    state: ExtensionState,
    /// State to revert to when the outstanding request fails.
    prior_state: ExtensionState,
    /// Sequence number and operation of the outstanding request, if any.
    pending: Option<(u64, Operation)>,
    next_seq: u64,
    last_failure: Option<LifecycleFailure>,
}

/// State machine for installing and activating the enforcement extension.
///
/// All transitions are driven by explicit requests or by host responses;
/// none are synthesized locally, because the enforcement capability is
/// granted and revoked by the host, not by this process. Mutating
/// operations are non-blocking and safe from any concurrent context.
pub struct ExtensionLifecycleManager {
    transport: Box<dyn ApprovalTransport>,
    extension_id: String,
    inner: Mutex<Inner>,
}

impl ExtensionLifecycleManager {
    pub fn new(transport: Box<dyn ApprovalTransport>, extension_id: impl Into<String>) -> Self {
        Self::with_state(transport, extension_id, ExtensionState::NotInstalled)
    }

    /// Restore a manager from a previously recorded state, e.g. a
    /// pending-reboot outcome carried across a restart.
    pub fn with_state(
        transport: Box<dyn ApprovalTransport>,
        extension_id: impl Into<String>,
        state: ExtensionState,
    ) -> Self {
        Self {
            transport,
            extension_id: extension_id.into(),
            inner: Mutex::new(Inner {
                prior_state: state.clone(),
                state,
                pending: None,
                next_seq: 0,
                last_failure: None,
            }),
        }
    }

    pub fn current_state(&self) -> ExtensionState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn last_failure(&self) -> Option<LifecycleFailure> {
        self.inner.lock().unwrap().last_failure.clone()
    }

    /// Whether the recorded state must be re-verified against the host
    /// (a reboot-deferred operation may or may not have completed).
    pub fn needs_reverification(&self) -> bool {
        matches!(
            self.inner.lock().unwrap().state,
            ExtensionState::PendingReboot(_)
        )
    }

    /// The host asks what to do with an existing extension version.
    pub fn replacement_decision(&self) -> ReplacementDecision {
        ReplacementDecision::Replace
    }

    /// Request installation. No-op when already installed.
    pub fn install(&self) -> Result<ExtensionState, HearthError> {
        self.request(Operation::Install)
    }

    /// Request removal. No-op when not installed.
    pub fn uninstall(&self) -> Result<ExtensionState, HearthError> {
        self.request(Operation::Uninstall)
    }

    pub fn enable(&self) -> Result<ExtensionState, HearthError> {
        self.request(Operation::Enable)
    }

    pub fn disable(&self) -> Result<ExtensionState, HearthError> {
        self.request(Operation::Disable)
    }

    /// Apply a host response. Responses for superseded requests are
    /// discarded; responses are otherwise applied in arrival order.
    pub fn handle_response(&self, seq: u64, response: ApprovalResponse) -> ExtensionState {
        let mut inner = self.inner.lock().unwrap();

        let Some((pending_seq, operation)) = inner.pending else {
            log::debug!("discarding approval response {seq} with no request outstanding");
            return inner.state.clone();
        };
        if pending_seq != seq {
            log::debug!(
                "discarding stale approval response {seq} (current request is {pending_seq})"
            );
            return inner.state.clone();
        }

        match response {
            ApprovalResponse::Completed => {
                inner.state = operation.terminal_state();
                inner.pending = None;
                inner.last_failure = None;
                log::info!("{} completed, extension now {:?}", operation.name(), inner.state);
            }
            ApprovalResponse::WillCompleteAfterReboot => {
                inner.state = ExtensionState::PendingReboot(operation);
                inner.pending = None;
                log::info!("{} deferred until reboot", operation.name());
            }
            ApprovalResponse::NeedsUserApproval => {
                // Request stays outstanding: the host sends a final outcome
                // once the user decides, with no timeout.
                inner.state = ExtensionState::WaitingForApproval;
                log::info!("{} waiting for user approval", operation.name());
            }
            ApprovalResponse::Failed(reason) => {
                inner.state = inner.prior_state.clone();
                inner.pending = None;
                let failure = classify_failure(operation, reason);
                log::warn!(
                    "{} failed: {} (permission required: {})",
                    operation.name(),
                    failure.reason,
                    failure.permission_required
                );
                inner.last_failure = Some(failure);
            }
        }

        inner.state.clone()
    }

    fn request(&self, operation: Operation) -> Result<ExtensionState, HearthError> {
        let mut inner = self.inner.lock().unwrap();

        if is_noop(&inner.state, operation) {
            log::debug!("{} is a no-op in state {:?}", operation.name(), inner.state);
            return Ok(inner.state.clone());
        }

        let prior = inner.state.clone();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.prior_state = prior.clone();
        inner.pending = Some((seq, operation));
        inner.state = match operation {
            Operation::Install => ExtensionState::Installing,
            Operation::Uninstall => ExtensionState::Uninstalling,
            // Enable/disable keep the installed state until the host answers.
            Operation::Enable | Operation::Disable => prior.clone(),
        };

        let request = ApprovalRequest {
            seq,
            extension_id: self.extension_id.clone(),
            operation,
        };
        if let Err(e) = self.transport.submit(request) {
            inner.state = prior;
            inner.pending = None;
            return Err(HearthError::ApprovalSubmit {
                operation: operation.name().to_string(),
                reason: e.to_string(),
            });
        }

        log::info!("submitted {} request {seq}", operation.name());
        Ok(inner.state.clone())
    }
}

/// Requests that would not change anything do not go to the host at all.
fn is_noop(state: &ExtensionState, operation: Operation) -> bool {
    match operation {
        Operation::Install => matches!(state, ExtensionState::Installed { .. }),
        Operation::Uninstall => matches!(state, ExtensionState::NotInstalled),
        Operation::Enable => matches!(state, ExtensionState::Installed { enabled: true }),
        Operation::Disable => matches!(state, ExtensionState::Installed { enabled: false }),
    }
}

fn classify_failure(operation: Operation, reason: String) -> LifecycleFailure {
    let lower = reason.to_lowercase();
    let permission_required = ["permission", "authoriz", "approval", "not permitted"]
        .iter()
        .any(|needle| lower.contains(needle));
    LifecycleFailure {
        operation,
        reason,
        permission_required,
    }
}
