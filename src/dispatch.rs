//! Fire-and-forget launching of issuance workflows

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::state::ConfigStore;
use crate::workflow::{DomainWorkflow, IpWorkflow, RunReport, Toolchain, WorkflowKind};

/// What to do when a workflow is launched while the same kind is still running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OverlapPolicy {
    /// Start another run regardless. Two runs may then drive acme.sh for the
    /// same identity at once.
    #[default]
    Allow,
    /// Skip the launch if a run of the same kind is in flight
    SkipIfBusy,
}

#[derive(Debug)]
pub enum Launch {
    Started(JoinHandle<Option<RunReport>>),
    Skipped,
}

impl Launch {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Wait for the run; `None` when skipped, disabled or aborted by a panic
    pub async fn wait(self) -> Option<RunReport> {
        match self {
            Self::Started(handle) => handle.await.ok().flatten(),
            Self::Skipped => None,
        }
    }
}

/// Starts workflows against a configuration snapshot taken at launch time
#[derive(Clone)]
pub struct Dispatcher {
    store: ConfigStore,
    ip: IpWorkflow,
    domain: DomainWorkflow,
    policy: OverlapPolicy,
    ip_busy: Arc<Mutex<()>>,
    domain_busy: Arc<Mutex<()>>,
}

impl Dispatcher {
    pub fn new(store: ConfigStore, tools: Toolchain, policy: OverlapPolicy) -> Self {
        Self {
            store,
            ip: IpWorkflow::new(tools.clone()),
            domain: DomainWorkflow::new(tools),
            policy,
            ip_busy: Arc::new(Mutex::new(())),
            domain_busy: Arc::new(Mutex::new(())),
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Spawn a run of `kind` without waiting for it
    pub async fn launch(&self, kind: WorkflowKind) -> Launch {
        let busy = match kind {
            WorkflowKind::Ip => Arc::clone(&self.ip_busy),
            WorkflowKind::Domain => Arc::clone(&self.domain_busy),
        };
        let guard = match self.policy {
            OverlapPolicy::Allow => None,
            OverlapPolicy::SkipIfBusy => match busy.try_lock_owned() {
                Ok(guard) => Some(guard),
                Err(_) => {
                    warn!("{} issuance already running, skipping this launch", kind);
                    return Launch::Skipped;
                }
            },
        };

        let run = match kind {
            WorkflowKind::Ip => {
                let cfg = self.store.ip().await;
                let wf = self.ip.clone();
                tokio::spawn(async move { wf.run(&cfg).await })
            }
            WorkflowKind::Domain => {
                let cfg = self.store.domain().await;
                let wf = self.domain.clone();
                tokio::spawn(async move { wf.run(&cfg).await })
            }
        };

        info!("{} issuance launched", kind);
        Launch::Started(tokio::spawn(async move {
            let _guard = guard;
            match run.await {
                Ok(report) => report,
                Err(e) => {
                    error!("[{} PANIC] issuance aborted: {}", kind, e);
                    None
                }
            }
        }))
    }
}
