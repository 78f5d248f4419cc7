//! Issuance workflows: ensure client, set CA, issue, install, reload proxy.
//!
//! A workflow never returns an error. Each stage runs through
//! [`StepLogger`], and the caller gets a [`RunReport`] describing what
//! happened, or `None` when the workflow is disabled.

pub mod domain;
pub mod ip;

pub use domain::DomainWorkflow;
pub use ip::IpWorkflow;

use anyhow::Context;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::proxy::ProxyReloader;
use crate::runner::CommandRunner;
use crate::step::{StepLogger, StepRecord};
use crate::tls::acme_client::{AcmeClient, IssueRequest};

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    Ip,
    Domain,
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => write!(f, "IP"),
            Self::Domain => write!(f, "domain"),
        }
    }
}

/// Outcome of one workflow run, in step order
#[derive(Debug, Clone)]
pub struct RunReport {
    pub kind: WorkflowKind,
    pub run_id: u64,
    pub started_at: DateTime<Utc>,
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| !s.succeeded())
    }

    pub fn step(&self, name: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Bracketing and step collection for a single run
pub(crate) struct Run {
    logger: StepLogger,
    report: RunReport,
}

impl Run {
    pub(crate) fn begin(kind: WorkflowKind) -> Self {
        let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            "============ [BEGIN] {} certificate issuance run={} ============",
            kind, run_id
        );
        Self {
            logger: StepLogger::new(format!("{}#{}", kind, run_id)),
            report: RunReport {
                kind,
                run_id,
                started_at: Utc::now(),
                steps: Vec::new(),
            },
        }
    }

    pub(crate) fn logger(&self) -> &StepLogger {
        &self.logger
    }

    pub(crate) fn record(&mut self, step: StepRecord) {
        self.report.steps.push(step);
    }

    pub(crate) fn finish(self) -> RunReport {
        let failed = self.report.failures().count();
        info!(
            "============ [END] {} certificate issuance run={} steps={} failed={} ============",
            self.report.kind,
            self.report.run_id,
            self.report.steps.len(),
            failed
        );
        self.report
    }
}

/// External collaborators shared by both workflows
#[derive(Clone)]
pub struct Toolchain {
    runner: Arc<dyn CommandRunner>,
    acme: AcmeClient,
    proxy: ProxyReloader,
}

impl Toolchain {
    pub fn new(runner: Arc<dyn CommandRunner>, acme: AcmeClient, proxy_bin: impl Into<String>) -> Self {
        let proxy = ProxyReloader::new(proxy_bin, Arc::clone(&runner));
        Self { runner, acme, proxy }
    }

    pub fn acme(&self) -> &AcmeClient {
        &self.acme
    }

    /// Install acme.sh unless its script is already present
    pub(crate) async fn ensure_client(&self, run: &mut Run, email: &str) {
        if self.acme.is_installed() {
            info!("acme.sh already installed at {}", self.acme.script_path().display());
            return;
        }
        let runner = Arc::clone(&self.runner);
        let cmd = self.acme.install_command(email);
        let record = run
            .logger()
            .run_step("install acme client", async move { runner.run(&cmd).await })
            .await;
        run.record(record);
    }

    pub(crate) async fn set_default_ca(&self, run: &mut Run) {
        let runner = Arc::clone(&self.runner);
        let cmd = self.acme.set_default_ca_command();
        let record = run
            .logger()
            .run_step("set default ca", async move { runner.run(&cmd).await })
            .await;
        run.record(record);
    }

    pub(crate) async fn issue(&self, run: &mut Run, req: IssueRequest<'_>) {
        let runner = Arc::clone(&self.runner);
        let cmd = self.acme.issue_command(&req);
        let record = run
            .logger()
            .run_step(format!("issue {}", req.identity), async move { runner.run(&cmd).await })
            .await;
        run.record(record);
    }

    /// Create `dir` if needed and install the key and full chain for `identity` into it
    pub(crate) async fn install(&self, run: &mut Run, identity: &str, dir: &str) {
        let runner = Arc::clone(&self.runner);
        let target = PathBuf::from(dir);
        let cmd = self.acme.install_cert_command(identity, &target);
        let record = run
            .logger()
            .run_step(format!("install {} -> {}", identity, dir), async move {
                tokio::fs::create_dir_all(&target)
                    .await
                    .with_context(|| format!("failed to create {}", target.display()))?;
                runner.run(&cmd).await?;
                Ok::<(), anyhow::Error>(())
            })
            .await;
        run.record(record);
    }

    pub(crate) async fn reload_proxy(&self, run: &mut Run) {
        let proxy = self.proxy.clone();
        let record = run
            .logger()
            .run_step("reload proxy", async move { proxy.test_and_reload().await })
            .await;
        run.record(record);
    }
}
