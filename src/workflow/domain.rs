use crate::config::DomainCertConfig;
use crate::tls::acme_client::IssueRequest;

use super::{Run, RunReport, Toolchain, WorkflowKind};

/// One certificate per configured domain, each with its own install directory
#[derive(Clone)]
pub struct DomainWorkflow {
    tools: Toolchain,
}

impl DomainWorkflow {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }

    /// Domains are processed in order; a failure on one never skips the rest.
    pub async fn run(&self, cfg: &DomainCertConfig) -> Option<RunReport> {
        if !cfg.enabled {
            return None;
        }

        let mut run = Run::begin(WorkflowKind::Domain);
        self.tools.ensure_client(&mut run, &cfg.contact_email).await;
        self.tools.set_default_ca(&mut run).await;

        for entry in &cfg.domains {
            self.tools
                .issue(
                    &mut run,
                    IssueRequest {
                        identity: &entry.domain_name,
                        webroot: &entry.webroot,
                        validity_days: cfg.validity_days,
                        short_lived: false,
                    },
                )
                .await;
            self.tools
                .install(&mut run, &entry.domain_name, &entry.install_path)
                .await;
        }

        self.tools.reload_proxy(&mut run).await;
        Some(run.finish())
    }
}
