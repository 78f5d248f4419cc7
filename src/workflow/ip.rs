use crate::config::IpCertConfig;
use crate::tls::acme_client::IssueRequest;

use super::{Run, RunReport, Toolchain, WorkflowKind};

/// One certificate for a bare IP address, installed to every configured target
#[derive(Clone)]
pub struct IpWorkflow {
    tools: Toolchain,
}

impl IpWorkflow {
    pub fn new(tools: Toolchain) -> Self {
        Self { tools }
    }

    /// Run against a configuration snapshot. Disabled configs do nothing at all.
    pub async fn run(&self, cfg: &IpCertConfig) -> Option<RunReport> {
        if !cfg.enabled {
            return None;
        }

        let mut run = Run::begin(WorkflowKind::Ip);
        self.tools.ensure_client(&mut run, &cfg.contact_email).await;
        self.tools.set_default_ca(&mut run).await;

        // Installs proceed even if issuance failed: existing material is reinstalled.
        self.tools
            .issue(
                &mut run,
                IssueRequest {
                    identity: &cfg.ip_addr,
                    webroot: &cfg.webroot,
                    validity_days: cfg.validity_days,
                    short_lived: true,
                },
            )
            .await;

        for target in &cfg.install_targets {
            self.tools.install(&mut run, &cfg.ip_addr, target).await;
        }

        self.tools.reload_proxy(&mut run).await;
        Some(run.finish())
    }
}
