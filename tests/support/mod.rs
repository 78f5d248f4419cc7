//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use cert_renewer::config::{DomainCertConfig, DomainEntry, IpCertConfig};
use cert_renewer::dispatch::{Dispatcher, OverlapPolicy};
use cert_renewer::error::{ExecutionCause, ExecutionError};
use cert_renewer::runner::{CommandRunner, CommandSpec};
use cert_renewer::state::{ConfigStore, Layout};
use cert_renewer::tls::AcmeClient;
use cert_renewer::workflow::Toolchain;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Predicate = Box<dyn Fn(&CommandSpec) -> bool + Send + Sync>;

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

/// CommandRunner that records every invocation and fails or panics on
/// commands matching the configured predicates.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_when: Vec<Predicate>,
    panic_when: Vec<Predicate>,
    delay: Option<Duration>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_when(mut self, pred: impl Fn(&CommandSpec) -> bool + Send + Sync + 'static) -> Self {
        self.fail_when.push(Box::new(pred));
        self
    }

    pub fn panic_when(mut self, pred: impl Fn(&CommandSpec) -> bool + Send + Sync + 'static) -> Self {
        self.panic_when.push(Box::new(pred));
        self
    }

    /// Make every command take `delay` before completing
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn rendered_calls(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.to_string()).collect()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandSpec) -> Result<(), ExecutionError> {
        self.calls.lock().unwrap().push(command.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_when.iter().any(|p| p(command)) {
            panic!("scripted panic for `{}`", command);
        }
        if self.fail_when.iter().any(|p| p(command)) {
            return Err(ExecutionError {
                command: command.to_string(),
                cause: ExecutionCause::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "scripted failure",
                )),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub dir: TempDir,
    pub store: ConfigStore,
    pub runner: Arc<ScriptedRunner>,
    pub tools: Toolchain,
}

impl Harness {
    /// Base dir with default documents and an already-installed acme.sh
    pub fn new(runner: ScriptedRunner) -> Self {
        let harness = Self::without_acme(runner);
        let script = harness.tools.acme().script_path();
        std::fs::create_dir_all(script.parent().unwrap()).unwrap();
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        harness
    }

    /// Base dir whose acme home has no client installed yet
    pub fn without_acme(runner: ScriptedRunner) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(Layout::new(dir.path().join("base"))).unwrap();
        let runner = Arc::new(runner);
        let acme = AcmeClient::new(dir.path().join("home"), "letsencrypt");
        let tools = Toolchain::new(runner.clone(), acme, "nginx");
        Self {
            dir,
            store,
            runner,
            tools,
        }
    }

    pub fn dispatcher(&self, policy: OverlapPolicy) -> Dispatcher {
        Dispatcher::new(self.store.clone(), self.tools.clone(), policy)
    }

    /// Absolute path inside the temporary directory
    pub fn path(&self, rel: &str) -> String {
        self.dir.path().join(rel).display().to_string()
    }

    pub fn ip_config(&self, targets: &[&str]) -> IpCertConfig {
        IpCertConfig {
            enabled: true,
            ip_addr: "203.0.113.5".to_string(),
            webroot: self.path("www/ip"),
            contact_email: "ops@example.com".to_string(),
            validity_days: 3,
            install_targets: targets.iter().map(|t| self.path(t)).collect(),
        }
    }

    pub fn domain_config(&self, domains: &[&str]) -> DomainCertConfig {
        DomainCertConfig {
            enabled: true,
            contact_email: "ops@example.com".to_string(),
            validity_days: 60,
            domains: domains
                .iter()
                .map(|d| DomainEntry {
                    domain_name: d.to_string(),
                    webroot: self.path(&format!("www/{}", d)),
                    install_path: self.path(&format!("certs/{}", d)),
                })
                .collect(),
        }
    }
}

pub fn key_file(dir: &str) -> String {
    PathBuf::from(dir).join("privkey.pem").display().to_string()
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

/// In-memory log sink for a thread-local tracing subscriber
#[derive(Clone, Default)]
pub struct SharedLog(Arc<Mutex<Vec<u8>>>);

impl SharedLog {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SharedLog {
    type Writer = SharedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture logs emitted on the current thread until the guard drops
pub fn capture_logs() -> (SharedLog, tracing::subscriber::DefaultGuard) {
    let log = SharedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(log.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (log, guard)
}
