//! Command lines for the external acme.sh client

use std::path::{Path, PathBuf};

use crate::runner::CommandSpec;

/// Home used when `$HOME` is unset
pub const FALLBACK_HOME: &str = "/root";

/// Certificate authority used when none is configured
pub const DEFAULT_CA_SERVER: &str = "letsencrypt";

const INSTALL_SCRIPT_URL: &str = "https://get.acme.sh";

/// Parameters for a single `--issue` call
#[derive(Debug, Clone)]
pub struct IssueRequest<'a> {
    /// IP address or domain name the certificate is for
    pub identity: &'a str,
    /// Directory served over HTTP for webroot validation
    pub webroot: &'a str,
    pub validity_days: u32,
    /// Request the short-lived profile (required for IP certificates)
    pub short_lived: bool,
}

/// Builds invocations of acme.sh installed under `<home>/.acme.sh`
#[derive(Debug, Clone)]
pub struct AcmeClient {
    home: PathBuf,
    server: String,
}

impl AcmeClient {
    pub fn new(home: impl Into<PathBuf>, server: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            server: server.into(),
        }
    }

    /// Resolve home from `$HOME`, falling back to [`FALLBACK_HOME`]
    pub fn from_env(server: impl Into<String>) -> Self {
        Self::new(resolve_home(std::env::var_os("HOME")), server)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn script_path(&self) -> PathBuf {
        self.home.join(".acme.sh").join("acme.sh")
    }

    /// The installation marker is the client script itself
    pub fn is_installed(&self) -> bool {
        self.script_path().is_file()
    }

    pub fn install_command(&self, email: &str) -> CommandSpec {
        let script = format!("curl {} | sh -s email={}", INSTALL_SCRIPT_URL, email);
        self.with_home(CommandSpec::new("sh").args(["-c".to_string(), script]))
    }

    pub fn set_default_ca_command(&self) -> CommandSpec {
        self.client()
            .args(["--set-default-ca", "--server", self.server.as_str()])
    }

    pub fn issue_command(&self, req: &IssueRequest<'_>) -> CommandSpec {
        let mut cmd = self.client().args(["--issue", "--server", self.server.as_str()]);
        if req.short_lived {
            cmd = cmd.args(["--certificate-profile", "shortlived"]);
        }
        cmd.arg("--days")
            .arg(req.validity_days.to_string())
            .args(["-d", req.identity, "-w", req.webroot])
    }

    /// Copy the current key and full chain for `identity` into `dir`
    pub fn install_cert_command(&self, identity: &str, dir: &Path) -> CommandSpec {
        self.client()
            .args(["--install-cert", "-d", identity])
            .arg("--key-file")
            .arg(dir.join("privkey.pem").display().to_string())
            .arg("--fullchain-file")
            .arg(dir.join("fullchain.pem").display().to_string())
    }

    fn client(&self) -> CommandSpec {
        self.with_home(CommandSpec::new(self.script_path().display().to_string()))
    }

    fn with_home(&self, cmd: CommandSpec) -> CommandSpec {
        cmd.env("HOME", self.home.display().to_string())
    }
}

fn resolve_home(var: Option<std::ffi::OsString>) -> PathBuf {
    match var {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => PathBuf::from(FALLBACK_HOME),
    }
}
