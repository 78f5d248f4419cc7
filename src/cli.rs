use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::dispatch::OverlapPolicy;
use crate::observability::logging::LogFormat;
use crate::proxy::DEFAULT_PROXY_BIN;
use crate::tls::acme_client::DEFAULT_CA_SERVER;

#[derive(Parser, Debug)]
#[command(name = "cert-renewer")]
#[command(about = "Renews IP and domain certificates with acme.sh and reloads the proxy", long_about = None)]
pub struct Cli {
    /// Directory holding config/, web/, logs/ and run/ (default: next to the executable)
    #[arg(long, env = "CERT_RENEWER_BASE_DIR")]
    pub base_dir: Option<PathBuf>,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, env = "CERT_RENEWER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "CERT_RENEWER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Home directory containing .acme.sh (default: $HOME, then /root)
    #[arg(long, env = "CERT_RENEWER_ACME_HOME")]
    pub acme_home: Option<PathBuf>,

    /// Certificate authority passed to acme.sh --server
    #[arg(long, env = "CERT_RENEWER_ACME_SERVER", default_value = DEFAULT_CA_SERVER)]
    pub acme_server: String,

    /// Reverse proxy binary used for `-t` and `-s reload`
    #[arg(long, env = "CERT_RENEWER_PROXY_BIN", default_value = DEFAULT_PROXY_BIN)]
    pub proxy_bin: String,

    /// Kill any external command that runs longer than this
    #[arg(long, env = "CERT_RENEWER_COMMAND_TIMEOUT_SECS", default_value_t = 900)]
    pub command_timeout_secs: u64,

    /// Behaviour when a workflow is triggered while the same kind is running
    #[arg(long, env = "CERT_RENEWER_OVERLAP", value_enum, default_value_t = OverlapPolicy::Allow)]
    pub overlap: OverlapPolicy,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Run the scheduler and control server (default)
    Run,
    /// Write default configuration and the control page, then exit
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["cert-renewer"]);
        assert_eq!(cli.acme_server, "letsencrypt");
        assert_eq!(cli.proxy_bin, "nginx");
        assert_eq!(cli.command_timeout_secs, 900);
        assert_eq!(cli.overlap, OverlapPolicy::Allow);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_skip_if_busy_flag() {
        let cli = Cli::parse_from(["cert-renewer", "--overlap", "skip-if-busy", "init"]);
        assert_eq!(cli.overlap, OverlapPolicy::SkipIfBusy);
        assert_eq!(cli.command, Some(Commands::Init));
    }
}
