use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::api::{server, ControlState};
use crate::cli::{Cli, Commands};
use crate::dispatch::Dispatcher;
use crate::instance::{InstanceLock, LOCK_FILE_NAME};
use crate::netinfo;
use crate::observability::logging::{init_logging, install_panic_hook, LoggingConfig};
use crate::runner::SystemRunner;
use crate::state::{ConfigStore, Layout};
use crate::tls::{AcmeClient, RenewalScheduler};
use crate::workflow::Toolchain;

const TAKEOVER_WAIT: Duration = Duration::from_secs(10);

pub async fn run(cli: Cli) -> Result<()> {
    let layout = Layout::new(resolve_base_dir(cli.base_dir.clone())?);

    if cli.command == Some(Commands::Init) {
        layout.ensure().context("failed to prepare base directory")?;
        println!("Configuration written to {}", layout.config_dir().display());
        return Ok(());
    }

    let _log_guard = init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        format: cli.log_format,
        log_dir: layout.log_dir(),
    })?;
    install_panic_hook();

    std::fs::create_dir_all(layout.run_dir())
        .with_context(|| format!("failed to create {}", layout.run_dir().display()))?;
    let _instance = InstanceLock::acquire(&layout.run_dir().join(LOCK_FILE_NAME), TAKEOVER_WAIT)
        .await
        .context("another instance is still running")?;

    let store = ConfigStore::open(layout.clone()).context("failed to load configuration")?;
    let system = store.system().await;

    let acme = match &cli.acme_home {
        Some(home) => AcmeClient::new(home, cli.acme_server.clone()),
        None => AcmeClient::from_env(cli.acme_server.clone()),
    };
    info!("Using acme.sh at {}", acme.script_path().display());

    let runner = Arc::new(SystemRunner::new(Duration::from_secs(cli.command_timeout_secs)));
    let tools = Toolchain::new(runner, acme, cli.proxy_bin.clone());
    let dispatcher = Dispatcher::new(store, tools, cli.overlap);

    let scheduler = RenewalScheduler::from_hours(dispatcher.clone(), system.renewal_interval_hours);
    tokio::spawn(async move { scheduler.start().await });

    let (addr, app) = server::create_api_server(&system.listen_addr, ControlState::new(dispatcher))?;

    println!("Configuration: {}", layout.config_dir().display());
    println!(
        "Administration: http://{}:{}",
        netinfo::public_ip_or_loopback().await,
        addr.port()
    );

    let mut server_task = tokio::spawn(async move { server::run_api_server(addr, app).await });
    let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => info!("Control server stopped"),
                Ok(Err(e)) => {
                    error!("Control server error: {:#}", e);
                    return Err(e);
                }
                Err(e) => return Err(e).context("control server task failed"),
            }
        }
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down..."),
        _ = terminate.recv() => info!("Received SIGTERM, shutting down..."),
    }

    Ok(())
}

fn resolve_base_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    let exe = std::env::current_exe().context("failed to locate executable")?;
    exe.parent()
        .map(PathBuf::from)
        .context("executable has no parent directory")
}
