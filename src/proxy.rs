use std::sync::Arc;
use tracing::warn;

use crate::error::ExecutionError;
use crate::runner::{CommandRunner, CommandSpec};

pub const DEFAULT_PROXY_BIN: &str = "nginx";

/// Tests and reloads the reverse proxy so it picks up installed certificates
#[derive(Clone)]
pub struct ProxyReloader {
    binary: String,
    runner: Arc<dyn CommandRunner>,
}

impl ProxyReloader {
    pub fn new(binary: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    pub fn test_command(&self) -> CommandSpec {
        CommandSpec::new(&self.binary).arg("-t")
    }

    pub fn reload_command(&self) -> CommandSpec {
        CommandSpec::new(&self.binary).args(["-s", "reload"])
    }

    /// Validate the proxy configuration, then reload. A failed test skips the reload.
    pub async fn test_and_reload(&self) -> Result<(), ExecutionError> {
        if let Err(e) = self.runner.run(&self.test_command()).await {
            warn!("Proxy configuration test failed, not reloading");
            return Err(e);
        }
        self.runner.run(&self.reload_command()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionCause;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_test: bool,
    }

    #[async_trait]
    impl CommandRunner for Recorder {
        async fn run(&self, command: &CommandSpec) -> Result<(), ExecutionError> {
            self.seen.lock().unwrap().push(command.to_string());
            if self.fail_test && command.has_arg("-t") {
                return Err(ExecutionError {
                    command: command.to_string(),
                    cause: ExecutionCause::Timeout(std::time::Duration::from_secs(1)),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_reload_runs_test_first() {
        let runner = Arc::new(Recorder::default());
        let proxy = ProxyReloader::new(DEFAULT_PROXY_BIN, runner.clone());
        proxy.test_and_reload().await.unwrap();
        assert_eq!(*runner.seen.lock().unwrap(), vec!["nginx -t", "nginx -s reload"]);
    }

    #[tokio::test]
    async fn test_failed_config_test_skips_reload() {
        let runner = Arc::new(Recorder {
            fail_test: true,
            ..Recorder::default()
        });
        let proxy = ProxyReloader::new("openresty", runner.clone());
        assert!(proxy.test_and_reload().await.is_err());
        assert_eq!(*runner.seen.lock().unwrap(), vec!["openresty -t"]);
    }
}
