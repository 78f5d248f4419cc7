//! External process execution
//!
//! Every call into the ACME client or the reverse proxy goes through a
//! [`CommandRunner`]. The production runner captures the child's output and
//! forwards it to the log one whole line at a time.

use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{ExecutionCause, ExecutionError};

/// Program, arguments and extra environment for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<(), ExecutionError>;
}

/// Runs commands on the host with a per-process timeout
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(15 * 60))
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<(), ExecutionError> {
        let rendered = command.to_string();
        let fail = |cause| ExecutionError {
            command: rendered.clone(),
            cause,
        };

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Spawning `{}`", rendered);
        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|e| fail(ExecutionCause::Spawn(e)))?;

        let readers = [
            tokio::spawn(forward_lines(command.program.clone(), child.stdout.take())),
            tokio::spawn(forward_lines(command.program.clone(), child.stderr.take())),
        ];

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill `{}`: {}", rendered, e);
                }
                drain(readers).await;
                warn!("`{}` exceeded {:?}, killed", rendered, self.timeout);
                return Err(fail(ExecutionCause::Timeout(self.timeout)));
            }
        };
        drain(readers).await;
        let status = status.map_err(|e| fail(ExecutionCause::Io(e)))?;

        debug!("`{}` finished in {:?} with {}", rendered, started.elapsed(), status);
        if status.success() {
            Ok(())
        } else {
            Err(fail(ExecutionCause::ExitStatus(status)))
        }
    }
}

/// Upper bound on waiting for a reader after the child is gone. A grandchild
/// that inherited the pipe can keep it open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

async fn drain(readers: [JoinHandle<()>; 2]) {
    for mut reader in readers {
        if tokio::time::timeout(DRAIN_GRACE, &mut reader).await.is_err() {
            reader.abort();
        }
    }
}

/// Emit each line of `stream` as it arrives, so output survives a kill
async fn forward_lines<R>(program: String, stream: Option<R>)
where
    R: AsyncRead + Unpin,
{
    let Some(stream) = stream else {
        return;
    };
    let mut segments = BufReader::new(stream).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                let line = String::from_utf8_lossy(&bytes);
                let line = line.trim_end();
                if !line.is_empty() {
                    info!(target: "process", program = %program, "{}", line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Output of `{}` unreadable: {}", program, e);
                break;
            }
        }
    }
}
