//! Failure isolation for workflow steps

use std::any::Any;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(String),
    Panicked(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub outcome: StepOutcome,
    pub elapsed: Duration,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Wraps each unit of work with start/finish log lines and a panic boundary.
///
/// The unit runs on its own tokio task, so a panic inside it surfaces as a
/// `JoinError` here instead of unwinding through the workflow.
#[derive(Debug, Clone, Default)]
pub struct StepLogger {
    scope: String,
}

impl StepLogger {
    pub fn new(scope: impl Into<String>) -> Self {
        Self { scope: scope.into() }
    }

    pub async fn run_step<F, E>(&self, name: impl Into<String>, step: F) -> StepRecord
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let name = name.into();
        let started = Instant::now();
        info!(scope = %self.scope, "[START] ==>> {}", name);

        let outcome = match tokio::spawn(step).await {
            Ok(Ok(())) => StepOutcome::Succeeded,
            Ok(Err(e)) => StepOutcome::Failed(format!("{:#}", e.into())),
            Err(join_err) => match join_err.try_into_panic() {
                Ok(payload) => StepOutcome::Panicked(panic_message(payload.as_ref())),
                Err(join_err) => StepOutcome::Failed(join_err.to_string()),
            },
        };

        let elapsed = started.elapsed();
        match &outcome {
            StepOutcome::Succeeded => {
                info!(scope = %self.scope, "[OK] ==>> {} succeeded ({:?})", name, elapsed);
            }
            StepOutcome::Failed(cause) => {
                error!(scope = %self.scope, "[FAILED] ==>> {} failed ({:?}): {}", name, elapsed, cause);
            }
            StepOutcome::Panicked(cause) => {
                error!(scope = %self.scope, "[PANIC] ==>> {} panicked ({:?}): {}", name, elapsed, cause);
            }
        }

        StepRecord {
            name,
            outcome,
            elapsed,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
