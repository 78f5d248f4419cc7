//! Periodic certificate renewal

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::config::MAX_RENEWAL_INTERVAL_HOURS;
use crate::dispatch::{Dispatcher, Launch};
use crate::workflow::WorkflowKind;

/// Recurring trigger for both issuance workflows.
///
/// The period is fixed when the scheduler is built; later edits to
/// `cron_hours` apply after a restart.
pub struct RenewalScheduler {
    dispatcher: Dispatcher,
    period: Duration,
}

impl RenewalScheduler {
    pub fn new(dispatcher: Dispatcher, period: Duration) -> Self {
        Self {
            dispatcher,
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// Hours are clamped to `1..=MAX_RENEWAL_INTERVAL_HOURS`
    pub fn from_hours(dispatcher: Dispatcher, hours: u64) -> Self {
        let hours = hours.clamp(1, MAX_RENEWAL_INTERVAL_HOURS);
        Self::new(dispatcher, Duration::from_secs(hours.saturating_mul(60 * 60)))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick forever. The first, immediate tick of the interval is skipped.
    pub async fn start(&self) {
        info!("Starting renewal scheduler (period: {:?})", self.period);

        let mut timer = interval(self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await;

        loop {
            timer.tick().await;
            self.tick().await;
        }
    }

    /// Launch both workflows without waiting for either
    pub async fn tick(&self) -> (Launch, Launch) {
        info!("+++++++++++++++ scheduled renewal triggered +++++++++++++++");
        let ip = self.dispatcher.launch(WorkflowKind::Ip).await;
        let domain = self.dispatcher.launch(WorkflowKind::Domain).await;
        (ip, domain)
    }
}
