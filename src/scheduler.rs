use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, error, info, info_span};

use crate::models::{CheckResult, ObservationState};
use crate::navigator::CycleRunner;
use crate::plugins::PluginManager;
use crate::watcher::ValueWatcher;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub successes: u64,
    pub failures: u64,
    pub alerts: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_value: Option<String>,
    pub last_error: Option<String>,
}

/// Runs check cycles back to back on a fixed interval and feeds each
/// outcome through the value watcher.
pub struct CheckScheduler {
    runner: Arc<dyn CycleRunner>,
    notifiers: PluginManager,
    interval: Duration,
    state: ObservationState,
    stats: SchedulerStats,
}

impl CheckScheduler {
    pub fn new(
        runner: Arc<dyn CycleRunner>,
        notifiers: PluginManager,
        interval: Duration,
        expected_value: Option<String>,
    ) -> Self {
        Self {
            runner,
            notifiers,
            interval,
            state: ObservationState::new(expected_value),
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> &ObservationState {
        &self.state
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Run one cycle to completion and apply its outcome.
    pub async fn run_once(&mut self) -> CheckResult {
        self.stats.cycles += 1;
        let span = info_span!("cycle", n = self.stats.cycles);

        async {
            let result = self.runner.run_cycle().await;
            self.stats.last_run = Some(Utc::now());
            self.apply(&result).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn apply(&mut self, result: &CheckResult) {
        match result {
            CheckResult::Success { value } => {
                self.stats.successes += 1;
                self.stats.last_value = Some(value.clone());
                match self.state.last_value.as_deref() {
                    None => info!("Initial value detected: {}", value),
                    Some(previous) if previous != value.as_str() => {
                        info!("VALUE CHANGED! Previous: {} -> Current: {}", previous, value)
                    }
                    Some(_) => info!("No change detected. Current value: {}", value),
                }
            }
            CheckResult::Failure { stage, message } => {
                self.stats.failures += 1;
                self.stats.last_error = Some(format!("{}: {}", stage, message));
                error!("Check failed at {}: {}", stage, message);
            }
        }

        let state = std::mem::take(&mut self.state);
        let (state, alert) = ValueWatcher::observe(result, state);
        self.state = state;

        if let Some(event) = alert {
            self.stats.alerts += 1;
            info!("Alert: {}", event.summary());
            let delivered = self.notifiers.alert_all(&event).await;
            info!("Alert delivered by {} notifier(s)", delivered);
        }
    }

    /// Run the first cycle now, then one per interval. A cycle that overruns
    /// pushes the next tick back; cycles never overlap or burst to catch up.
    /// Returns after `max_cycles` when given, otherwise runs until cancelled.
    pub async fn run(&mut self, max_cycles: Option<u64>) {
        info!(
            "Set up recurring checks every {} minutes",
            self.interval.as_secs_f64() / 60.0
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut completed = 0;
        loop {
            if max_cycles.is_some_and(|max| completed >= max) {
                break;
            }
            ticker.tick().await;
            self.run_once().await;
            completed += 1;
        }

        info!(
            "Scheduler stopped after {} cycles ({} succeeded, {} failed, {} alerts)",
            self.stats.cycles, self.stats.successes, self.stats.failures, self.stats.alerts
        );
    }
}
