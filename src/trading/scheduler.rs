//! Daily scheduler: at most one rebalance per UTC calendar day.
//!
//! A timer ticks roughly once a minute. On each tick the scheduler runs the
//! orchestrator if today has not been triggered yet and the current UTC time
//! has reached the configured hour:minute. A failed rebalance still counts as
//! today's trigger; the next attempt happens tomorrow.
//!
//! The last-triggered date lives only in memory. On startup, if today's
//! target time has already passed, today is marked as triggered without
//! running, so a restart after the window does not cause a surprise trade.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::models::TradeRecord;
use crate::notify::{publish, TradeSink};

use super::RebalanceOrchestrator;

/// Default interval between trigger checks.
pub const DEFAULT_TICK: Duration = Duration::from_secs(60);

/// Daily trigger time in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub hour: u32,
    pub minute: u32,
}

impl Schedule {
    /// Parse a five-field cron expression of the form `M H * * *`.
    pub fn parse(expr: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Schedule {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(invalid("expected 5 fields"));
        }
        if fields[2..].iter().any(|f| *f != "*") {
            return Err(invalid("day-of-month, month and day-of-week must be '*'"));
        }

        let minute: u32 = fields[0]
            .parse()
            .map_err(|_| invalid("minute must be a number"))?;
        let hour: u32 = fields[1]
            .parse()
            .map_err(|_| invalid("hour must be a number"))?;

        if minute > 59 {
            return Err(invalid("minute must be 0-59"));
        }
        if hour > 23 {
            return Err(invalid("hour must be 0-23"));
        }

        Ok(Self { hour, minute })
    }

    /// Whether `now` is at or past today's trigger minute.
    pub fn reached(&self, now: DateTime<Utc>) -> bool {
        (now.hour(), now.minute()) >= (self.hour, self.minute)
    }

    /// Whether `now` is strictly after today's trigger minute.
    pub fn passed(&self, now: DateTime<Utc>) -> bool {
        (now.hour(), now.minute()) > (self.hour, self.minute)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02} UTC", self.hour, self.minute)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Per-process scheduler state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerState {
    /// Last UTC date on which a rebalance was triggered
    pub last_triggered: Option<NaiveDate>,
}

impl SchedulerState {
    /// Whether a rebalance should be triggered at `now`.
    pub fn is_due(&self, schedule: &Schedule, now: DateTime<Utc>) -> bool {
        self.last_triggered != Some(now.date_naive()) && schedule.reached(now)
    }

    pub fn mark(&mut self, date: NaiveDate) {
        self.last_triggered = Some(date);
    }
}

/// Drives the orchestrator once per day.
pub struct Scheduler<C: Clock = SystemClock> {
    schedule: Schedule,
    clock: C,
    state: SchedulerState,
    tick_interval: Duration,
}

impl<C: Clock> Scheduler<C> {
    /// Create a scheduler and apply the startup catch-up rule.
    pub fn new(schedule: Schedule, clock: C) -> Self {
        let mut scheduler = Self {
            schedule,
            clock,
            state: SchedulerState::default(),
            tick_interval: DEFAULT_TICK,
        };
        scheduler.catch_up();
        scheduler
    }

    fn catch_up(&mut self) {
        let now = self.clock.now();
        if self.schedule.passed(now) {
            let today = now.date_naive();
            self.state.mark(today);
            info!(
                schedule = %self.schedule,
                date = %today,
                "Started after today's rebalance time, next run is tomorrow"
            );
        } else {
            info!(schedule = %self.schedule, "Next rebalance is today");
        }
    }

    /// Check the trigger and run the orchestrator if due.
    ///
    /// Returns the record when a rebalance ran on this tick.
    pub async fn tick(
        &mut self,
        orchestrator: &RebalanceOrchestrator,
        sinks: &[Arc<dyn TradeSink>],
    ) -> Option<TradeRecord> {
        let now = self.clock.now();
        if !self.state.is_due(&self.schedule, now) {
            debug!(now = %now, "Not due");
            return None;
        }

        info!(date = %now.date_naive(), schedule = %self.schedule, "Daily rebalance triggered");

        let record = orchestrator.rebalance().await;
        self.state.mark(now.date_naive());

        if !record.success() {
            warn!(
                error = record.error().unwrap_or_default(),
                "Rebalance failed, next attempt at tomorrow's schedule"
            );
        }

        publish(&record, sinks).await;
        Some(record)
    }

    /// Tick until `shutdown` resolves.
    pub async fn run<F>(
        &mut self,
        orchestrator: &RebalanceOrchestrator,
        sinks: &[Arc<dyn TradeSink>],
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        info!(
            instrument = %orchestrator.instrument(),
            schedule = %self.schedule,
            tick_secs = self.tick_interval.as_secs(),
            "Scheduler started"
        );

        tokio::pin!(shutdown);
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick(orchestrator, sinks).await;
                }
            }
        }
    }
}
