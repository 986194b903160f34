//! Weekly scheduler: runs the generation job once a week at a fixed local time.
//!
//! The loop polls on a fixed interval instead of sleeping until the target time, so a
//! suspended machine or a clock change still fires the job on the next poll.

use std::future::Future;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDateTime, NaiveTime, Weekday};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};

use crate::errors::AppError;

/// How often the loop checks whether the job is due.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    /// First scheduled moment strictly after `now`.
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let days_ahead = (7 + self.weekday.num_days_from_monday() as i64
            - now.weekday().num_days_from_monday() as i64)
            % 7;
        let candidate = (now.date() + chrono::Duration::days(days_ahead)).and_time(self.time);
        if candidate > now {
            candidate
        } else {
            candidate + chrono::Duration::days(7)
        }
    }
}

/// Tracks the next due moment across polls.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    schedule: WeeklySchedule,
    next_run: NaiveDateTime,
}

impl ScheduleState {
    pub fn new(schedule: WeeklySchedule, now: NaiveDateTime) -> Self {
        Self {
            schedule,
            next_run: schedule.next_run_after(now),
        }
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    /// True when the job is due at `now`; the next run is then moved a week ahead.
    /// Several missed runs collapse into one.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next_run {
            return false;
        }
        self.next_run = self.schedule.next_run_after(now);
        true
    }
}

/// Runs `job` every week until Ctrl-C. Job failures are logged and the loop keeps going.
/// Ctrl-C during a running job stops the loop without waiting for the job.
pub async fn run_weekly<F, Fut>(schedule: WeeklySchedule, job: F) -> Result<(), AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
{
    run_until(
        schedule,
        job,
        || Local::now().naive_local(),
        tokio::signal::ctrl_c(),
    )
    .await
}

async fn run_until<F, Fut, C, S>(
    schedule: WeeklySchedule,
    mut job: F,
    now: C,
    shutdown: S,
) -> Result<(), AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), AppError>>,
    C: Fn() -> NaiveDateTime,
    S: Future<Output = std::io::Result<()>>,
{
    let mut state = ScheduleState::new(schedule, now());
    info!(
        "Scheduler started: every {} at {}; next run {}",
        schedule.weekday,
        schedule.time.format("%H:%M"),
        state.next_run()
    );

    let mut ticker = time::interval(POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !state.poll(now()) {
                    continue;
                }
                info!("Scheduled run starting");
                tokio::select! {
                    result = job() => match result {
                        Ok(()) => info!("Scheduled run finished; next run {}", state.next_run()),
                        Err(e) => error!(code = e.code(), "Scheduled run failed: {e}; next run {}", state.next_run()),
                    },
                    signal = &mut shutdown => {
                        signal?;
                        info!("Scheduler stopped during a scheduled run");
                        return Ok(());
                    }
                }
            }
            signal = &mut shutdown => {
                signal?;
                info!("Scheduler stopped");
                return Ok(());
            }
        }
    }
}
