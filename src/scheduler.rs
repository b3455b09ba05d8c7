use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use tokio::time::interval;
use tracing::{error, info};

use crate::config::SCHEDULER_TICK_SECS;
use crate::error::{AppError, Result};
use crate::orchestrator::Orchestrator;

/// Day-of-week gated schedule evaluated in a fixed timezone offset.
#[derive(Debug, Clone)]
pub struct Schedule {
    days: Vec<Weekday>,
    hour: u32,
    minute: u32,
    offset: FixedOffset,
}

impl Schedule {
    /// Parses an expression like `"mon,thu 08:30"` plus a UTC offset in hours.
    pub fn parse(expr: &str, offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(offset_hours * 3600)
            .ok_or_else(|| AppError::Schedule(format!("invalid UTC offset {offset_hours}")))?;

        let (days_part, time_part) = expr
            .trim()
            .split_once(' ')
            .ok_or_else(|| AppError::Schedule(format!("expected \"days hh:mm\", got {expr:?}")))?;

        let mut days = Vec::new();
        for name in days_part.split(',') {
            days.push(parse_weekday(name.trim())?);
        }

        let (hh, mm) = time_part
            .trim()
            .split_once(':')
            .ok_or_else(|| AppError::Schedule(format!("expected hh:mm, got {time_part:?}")))?;
        let hour: u32 = hh
            .parse()
            .map_err(|_| AppError::Schedule(format!("invalid hour {hh:?}")))?;
        let minute: u32 = mm
            .parse()
            .map_err(|_| AppError::Schedule(format!("invalid minute {mm:?}")))?;
        if hour > 23 || minute > 59 {
            return Err(AppError::Schedule(format!("time {hour:02}:{minute:02} out of range")));
        }

        Ok(Self { days, hour, minute, offset })
    }

    /// True when `now` falls inside the scheduled minute, evaluated in the
    /// schedule's local timezone.
    pub fn matches(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset);
        self.days.contains(&local.weekday())
            && local.hour() == self.hour
            && local.minute() == self.minute
    }
}

fn parse_weekday(name: &str) -> Result<Weekday> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "mon" | "monday" => Weekday::Mon,
        "tue" | "tuesday" => Weekday::Tue,
        "wed" | "wednesday" => Weekday::Wed,
        "thu" | "thursday" => Weekday::Thu,
        "fri" | "friday" => Weekday::Fri,
        "sat" | "saturday" => Weekday::Sat,
        "sun" | "sunday" => Weekday::Sun,
        other => return Err(AppError::Schedule(format!("unknown weekday {other:?}"))),
    })
}

/// Fires the orchestrator on schedule. Shares the exact run function with
/// the manual trigger; the only state here is the fired-minute latch.
pub struct Scheduler {
    schedule: Schedule,
    orchestrator: Arc<Orchestrator>,
}

impl Scheduler {
    pub fn new(schedule: Schedule, orchestrator: Arc<Orchestrator>) -> Self {
        Self { schedule, orchestrator }
    }

    pub async fn run(self) {
        let mut ticker = interval(Duration::from_secs(SCHEDULER_TICK_SECS));
        ticker.tick().await; // consume immediate first tick

        // Latch the fired minute so one schedule slot triggers exactly one run.
        let mut last_fired: Option<i64> = None;
        loop {
            ticker.tick().await;
            let now = Utc::now();
            let slot = now.timestamp() / 60;
            if !self.schedule.matches(now) || last_fired == Some(slot) {
                continue;
            }
            last_fired = Some(slot);

            info!("schedule slot reached, starting detection run");
            match self.orchestrator.run().await {
                Ok(stats) => info!(
                    processed = stats.processed_accounts,
                    failed = stats.failed_accounts,
                    "scheduled run complete"
                ),
                Err(e) => error!("scheduled run failed: {e}"),
            }
        }
    }
}
