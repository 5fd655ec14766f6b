//! Reminder data model: schedules, completion/skip records, derived state.
//!
//! Schedules are a closed tagged variant validated at construction. There is
//! no implicit day-set defaulting: recurring schedules must name their days.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CadenceError, Result};

/// When a reminder fires. `Daily` and `Weekly` repeat on a weekday set at a
/// fixed local time; `OneTime` fires once and never again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleSpec {
    Daily {
        time: NaiveTime,
        timezone: Tz,
        days_of_week: Vec<Weekday>,
    },
    Weekly {
        time: NaiveTime,
        timezone: Tz,
        days_of_week: Vec<Weekday>,
    },
    OneTime {
        date: NaiveDate,
        time: NaiveTime,
        timezone: Tz,
    },
}

impl ScheduleSpec {
    /// Build a daily schedule from an hour/minute pair, validating the range.
    pub fn daily(hour: u32, minute: u32, timezone: Tz, days_of_week: Vec<Weekday>) -> Result<Self> {
        let spec = ScheduleSpec::Daily {
            time: parse_time(hour, minute)?,
            timezone,
            days_of_week,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn weekly(hour: u32, minute: u32, timezone: Tz, days_of_week: Vec<Weekday>) -> Result<Self> {
        let spec = ScheduleSpec::Weekly {
            time: parse_time(hour, minute)?,
            timezone,
            days_of_week,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn one_time(date: NaiveDate, hour: u32, minute: u32, timezone: Tz) -> Result<Self> {
        Ok(ScheduleSpec::OneTime {
            date,
            time: parse_time(hour, minute)?,
            timezone,
        })
    }

    /// Reject recurring schedules with an empty day set or duplicate days.
    pub fn validate(&self) -> Result<()> {
        match self {
            ScheduleSpec::Daily { days_of_week, .. } | ScheduleSpec::Weekly { days_of_week, .. } => {
                if days_of_week.is_empty() {
                    return Err(CadenceError::InvalidSchedule(
                        "recurring schedule has an empty day set".to_string(),
                    ));
                }
                let mut seen = [false; 7];
                for d in days_of_week {
                    let idx = d.num_days_from_monday() as usize;
                    if seen[idx] {
                        return Err(CadenceError::InvalidSchedule(format!(
                            "day {d} listed more than once"
                        )));
                    }
                    seen[idx] = true;
                }
                Ok(())
            }
            ScheduleSpec::OneTime { .. } => Ok(()),
        }
    }

    /// Local time-of-day the schedule fires at.
    pub fn time(&self) -> NaiveTime {
        match self {
            ScheduleSpec::Daily { time, .. }
            | ScheduleSpec::Weekly { time, .. }
            | ScheduleSpec::OneTime { time, .. } => *time,
        }
    }

    pub fn timezone(&self) -> Tz {
        match self {
            ScheduleSpec::Daily { timezone, .. }
            | ScheduleSpec::Weekly { timezone, .. }
            | ScheduleSpec::OneTime { timezone, .. } => *timezone,
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, ScheduleSpec::OneTime { .. })
    }

    /// Whether an occurrence is expected on the given weekday.
    /// Always false for one-time schedules; they are keyed by date, not weekday.
    pub fn fires_on(&self, weekday: Weekday) -> bool {
        match self {
            ScheduleSpec::Daily { days_of_week, .. } | ScheduleSpec::Weekly { days_of_week, .. } => {
                days_of_week.contains(&weekday)
            }
            ScheduleSpec::OneTime { .. } => false,
        }
    }
}

fn parse_time(hour: u32, minute: u32) -> Result<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
        CadenceError::InvalidSchedule(format!("time {hour:02}:{minute:02} is out of range"))
    })
}

/// A user-owned reminder. `message` is opaque text; content decisions live
/// outside this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub active: bool,
    pub schedule: ScheduleSpec,
    /// Whether completion is monitored at all.
    pub tracking_enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// One fulfilled occurrence. At most one per `(reminder_id, scheduled_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub reminder_id: String,
    pub user_id: String,
    /// Time-of-day the occurrence was due. A key, not a timestamp: recurring
    /// reminders repeat the same time-of-day.
    pub scheduled_time: NaiveTime,
    /// Calendar date, in the reminder's timezone, this occurrence belonged to.
    pub scheduled_date: NaiveDate,
    pub completed_at: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Sick,
    OutOfStock,
    DoctorAdvice,
    Other,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::Sick => "sick",
            SkipReason::OutOfStock => "out_of_stock",
            SkipReason::DoctorAdvice => "doctor_advice",
            SkipReason::Other => "other",
        };
        f.write_str(s)
    }
}

/// One explicitly skipped occurrence. A `(reminder_id, scheduled_date)` pair
/// holds at most one of completion/skip; recording one replaces the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub reminder_id: String,
    pub user_id: String,
    pub scheduled_date: NaiveDate,
    pub reason: SkipReason,
    pub skipped_at: DateTime<Utc>,
}
