//! Adaptive schedule suggestions derived from analytics output.
//!
//! Reconciles timing drift and day-of-week difficulty into a ranked list.
//! No signal over threshold means an empty list: the reminder is performing
//! well, which is not an error.

use chrono::{Duration, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::analytics::AnalyticsSnapshot;
use crate::model::Reminder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    TimeShift,
    DifficultDaySupport,
    ScheduleSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum ProposedChange {
    /// Move the reminder to a new time-of-day.
    NewTime { time: NaiveTime },
    /// Targeted support on one weekday: an earlier nudge at the given time.
    DaySupport { weekday: Weekday, time: NaiveTime },
    /// Split into separate weekday/weekend times.
    SplitSchedule {
        weekday_time: NaiveTime,
        weekend_time: NaiveTime,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    /// Human-readable justification carrying the numeric evidence.
    pub rationale: String,
    pub proposed_change: ProposedChange,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SuggestionThresholds {
    /// Minimum |average delay| in minutes before proposing a time shift.
    #[serde(default = "default_time_shift_min_delay")]
    pub time_shift_min_delay_minutes: f64,
    /// Minimum completion sample size for a time shift.
    #[serde(default = "default_time_shift_min_samples")]
    pub time_shift_min_samples: u32,
    /// Percentage points below the overall rate before a weekday counts as difficult.
    #[serde(default = "default_difficult_day_margin")]
    pub difficult_day_margin: f64,
    /// Minimum expected occurrences on a weekday before it can be flagged.
    #[serde(default = "default_difficult_day_min_expected")]
    pub difficult_day_min_expected: u32,
    /// Weekday-vs-weekend rate divergence, in percentage points, before a split.
    #[serde(default = "default_split_margin")]
    pub split_margin: f64,
    /// Minimum expected occurrences in each group before a split.
    #[serde(default = "default_split_min_expected")]
    pub split_min_expected_each: u32,
}

fn default_time_shift_min_delay() -> f64 {
    30.0
}
fn default_time_shift_min_samples() -> u32 {
    5
}
fn default_difficult_day_margin() -> f64 {
    25.0
}
fn default_difficult_day_min_expected() -> u32 {
    3
}
fn default_split_margin() -> f64 {
    20.0
}
fn default_split_min_expected() -> u32 {
    3
}

impl Default for SuggestionThresholds {
    fn default() -> Self {
        Self {
            time_shift_min_delay_minutes: default_time_shift_min_delay(),
            time_shift_min_samples: default_time_shift_min_samples(),
            difficult_day_margin: default_difficult_day_margin(),
            difficult_day_min_expected: default_difficult_day_min_expected(),
            split_margin: default_split_margin(),
            split_min_expected_each: default_split_min_expected(),
        }
    }
}

fn fmt_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

fn shifted(time: NaiveTime, minutes: i64) -> NaiveTime {
    // NaiveTime arithmetic wraps around midnight.
    time + Duration::minutes(minutes)
}

/// Produce ranked suggestions for one reminder.
///
/// Ranking is fixed-precedence (time shift, then difficult day, then split)
/// so the output is deterministic regardless of iteration order upstream.
pub fn suggest(
    reminder: &Reminder,
    snapshot: &AnalyticsSnapshot,
    thresholds: &SuggestionThresholds,
) -> Vec<Suggestion> {
    if !reminder.schedule.is_recurring() {
        return vec![];
    }

    let time = reminder.schedule.time();
    let mut out = Vec::new();

    // Timing drift: the user consistently acts earlier/later than scheduled.
    let avg = snapshot.average_delay_minutes;
    if avg.abs() >= thresholds.time_shift_min_delay_minutes
        && snapshot.total_completions >= thresholds.time_shift_min_samples
    {
        let shift = avg.round() as i64;
        let new_time = shifted(time, shift);
        out.push(Suggestion {
            kind: SuggestionKind::TimeShift,
            rationale: format!(
                "Across {} completions you average {:+.0} min from the scheduled time; \
                 moving {} to {} would match when you actually act.",
                snapshot.total_completions,
                avg,
                fmt_time(time),
                fmt_time(new_time),
            ),
            proposed_change: ProposedChange::NewTime { time: new_time },
        });
    }

    // One weekday falling well behind the overall rate.
    let overall = snapshot.completion_rate;
    let mut difficult: Option<(&crate::analytics::WeekdayStats, f64)> = None;
    for stats in &snapshot.day_of_week_breakdown {
        if stats.expected() < thresholds.difficult_day_min_expected {
            continue;
        }
        let gap = overall - stats.completion_rate;
        if gap < thresholds.difficult_day_margin {
            continue;
        }
        // Strict greater keeps the earliest weekday on ties (Monday-first input).
        if difficult.map(|(_, g)| gap > g).unwrap_or(true) {
            difficult = Some((stats, gap));
        }
    }
    if let Some((stats, gap)) = difficult {
        let support_time = shifted(time, -60);
        out.push(Suggestion {
            kind: SuggestionKind::DifficultDaySupport,
            rationale: format!(
                "{} completion is {:.1}% against {:.1}% overall ({:.0} points behind, \
                 {} occurrences); an extra nudge at {} could help on that day.",
                stats.weekday,
                stats.completion_rate,
                overall,
                gap,
                stats.expected(),
                fmt_time(support_time),
            ),
            proposed_change: ProposedChange::DaySupport {
                weekday: stats.weekday,
                time: support_time,
            },
        });
    }

    // Weekday-vs-weekend divergence.
    let mut wd = (0u32, 0u32); // (completions, expected)
    let mut we = (0u32, 0u32);
    for stats in &snapshot.day_of_week_breakdown {
        let bucket = match stats.weekday {
            Weekday::Sat | Weekday::Sun => &mut we,
            _ => &mut wd,
        };
        bucket.0 += stats.completions;
        bucket.1 += stats.expected();
    }
    if wd.1 >= thresholds.split_min_expected_each && we.1 >= thresholds.split_min_expected_each {
        let wd_rate = f64::from(wd.0) / f64::from(wd.1) * 100.0;
        let we_rate = f64::from(we.0) / f64::from(we.1) * 100.0;
        if (wd_rate - we_rate).abs() > thresholds.split_margin {
            // The lagging group gets the drift-adjusted time; without a drift
            // signal, fall back to an hour earlier.
            let adjusted = if avg.abs() >= 1.0 {
                shifted(time, avg.round() as i64)
            } else {
                shifted(time, -60)
            };
            let (weekday_time, weekend_time) = if wd_rate >= we_rate {
                (time, adjusted)
            } else {
                (adjusted, time)
            };
            out.push(Suggestion {
                kind: SuggestionKind::ScheduleSplit,
                rationale: format!(
                    "Weekday completion is {:.1}% but weekend is {:.1}%; splitting into \
                     {} on weekdays and {} on weekends fits the two routines.",
                    wd_rate,
                    we_rate,
                    fmt_time(weekday_time),
                    fmt_time(weekend_time),
                ),
                proposed_change: ProposedChange::SplitSchedule {
                    weekday_time,
                    weekend_time,
                },
            });
        }
    }

    out
}
