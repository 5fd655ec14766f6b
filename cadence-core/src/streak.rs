//! Streak derivation from completion history.
//!
//! Streaks are recomputed from records, never stored as source of truth.
//! Given the same records and the same `now`, the result is deterministic.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CompletionRecord, Reminder, SkipRecord};
use crate::resolver::{expected_dates, occurrence_elapsed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakStatus {
    Tracked,
    /// One-time reminders have a single occurrence and no streak.
    NotApplicable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub best_streak: u32,
    pub status: StreakStatus,
}

impl StreakState {
    pub fn not_applicable() -> Self {
        StreakState {
            current_streak: 0,
            best_streak: 0,
            status: StreakStatus::NotApplicable,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreakPolicy {
    /// Minutes past the scheduled time-of-day before an unresolved occurrence
    /// counts as missed.
    pub grace_minutes: i64,
    /// Hard bound on the backward scan.
    pub lookback_days: u32,
}

impl Default for StreakPolicy {
    fn default() -> Self {
        Self {
            grace_minutes: 0,
            lookback_days: 365,
        }
    }
}

/// Current and best streak for a reminder, walking expected dates backward
/// from "today" in the reminder's timezone.
pub fn compute_streak(
    reminder: &Reminder,
    completions: &[CompletionRecord],
    skips: &[SkipRecord],
    now: DateTime<Utc>,
    policy: StreakPolicy,
) -> StreakState {
    if !reminder.schedule.is_recurring() {
        return StreakState::not_applicable();
    }

    let tz = reminder.schedule.timezone();
    let today = now.with_timezone(&tz).date_naive();
    let created = reminder.created_at.with_timezone(&tz).date_naive();
    let floor = today - Duration::days(i64::from(policy.lookback_days));
    let from = created.max(floor);

    let expected = expected_dates(&reminder.schedule, from, today);
    let completed: HashSet<NaiveDate> = completions.iter().map(|c| c.scheduled_date).collect();
    let skipped: HashSet<NaiveDate> = skips.iter().map(|s| s.scheduled_date).collect();

    let mut current = 0u32;
    for date in expected.iter().rev() {
        let resolved = completed.contains(date) || skipped.contains(date);
        if *date == today
            && !resolved
            && !occurrence_elapsed(&reminder.schedule, *date, now, policy.grace_minutes)
        {
            // Today's occurrence simply hasn't happened yet.
            continue;
        }
        if completed.contains(date) {
            current += 1;
        } else {
            // A skip or a miss breaks the streak.
            break;
        }
    }

    let mut best = 0u32;
    let mut run = 0u32;
    for date in &expected {
        if completed.contains(date) {
            run += 1;
            best = best.max(run);
        } else if *date == today
            && !skipped.contains(date)
            && !occurrence_elapsed(&reminder.schedule, *date, now, policy.grace_minutes)
        {
            // Unresolved today neither extends nor breaks the best run.
        } else {
            run = 0;
        }
    }

    StreakState {
        current_streak: current,
        best_streak: best,
        status: StreakStatus::Tracked,
    }
}
