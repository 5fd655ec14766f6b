//! Windowed completion analytics for a single reminder.
//!
//! Pure aggregation over completion/skip history; `now` is injected. The
//! cross-reminder comparison lives in the engine crate, next to the store.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::model::{CompletionRecord, Reminder, SkipReason, SkipRecord};
use crate::resolver::{expected_dates, local_instant, occurrence_elapsed};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayStats {
    pub weekday: Weekday,
    pub completions: u32,
    pub skips: u32,
    pub missed: u32,
    pub completion_rate: f64,
}

impl WeekdayStats {
    pub fn expected(&self) -> u32 {
        self.completions + self.skips + self.missed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub period_days: u32,
    /// 0-100, one decimal.
    pub completion_rate: f64,
    pub total_completions: u32,
    pub total_expected: u32,
    pub total_skips: u32,
    pub total_missed: u32,
    /// Signed; negative means the user completes early on average.
    pub average_delay_minutes: f64,
    pub skip_reason_counts: BTreeMap<SkipReason, u32>,
    /// Monday-first, only weekdays with at least one expected occurrence.
    pub day_of_week_breakdown: Vec<WeekdayStats>,
}

fn rate(completions: u32, expected: u32) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    let pct = f64::from(completions) / f64::from(expected) * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Aggregate the trailing `period_days` window ending "today" in the
/// reminder's timezone.
///
/// Skips count toward `total_expected`: a skip is a resolved outcome, not
/// missing data. An unresolved "today" inside its grace window is excluded
/// entirely rather than counted as missed.
pub fn snapshot(
    reminder: &Reminder,
    completions: &[CompletionRecord],
    skips: &[SkipRecord],
    period_days: u32,
    now: DateTime<Utc>,
    grace_minutes: i64,
) -> AnalyticsSnapshot {
    let tz = reminder.schedule.timezone();
    let today = now.with_timezone(&tz).date_naive();
    let created = reminder.created_at.with_timezone(&tz).date_naive();
    let from = created.max(today - Duration::days(i64::from(period_days)));

    let mut expected: Vec<NaiveDate> = expected_dates(&reminder.schedule, from, today);
    let completed_by_date: HashMap<NaiveDate, &CompletionRecord> =
        completions.iter().map(|c| (c.scheduled_date, c)).collect();
    let skipped_by_date: HashMap<NaiveDate, &SkipRecord> =
        skips.iter().map(|s| (s.scheduled_date, s)).collect();

    // Today's occurrence may simply not have happened yet.
    expected.retain(|d| {
        *d != today
            || completed_by_date.contains_key(d)
            || skipped_by_date.contains_key(d)
            || occurrence_elapsed(&reminder.schedule, *d, now, grace_minutes)
    });

    let mut total_completions = 0u32;
    let mut total_skips = 0u32;
    let mut total_missed = 0u32;
    let mut skip_reason_counts: BTreeMap<SkipReason, u32> = BTreeMap::new();
    let mut per_day: BTreeMap<u32, (Weekday, u32, u32, u32)> = BTreeMap::new();
    let mut delay_sum_minutes = 0.0f64;
    let mut delay_samples = 0u32;

    for date in &expected {
        let weekday = date.weekday();
        let slot = per_day
            .entry(weekday.num_days_from_monday())
            .or_insert((weekday, 0, 0, 0));
        if let Some(c) = completed_by_date.get(date) {
            total_completions += 1;
            slot.1 += 1;
            if let Some(due) = local_instant(tz, c.scheduled_date, c.scheduled_time) {
                delay_sum_minutes += (c.completed_at - due).num_seconds() as f64 / 60.0;
                delay_samples += 1;
            }
        } else if let Some(s) = skipped_by_date.get(date) {
            total_skips += 1;
            slot.2 += 1;
            *skip_reason_counts.entry(s.reason).or_insert(0) += 1;
        } else {
            total_missed += 1;
            slot.3 += 1;
        }
    }

    let total_expected = expected.len() as u32;
    let average_delay_minutes = if delay_samples == 0 {
        0.0
    } else {
        delay_sum_minutes / f64::from(delay_samples)
    };

    let day_of_week_breakdown = per_day
        .into_values()
        .map(|(weekday, c, s, m)| WeekdayStats {
            weekday,
            completions: c,
            skips: s,
            missed: m,
            completion_rate: rate(c, c + s + m),
        })
        .collect();

    AnalyticsSnapshot {
        period_days,
        completion_rate: rate(total_completions, total_expected),
        total_completions,
        total_expected,
        total_skips,
        total_missed,
        average_delay_minutes,
        skip_reason_counts,
        day_of_week_breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScheduleSpec;
    use chrono::{NaiveTime, TimeZone};
    use chrono_tz::Tz;

    fn utc_tz() -> Tz {
        chrono_tz::UTC
    }

    fn all_days() -> Vec<Weekday> {
        vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
    }

    fn reminder() -> Reminder {
        Reminder {
            id: "rem-1".to_string(),
            user_id: "u1".to_string(),
            message: "Drink water".to_string(),
            active: true,
            schedule: ScheduleSpec::daily(10, 0, utc_tz(), all_days()).unwrap(),
            tracking_enabled: true,
            created_at: Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn completion_at(r: &Reminder, date: NaiveDate, minutes_late: i64) -> CompletionRecord {
        let due = Utc
            .from_utc_datetime(&date.and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
        CompletionRecord {
            reminder_id: r.id.clone(),
            user_id: r.user_id.clone(),
            scheduled_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            scheduled_date: date,
            completed_at: due + Duration::minutes(minutes_late),
            note: None,
        }
    }

    #[test]
    fn empty_window_yields_zero_rate() {
        let r = reminder();
        // "Now" before any occurrence has elapsed on creation day.
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let snap = snapshot(&r, &[], &[], 30, now, 0);
        assert_eq!(snap.total_expected, 0);
        assert_eq!(snap.completion_rate, 0.0);
    }

    #[test]
    fn rate_and_missed_counting() {
        let r = reminder();
        let completions = vec![
            completion_at(&r, day(2), 5),
            completion_at(&r, day(3), 5),
            completion_at(&r, day(4), 5),
            completion_at(&r, day(5), 5),
            completion_at(&r, day(6), 5),
        ];
        // Saturday evening: Jun 2..7 expected, Saturday missed.
        let now = Utc.with_ymd_and_hms(2025, 6, 7, 20, 0, 0).unwrap();
        let snap = snapshot(&r, &completions, &[], 30, now, 0);
        assert_eq!(snap.total_expected, 6);
        assert_eq!(snap.total_completions, 5);
        assert_eq!(snap.total_missed, 1);
        assert_eq!(snap.completion_rate, 83.3);
    }

    #[test]
    fn skips_count_as_expected_not_completed() {
        let r = reminder();
        let completions = vec![completion_at(&r, day(2), 0)];
        let skips = vec![SkipRecord {
            reminder_id: r.id.clone(),
            user_id: r.user_id.clone(),
            scheduled_date: day(3),
            reason: SkipReason::OutOfStock,
            skipped_at: Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap(),
        }];
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 20, 0, 0).unwrap();
        let snap = snapshot(&r, &completions, &skips, 30, now, 0);
        assert_eq!(snap.total_expected, 2);
        assert_eq!(snap.total_skips, 1);
        assert_eq!(snap.completion_rate, 50.0);
        assert_eq!(snap.skip_reason_counts[&SkipReason::OutOfStock], 1);
    }

    #[test]
    fn average_delay_is_signed() {
        let r = reminder();
        let completions = vec![
            completion_at(&r, day(2), -10),
            completion_at(&r, day(3), 40),
        ];
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 20, 0, 0).unwrap();
        let snap = snapshot(&r, &completions, &[], 30, now, 0);
        assert!((snap.average_delay_minutes - 15.0).abs() < 1e-9);
    }

    #[test]
    fn unresolved_today_excluded_from_expected() {
        let r = reminder();
        let completions = vec![completion_at(&r, day(2), 0)];
        // Tuesday 09:00, before the 10:00 occurrence.
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 9, 0, 0).unwrap();
        let snap = snapshot(&r, &completions, &[], 30, now, 0);
        assert_eq!(snap.total_expected, 1);
        assert_eq!(snap.completion_rate, 100.0);
    }

    #[test]
    fn weekday_breakdown_partitions_outcomes() {
        let r = reminder();
        let completions = vec![completion_at(&r, day(2), 0)]; // Monday
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 20, 0, 0).unwrap(); // Tuesday missed
        let snap = snapshot(&r, &completions, &[], 30, now, 0);
        assert_eq!(snap.day_of_week_breakdown.len(), 2);
        let mon = &snap.day_of_week_breakdown[0];
        assert_eq!(mon.weekday, Weekday::Mon);
        assert_eq!(mon.completions, 1);
        assert_eq!(mon.completion_rate, 100.0);
        let tue = &snap.day_of_week_breakdown[1];
        assert_eq!(tue.missed, 1);
        assert_eq!(tue.completion_rate, 0.0);
    }
}
