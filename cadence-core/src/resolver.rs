//! Schedule resolution: timezone-correct "when does this fire next" math.
//!
//! Everything here is pure. The reference instant is a parameter, never the
//! wall clock, so the whole module unit-tests without a clock dependency.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::Result;
use crate::model::ScheduleSpec;

/// Next occurrence strictly after `after`, as an absolute instant.
///
/// `Ok(None)` means no further occurrence exists (a one-time schedule whose
/// moment has passed); the caller must not re-arm.
pub fn next_occurrence(schedule: &ScheduleSpec, after: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    schedule.validate()?;
    let tz = schedule.timezone();
    let time = schedule.time();

    match schedule {
        ScheduleSpec::OneTime { date, .. } => {
            let instant = local_instant(tz, *date, time);
            Ok(instant.filter(|i| *i > after))
        }
        ScheduleSpec::Daily { .. } | ScheduleSpec::Weekly { .. } => {
            let mut date = after.with_timezone(&tz).date_naive();
            // Day set is non-empty, so a match exists within the next 7 days.
            // One extra day absorbs a same-day candidate already behind `after`,
            // and one more a DST-gap skip.
            for _ in 0..=8 {
                if schedule.fires_on(date.weekday()) {
                    if let Some(instant) = local_instant(tz, date, time) {
                        if instant > after {
                            return Ok(Some(instant));
                        }
                    }
                }
                date = match date.succ_opt() {
                    Some(d) => d,
                    None => break,
                };
            }
            Ok(None)
        }
    }
}

/// Absolute instant of the occurrence belonging to `date`.
///
/// A spring-forward gap shifts the wall time one hour later; an ambiguous
/// fall-back time resolves to the earlier instant.
pub fn local_instant(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive).earliest() {
        Some(local) => Some(local.with_timezone(&Utc)),
        None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|local| local.with_timezone(&Utc)),
    }
}

/// Whether the occurrence belonging to `date` is past its grace window at `now`.
///
/// Grace policy: an occurrence counts as elapsed once its scheduled
/// time-of-day plus `grace_minutes` has passed in the schedule's timezone.
pub fn occurrence_elapsed(
    schedule: &ScheduleSpec,
    date: NaiveDate,
    now: DateTime<Utc>,
    grace_minutes: i64,
) -> bool {
    match local_instant(schedule.timezone(), date, schedule.time()) {
        Some(instant) => now >= instant + Duration::minutes(grace_minutes),
        None => true,
    }
}

/// Calendar dates in `[from, to]` an occurrence is expected for, ascending.
///
/// Recurring schedules yield every date whose weekday is configured; a
/// one-time schedule yields its single date when it falls in the range.
pub fn expected_dates(schedule: &ScheduleSpec, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    match schedule {
        ScheduleSpec::OneTime { date, .. } => {
            if *date >= from && *date <= to {
                vec![*date]
            } else {
                vec![]
            }
        }
        ScheduleSpec::Daily { .. } | ScheduleSpec::Weekly { .. } => {
            let mut out = Vec::new();
            let mut d = from;
            while d <= to {
                if schedule.fires_on(d.weekday()) {
                    out.push(d);
                }
                d = match d.succ_opt() {
                    Some(n) => n,
                    None => break,
                };
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn stockholm() -> Tz {
        "Europe/Stockholm".parse().unwrap()
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

    #[test]
    fn daily_same_day_when_time_ahead() {
        let spec = ScheduleSpec::daily(9, 0, stockholm(), all_days()).unwrap();
        // 2025-06-02 06:00 UTC = 08:00 Stockholm (CEST).
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap();
        let next = next_occurrence(&spec, after).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap());
    }

    #[test]
    fn daily_rolls_to_next_day_when_time_passed() {
        let spec = ScheduleSpec::daily(9, 0, stockholm(), all_days()).unwrap();
        // 10:00 Stockholm, past 09:00.
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let next = next_occurrence(&spec, after).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 3, 7, 0, 0).unwrap());
    }

    #[test]
    fn weekly_advances_to_configured_weekday() {
        let spec = ScheduleSpec::weekly(9, 0, stockholm(), vec![Weekday::Fri]).unwrap();
        // Monday 2025-06-02.
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap();
        let next = next_occurrence(&spec, after).unwrap().unwrap();
        let local = next.with_timezone(&stockholm());
        assert_eq!(local.weekday(), Weekday::Fri);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 6).unwrap());
    }

    #[test]
    fn next_is_strictly_after_reference() {
        let spec = ScheduleSpec::daily(9, 0, stockholm(), all_days()).unwrap();
        // Exactly 09:00 Stockholm: the same-day candidate is not strictly after.
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap();
        let next = next_occurrence(&spec, after).unwrap().unwrap();
        assert!(next > after);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 6, 3, 7, 0, 0).unwrap());
    }

    #[test]
    fn one_time_in_future_resolves() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let spec = ScheduleSpec::one_time(date, 15, 30, chrono_tz::UTC).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        let next = next_occurrence(&spec, after).unwrap().unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 7, 1, 15, 30, 0).unwrap());
    }

    #[test]
    fn one_time_in_past_has_no_further_occurrence() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let spec = ScheduleSpec::one_time(date, 15, 30, chrono_tz::UTC).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
        assert!(next_occurrence(&spec, after).unwrap().is_none());
    }

    #[test]
    fn spring_forward_gap_shifts_forward() {
        // Europe/Stockholm jumps 02:00 -> 03:00 on 2025-03-30.
        let gap_date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let time = NaiveTime::from_hms_opt(2, 30, 0).unwrap();
        let instant = local_instant(stockholm(), gap_date, time).unwrap();
        // 03:30 CEST = 01:30 UTC.
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 3, 30, 1, 30, 0).unwrap());
    }

    #[test]
    fn expected_dates_respect_day_set() {
        let spec =
            ScheduleSpec::weekly(9, 0, chrono_tz::UTC, vec![Weekday::Mon, Weekday::Wed]).unwrap();
        let from = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(); // Monday
        let to = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap(); // Sunday
        let dates = expected_dates(&spec, from, to);
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
                NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
            ]
        );
    }

    #[test]
    fn grace_window_delays_elapsed() {
        let spec = ScheduleSpec::daily(9, 0, chrono_tz::UTC, all_days()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let just_after = Utc.with_ymd_and_hms(2025, 6, 2, 9, 10, 0).unwrap();
        assert!(occurrence_elapsed(&spec, date, just_after, 0));
        assert!(!occurrence_elapsed(&spec, date, just_after, 30));
        let later = Utc.with_ymd_and_hms(2025, 6, 2, 9, 40, 0).unwrap();
        assert!(occurrence_elapsed(&spec, date, later, 30));
    }
}
