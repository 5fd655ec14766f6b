//! Store-backed analytics: per-reminder snapshots, streaks, suggestions, and
//! the cross-reminder comparison. All computation is delegated to
//! `cadence-core`; this layer only loads history and orders results.

use cadence_core::{
    AnalyticsSnapshot, CadenceError, Reminder, Result, StreakState, Suggestion, compute_streak,
    snapshot, suggest,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::store::SharedStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderComparison {
    pub reminder_id: String,
    pub message: String,
    pub snapshot: AnalyticsSnapshot,
    pub streak: StreakState,
}

#[derive(Clone)]
pub struct Insights {
    store: SharedStore,
    config: EngineConfig,
}

impl Insights {
    pub fn new(store: SharedStore, config: EngineConfig) -> Self {
        Self { store, config }
    }

    async fn load(&self, reminder_id: &str) -> Result<(Reminder, Vec<cadence_core::CompletionRecord>, Vec<cadence_core::SkipRecord>)> {
        let reminder = self
            .store
            .get_reminder(reminder_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("reminder {reminder_id}")))?;
        let completions = self.store.completions_for(reminder_id).await?;
        let skips = self.store.skips_for(reminder_id).await?;
        Ok((reminder, completions, skips))
    }

    pub async fn streak(&self, reminder_id: &str, now: DateTime<Utc>) -> Result<StreakState> {
        let (reminder, completions, skips) = self.load(reminder_id).await?;
        Ok(compute_streak(
            &reminder,
            &completions,
            &skips,
            now,
            self.config.streak_policy(),
        ))
    }

    pub async fn snapshot(
        &self,
        reminder_id: &str,
        period_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsSnapshot> {
        let (reminder, completions, skips) = self.load(reminder_id).await?;
        let period = period_days.unwrap_or(self.config.analytics.default_period_days);
        Ok(snapshot(
            &reminder,
            &completions,
            &skips,
            period,
            now,
            self.config.streaks.grace_minutes,
        ))
    }

    pub async fn suggestions(
        &self,
        reminder_id: &str,
        period_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Suggestion>> {
        let (reminder, completions, skips) = self.load(reminder_id).await?;
        let period = period_days.unwrap_or(self.config.analytics.default_period_days);
        let snap = snapshot(
            &reminder,
            &completions,
            &skips,
            period,
            now,
            self.config.streaks.grace_minutes,
        );
        Ok(suggest(&reminder, &snap, &self.config.suggestions))
    }

    /// Every active, tracked reminder of the user, best performers first:
    /// completion rate desc, then current streak desc, then message.
    pub async fn compare_across_reminders(
        &self,
        user_id: &str,
        period_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReminderComparison>> {
        let period = period_days.unwrap_or(self.config.analytics.default_period_days);
        let reminders = self.store.list_active_for_user(user_id).await?;

        let mut out = Vec::new();
        for reminder in reminders.into_iter().filter(|r| r.tracking_enabled) {
            let completions = self.store.completions_for(&reminder.id).await?;
            let skips = self.store.skips_for(&reminder.id).await?;
            let snap = snapshot(
                &reminder,
                &completions,
                &skips,
                period,
                now,
                self.config.streaks.grace_minutes,
            );
            let streak = compute_streak(
                &reminder,
                &completions,
                &skips,
                now,
                self.config.streak_policy(),
            );
            out.push(ReminderComparison {
                reminder_id: reminder.id,
                message: reminder.message,
                snapshot: snap,
                streak,
            });
        }

        out.sort_by(|a, b| {
            b.snapshot
                .completion_rate
                .total_cmp(&a.snapshot.completion_rate)
                .then_with(|| b.streak.current_streak.cmp(&a.streak.current_streak))
                .then_with(|| a.message.cmp(&b.message))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ReminderStore};
    use cadence_core::{CompletionRecord, ScheduleSpec};
    use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Weekday};
    use std::sync::Arc;

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

    fn reminder(id: &str, message: &str) -> Reminder {
        Reminder {
            id: id.to_string(),
            user_id: "u1".to_string(),
            message: message.to_string(),
            active: true,
            schedule: ScheduleSpec::daily(9, 0, chrono_tz::UTC, all_days()).unwrap(),
            tracking_enabled: true,
            created_at: Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap(),
        }
    }

    fn completion(id: &str, date: NaiveDate) -> CompletionRecord {
        CompletionRecord {
            reminder_id: id.to_string(),
            user_id: "u1".to_string(),
            scheduled_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            scheduled_date: date,
            completed_at: Utc.from_utc_datetime(
                &date.and_time(NaiveTime::from_hms_opt(9, 5, 0).unwrap()),
            ),
            note: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    async fn seed(store: &MemoryStore, id: &str, message: &str, completed: &[u32]) {
        store.insert_reminder(reminder(id, message)).await.unwrap();
        for d in completed {
            store.upsert_completion(completion(id, day(*d))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn comparison_orders_by_rate_then_streak_then_message() {
        let store = Arc::new(MemoryStore::new());
        // Window Jun 2..7 (Saturday evening): 6 expected each.
        seed(&store, "a", "Water", &[2, 3, 4, 5, 6, 7]).await; // 100%
        seed(&store, "b", "Vitamin", &[2, 3, 4, 5]).await; // 4/6
        seed(&store, "c", "Stretch", &[3, 4, 6, 7]).await; // 4/6, longer current streak? no
        let insights = Insights::new(store, EngineConfig::default());
        let now = Utc.with_ymd_and_hms(2025, 6, 7, 20, 0, 0).unwrap();

        let ranked = insights
            .compare_across_reminders("u1", Some(30), now)
            .await
            .unwrap();
        let ids: Vec<&str> = ranked.iter().map(|c| c.reminder_id.as_str()).collect();
        // a: 100%. b and c both 66.7%: c has current streak 2 (Jun 6-7),
        // b has 0 (missed Jun 5 onward), so c ranks ahead of b.
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn untracked_reminders_excluded_from_comparison() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, "a", "Water", &[2, 3]).await;
        let mut untracked = reminder("b", "Vitamin");
        untracked.tracking_enabled = false;
        store.insert_reminder(untracked).await.unwrap();
        let insights = Insights::new(store, EngineConfig::default());
        let now = Utc.with_ymd_and_hms(2025, 6, 3, 20, 0, 0).unwrap();

        let ranked = insights
            .compare_across_reminders("u1", None, now)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].reminder_id, "a");
    }

    #[tokio::test]
    async fn streak_for_unknown_reminder_is_not_found() {
        let insights = Insights::new(Arc::new(MemoryStore::new()), EngineConfig::default());
        let err = insights.streak("ghost", Utc::now()).await.unwrap_err();
        assert!(matches!(err, CadenceError::NotFound(_)));
    }
}
