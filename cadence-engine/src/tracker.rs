//! Completion and skip recording with ownership checks.
//!
//! Records are upserts keyed by `(reminder_id, scheduled_date)`: the delivery
//! channel can retry an action callback, so recording twice must overwrite,
//! never duplicate. Recording a skip after a completion (or vice versa)
//! replaces it; the user corrected their action.

use cadence_core::{
    CadenceError, CompletionRecord, Reminder, Result, SkipReason, SkipRecord, local_instant,
};
use chrono::{DateTime, NaiveDate, Utc};

use crate::notify::{RewardSummary, SharedGamification};
use crate::store::SharedStore;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub record: CompletionRecord,
    /// "early", or how late in minutes, relative to the scheduled instant.
    pub timing_note: String,
    /// Present when the gamification boundary answered.
    pub reward: Option<RewardSummary>,
}

#[derive(Clone)]
pub struct CompletionTracker {
    store: SharedStore,
    gamification: SharedGamification,
}

impl CompletionTracker {
    pub fn new(store: SharedStore, gamification: SharedGamification) -> Self {
        Self {
            store,
            gamification,
        }
    }

    async fn owned_reminder(&self, reminder_id: &str, user_id: &str) -> Result<Reminder> {
        let reminder = self
            .store
            .get_reminder(reminder_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("reminder {reminder_id}")))?;
        if reminder.user_id != user_id {
            tracing::warn!(reminder_id, user_id, "rejected access to another user's reminder");
            return Err(CadenceError::Forbidden {
                reminder_id: reminder_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        Ok(reminder)
    }

    pub async fn record_completion(
        &self,
        reminder_id: &str,
        user_id: &str,
        scheduled_date: NaiveDate,
        note: Option<String>,
    ) -> Result<CompletionOutcome> {
        self.record_completion_at(reminder_id, user_id, scheduled_date, note, Utc::now())
            .await
    }

    /// Same as `record_completion` with an explicit completion instant.
    pub async fn record_completion_at(
        &self,
        reminder_id: &str,
        user_id: &str,
        scheduled_date: NaiveDate,
        note: Option<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<CompletionOutcome> {
        let reminder = self.owned_reminder(reminder_id, user_id).await?;

        let record = CompletionRecord {
            reminder_id: reminder.id.clone(),
            user_id: reminder.user_id.clone(),
            scheduled_time: reminder.schedule.time(),
            scheduled_date,
            completed_at,
            note,
        };
        self.store.upsert_completion(record.clone()).await?;

        let timing_note = timing_note(&reminder, scheduled_date, completed_at);
        tracing::info!(reminder_id, %scheduled_date, timing = %timing_note, "completion recorded");

        // Rewards are advisory; a dead gamification service must not fail the record.
        let reward = match self
            .gamification
            .report_completion(user_id, reminder_id, completed_at, record.scheduled_time)
            .await
        {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(reminder_id, error = %e, "gamification report failed");
                None
            }
        };

        Ok(CompletionOutcome {
            record,
            timing_note,
            reward,
        })
    }

    pub async fn record_skip(
        &self,
        reminder_id: &str,
        user_id: &str,
        scheduled_date: NaiveDate,
        reason: SkipReason,
    ) -> Result<SkipRecord> {
        let reminder = self.owned_reminder(reminder_id, user_id).await?;
        let record = SkipRecord {
            reminder_id: reminder.id.clone(),
            user_id: reminder.user_id.clone(),
            scheduled_date,
            reason,
            skipped_at: Utc::now(),
        };
        self.store.upsert_skip(record.clone()).await?;
        tracing::info!(reminder_id, %scheduled_date, %reason, "skip recorded");
        Ok(record)
    }

    /// Attach or replace the note on an existing completion. A note cannot
    /// exist before the completion does.
    pub async fn update_note(
        &self,
        reminder_id: &str,
        user_id: &str,
        scheduled_date: NaiveDate,
        note: Option<String>,
    ) -> Result<()> {
        self.owned_reminder(reminder_id, user_id).await?;
        self.store.update_note(reminder_id, scheduled_date, note).await
    }
}

fn timing_note(reminder: &Reminder, scheduled_date: NaiveDate, completed_at: DateTime<Utc>) -> String {
    let due = local_instant(
        reminder.schedule.timezone(),
        scheduled_date,
        reminder.schedule.time(),
    );
    match due {
        Some(due) if completed_at <= due => "early".to_string(),
        Some(due) => {
            let minutes = (completed_at - due).num_minutes();
            format!("{minutes} min late")
        }
        None => "early".to_string(),
    }
}
