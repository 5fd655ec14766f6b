//! The engine facade: one explicitly constructed object wiring store,
//! scheduler, tracker, detector, and insights.
//!
//! There is deliberately no process-wide singleton; the process entry point
//! owns the lifecycle (`start`/`shutdown`) and passes the engine down.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cadence_core::{
    AnalyticsSnapshot, CadenceError, CompletionRecord, DuplicateGroup, Reminder, Result,
    ScheduleSpec, SkipReason, SkipRecord, StreakState, Suggestion,
};
use chrono::{NaiveDate, Utc};

use crate::config::EngineConfig;
use crate::detector::DuplicateDetector;
use crate::insights::{Insights, ReminderComparison};
use crate::notify::{SharedGamification, SharedNotifier};
use crate::scheduler::JobScheduler;
use crate::store::SharedStore;
use crate::tracker::{CompletionOutcome, CompletionTracker};

#[derive(Debug, Clone)]
pub struct NewReminder {
    pub user_id: String,
    pub message: String,
    pub schedule: ScheduleSpec,
    pub tracking_enabled: bool,
}

/// Partial update; only `Some` fields change.
#[derive(Debug, Clone, Default)]
pub struct ReminderPatch {
    pub message: Option<String>,
    pub schedule: Option<ScheduleSpec>,
    pub tracking_enabled: Option<bool>,
}

pub struct ReminderEngine {
    store: SharedStore,
    scheduler: JobScheduler,
    tracker: CompletionTracker,
    detector: DuplicateDetector,
    insights: Insights,
    config: EngineConfig,
    id_seq: AtomicU64,
}

impl ReminderEngine {
    pub fn new(
        store: SharedStore,
        notifier: SharedNotifier,
        gamification: SharedGamification,
        config: EngineConfig,
    ) -> Self {
        let scheduler = JobScheduler::new(Arc::clone(&store), notifier);
        Self {
            tracker: CompletionTracker::new(Arc::clone(&store), gamification),
            detector: DuplicateDetector::new(Arc::clone(&store), scheduler.clone()),
            insights: Insights::new(Arc::clone(&store), config.clone()),
            scheduler,
            store,
            config,
            id_seq: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Arm every active reminder from the store; returns the armed count.
    pub async fn start(&self) -> Result<usize> {
        self.scheduler.load_all().await
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    fn next_id(&self) -> String {
        let seq = self.id_seq.fetch_add(1, Ordering::Relaxed);
        format!("rem-{}-{:04}", Utc::now().timestamp_millis(), seq)
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

    /// Validate, persist, and arm a new reminder.
    pub async fn create_reminder(&self, new: NewReminder) -> Result<Reminder> {
        new.schedule.validate()?;
        let reminder = Reminder {
            id: self.next_id(),
            user_id: new.user_id,
            message: new.message,
            active: true,
            schedule: new.schedule,
            tracking_enabled: new.tracking_enabled,
            created_at: Utc::now(),
        };
        self.store.insert_reminder(reminder.clone()).await?;
        self.scheduler.schedule(&reminder)?;
        tracing::info!(reminder_id = %reminder.id, user_id = %reminder.user_id, "reminder created");
        Ok(reminder)
    }

    /// Apply a patch and reschedule atomically with respect to fires.
    pub async fn update_reminder(
        &self,
        reminder_id: &str,
        user_id: &str,
        patch: ReminderPatch,
    ) -> Result<Reminder> {
        let mut reminder = self.owned_reminder(reminder_id, user_id).await?;
        if let Some(message) = patch.message {
            reminder.message = message;
        }
        if let Some(schedule) = patch.schedule {
            schedule.validate()?;
            reminder.schedule = schedule;
        }
        if let Some(tracking) = patch.tracking_enabled {
            reminder.tracking_enabled = tracking;
        }
        self.store.update_reminder(reminder.clone()).await?;
        self.scheduler.reschedule(&reminder)?;
        Ok(reminder)
    }

    /// Pause or resume. Pausing cancels the pending timer; resuming re-arms.
    pub async fn set_active(&self, reminder_id: &str, user_id: &str, active: bool) -> Result<()> {
        let mut reminder = self.owned_reminder(reminder_id, user_id).await?;
        self.store.set_active(reminder_id, active).await?;
        reminder.active = active;
        if active {
            self.scheduler.schedule(&reminder)?;
        } else {
            self.scheduler.cancel(reminder_id);
        }
        Ok(())
    }

    /// Delete the reminder, cancelling its pending timer. History survives.
    pub async fn delete_reminder(&self, reminder_id: &str, user_id: &str) -> Result<()> {
        self.owned_reminder(reminder_id, user_id).await?;
        self.scheduler.cancel(reminder_id);
        self.store.delete_reminder(reminder_id).await?;
        tracing::info!(reminder_id, "reminder deleted");
        Ok(())
    }

    // Action-callback surface, invoked by the surrounding UI.

    pub async fn on_complete(
        &self,
        reminder_id: &str,
        user_id: &str,
        scheduled_date: NaiveDate,
        note: Option<String>,
    ) -> Result<CompletionOutcome> {
        self.tracker
            .record_completion(reminder_id, user_id, scheduled_date, note)
            .await
    }

    pub async fn on_skip(
        &self,
        reminder_id: &str,
        user_id: &str,
        scheduled_date: NaiveDate,
        reason: SkipReason,
    ) -> Result<SkipRecord> {
        self.tracker
            .record_skip(reminder_id, user_id, scheduled_date, reason)
            .await
    }

    pub async fn on_snooze(
        &self,
        reminder_id: &str,
        user_id: &str,
        delay_minutes: i64,
    ) -> Result<()> {
        self.owned_reminder(reminder_id, user_id).await?;
        self.scheduler.snooze(reminder_id, delay_minutes).await
    }

    pub async fn update_note(
        &self,
        reminder_id: &str,
        user_id: &str,
        scheduled_date: NaiveDate,
        note: Option<String>,
    ) -> Result<()> {
        self.tracker
            .update_note(reminder_id, user_id, scheduled_date, note)
            .await
    }

    // History, for callers rendering past occurrences.

    /// Completions with `scheduled_date` in `[from, to]`, ascending by date.
    pub async fn completion_history(
        &self,
        reminder_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CompletionRecord>> {
        self.owned_reminder(reminder_id, user_id).await?;
        let mut records = self.store.completions_for(reminder_id).await?;
        records.retain(|c| c.scheduled_date >= from && c.scheduled_date <= to);
        Ok(records)
    }

    /// Skips with `scheduled_date` in `[from, to]`, ascending by date.
    pub async fn skip_history(
        &self,
        reminder_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SkipRecord>> {
        self.owned_reminder(reminder_id, user_id).await?;
        let mut records = self.store.skips_for(reminder_id).await?;
        records.retain(|s| s.scheduled_date >= from && s.scheduled_date <= to);
        Ok(records)
    }

    // Derived state.

    pub async fn streak(&self, reminder_id: &str) -> Result<StreakState> {
        self.insights.streak(reminder_id, Utc::now()).await
    }

    pub async fn analytics(
        &self,
        reminder_id: &str,
        period_days: Option<u32>,
    ) -> Result<AnalyticsSnapshot> {
        self.insights.snapshot(reminder_id, period_days, Utc::now()).await
    }

    pub async fn suggestions(
        &self,
        reminder_id: &str,
        period_days: Option<u32>,
    ) -> Result<Vec<Suggestion>> {
        self.insights
            .suggestions(reminder_id, period_days, Utc::now())
            .await
    }

    pub async fn compare_across_reminders(
        &self,
        user_id: &str,
        period_days: Option<u32>,
    ) -> Result<Vec<ReminderComparison>> {
        self.insights
            .compare_across_reminders(user_id, period_days, Utc::now())
            .await
    }

    // Administrative triggers.

    pub async fn scan_duplicates(&self) -> Result<Vec<DuplicateGroup>> {
        self.detector.scan().await
    }

    /// Idempotent duplicate cleanup, invokable on demand or on a cadence.
    pub async fn resolve_duplicates(&self) -> Result<usize> {
        self.detector.resolve().await
    }

    pub fn armed_count(&self) -> usize {
        self.scheduler.armed_count()
    }

    pub fn is_armed(&self, reminder_id: &str) -> bool {
        self.scheduler.is_armed(reminder_id)
    }
}
