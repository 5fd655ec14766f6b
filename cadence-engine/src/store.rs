//! Persistence boundary for reminders and their occurrence history.
//!
//! Storage technology is external; this trait is the whole contract. The
//! in-memory implementation backs tests and embeds the single place the
//! one-record-per-date invariant is enforced.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::{CadenceError, CompletionRecord, Reminder, Result, SkipRecord};
use chrono::NaiveDate;
use tokio::sync::RwLock;

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn insert_reminder(&self, reminder: Reminder) -> Result<()>;
    async fn update_reminder(&self, reminder: Reminder) -> Result<()>;
    /// Returns true when the flag actually changed.
    async fn set_active(&self, reminder_id: &str, active: bool) -> Result<bool>;
    /// Removes the reminder but keeps its completion/skip history (audit trail).
    async fn delete_reminder(&self, reminder_id: &str) -> Result<()>;
    async fn get_reminder(&self, reminder_id: &str) -> Result<Option<Reminder>>;
    async fn list_active(&self) -> Result<Vec<Reminder>>;
    async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Reminder>>;

    /// Upsert keyed by `(reminder_id, scheduled_date)`, dropping any skip
    /// for the same date. At most one record survives per occurrence.
    async fn upsert_completion(&self, record: CompletionRecord) -> Result<()>;
    /// Symmetric: drops any completion for the same date.
    async fn upsert_skip(&self, record: SkipRecord) -> Result<()>;
    /// Mutates only the note of an existing completion.
    async fn update_note(
        &self,
        reminder_id: &str,
        scheduled_date: NaiveDate,
        note: Option<String>,
    ) -> Result<()>;
    async fn completions_for(&self, reminder_id: &str) -> Result<Vec<CompletionRecord>>;
    async fn skips_for(&self, reminder_id: &str) -> Result<Vec<SkipRecord>>;
}

pub type SharedStore = Arc<dyn ReminderStore>;

/// In-memory reference store. Row-level consistency only; readers never need
/// a whole-store freeze.
#[derive(Default)]
pub struct MemoryStore {
    reminders: RwLock<HashMap<String, Reminder>>,
    completions: RwLock<HashMap<(String, NaiveDate), CompletionRecord>>,
    skips: RwLock<HashMap<(String, NaiveDate), SkipRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn insert_reminder(&self, reminder: Reminder) -> Result<()> {
        self.reminders
            .write()
            .await
            .insert(reminder.id.clone(), reminder);
        Ok(())
    }

    async fn update_reminder(&self, reminder: Reminder) -> Result<()> {
        let mut map = self.reminders.write().await;
        if !map.contains_key(&reminder.id) {
            return Err(CadenceError::NotFound(format!("reminder {}", reminder.id)));
        }
        map.insert(reminder.id.clone(), reminder);
        Ok(())
    }

    async fn set_active(&self, reminder_id: &str, active: bool) -> Result<bool> {
        let mut map = self.reminders.write().await;
        let r = map
            .get_mut(reminder_id)
            .ok_or_else(|| CadenceError::NotFound(format!("reminder {reminder_id}")))?;
        let changed = r.active != active;
        r.active = active;
        Ok(changed)
    }

    async fn delete_reminder(&self, reminder_id: &str) -> Result<()> {
        let mut map = self.reminders.write().await;
        map.remove(reminder_id)
            .ok_or_else(|| CadenceError::NotFound(format!("reminder {reminder_id}")))?;
        Ok(())
    }

    async fn get_reminder(&self, reminder_id: &str) -> Result<Option<Reminder>> {
        Ok(self.reminders.read().await.get(reminder_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Reminder>> {
        let mut out: Vec<Reminder> = self
            .reminders
            .read()
            .await
            .values()
            .filter(|r| r.active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Reminder>> {
        let mut out: Vec<Reminder> = self
            .reminders
            .read()
            .await
            .values()
            .filter(|r| r.active && r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn upsert_completion(&self, record: CompletionRecord) -> Result<()> {
        let key = (record.reminder_id.clone(), record.scheduled_date);
        // Hold both locks so no reader sees two records for one date.
        let mut completions = self.completions.write().await;
        let mut skips = self.skips.write().await;
        skips.remove(&key);
        completions.insert(key, record);
        Ok(())
    }

    async fn upsert_skip(&self, record: SkipRecord) -> Result<()> {
        let key = (record.reminder_id.clone(), record.scheduled_date);
        let mut completions = self.completions.write().await;
        let mut skips = self.skips.write().await;
        completions.remove(&key);
        skips.insert(key, record);
        Ok(())
    }

    async fn update_note(
        &self,
        reminder_id: &str,
        scheduled_date: NaiveDate,
        note: Option<String>,
    ) -> Result<()> {
        let mut completions = self.completions.write().await;
        let record = completions
            .get_mut(&(reminder_id.to_string(), scheduled_date))
            .ok_or_else(|| {
                CadenceError::NotFound(format!(
                    "completion for reminder {reminder_id} on {scheduled_date}"
                ))
            })?;
        record.note = note;
        Ok(())
    }

    async fn completions_for(&self, reminder_id: &str) -> Result<Vec<CompletionRecord>> {
        let mut out: Vec<CompletionRecord> = self
            .completions
            .read()
            .await
            .values()
            .filter(|c| c.reminder_id == reminder_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.scheduled_date);
        Ok(out)
    }

    async fn skips_for(&self, reminder_id: &str) -> Result<Vec<SkipRecord>> {
        let mut out: Vec<SkipRecord> = self
            .skips
            .read()
            .await
            .values()
            .filter(|s| s.reminder_id == reminder_id)
            .cloned()
            .collect();
        out.sort_by_key(|s| s.scheduled_date);
        Ok(out)
    }
}
