//! Timer registry: arms one timer per active reminder and advances it on fire.
//!
//! State machine per reminder: Unscheduled -> Scheduled -> Fired ->
//! (Scheduled | Unscheduled). Each armed timer carries a generation number;
//! cancel and reschedule bump the registry entry, so a stale fire that lost
//! the race observes the mismatch and stands down without re-arming.
//!
//! Notification is fire-and-continue: the next occurrence is armed before the
//! notifier is invoked, and delivery failure only reaches the log.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cadence_core::{Result, next_occurrence};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::notify::SharedNotifier;
use crate::store::SharedStore;

struct ArmedTimer {
    generation: u64,
    fire_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

struct Inner {
    store: SharedStore,
    notifier: SharedNotifier,
    /// The one shared mutable structure. Never held across an await.
    timers: Mutex<HashMap<String, ArmedTimer>>,
    generations: AtomicU64,
}

#[derive(Clone)]
pub struct JobScheduler {
    inner: Arc<Inner>,
}

impl JobScheduler {
    pub fn new(store: SharedStore, notifier: SharedNotifier) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                timers: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Arm the reminder's next occurrence, replacing any existing timer for
    /// the same id. Returns whether a timer was armed: inactive reminders and
    /// exhausted one-time schedules cancel and arm nothing.
    pub fn schedule(&self, reminder: &cadence_core::Reminder) -> Result<bool> {
        if !reminder.active {
            self.cancel(&reminder.id);
            return Ok(false);
        }
        reminder.schedule.validate()?;

        let next = match next_occurrence(&reminder.schedule, Utc::now())? {
            Some(next) => next,
            None => {
                // One-time schedule already in the past: terminal Unscheduled.
                self.cancel(&reminder.id);
                tracing::info!(reminder_id = %reminder.id, "no further occurrence; not arming");
                return Ok(false);
            }
        };

        self.inner.arm(reminder, next);
        Ok(true)
    }

    /// Remove the pending timer if present. Safe to call when none exists.
    /// Returns whether a timer was actually removed.
    pub fn cancel(&self, reminder_id: &str) -> bool {
        let removed = {
            let mut timers = self.inner.timers.lock().expect("timer registry poisoned");
            timers.remove(reminder_id)
        };
        match removed {
            Some(timer) => {
                timer.handle.abort();
                tracing::info!(reminder_id, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel + schedule as one step. The registry swap inside `schedule` is
    /// atomic under the registry lock, so a concurrent fire cannot deliver a
    /// stale occurrence in between.
    pub fn reschedule(&self, reminder: &cadence_core::Reminder) -> Result<bool> {
        self.schedule(reminder)
    }

    /// Arm every active reminder from the store. Called once at process
    /// start. A reminder whose schedule fails to resolve is logged and
    /// skipped, never fatal to the batch.
    pub async fn load_all(&self) -> Result<usize> {
        let reminders = self.inner.store.list_active().await?;
        let total = reminders.len();
        let mut armed = 0usize;
        for reminder in &reminders {
            match self.schedule(reminder) {
                Ok(true) => armed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(reminder_id = %reminder.id, error = %e, "skipping unschedulable reminder");
                }
            }
        }
        tracing::info!(armed, total, "startup scheduling complete");
        Ok(armed)
    }

    /// Re-fire the same occurrence context after `delay_minutes`, independent
    /// of the reminder's normal recurrence. The pending next-occurrence timer
    /// is untouched.
    pub async fn snooze(&self, reminder_id: &str, delay_minutes: i64) -> Result<()> {
        let reminder = self
            .inner
            .store
            .get_reminder(reminder_id)
            .await?
            .ok_or_else(|| cadence_core::CadenceError::NotFound(format!("reminder {reminder_id}")))?;

        let tz = reminder.schedule.timezone();
        let scheduled_date = Utc::now().with_timezone(&tz).date_naive();
        let delay = std::time::Duration::from_secs((delay_minutes.max(0) as u64) * 60);
        let inner = Arc::clone(&self.inner);

        tracing::info!(reminder_id = %reminder.id, delay_minutes, "snoozed");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = inner
                .notifier
                .notify(&reminder.user_id, &reminder.id, &reminder.message, scheduled_date)
                .await
            {
                tracing::error!(reminder_id = %reminder.id, error = %e, "snooze delivery failed");
            }
        });
        Ok(())
    }

    /// Abort every armed timer. Owned by the process entry point.
    pub fn shutdown(&self) {
        let mut timers = self.inner.timers.lock().expect("timer registry poisoned");
        for (_, timer) in timers.drain() {
            timer.handle.abort();
        }
        tracing::info!("scheduler shut down");
    }

    pub fn armed_count(&self) -> usize {
        self.inner.timers.lock().expect("timer registry poisoned").len()
    }

    pub fn is_armed(&self, reminder_id: &str) -> bool {
        self.inner
            .timers
            .lock()
            .expect("timer registry poisoned")
            .contains_key(reminder_id)
    }

    pub fn next_fire(&self, reminder_id: &str) -> Option<DateTime<Utc>> {
        self.inner
            .timers
            .lock()
            .expect("timer registry poisoned")
            .get(reminder_id)
            .map(|t| t.fire_at)
    }
}

impl Inner {
    /// Swap in a new timer for the reminder under a single lock acquisition.
    /// The lock is held across the spawn so the new task cannot observe the
    /// registry before its own entry exists. The task carries a snapshot of
    /// the reminder so a fire can proceed even if the store is down then.
    fn arm(self: &Arc<Self>, reminder: &cadence_core::Reminder, fire_at: DateTime<Utc>) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let delay = (fire_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        let mut timers = self.timers.lock().expect("timer registry poisoned");
        let inner = Arc::clone(self);
        let snapshot = reminder.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire(snapshot, generation, fire_at).await;
        });
        if let Some(old) = timers.insert(
            reminder.id.clone(),
            ArmedTimer {
                generation,
                fire_at,
                handle,
            },
        ) {
            old.handle.abort();
        }
        drop(timers);
        tracing::info!(reminder_id = %reminder.id, fire_at = %fire_at, "timer armed");
    }

    /// Remove the entry only if it still belongs to `generation`.
    fn disarm(&self, reminder_id: &str, generation: u64) {
        let mut timers = self.timers.lock().expect("timer registry poisoned");
        if timers.get(reminder_id).map(|t| t.generation) == Some(generation) {
            timers.remove(reminder_id);
        }
    }

    /// Boxed return type breaks the recursive-future cycle so `Send` can be
    /// inferred for the spawned re-arm task.
    fn fire(
        self: Arc<Self>,
        snapshot: cadence_core::Reminder,
        generation: u64,
        fire_at: DateTime<Utc>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        Box::pin(self.fire_inner(snapshot, generation, fire_at))
    }

    async fn fire_inner(
        self: Arc<Self>,
        snapshot: cadence_core::Reminder,
        generation: u64,
        fire_at: DateTime<Utc>,
    ) {
        let reminder_id = snapshot.id.clone();
        // A cancel or reschedule that won the race bumped the entry already.
        {
            let timers = self.timers.lock().expect("timer registry poisoned");
            match timers.get(&reminder_id) {
                Some(t) if t.generation == generation => {}
                _ => return,
            }
        }

        // Refresh from the store; on outage the occurrence still counts as
        // fired and the reminder advances from the armed snapshot rather than
        // wedging. Background failures are never user-visible in real time.
        let reminder = match self.store.get_reminder(&reminder_id).await {
            Ok(Some(r)) => r,
            Ok(None) => {
                self.disarm(&reminder_id, generation);
                return;
            }
            Err(e) => {
                tracing::error!(reminder_id = %reminder_id, error = %e, "store unavailable during fire; using armed snapshot");
                snapshot
            }
        };
        if !reminder.active {
            self.disarm(&reminder_id, generation);
            return;
        }

        let tz = reminder.schedule.timezone();
        // The date this occurrence belongs to is fixed by the armed instant,
        // not by however late the callback actually ran.
        let scheduled_date = fire_at.with_timezone(&tz).date_naive();

        // Advance first; delivery never blocks the state transition.
        let after = fire_at.max(Utc::now());
        let advanced = match next_occurrence(&reminder.schedule, after) {
            Ok(Some(next)) => {
                let mut timers = self.timers.lock().expect("timer registry poisoned");
                match timers.get(&reminder_id) {
                    Some(t) if t.generation == generation => {}
                    // Cancelled while we were reading the store: arm nothing.
                    _ => return,
                }
                let next_generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
                let delay = (next - Utc::now())
                    .to_std()
                    .unwrap_or(std::time::Duration::ZERO);
                let inner = Arc::clone(&self);
                let next_snapshot = reminder.clone();
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.fire(next_snapshot, next_generation, next).await;
                });
                if let Some(old) = timers.insert(
                    reminder_id.clone(),
                    ArmedTimer {
                        generation: next_generation,
                        fire_at: next,
                        handle,
                    },
                ) {
                    // The old entry is this fire's own exhausted timer.
                    old.handle.abort();
                }
                true
            }
            Ok(None) => {
                self.disarm(&reminder_id, generation);
                false
            }
            Err(e) => {
                tracing::error!(reminder_id = %reminder_id, error = %e, "failed to resolve next occurrence");
                self.disarm(&reminder_id, generation);
                false
            }
        };
        tracing::info!(reminder_id = %reminder_id, %scheduled_date, advanced, "fired");

        let inner = Arc::clone(&self);
        let id = reminder_id.clone();
        tokio::spawn(async move {
            if let Err(e) = inner
                .notifier
                .notify(&reminder.user_id, &reminder.id, &reminder.message, scheduled_date)
                .await
            {
                tracing::error!(reminder_id = %id, error = %e, "delivery failed");
            }
        });
    }
}
