//! Duplicate cleanup: deactivate redundant reminders and drop their timers.

use cadence_core::{DuplicateGroup, Result, find_duplicates};

use crate::scheduler::JobScheduler;
use crate::store::SharedStore;

#[derive(Clone)]
pub struct DuplicateDetector {
    store: SharedStore,
    scheduler: JobScheduler,
}

impl DuplicateDetector {
    pub fn new(store: SharedStore, scheduler: JobScheduler) -> Self {
        Self { store, scheduler }
    }

    /// Report duplicate groups without mutating anything.
    pub async fn scan(&self) -> Result<Vec<DuplicateGroup>> {
        let reminders = self.store.list_active().await?;
        Ok(find_duplicates(&reminders))
    }

    /// Deactivate every redundant reminder and cancel its pending timer.
    /// Cancelling is not optional: a deactivated row with a live timer keeps
    /// firing duplicate notifications. Returns the number deactivated;
    /// running twice in a row deactivates nothing the second time.
    pub async fn resolve(&self) -> Result<usize> {
        let groups = self.scan().await?;
        let mut deactivated = 0usize;
        for group in &groups {
            for id in &group.remove_ids {
                if self.store.set_active(id, false).await? {
                    deactivated += 1;
                }
                self.scheduler.cancel(id);
                tracing::info!(
                    reminder_id = %id,
                    kept = %group.keep_id,
                    "duplicate reminder deactivated"
                );
            }
        }
        if !groups.is_empty() {
            tracing::info!(groups = groups.len(), deactivated, "duplicate cleanup finished");
        }
        Ok(deactivated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::store::{MemoryStore, ReminderStore};
    use async_trait::async_trait;
    use cadence_core::{Reminder, ScheduleSpec};
    use chrono::{NaiveDate, TimeZone, Utc, Weekday};
    use std::sync::Arc;

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn notify(
            &self,
            _user_id: &str,
            _reminder_id: &str,
            _message: &str,
            _scheduled_date: NaiveDate,
        ) -> cadence_core::Result<()> {
            Ok(())
        }
    }

    fn water_reminder(id: &str, created_hour: u32) -> Reminder {
        Reminder {
            id: id.to_string(),
            user_id: "u1".to_string(),
            message: "Drink water".to_string(),
            active: true,
            schedule: ScheduleSpec::daily(
                10,
                0,
                chrono_tz::UTC,
                vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                    Weekday::Sat,
                    Weekday::Sun,
                ],
            )
            .unwrap(),
            tracking_enabled: true,
            created_at: Utc.with_ymd_and_hms(2025, 6, 2, created_hour, 0, 0).unwrap(),
        }
    }

    async fn setup() -> (Arc<MemoryStore>, JobScheduler, DuplicateDetector) {
        let store = Arc::new(MemoryStore::new());
        let scheduler = JobScheduler::new(store.clone(), Arc::new(SilentNotifier));
        let detector = DuplicateDetector::new(store.clone(), scheduler.clone());
        (store, scheduler, detector)
    }

    #[tokio::test(start_paused = true)]
    async fn scan_reports_without_mutation() {
        let (store, _scheduler, detector) = setup().await;
        store.insert_reminder(water_reminder("a", 8)).await.unwrap();
        store.insert_reminder(water_reminder("b", 9)).await.unwrap();

        let groups = detector.scan().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep_id, "a");
        assert_eq!(groups[0].duplicate_count, 2);
        assert!(store.get_reminder("b").await.unwrap().unwrap().active);
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_deactivates_later_copy_and_cancels_its_timer() {
        let (store, scheduler, detector) = setup().await;
        let a = water_reminder("a", 8);
        let b = water_reminder("b", 9);
        store.insert_reminder(a.clone()).await.unwrap();
        store.insert_reminder(b.clone()).await.unwrap();
        scheduler.schedule(&a).unwrap();
        scheduler.schedule(&b).unwrap();

        let deactivated = detector.resolve().await.unwrap();
        assert_eq!(deactivated, 1);
        assert!(store.get_reminder("a").await.unwrap().unwrap().active);
        assert!(!store.get_reminder("b").await.unwrap().unwrap().active);
        assert!(scheduler.is_armed("a"));
        assert!(!scheduler.is_armed("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_is_reentrant() {
        let (store, _scheduler, detector) = setup().await;
        store.insert_reminder(water_reminder("a", 8)).await.unwrap();
        store.insert_reminder(water_reminder("b", 9)).await.unwrap();

        assert_eq!(detector.resolve().await.unwrap(), 1);
        assert_eq!(detector.resolve().await.unwrap(), 0);
    }
}
