//! External boundaries: notification delivery and gamification.
//!
//! The engine only needs success/failure for logging; delivery mechanics and
//! reward logic live on the far side of these traits.

use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::{Result, StreakState};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        user_id: &str,
        reminder_id: &str,
        message: &str,
        scheduled_date: NaiveDate,
    ) -> Result<()>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    pub xp_awarded: u32,
    pub achievements_unlocked: Vec<String>,
    pub streak_info: Option<StreakState>,
}

/// Consumed after a completion is recorded. Failures are logged, never
/// propagated: rewards must not block the audit trail.
#[async_trait]
pub trait GamificationSink: Send + Sync {
    async fn report_completion(
        &self,
        user_id: &str,
        reminder_id: &str,
        completed_at: DateTime<Utc>,
        scheduled_time: NaiveTime,
    ) -> Result<RewardSummary>;
}

pub type SharedGamification = Arc<dyn GamificationSink>;

/// Sink for deployments without a gamification service.
pub struct NullGamification;

#[async_trait]
impl GamificationSink for NullGamification {
    async fn report_completion(
        &self,
        _user_id: &str,
        _reminder_id: &str,
        _completed_at: DateTime<Utc>,
        _scheduled_time: NaiveTime,
    ) -> Result<RewardSummary> {
        Ok(RewardSummary {
            xp_awarded: 0,
            achievements_unlocked: vec![],
            streak_info: None,
        })
    }
}
