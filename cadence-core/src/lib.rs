//! cadence-core: pure reminder scheduling, streak, and analytics logic.
//!
//! Everything here is synchronous and clock-injected; the async runtime,
//! persistence boundary, and timers live in `cadence-engine`.

pub mod analytics;
pub mod duplicate;
pub mod error;
pub mod model;
pub mod resolver;
pub mod streak;
pub mod suggest;

pub use analytics::{AnalyticsSnapshot, WeekdayStats, snapshot};
pub use duplicate::{DuplicateGroup, find_duplicates};
pub use error::{CadenceError, Result};
pub use model::{CompletionRecord, Reminder, ScheduleSpec, SkipReason, SkipRecord};
pub use resolver::{expected_dates, local_instant, next_occurrence, occurrence_elapsed};
pub use streak::{StreakPolicy, StreakState, StreakStatus, compute_streak};
pub use suggest::{
    ProposedChange, Suggestion, SuggestionKind, SuggestionThresholds, suggest,
};
