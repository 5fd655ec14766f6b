//! cadence-engine: the async runtime half of cadence.
//!
//! Owns the persistence boundary, the timer scheduler, completion tracking,
//! duplicate cleanup, and the `ReminderEngine` facade that wires them.

pub mod config;
pub mod detector;
pub mod engine;
pub mod insights;
pub mod notify;
pub mod scheduler;
pub mod store;
pub mod tracker;

pub use config::EngineConfig;
pub use detector::DuplicateDetector;
pub use engine::{NewReminder, ReminderEngine, ReminderPatch};
pub use insights::{Insights, ReminderComparison};
pub use notify::{
    GamificationSink, Notifier, NullGamification, RewardSummary, SharedGamification,
    SharedNotifier,
};
pub use scheduler::JobScheduler;
pub use store::{MemoryStore, ReminderStore, SharedStore};
pub use tracker::{CompletionOutcome, CompletionTracker};
