//! Duplicate-reminder grouping.
//!
//! Two active reminders are duplicates when they share user, message, local
//! fire time, and timezone. Grouping is pure; deactivation and timer
//! cancellation live in the engine crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Reminder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Earliest-created reminder in the group; ties break to the lowest id.
    pub keep_id: String,
    pub remove_ids: Vec<String>,
    pub duplicate_count: usize,
}

/// Group active reminders by `(user, message, time, timezone)` and report
/// every group of size > 1. Output is ordered by `keep_id` for determinism.
pub fn find_duplicates(reminders: &[Reminder]) -> Vec<DuplicateGroup> {
    let mut groups: BTreeMap<(String, String, String, String), Vec<&Reminder>> = BTreeMap::new();

    for r in reminders.iter().filter(|r| r.active) {
        let key = (
            r.user_id.clone(),
            r.message.clone(),
            r.schedule.time().format("%H:%M").to_string(),
            r.schedule.timezone().name().to_string(),
        );
        groups.entry(key).or_default().push(r);
    }

    let mut out = Vec::new();
    for (_, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let keep = members[0];
        out.push(DuplicateGroup {
            keep_id: keep.id.clone(),
            remove_ids: members[1..].iter().map(|r| r.id.clone()).collect(),
            duplicate_count: members.len(),
        });
    }
    out.sort_by(|a, b| a.keep_id.cmp(&b.keep_id));
    out
}
