//! Engine configuration, loadable from TOML.

use anyhow::{Context, Result};
use cadence_core::{StreakPolicy, SuggestionThresholds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub streaks: StreakSection,
    #[serde(default)]
    pub analytics: AnalyticsSection,
    #[serde(default = "SuggestionThresholds::default")]
    pub suggestions: SuggestionThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakSection {
    /// Minutes past the scheduled time before an unresolved occurrence
    /// counts as missed. The grace boundary is deliberately configurable.
    pub grace_minutes: i64,
    pub lookback_days: u32,
}

impl Default for StreakSection {
    fn default() -> Self {
        Self {
            grace_minutes: 0,
            lookback_days: 365,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSection {
    /// Default window for snapshots when the caller does not pass one.
    pub default_period_days: u32,
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            default_period_days: 30,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            streaks: StreakSection::default(),
            analytics: AnalyticsSection::default(),
            suggestions: SuggestionThresholds::default(),
        }
    }
}

impl EngineConfig {
    pub fn streak_policy(&self) -> StreakPolicy {
        StreakPolicy {
            grace_minutes: self.streaks.grace_minutes,
            lookback_days: self.streaks.lookback_days,
        }
    }

    /// Load from a TOML file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&s).with_context(|| format!("parse {}", path.display()))
    }
}
