//! Token age bounds, measured from a listing's discovery time

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::ListingSettings;

/// Seven days, the default ceiling on listing age
pub const DEFAULT_MAX_AGE_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeWindow {
    pub min: Option<Duration>,
    pub max: Option<Duration>,
}

impl Default for AgeWindow {
    fn default() -> Self {
        Self::minutes(0, Some(DEFAULT_MAX_AGE_MINUTES))
    }
}

impl AgeWindow {
    pub fn unbounded() -> Self {
        Self { min: None, max: None }
    }

    /// A zero minimum means no lower bound
    pub fn minutes(min: u64, max: Option<u64>) -> Self {
        let to_duration = |m: u64| Duration::from_secs(m.saturating_mul(60));
        Self {
            min: (min > 0).then(|| to_duration(min)),
            max: max.map(to_duration),
        }
    }

    pub fn from_settings(settings: &ListingSettings) -> Self {
        Self::minutes(settings.min_age_minutes, settings.max_age_minutes)
    }

    /// Inclusive at both ends. A discovery time in the future counts as age zero.
    pub fn accepts(&self, discovered_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let age = (now - discovered_at).to_std().unwrap_or(Duration::ZERO);
        self.min.map_or(true, |min| age >= min) && self.max.map_or(true, |max| age <= max)
    }
}
