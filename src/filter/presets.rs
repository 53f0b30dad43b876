//! Named filter shortcuts offered as buttons by the front end

use super::{Comparator, Constraint, FilterSet, Metric, Quantity};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preset {
    pub key: &'static str,
    pub name: &'static str,
    pub metric: Metric,
    pub comparator: Comparator,
    pub threshold: f64,
}

impl Preset {
    pub fn filters(&self) -> FilterSet {
        Quantity::new(self.threshold)
            .map(|q| FilterSet::from_constraints([Constraint::new(self.metric, self.comparator, q)]))
            .unwrap_or_default()
    }
}

pub const PRESETS: &[Preset] = &[
    Preset {
        key: "high_mc",
        name: "High MC (100k+)",
        metric: Metric::MarketCap,
        comparator: Comparator::AtLeast,
        threshold: 100_000.0,
    },
    Preset {
        key: "high_vol",
        name: "High Vol (10k+)",
        metric: Metric::Volume24h,
        comparator: Comparator::AtLeast,
        threshold: 10_000.0,
    },
    Preset {
        key: "active_users",
        name: "Active Users (100+ holders)",
        metric: Metric::HolderCount,
        comparator: Comparator::AtLeast,
        threshold: 100.0,
    },
    Preset {
        key: "small_cap",
        name: "Small Cap (<1M MC)",
        metric: Metric::MarketCap,
        comparator: Comparator::AtMost,
        threshold: 1_000_000.0,
    },
    Preset {
        key: "high_liquidity",
        name: "High Liquidity (50k+)",
        metric: Metric::Liquidity,
        comparator: Comparator::AtLeast,
        threshold: 50_000.0,
    },
];

/// Exact key lookup
pub fn preset(key: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.key == key)
}

/// (key, display name) pairs in menu order
pub fn list_presets() -> Vec<(&'static str, &'static str)> {
    PRESETS.iter().map(|p| (p.key, p.name)).collect()
}
