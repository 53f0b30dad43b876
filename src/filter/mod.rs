//! Criteria filters: quantities, metric aliases, free-text parsing and presets

pub mod age;
pub mod metric;
pub mod parser;
pub mod presets;
pub mod quantity;
pub mod saved;

pub use age::AgeWindow;
pub use metric::Metric;
pub use parser::{parse_filter, FilterParser, ParsedFilter};
pub use presets::{list_presets, preset, Preset, PRESETS};
pub use quantity::{parse_quantity, Quantity};
pub use saved::{SavedFilter, SavedFilterStore};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Bound direction of a constraint. Bare mentions and "=" read as a minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    AtLeast,
    AtMost,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::AtLeast => "≥",
            Comparator::AtMost => "≤",
        }
    }

    pub fn accepts(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparator::AtLeast => value >= threshold,
            Comparator::AtMost => value <= threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub metric: Metric,
    pub comparator: Comparator,
    pub threshold: Quantity,
}

impl Constraint {
    pub fn new(metric: Metric, comparator: Comparator, threshold: Quantity) -> Self {
        Self { metric, comparator, threshold }
    }

    pub fn at_least(metric: Metric, value: f64) -> Option<Self> {
        Quantity::new(value).map(|q| Self::new(metric, Comparator::AtLeast, q))
    }

    pub fn at_most(metric: Metric, value: f64) -> Option<Self> {
        Quantity::new(value).map(|q| Self::new(metric, Comparator::AtMost, q))
    }

    pub fn accepts(&self, value: f64) -> bool {
        self.comparator.accepts(value, self.threshold.value())
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let currency = if self.metric.is_monetary() { "$" } else { "" };
        let amount = if self.metric.is_monetary() {
            self.threshold.to_string()
        } else {
            format!("{}", self.threshold.value().trunc() as u64)
        };
        write!(f, "{} {} {}{}", self.metric.label(), self.comparator.symbol(), currency, amount)
    }
}

/// At most one constraint per metric; a later constraint on the same metric
/// replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    constraints: BTreeMap<Metric, Constraint>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_constraints(constraints: impl IntoIterator<Item = Constraint>) -> Self {
        let mut set = Self::new();
        for constraint in constraints {
            set.insert(constraint);
        }
        set
    }

    /// Upsert; returns the constraint that was replaced, if any
    pub fn insert(&mut self, constraint: Constraint) -> Option<Constraint> {
        self.constraints.insert(constraint.metric, constraint)
    }

    /// Set one bound from a user-typed amount, as the interactive builder does
    pub fn with_bound_text(
        mut self,
        metric: Metric,
        comparator: Comparator,
        raw_quantity: &str,
    ) -> Result<Self, ParseError> {
        let threshold = parse_quantity(raw_quantity)?;
        self.insert(Constraint::new(metric, comparator, threshold));
        Ok(self)
    }

    pub fn without(mut self, metric: Metric) -> Self {
        self.constraints.remove(&metric);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<&Constraint> {
        self.constraints.get(&metric)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.values()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}

impl fmt::Display for FilterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("No filters applied");
        }
        let parts: Vec<String> = self.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(" | "))
    }
}

/// What the presentation layer hands over for a listing search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRequest {
    Preset(String),
    Text(String),
}

/// Presets bypass the parser; free text is parsed best-effort. Text that
/// resolves to nothing because of a bad amount is rejected as a whole.
pub fn resolve_request(request: &FilterRequest) -> Result<FilterSet, ParseError> {
    match request {
        FilterRequest::Preset(key) => preset(key)
            .map(|p| p.filters())
            .ok_or_else(|| ParseError::UnresolvableFilter(key.clone())),
        FilterRequest::Text(raw) => {
            let parsed = FilterParser::new().parse_detailed(raw);
            if parsed.filters.is_empty() {
                let invalid = parsed
                    .rejected
                    .into_iter()
                    .find(|e| matches!(e, ParseError::InvalidQuantity(_)));
                if let Some(err) = invalid {
                    return Err(err);
                }
            }
            Ok(parsed.filters)
        }
    }
}
