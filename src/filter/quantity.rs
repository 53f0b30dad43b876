//! Magnitude parsing for user amounts like "100k", "1.5m" or "2b"

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Non-negative amount parsed from a numeric literal with an optional
/// k/m/b suffix
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Quantity(f64);

impl Quantity {
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_compact(self.0))
    }
}

/// Multiplier for a magnitude suffix letter, case-insensitive
pub fn suffix_multiplier(suffix: char) -> Option<f64> {
    match suffix.to_ascii_lowercase() {
        'k' => Some(1_000.0),
        'm' => Some(1_000_000.0),
        'b' => Some(1_000_000_000.0),
        _ => None,
    }
}

/// Parse a standalone quantity token.
///
/// Whitespace and thousands separators are stripped first. A trailing letter
/// that is not a known suffix rejects the whole token: "100x" is an
/// `InvalidQuantity`, never 100.
pub fn parse_quantity(raw: &str) -> Result<Quantity, ParseError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    let invalid = || ParseError::InvalidQuantity(raw.trim().to_string());

    let (number, multiplier) = match cleaned.chars().last() {
        None => return Err(invalid()),
        Some(last) if last.is_ascii_alphabetic() => {
            let multiplier = suffix_multiplier(last).ok_or_else(invalid)?;
            (&cleaned[..cleaned.len() - 1], multiplier)
        }
        Some(_) => (cleaned.as_str(), 1.0),
    };

    // f64::from_str accepts "inf", "nan" and exponents; only plain decimals are amounts
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(invalid());
    }

    let value: f64 = number.parse().map_err(|_| invalid())?;
    Quantity::new(value * multiplier).ok_or_else(invalid)
}

/// "$1.5M"-style rendering without the currency sign
pub fn format_compact(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("{:.1}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{}", value.trunc() as u64)
    }
}
