//! Metric identifiers and their free-text aliases

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MarketCap,
    Volume24h,
    HolderCount,
    Liquidity,
}

/// Alias table, longest alias first so "market cap" wins over "mc"-style
/// fragments. Aliases are matched on whole words against lowercased,
/// whitespace-collapsed text.
const ALIASES: &[(&str, Metric)] = &[
    ("market cap", Metric::MarketCap),
    ("24h volume", Metric::Volume24h),
    ("volume 24h", Metric::Volume24h),
    ("marketcap", Metric::MarketCap),
    ("liquidity", Metric::Liquidity),
    ("holders", Metric::HolderCount),
    ("vol 24h", Metric::Volume24h),
    ("volume", Metric::Volume24h),
    ("holder", Metric::HolderCount),
    ("users", Metric::HolderCount),
    ("mcap", Metric::MarketCap),
    ("user", Metric::HolderCount),
    ("liq", Metric::Liquidity),
    ("vol", Metric::Volume24h),
    ("mc", Metric::MarketCap),
];

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::MarketCap,
        Metric::Volume24h,
        Metric::HolderCount,
        Metric::Liquidity,
    ];

    pub fn canonical_name(self) -> &'static str {
        match self {
            Metric::MarketCap => "market_cap",
            Metric::Volume24h => "volume_24h",
            Metric::HolderCount => "holder_count",
            Metric::Liquidity => "liquidity",
        }
    }

    /// Short label used when rendering a filter back to the user
    pub fn label(self) -> &'static str {
        match self {
            Metric::MarketCap => "MC",
            Metric::Volume24h => "Vol",
            Metric::HolderCount => "Holders",
            Metric::Liquidity => "Liquidity",
        }
    }

    /// Whether values of this metric are dollar amounts
    pub fn is_monetary(self) -> bool {
        !matches!(self, Metric::HolderCount)
    }

    pub fn from_canonical(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.canonical_name() == name)
    }

    pub fn aliases(self) -> impl Iterator<Item = &'static str> {
        ALIASES
            .iter()
            .filter(move |(_, metric)| *metric == self)
            .map(|(alias, _)| *alias)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Match the longest metric alias that starts at byte `pos` of `text` and
/// ends on a word boundary. Returns the metric and the alias length in bytes.
pub(crate) fn match_alias_at(text: &str, pos: usize) -> Option<(Metric, usize)> {
    let rest = &text[pos..];
    ALIASES.iter().find_map(|(alias, metric)| {
        if !rest.starts_with(alias) {
            return None;
        }
        let boundary = rest[alias.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        boundary.then_some((*metric, alias.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_table_is_longest_first() {
        let lengths: Vec<usize> = ALIASES.iter().map(|(alias, _)| alias.len()).collect();
        let mut sorted = lengths.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(lengths, sorted);
    }

    #[test]
    fn test_alias_matching_respects_word_boundaries() {
        assert_eq!(match_alias_at("market cap > 1m", 0), Some((Metric::MarketCap, 10)));
        assert_eq!(match_alias_at("mc", 0), Some((Metric::MarketCap, 2)));
        assert_eq!(match_alias_at("vol>5k", 0), Some((Metric::Volume24h, 3)));
        // "volatile" must not be read as "vol"
        assert_eq!(match_alias_at("volatile", 0), None);
        assert_eq!(match_alias_at("holders", 0), Some((Metric::HolderCount, 7)));
    }

    #[test]
    fn test_canonical_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_canonical(metric.canonical_name()), Some(metric));
            assert!(metric.aliases().count() >= 2);
        }
    }
}
