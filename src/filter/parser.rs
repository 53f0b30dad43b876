//! Best-effort free-text filter parsing
//!
//! Input like "100k mc, vol > 50k and 100+ holders" is split into clauses on
//! commas, semicolons, newlines and the word "and". Each clause is tokenized
//! into metric aliases, comparators and quantities, which are grouped into
//! constraints in either order ("mc > 1m" or "1m mc"). "no" or "not" flips
//! the comparator that follows it, so "no more than 1m mc" is a ceiling.
//! Clauses that do not resolve are dropped and reported, never fatal.

use tracing::{debug, info};

use super::metric::match_alias_at;
use super::quantity::parse_quantity;
use super::{Comparator, Constraint, FilterSet, Metric, Quantity};
use crate::error::ParseError;

const WORD_COMPARATORS: &[(&str, Comparator)] = &[
    ("over", Comparator::AtLeast),
    ("above", Comparator::AtLeast),
    ("min", Comparator::AtLeast),
    ("minimum", Comparator::AtLeast),
    ("least", Comparator::AtLeast),
    ("more", Comparator::AtLeast),
    ("under", Comparator::AtMost),
    ("below", Comparator::AtMost),
    ("max", Comparator::AtMost),
    ("maximum", Comparator::AtMost),
    ("most", Comparator::AtMost),
    ("less", Comparator::AtMost),
];

const NEGATIONS: &[&str] = &["no", "not"];

/// Parse result including what was dropped along the way
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFilter {
    pub filters: FilterSet,
    pub rejected: Vec<ParseError>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Metric(Metric),
    Comparator(Comparator),
    Quantity(Quantity),
    Invalid(String),
}

#[derive(Debug, Default)]
struct PendingClause {
    metric: Option<Metric>,
    comparator: Option<Comparator>,
    quantity: Option<Quantity>,
}

impl PendingClause {
    fn is_blank(&self) -> bool {
        self.metric.is_none() && self.quantity.is_none()
    }

    fn complete(&mut self) -> Option<Constraint> {
        match (self.metric, self.quantity) {
            (Some(metric), Some(quantity)) => {
                let comparator = self.comparator.unwrap_or(Comparator::AtLeast);
                *self = PendingClause::default();
                Some(Constraint::new(metric, comparator, quantity))
            }
            _ => None,
        }
    }
}

/// Stateless; identical text always yields an identical `FilterSet`
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterParser;

impl FilterParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, text: &str) -> FilterSet {
        self.parse_detailed(text).filters
    }

    pub fn parse_detailed(&self, text: &str) -> ParsedFilter {
        let mut parsed = ParsedFilter::default();

        for clause in split_clauses(text) {
            let mut pending = PendingClause::default();
            let mut resolved_any = false;

            for token in tokenize(&clause) {
                match token {
                    Token::Metric(metric) => {
                        if pending.metric.is_some() {
                            // two metrics without a quantity in between
                            parsed.rejected.push(ParseError::UnresolvableFilter(clause.clone()));
                            pending = PendingClause::default();
                        }
                        pending.metric = Some(metric);
                    }
                    Token::Comparator(comparator) => pending.comparator = Some(comparator),
                    Token::Quantity(quantity) => pending.quantity = Some(quantity),
                    Token::Invalid(raw) => {
                        debug!("Dropping clause {:?}: invalid quantity {:?}", clause, raw);
                        parsed.rejected.push(ParseError::InvalidQuantity(raw));
                        pending = PendingClause::default();
                    }
                }

                if let Some(constraint) = pending.complete() {
                    if let Some(previous) = parsed.filters.insert(constraint) {
                        debug!("Constraint {} replaced by {}", previous, constraint);
                    }
                    resolved_any = true;
                }
            }

            if !pending.is_blank() || !resolved_any {
                debug!("Unresolvable clause dropped: {:?}", clause);
                let error = ParseError::UnresolvableFilter(clause.clone());
                if !parsed.rejected.contains(&error) {
                    parsed.rejected.push(error);
                }
            }
        }

        info!("Parsed filters: {}", parsed.filters);
        parsed
    }
}

/// Convenience wrapper around [`FilterParser::parse`]
pub fn parse_filter(text: &str) -> FilterSet {
    FilterParser::new().parse(text)
}

/// Lowercase, whitespace-collapsed clauses. A comma between two digits is a
/// thousands separator, not a clause break.
fn split_clauses(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let chars: Vec<char> = lowered.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let thousands = c == ','
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if (c == ',' && !thousands) || c == ';' || c == '\n' {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    segments.push(current);

    segments
        .iter()
        .map(|segment| segment.split_whitespace().collect::<Vec<_>>().join(" "))
        .flat_map(|segment| {
            segment
                .split(" and ")
                .map(|clause| clause.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|clause| !clause.is_empty())
        .collect()
}

fn tokenize(clause: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    // a negation applies to the next comparator only
    let mut negated = false;

    while let Some(c) = clause[pos..].chars().next() {
        let word_start = clause[..pos]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_ascii_alphanumeric());

        if word_start {
            if let Some((metric, len)) = match_alias_at(clause, pos) {
                tokens.push(Token::Metric(metric));
                negated = false;
                pos += len;
                continue;
            }
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && clause[pos + 1..].starts_with(|n: char| n.is_ascii_digit()));
        if starts_number {
            let end = scan_quantity(clause, pos);
            let raw = &clause[pos..end];
            tokens.push(match parse_quantity(raw) {
                Ok(quantity) => Token::Quantity(quantity),
                Err(_) => Token::Invalid(raw.to_string()),
            });
            negated = false;
            pos = end;
            continue;
        }

        match c {
            '>' | '<' | '=' => {
                let end = run_end(clause, pos, |ch| matches!(ch, '>' | '<' | '='));
                if let Some(comparator) = symbol_comparator(&clause[pos..end]) {
                    push_comparator(&mut tokens, &mut negated, comparator);
                }
                pos = end;
            }
            '+' | '≥' => {
                push_comparator(&mut tokens, &mut negated, Comparator::AtLeast);
                pos += c.len_utf8();
            }
            '≤' => {
                push_comparator(&mut tokens, &mut negated, Comparator::AtMost);
                pos += c.len_utf8();
            }
            _ if c.is_alphabetic() => {
                let end = run_end(clause, pos, char::is_alphanumeric);
                let word = &clause[pos..end];
                let comparator = WORD_COMPARATORS.iter().find(|(w, _)| *w == word);
                if NEGATIONS.contains(&word) {
                    negated = true;
                } else if let Some((_, comparator)) = comparator {
                    push_comparator(&mut tokens, &mut negated, *comparator);
                }
                pos = end;
            }
            _ => pos += c.len_utf8(),
        }
    }

    tokens
}

fn push_comparator(tokens: &mut Vec<Token>, negated: &mut bool, comparator: Comparator) {
    let comparator = match (std::mem::take(negated), comparator) {
        (true, Comparator::AtLeast) => Comparator::AtMost,
        (true, Comparator::AtMost) => Comparator::AtLeast,
        (false, comparator) => comparator,
    };
    tokens.push(Token::Comparator(comparator));
}

/// Digits, decimal points and thousands commas, then any letters glued to
/// the number (a suffix candidate, validated by `parse_quantity`)
fn scan_quantity(clause: &str, start: usize) -> usize {
    let bytes = clause.as_bytes();
    let mut end = start;
    while end < bytes.len() {
        let b = bytes[end];
        let thousands = b == b',' && bytes.get(end + 1).is_some_and(u8::is_ascii_digit);
        if b.is_ascii_digit() || b == b'.' || thousands {
            end += 1;
        } else {
            break;
        }
    }
    while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
        end += 1;
    }
    end
}

fn run_end(clause: &str, start: usize, keep: impl Fn(char) -> bool) -> usize {
    clause[start..]
        .char_indices()
        .find(|(_, ch)| !keep(*ch))
        .map_or(clause.len(), |(offset, _)| start + offset)
}

fn symbol_comparator(symbols: &str) -> Option<Comparator> {
    let has_gt = symbols.contains('>');
    let has_lt = symbols.contains('<');
    match (has_gt, has_lt) {
        (true, false) => Some(Comparator::AtLeast),
        (false, true) => Some(Comparator::AtMost),
        // plain "=" reads as a minimum
        (false, false) => Some(Comparator::AtLeast),
        (true, true) => None,
    }
}
