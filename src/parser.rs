// 🔢 Locale Number Parser
// Repairs Brazilian-locale text ("12.345,6", "85,3%", "R$ 25.432,10")
// into plain f64 values.
//
// Thousands and decimal separators share characters, so every rule runs its
// steps in a fixed order: strip grouping dots first, then turn the decimal
// comma into a point, then parse.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CORE TYPES
// ============================================================================

/// NumericRule - which repair pipeline a field goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericRule {
    /// "12.345,6" → 12345.6
    Population,
    /// Already dot-decimal: "0.712"
    Hdi,
    /// "85,3%" → 85.3
    Rate,
    /// "1,85" → 1.85
    Income,
    /// "R$ 25.432,10" → 25432.1
    Currency,
}

impl NumericRule {
    /// Human-readable name for error messages
    pub fn name(&self) -> &str {
        match self {
            NumericRule::Population => "population",
            NumericRule::Hdi => "index",
            NumericRule::Rate => "percentage",
            NumericRule::Income => "decimal",
            NumericRule::Currency => "currency",
        }
    }

    /// Run the repair pipeline for this rule
    pub fn parse(&self, raw: &str) -> Result<f64, NumericParseError> {
        match self {
            NumericRule::Population => parse_population(raw),
            NumericRule::Hdi => parse_hdi(raw),
            NumericRule::Rate => parse_rate(raw),
            NumericRule::Income => parse_income(raw),
            NumericRule::Currency => parse_gdp(raw),
        }
    }

    /// Parse, then require a finite, non-negative result
    pub fn parse_measure(&self, raw: &str) -> Result<f64, NumericParseError> {
        let value = self.parse(raw)?;
        check_measure(*self, raw, value)
    }
}

/// NumericParseError - a value that could not be repaired
#[derive(Debug, Clone, PartialEq)]
pub struct NumericParseError {
    pub rule: NumericRule,
    pub raw: String,
    pub reason: String,
}

impl NumericParseError {
    fn new(rule: NumericRule, raw: &str, reason: impl Into<String>) -> Self {
        NumericParseError {
            rule,
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for NumericParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' is not a valid {} value: {}",
            self.raw,
            self.rule.name(),
            self.reason
        )
    }
}

impl std::error::Error for NumericParseError {}

// ============================================================================
// REPAIR RULES
// ============================================================================

/// Population-like counts: strip `.` grouping, then `,` → `.`
pub fn parse_population(raw: &str) -> Result<f64, NumericParseError> {
    let cleaned = raw.trim().replace('.', "").replace(',', ".");
    to_f64(NumericRule::Population, raw, &cleaned)
}

/// HDI is published dot-decimal already
pub fn parse_hdi(raw: &str) -> Result<f64, NumericParseError> {
    to_f64(NumericRule::Hdi, raw, raw.trim())
}

/// Percentages: `,` → `.`, drop the trailing `%`
pub fn parse_rate(raw: &str) -> Result<f64, NumericParseError> {
    let cleaned = raw.trim().replace(',', ".");
    let cleaned = cleaned.trim_end_matches('%').trim_end();
    to_f64(NumericRule::Rate, raw, cleaned)
}

/// Plain decimal-comma numbers (income in minimum wages, index values)
pub fn parse_income(raw: &str) -> Result<f64, NumericParseError> {
    let cleaned = raw.trim().replace(',', ".");
    to_f64(NumericRule::Income, raw, &cleaned)
}

/// Currency strings: drop the symbol and spaces, strip `.` grouping, then
/// `,` → `.`.
///
/// Input that is already clean dot-decimal ("1234.56") has no comma and no
/// three-digit dot groups, so it passes through unchanged.
pub fn parse_gdp(raw: &str) -> Result<f64, NumericParseError> {
    let trimmed = raw.trim();
    let without_symbol = CURRENCY_SYMBOLS
        .iter()
        .find_map(|symbol| trimmed.strip_prefix(symbol))
        .unwrap_or(trimmed);

    let compact: String = without_symbol
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let cleaned = if compact.contains(',') || has_thousands_grouping(&compact) {
        compact.replace('.', "").replace(',', ".")
    } else {
        compact
    };

    to_f64(NumericRule::Currency, raw, &cleaned)
}

const CURRENCY_SYMBOLS: [&str; 3] = ["R$", "US$", "$"];

/// "25.432" and "1.234.567" are grouped; "1234.56" and "0.5" are not
fn has_thousands_grouping(s: &str) -> bool {
    let mut parts = s.split('.');
    let head = parts.next().unwrap_or("");
    let tail: Vec<&str> = parts.collect();

    !tail.is_empty()
        && !head.is_empty()
        && head.len() <= 3
        && tail
            .iter()
            .all(|group| group.len() == 3 && group.chars().all(|c| c.is_ascii_digit()))
}

fn to_f64(rule: NumericRule, raw: &str, cleaned: &str) -> Result<f64, NumericParseError> {
    if cleaned.is_empty() {
        return Err(NumericParseError::new(rule, raw, "empty value"));
    }
    cleaned
        .parse::<f64>()
        .map_err(|e| NumericParseError::new(rule, raw, e.to_string()))
}

fn check_measure(rule: NumericRule, raw: &str, value: f64) -> Result<f64, NumericParseError> {
    if !value.is_finite() {
        return Err(NumericParseError::new(rule, raw, "value is not finite"));
    }
    if value < 0.0 {
        return Err(NumericParseError::new(rule, raw, "value is negative"));
    }
    Ok(value)
}

/// Validate a value that arrived already numeric (e.g. a spreadsheet cell)
pub fn validate_measure(rule: NumericRule, value: f64) -> Result<f64, NumericParseError> {
    check_measure(rule, &value.to_string(), value)
}

// ============================================================================
// TESTS
// ============================================================================
