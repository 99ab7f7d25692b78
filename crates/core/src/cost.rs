//! Cost parsing for stage, task, and invoice amounts.
//!
//! Costs arrive either as plain integers or as currency-formatted strings
//! such as `"₦1,234,567"`. Two parsers are provided:
//!
//! - [`parse_cost`] is permissive: anything it cannot read becomes `0`. It is
//!   used when loading stored timelines, which may predate validation.
//! - [`parse_required_cost`] backs every mutation and rejects missing or
//!   malformed input with [`CoreError::Validation`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// A cost as supplied by a client: either a number or formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CostInput {
    Amount(i64),
    Text(String),
}

impl From<i64> for CostInput {
    fn from(value: i64) -> Self {
        Self::Amount(value)
    }
}

impl From<&str> for CostInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Keep only ASCII digits, dropping currency symbols, separators and signs.
fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize a cost into an integer, defaulting to `0`.
///
/// Numbers are returned unchanged. Strings have every non-digit character
/// stripped and are parsed as an integer; empty or unparseable strings (and a
/// missing value) yield `0`.
pub fn parse_cost(value: Option<&CostInput>) -> i64 {
    match value {
        Some(CostInput::Amount(amount)) => *amount,
        Some(CostInput::Text(text)) => digits_only(text).parse().unwrap_or(0),
        None => 0,
    }
}

/// Parse a cost that must be present and well formed.
///
/// `field` names the input in the error message.
pub fn parse_required_cost(field: &str, value: Option<&CostInput>) -> Result<i64, CoreError> {
    match value {
        None => Err(CoreError::Validation(format!("{field} is required"))),
        Some(CostInput::Amount(amount)) if *amount < 0 => Err(CoreError::Validation(format!(
            "{field} must not be negative, got {amount}"
        ))),
        Some(CostInput::Amount(amount)) => Ok(*amount),
        Some(CostInput::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(CoreError::Validation(format!("{field} is required")));
            }
            if trimmed.starts_with('-') {
                return Err(CoreError::Validation(format!(
                    "{field} must not be negative, got '{trimmed}'"
                )));
            }
            if trimmed.contains('.') {
                return Err(CoreError::Validation(format!(
                    "{field} must be a whole amount, got '{trimmed}'"
                )));
            }
            let digits = digits_only(trimmed);
            if digits.is_empty() {
                return Err(CoreError::Validation(format!(
                    "{field} must contain a numeric amount, got '{trimmed}'"
                )));
            }
            digits
                .parse()
                .map_err(|_| CoreError::Validation(format!("{field} is too large: '{trimmed}'")))
        }
    }
}

/// Currency symbol used when presenting amounts to people.
pub const CURRENCY_SYMBOL: &str = "₦";

/// Render an amount with thousands separators, e.g. `₦1,234,567`.
pub fn format_cost(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}{CURRENCY_SYMBOL}{grouped}")
}

/// Shapes a cost may take in previously stored documents.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCost {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Serde adapter reading a stored cost leniently (see [`parse_cost`]).
///
/// Fractional numbers are truncated; `null` becomes `0`.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let stored = Option::<StoredCost>::deserialize(deserializer)?;
    Ok(match stored {
        Some(StoredCost::Integer(amount)) => amount,
        Some(StoredCost::Float(amount)) => amount.trunc() as i64,
        Some(StoredCost::Text(text)) => parse_cost(Some(&CostInput::Text(text))),
        None => 0,
    })
}
