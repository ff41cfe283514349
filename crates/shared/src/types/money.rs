//! Decimal formatting and parsing for statement amounts.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount in the system is a `rust_decimal::Decimal`; this module is
//! the only place amounts turn into text and back.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Decimal places shown for monetary amounts.
pub const AMOUNT_DP: u32 = 2;

/// Decimal places shown for percentages.
pub const PERCENT_DP: u32 = 1;

/// Currency symbols stripped from amount strings before parsing.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₩', '₽'];

/// Error returned when an amount string is not a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount: {0:?}")]
pub struct AmountParseError(pub String);

/// Formats an amount with exactly two decimal places, rounding half away from zero.
///
/// The currency symbol is not included; templates place it.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    format_fixed(amount, AMOUNT_DP)
}

/// Formats a percentage value (already multiplied by 100) with one decimal place.
#[must_use]
pub fn format_percent(value: Decimal) -> String {
    format_fixed(value, PERCENT_DP)
}

fn format_fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    // -0.004 rounds to a negative zero
    let rounded = if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    };
    format!("{rounded:.prec$}", prec = dp as usize)
}

/// Parses a human-entered amount.
///
/// Accepts currency symbols, thousands separators, a decimal comma
/// (`12,50`), leading signs and accounting negatives (`(1,200.00)`).
/// Blank cells and the spreadsheet placeholders `nan`, `null` and `none`
/// read as zero. Anything else that is not a number is an error.
pub fn parse_amount(raw: &str) -> Result<Decimal, AmountParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || ["nan", "null", "none"]
            .iter()
            .any(|p| trimmed.eq_ignore_ascii_case(p))
    {
        return Ok(Decimal::ZERO);
    }

    let invalid = || AmountParseError(raw.to_string());

    let mut cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    let parenthesized = cleaned.starts_with('(') && cleaned.ends_with(')');
    if parenthesized {
        cleaned = cleaned[1..cleaned.len() - 1].to_string();
    }

    if !cleaned.chars().any(|c| c.is_ascii_digit())
        || cleaned
            .chars()
            .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+')))
    {
        return Err(invalid());
    }

    let normalized = normalize_separators(&cleaned);
    let amount = Decimal::from_str(&normalized).map_err(|_| invalid())?;

    Ok(if parenthesized { -amount.abs() } else { amount })
}

/// Resolves `,` into either a thousands separator or a decimal comma.
fn normalize_separators(value: &str) -> String {
    if !value.contains(',') {
        return value.to_string();
    }
    if value.contains('.') {
        return value.replace(',', "");
    }
    match value.split_once(',') {
        Some((whole, frac)) if !frac.contains(',') && frac.len() <= 2 => {
            format!("{whole}.{frac}")
        }
        _ => value.replace(',', ""),
    }
}
