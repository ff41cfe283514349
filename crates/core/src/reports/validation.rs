//! Integrity checks over account records before a statement is generated.

use std::collections::{BTreeMap, HashSet};

use finstate_shared::config::ValidationConfig;
use finstate_shared::types::format_amount;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::aggregator::checked_sum;
use super::error::ReportError;
use super::types::AccountRecord;

/// Category label for records without one.
const UNCATEGORIZED: &str = "Uncategorized";

/// Outcome of validating a record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// True when there are no errors. Warnings do not fail validation.
    pub is_valid: bool,
    /// Problems that make the record set unusable as a trial balance.
    pub errors: Vec<String>,
    /// Problems worth a look.
    pub warnings: Vec<String>,
    /// Sum of debits.
    pub total_debits: Decimal,
    /// Sum of credits.
    pub total_credits: Decimal,
    /// Absolute difference between debits and credits.
    pub balance_difference: Decimal,
    /// Number of records checked.
    pub records_processed: usize,
    /// Records with a missing or too-short name.
    pub empty_accounts: usize,
    /// Records with no amounts at all.
    pub zero_amounts: usize,
}

/// Descriptive statistics over a record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordSummary {
    /// Number of records.
    pub total_records: usize,
    /// Records per account type label.
    pub account_types: BTreeMap<String, usize>,
    /// Records per category.
    pub categories: BTreeMap<String, usize>,
    /// Sum of debits.
    pub total_debits: Decimal,
    /// Sum of credits.
    pub total_credits: Decimal,
    /// Largest single debit.
    pub largest_debit: Decimal,
    /// Largest single credit.
    pub largest_credit: Decimal,
    /// Records carrying a non-blank description.
    pub accounts_with_description: usize,
}

impl RecordSummary {
    /// Summarizes `records`.
    pub fn from_records(records: &[AccountRecord]) -> Result<Self, ReportError> {
        let mut account_types = BTreeMap::new();
        let mut categories = BTreeMap::new();
        for record in records {
            *account_types
                .entry(record.account_type.as_str().to_string())
                .or_insert(0) += 1;
            *categories
                .entry(
                    record
                        .category
                        .clone()
                        .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                )
                .or_insert(0) += 1;
        }

        Ok(Self {
            total_records: records.len(),
            account_types,
            categories,
            total_debits: checked_sum(records.iter().map(|r| r.debit), "total debits")?,
            total_credits: checked_sum(records.iter().map(|r| r.credit), "total credits")?,
            largest_debit: records.iter().map(|r| r.debit).max().unwrap_or_default(),
            largest_credit: records.iter().map(|r| r.credit).max().unwrap_or_default(),
            accounts_with_description: records
                .iter()
                .filter(|r| r.description.as_deref().is_some_and(|d| !d.trim().is_empty()))
                .count(),
        })
    }
}

/// Validates account records against [`ValidationConfig`] limits.
#[derive(Debug, Clone)]
pub struct RecordValidator {
    config: ValidationConfig,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl RecordValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Checks totals, names, empty rows, oversized amounts and duplicates.
    #[must_use]
    pub fn validate(&self, records: &[AccountRecord]) -> ValidationReport {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut empty_accounts = 0;
        let mut zero_amounts = 0;

        let total_debits = total_or_error(records.iter().map(|r| r.debit), "total debits", &mut errors);
        let total_credits =
            total_or_error(records.iter().map(|r| r.credit), "total credits", &mut errors);

        for record in records {
            if record.name.chars().count() < self.config.min_account_name_length {
                empty_accounts += 1;
            }

            if record.is_zero() {
                zero_amounts += 1;
            }

            if record.debit > self.config.max_amount || record.credit > self.config.max_amount {
                warnings.push(format!(
                    "Large amount detected in account '{}': ${}",
                    record.name,
                    format_amount(record.debit.max(record.credit))
                ));
            }
        }

        let balance_difference = total_debits.saturating_sub(total_credits).abs();
        if balance_difference > self.config.tolerance {
            errors.push(format!(
                "Trial balance does not balance: Debits (${}) != Credits (${}), Difference: ${}",
                format_amount(total_debits),
                format_amount(total_credits),
                format_amount(balance_difference)
            ));
        }

        if empty_accounts > 0 {
            warnings.push(format!(
                "{empty_accounts} records have missing or invalid account names"
            ));
        }

        if zero_amounts > 0 {
            warnings.push(format!("{zero_amounts} records have zero amounts"));
        }

        let named: Vec<&str> = records
            .iter()
            .map(|r| r.name.as_str())
            .filter(|n| !n.is_empty())
            .collect();
        let distinct: HashSet<&str> = named.iter().copied().collect();
        if distinct.len() != named.len() {
            warnings.push(format!(
                "{} duplicate account names detected",
                named.len() - distinct.len()
            ));
        }

        for warning in &warnings {
            warn!(%warning, "Validation warning");
        }

        let is_valid = errors.is_empty();
        info!(
            passed = is_valid,
            errors = errors.len(),
            warnings = warnings.len(),
            "Validation complete"
        );

        ValidationReport {
            is_valid,
            errors,
            warnings,
            total_debits,
            total_credits,
            balance_difference,
            records_processed: records.len(),
            empty_accounts,
            zero_amounts,
        }
    }
}

/// Sums `values`, recording an error and saturating on overflow.
fn total_or_error(
    values: impl IntoIterator<Item = Decimal>,
    what: &str,
    errors: &mut Vec<String>,
) -> Decimal {
    checked_sum(values, what).unwrap_or_else(|err| {
        errors.push(err.to_string());
        Decimal::MAX
    })
}
