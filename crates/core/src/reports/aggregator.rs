//! Trial balance aggregation.

use rust_decimal::Decimal;

use super::error::ReportError;
use super::types::{AccountRecord, TrialBalanceSummary, TypeCount};
use super::verifier::BalanceVerifier;

/// Totals account records into a [`TrialBalanceSummary`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TrialBalanceAggregator {
    verifier: BalanceVerifier,
}

impl TrialBalanceAggregator {
    /// Creates an aggregator that checks debits against credits with `verifier`.
    #[must_use]
    pub const fn new(verifier: BalanceVerifier) -> Self {
        Self { verifier }
    }

    /// Sums debits and credits and counts accounts per type.
    ///
    /// Type counts keep the order in which each type first appears.
    pub fn aggregate(&self, records: &[AccountRecord]) -> Result<TrialBalanceSummary, ReportError> {
        let total_debits = checked_sum(records.iter().map(|r| r.debit), "total debits")?;
        let total_credits = checked_sum(records.iter().map(|r| r.credit), "total credits")?;

        let mut account_type_summary: Vec<TypeCount> = Vec::new();
        for record in records {
            let label = record.account_type.as_str();
            match account_type_summary
                .iter_mut()
                .find(|c| c.account_type == label)
            {
                Some(entry) => entry.count += 1,
                None => account_type_summary.push(TypeCount {
                    account_type: label.to_string(),
                    count: 1,
                }),
            }
        }

        Ok(TrialBalanceSummary {
            total_debits,
            total_credits,
            total_accounts: records.len(),
            account_type_summary,
            balance: self.verifier.verify(total_debits, total_credits),
        })
    }
}

/// Adds `values`, failing instead of panicking when the total leaves the
/// `Decimal` range.
pub(crate) fn checked_sum(
    values: impl IntoIterator<Item = Decimal>,
    what: &str,
) -> Result<Decimal, ReportError> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, Decimal::checked_add)
        .ok_or_else(|| ReportError::Overflow(what.to_string()))
}
