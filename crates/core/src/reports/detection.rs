//! Picking a statement layout for a record set.

use tracing::debug;

use super::types::{AccountRecord, StatementKind};

/// Chooses the statement that best fits `records`.
///
/// Balance-sheet accounts must outnumber income-statement accounts and make
/// up at least 60% of the records for a balance sheet; income-statement
/// accounts must outnumber balance-sheet accounts and make up at least 50%
/// for a profit & loss statement. Everything else, including an empty set,
/// becomes a trial balance. Cash flow statements are never inferred.
#[must_use]
pub fn detect_statement_kind(records: &[AccountRecord]) -> StatementKind {
    if records.is_empty() {
        return StatementKind::TrialBalance;
    }

    let total = records.len();
    let balance_sheet = records
        .iter()
        .filter(|r| r.account_type.is_balance_sheet())
        .count();
    let income = records
        .iter()
        .filter(|r| r.account_type.is_income_statement())
        .count();

    debug!(balance_sheet, income, total, "Statement detection indicators");

    // integer form of `bs >= 0.6 * n` and `is >= 0.5 * n`
    if balance_sheet > income && balance_sheet * 10 >= total * 6 {
        StatementKind::BalanceSheet
    } else if income > balance_sheet && income * 2 >= total {
        StatementKind::ProfitLoss
    } else {
        StatementKind::TrialBalance
    }
}
