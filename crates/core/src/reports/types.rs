//! Report data types.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ReportError;

/// Account classification.
///
/// Known types parse case-insensitively; anything else is kept verbatim in
/// [`AccountType::Other`] so type summaries never lose information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    /// Asset account.
    Asset,
    /// Liability account.
    Liability,
    /// Equity account.
    Equity,
    /// Revenue account.
    Revenue,
    /// Expense account.
    Expense,
    /// Account whose type could not be inferred.
    Unknown,
    /// Any other label supplied by the input.
    Other(String),
}

impl AccountType {
    /// Returns the display label (`Asset`, `Liability`, ...).
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Asset => "Asset",
            Self::Liability => "Liability",
            Self::Equity => "Equity",
            Self::Revenue => "Revenue",
            Self::Expense => "Expense",
            Self::Unknown => "Unknown",
            Self::Other(label) => label,
        }
    }

    /// Returns true for asset, liability and equity accounts.
    #[must_use]
    pub fn is_balance_sheet(&self) -> bool {
        matches!(self, Self::Asset | Self::Liability | Self::Equity)
    }

    /// Returns true for revenue and expense accounts.
    #[must_use]
    pub fn is_income_statement(&self) -> bool {
        matches!(self, Self::Revenue | Self::Expense)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_lowercase().as_str() {
            "asset" | "assets" => Self::Asset,
            "liability" | "liabilities" => Self::Liability,
            "equity" => Self::Equity,
            "revenue" | "income" => Self::Revenue,
            "expense" | "expenses" => Self::Expense,
            "" | "unknown" => Self::Unknown,
            _ => Self::Other(trimmed.to_string()),
        })
    }
}

impl From<String> for AccountType {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        }
    }
}

impl From<AccountType> for String {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

/// A single ledger account line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Keyword category the account was matched under.
    pub category: Option<String>,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Net balance as supplied by the source (debit minus credit when derived).
    pub balance: Decimal,
    /// Free-text description.
    pub description: Option<String>,
}

impl AccountRecord {
    /// Creates a record whose balance is `debit - credit`, saturating at the
    /// `Decimal` bounds.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        account_type: AccountType,
        debit: Decimal,
        credit: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            account_type,
            category: None,
            debit,
            credit,
            balance: debit.saturating_sub(credit),
            description: None,
        }
    }

    /// Returns true if debit, credit and balance are all zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero() && self.balance.is_zero()
    }
}

/// The statement layouts the renderer knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    /// Assets, liabilities and equity at a point in time.
    BalanceSheet,
    /// Revenue and expenses over a period.
    ProfitLoss,
    /// Every account with its debit and credit balance.
    TrialBalance,
    /// Operating, investing and financing cash movements.
    CashFlow,
}

impl StatementKind {
    /// All statement kinds, in template listing order.
    pub const ALL: [Self; 4] = [
        Self::BalanceSheet,
        Self::ProfitLoss,
        Self::TrialBalance,
        Self::CashFlow,
    ];

    /// Returns the snake_case identifier.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::BalanceSheet => "balance_sheet",
            Self::ProfitLoss => "profit_loss",
            Self::TrialBalance => "trial_balance",
            Self::CashFlow => "cash_flow",
        }
    }

    /// Returns the template file name bound to this kind.
    #[must_use]
    pub const fn template_name(self) -> &'static str {
        match self {
            Self::BalanceSheet => "balance_sheet.md",
            Self::ProfitLoss => "profit_loss.md",
            Self::TrialBalance => "trial_balance.md",
            Self::CashFlow => "cash_flow.md",
        }
    }

    /// Returns the human-readable statement title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::BalanceSheet => "Balance Sheet",
            Self::ProfitLoss => "Profit & Loss Statement",
            Self::TrialBalance => "Trial Balance",
            Self::CashFlow => "Cash Flow Statement",
        }
    }

    /// Looks up the kind bound to a template file name.
    #[must_use]
    pub fn from_template_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.template_name() == name)
    }

    /// Context fields compared by the balance indicator of this statement.
    #[must_use]
    pub const fn balance_fields(self) -> (&'static str, &'static str) {
        match self {
            Self::BalanceSheet => ("total_assets", "total_liab_equity"),
            Self::ProfitLoss | Self::TrialBalance | Self::CashFlow => {
                ("total_debits", "total_credits")
            }
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for StatementKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().trim_end_matches(".md").to_lowercase().replace('-', "_");
        match key.as_str() {
            "balance_sheet" | "bs" => Ok(Self::BalanceSheet),
            "profit_loss" | "pl" | "pnl" | "income_statement" => Ok(Self::ProfitLoss),
            "trial_balance" | "tb" => Ok(Self::TrialBalance),
            "cash_flow" | "cf" => Ok(Self::CashFlow),
            _ => Err(ReportError::UnknownStatementKind(s.to_string())),
        }
    }
}

/// Outcome of comparing two totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResult {
    /// Whether the totals agree within tolerance.
    pub is_balanced: bool,
    /// Absolute difference between the totals.
    pub difference: Decimal,
    /// Left total minus right total.
    pub signed_difference: Decimal,
}

impl BalanceResult {
    /// A balanced result with zero difference.
    #[must_use]
    pub const fn balanced() -> Self {
        Self {
            is_balanced: true,
            difference: Decimal::ZERO,
            signed_difference: Decimal::ZERO,
        }
    }

    /// An unbalanced result carrying an already-known absolute difference.
    #[must_use]
    pub fn unbalanced(difference: Decimal) -> Self {
        Self {
            is_balanced: false,
            difference: difference.abs(),
            signed_difference: difference,
        }
    }
}

/// Number of accounts of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    /// Account type label.
    pub account_type: String,
    /// Number of accounts with that type.
    pub count: usize,
}

/// Trial balance totals and per-type breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceSummary {
    /// Sum of all debits.
    pub total_debits: Decimal,
    /// Sum of all credits.
    pub total_credits: Decimal,
    /// Number of records.
    pub total_accounts: usize,
    /// Account counts per type, in order of first occurrence.
    pub account_type_summary: Vec<TypeCount>,
    /// Debits compared with credits.
    pub balance: BalanceResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Asset", AccountType::Asset)]
    #[case(" liabilities ", AccountType::Liability)]
    #[case("INCOME", AccountType::Revenue)]
    #[case("", AccountType::Unknown)]
    #[case("Contra", AccountType::Other("Contra".into()))]
    fn test_account_type_parsing(#[case] raw: &str, #[case] expected: AccountType) {
        assert_eq!(AccountType::from(raw.to_string()), expected);
    }

    #[test]
    fn test_account_type_serializes_as_label() {
        let json = serde_json::to_string(&AccountType::Other("Contra".into())).unwrap();
        assert_eq!(json, "\"Contra\"");
        let parsed: AccountType = serde_json::from_str("\"expense\"").unwrap();
        assert_eq!(parsed, AccountType::Expense);
    }

    #[rstest]
    #[case("balance-sheet", StatementKind::BalanceSheet)]
    #[case("pnl", StatementKind::ProfitLoss)]
    #[case("trial_balance.md", StatementKind::TrialBalance)]
    #[case("CF", StatementKind::CashFlow)]
    fn test_statement_kind_aliases(#[case] raw: &str, #[case] expected: StatementKind) {
        assert_eq!(raw.parse::<StatementKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_statement_kind() {
        assert!(matches!(
            "equity_changes".parse::<StatementKind>(),
            Err(ReportError::UnknownStatementKind(_))
        ));
    }

    #[test]
    fn test_template_names_round_trip() {
        for kind in StatementKind::ALL {
            assert_eq!(StatementKind::from_template_name(kind.template_name()), Some(kind));
        }
        assert_eq!(StatementKind::from_template_name("notes.md"), None);
    }

    #[test]
    fn test_record_balance_is_debit_minus_credit() {
        let record = AccountRecord::new("Loan", AccountType::Liability, Decimal::ZERO, Decimal::TEN);
        assert_eq!(record.balance, -Decimal::TEN);
        assert!(!record.is_zero());
    }
}
