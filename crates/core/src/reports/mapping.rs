//! Mapping account records onto the named fields the templates use.
//!
//! The mapper is the only place statement subtotals are computed; the
//! renderer formats whatever the context already holds.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::aggregator::TrialBalanceAggregator;
use super::context::StatementContext;
use super::error::ReportError;
use super::types::{AccountRecord, StatementKind};

const CURRENT_ASSETS: &[&str] = &["cash", "accounts_receivable", "inventory", "prepaid_expenses"];
const NON_CURRENT_ASSETS: &[&str] = &["ppe", "investments", "intangible_assets"];
const CURRENT_LIABILITIES: &[&str] = &["accounts_payable", "accrued_expenses", "short_term_debt"];
const NON_CURRENT_LIABILITIES: &[&str] = &["long_term_debt", "deferred_tax"];
const EQUITY: &[&str] = &["share_capital", "retained_earnings"];

const REVENUE: &[&str] = &["sales_revenue", "service_revenue", "other_income"];
const OPERATING_EXPENSES: &[&str] = &[
    "salaries",
    "rent",
    "utilities",
    "insurance",
    "depreciation",
    "marketing",
    "professional_fees",
    "office_expenses",
    "other_expenses",
];

const OPERATING_CASH: &[&str] = &[
    "net_income",
    "depreciation",
    "ar_change",
    "inventory_change",
    "ap_change",
];
const INVESTING_CASH: &[&str] = &["equipment_purchase", "investment_sale"];
const FINANCING_CASH: &[&str] = &["debt_proceeds", "debt_repayment", "dividends"];

const TRIAL_BALANCE_TOTALS: &[&str] = &["total_debits", "total_credits"];
const BALANCE_SHEET_TOTALS: &[&str] = &[
    "total_current_assets",
    "total_non_current_assets",
    "total_assets",
    "total_current_liabilities",
    "total_non_current_liabilities",
    "total_equity",
    "total_liab_equity",
];
const INCOME_STATEMENT_TOTALS: &[&str] = &[
    "total_revenue",
    "gross_profit",
    "total_operating_expenses",
    "operating_income",
    "net_other_income",
    "gross_margin",
    "operating_margin",
    "net_margin",
];
const CASH_FLOW_TOTALS: &[&str] = &[
    "operating_cash_flow",
    "investing_cash_flow",
    "financing_cash_flow",
    "net_cash_change",
    "ending_cash",
];

/// Which side of a record feeds a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Debit,
    Credit,
}

impl Side {
    /// Amount `record` contributes to a field on this side.
    ///
    /// A bare balance (no debit or credit) counts with the sign the side
    /// expects. An amount only on the opposite side contributes nothing.
    fn amount(self, record: &AccountRecord) -> Decimal {
        match self {
            Self::Debit if !record.debit.is_zero() => record.debit,
            Self::Credit if !record.credit.is_zero() => record.credit,
            Self::Debit if record.credit.is_zero() => record.balance,
            Self::Credit if record.debit.is_zero() => -record.balance,
            Self::Debit | Self::Credit => Decimal::ZERO,
        }
    }
}

/// Maps records into a [`StatementContext`] and computes statement totals.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextMapper {
    aggregator: TrialBalanceAggregator,
}

impl ContextMapper {
    /// Creates a mapper that aggregates with `aggregator`.
    #[must_use]
    pub const fn new(aggregator: TrialBalanceAggregator) -> Self {
        Self { aggregator }
    }

    /// Maps `records` and computes the totals for `kind`.
    pub fn map(
        &self,
        ctx: &mut StatementContext,
        records: &[AccountRecord],
        kind: StatementKind,
    ) -> Result<(), ReportError> {
        self.map_records(ctx, records)?;
        Self::compute_totals(ctx, kind)
    }

    /// Accumulates record amounts into keyword-matched fields and stores the
    /// trial balance rows, type summary, totals and balance indicator.
    pub fn map_records(
        &self,
        ctx: &mut StatementContext,
        records: &[AccountRecord],
    ) -> Result<(), ReportError> {
        let summary = self.aggregator.aggregate(records)?;
        ctx.set("total_debits", summary.total_debits);
        ctx.set("total_credits", summary.total_credits);
        ctx.balance = Some(summary.balance);
        ctx.account_type_summary = summary.account_type_summary;
        ctx.accounts = records.to_vec();

        for record in records {
            match field_for(&record.name) {
                Some((field, side)) => {
                    let value = side.amount(record);
                    debug!(account = %record.name, field, %value, "Mapped account");
                    ctx.add(field, value)?;
                }
                None => debug!(account = %record.name, "Account left unmapped"),
            }
        }
        Ok(())
    }

    /// Returns true if `field` is derived for `kind` and so cannot be set
    /// from outside.
    #[must_use]
    pub fn is_computed(kind: StatementKind, field: &str) -> bool {
        let in_any = |lists: &[&[&str]]| lists.iter().any(|list| list.contains(&field));
        match kind {
            StatementKind::TrialBalance => in_any(&[TRIAL_BALANCE_TOTALS]),
            StatementKind::BalanceSheet => in_any(&[TRIAL_BALANCE_TOTALS, BALANCE_SHEET_TOTALS]),
            StatementKind::ProfitLoss => {
                field == "net_income" || in_any(&[TRIAL_BALANCE_TOTALS, INCOME_STATEMENT_TOTALS])
            }
            StatementKind::CashFlow => in_any(&[
                TRIAL_BALANCE_TOTALS,
                INCOME_STATEMENT_TOTALS,
                CASH_FLOW_TOTALS,
            ]),
        }
    }

    /// Computes the subtotals the template for `kind` displays.
    pub fn compute_totals(
        ctx: &mut StatementContext,
        kind: StatementKind,
    ) -> Result<(), ReportError> {
        match kind {
            StatementKind::BalanceSheet => Self::balance_sheet_totals(ctx),
            StatementKind::ProfitLoss => Self::income_statement_totals(ctx),
            StatementKind::CashFlow => {
                if !ctx.contains("net_income") {
                    Self::income_statement_totals(ctx)?;
                }
                Self::cash_flow_totals(ctx)
            }
            StatementKind::TrialBalance => Ok(()),
        }
    }

    fn balance_sheet_totals(ctx: &mut StatementContext) -> Result<(), ReportError> {
        let current_assets = ctx.sum(CURRENT_ASSETS)?;
        let non_current_assets = ctx.sum(NON_CURRENT_ASSETS)?;
        let current_liabilities = ctx.sum(CURRENT_LIABILITIES)?;
        let non_current_liabilities = ctx.sum(NON_CURRENT_LIABILITIES)?;
        let equity = ctx.sum(EQUITY)?;

        let total_assets = checked(
            current_assets.checked_add(non_current_assets),
            "total_assets",
        )?;
        let total_liab_equity = checked(
            current_liabilities
                .checked_add(non_current_liabilities)
                .and_then(|l| l.checked_add(equity)),
            "total_liab_equity",
        )?;

        ctx.set("total_current_assets", current_assets);
        ctx.set("total_non_current_assets", non_current_assets);
        ctx.set("total_assets", total_assets);
        ctx.set("total_current_liabilities", current_liabilities);
        ctx.set("total_non_current_liabilities", non_current_liabilities);
        ctx.set("total_equity", equity);
        ctx.set("total_liab_equity", total_liab_equity);
        Ok(())
    }

    fn income_statement_totals(ctx: &mut StatementContext) -> Result<(), ReportError> {
        let total_revenue = ctx.sum(REVENUE)?;
        let gross_profit = checked(total_revenue.checked_sub(ctx.get("cogs")), "gross_profit")?;
        let operating_expenses = ctx.sum(OPERATING_EXPENSES)?;
        let operating_income = checked(
            gross_profit.checked_sub(operating_expenses),
            "operating_income",
        )?;
        let net_other_income = checked(
            ctx.get("interest_income")
                .checked_sub(ctx.get("interest_expense")),
            "net_other_income",
        )?;
        let net_income = checked(operating_income.checked_add(net_other_income), "net_income")?;

        ctx.set("total_revenue", total_revenue);
        ctx.set("gross_profit", gross_profit);
        ctx.set("total_operating_expenses", operating_expenses);
        ctx.set("operating_income", operating_income);
        ctx.set("net_other_income", net_other_income);
        ctx.set("net_income", net_income);
        ctx.set("gross_margin", margin(gross_profit, total_revenue));
        ctx.set("operating_margin", margin(operating_income, total_revenue));
        ctx.set("net_margin", margin(net_income, total_revenue));
        Ok(())
    }

    fn cash_flow_totals(ctx: &mut StatementContext) -> Result<(), ReportError> {
        let operating = ctx.sum(OPERATING_CASH)?;
        let investing = ctx.sum(INVESTING_CASH)?;
        let financing = ctx.sum(FINANCING_CASH)?;
        let net_change = checked(
            operating
                .checked_add(investing)
                .and_then(|n| n.checked_add(financing)),
            "net_cash_change",
        )?;
        let ending_cash = checked(
            ctx.get("beginning_cash").checked_add(net_change),
            "ending_cash",
        )?;

        ctx.set("operating_cash_flow", operating);
        ctx.set("investing_cash_flow", investing);
        ctx.set("financing_cash_flow", financing);
        ctx.set("net_cash_change", net_change);
        ctx.set("ending_cash", ending_cash);
        Ok(())
    }
}

fn checked(value: Option<Decimal>, field: &str) -> Result<Decimal, ReportError> {
    value.ok_or_else(|| ReportError::Overflow(field.to_string()))
}

/// `part` as a percentage of `revenue`; zero when there is no revenue or
/// the ratio is out of range.
fn margin(part: Decimal, revenue: Decimal) -> Decimal {
    if revenue <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_div(revenue)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or_else(|| {
            warn!(%part, %revenue, "Margin out of range, shown as zero");
            Decimal::ZERO
        })
}

/// Picks the template field an account name feeds, if any.
fn field_for(name: &str) -> Option<(&'static str, Side)> {
    let name = name.to_lowercase();
    let has = |k: &str| name.contains(k);

    if has("cash") || has("bank") {
        Some(("cash", Side::Debit))
    } else if has("receivable") {
        Some(("accounts_receivable", Side::Debit))
    } else if has("inventory") {
        Some(("inventory", Side::Debit))
    } else if has("payable") {
        Some(("accounts_payable", Side::Credit))
    } else if has("revenue") || has("sales") {
        if has("service") {
            Some(("service_revenue", Side::Credit))
        } else {
            Some(("sales_revenue", Side::Credit))
        }
    } else if has("expense") || has("cost") {
        let field = if has("salary") || has("wage") {
            "salaries"
        } else if has("rent") {
            "rent"
        } else if has("utility") || has("utilities") {
            "utilities"
        } else if has("cogs") || has("cost of goods") {
            "cogs"
        } else {
            "other_expenses"
        };
        Some((field, Side::Debit))
    } else {
        None
    }
}
