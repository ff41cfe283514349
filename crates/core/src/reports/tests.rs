//! Property-based tests for the reports module.

use std::collections::HashSet;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::aggregator::TrialBalanceAggregator;
use super::context::StatementContext;
use super::mapping::ContextMapper;
use super::renderer::StatementRenderer;
use super::types::{AccountRecord, AccountType, StatementKind};
use super::verifier::BalanceVerifier;

fn account_type() -> impl Strategy<Value = AccountType> {
    prop_oneof![
        Just(AccountType::Asset),
        Just(AccountType::Liability),
        Just(AccountType::Equity),
        Just(AccountType::Revenue),
        Just(AccountType::Expense),
        Just(AccountType::Unknown),
    ]
}

/// Amounts in cents, up to ten million.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn record() -> impl Strategy<Value = AccountRecord> {
    ("[A-Z][a-z]{1,10}", account_type(), amount(), amount())
        .prop_map(|(name, t, debit, credit)| AccountRecord::new(name, t, debit, credit))
}

fn fixed_context() -> StatementContext {
    StatementContext::new(
        NaiveDate::from_ymd_opt(2024, 6, 30)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
    )
}

proptest! {
    /// Property: totals are the plain sums of debits and credits.
    #[test]
    fn test_aggregate_totals_are_sums(records in prop::collection::vec(record(), 0..30)) {
        let summary = TrialBalanceAggregator::default().aggregate(&records).unwrap();

        let debits: Decimal = records.iter().map(|r| r.debit).sum();
        let credits: Decimal = records.iter().map(|r| r.credit).sum();

        prop_assert_eq!(summary.total_debits, debits);
        prop_assert_eq!(summary.total_credits, credits);
        prop_assert_eq!(summary.total_accounts, records.len());
        prop_assert_eq!(summary.balance.difference, (debits - credits).abs());
    }

    /// Property: a record set closed by a balancing entry is always balanced.
    #[test]
    fn test_balancing_entry_balances(records in prop::collection::vec(record(), 1..30)) {
        let mut records = records;
        let debits: Decimal = records.iter().map(|r| r.debit).sum();
        let credits: Decimal = records.iter().map(|r| r.credit).sum();
        let diff = debits - credits;
        let (debit, credit) = if diff > Decimal::ZERO {
            (Decimal::ZERO, diff)
        } else {
            (-diff, Decimal::ZERO)
        };
        records.push(AccountRecord::new("Suspense", AccountType::Equity, debit, credit));

        let summary = TrialBalanceAggregator::default().aggregate(&records).unwrap();

        prop_assert!(summary.balance.is_balanced);
        prop_assert_eq!(summary.total_debits, summary.total_credits);
    }

    /// Property: the type summary has one entry per distinct type and its
    /// counts add up to the number of records.
    #[test]
    fn test_type_summary_is_distinct(records in prop::collection::vec(record(), 0..30)) {
        let summary = TrialBalanceAggregator::default().aggregate(&records).unwrap();

        let distinct: HashSet<&str> = records.iter().map(|r| r.account_type.as_str()).collect();
        let labels: HashSet<&str> = summary
            .account_type_summary
            .iter()
            .map(|t| t.account_type.as_str())
            .collect();

        prop_assert_eq!(summary.account_type_summary.len(), distinct.len());
        prop_assert_eq!(labels, distinct);
        prop_assert_eq!(
            summary.account_type_summary.iter().map(|t| t.count).sum::<usize>(),
            records.len()
        );
    }

    /// Property: verification is symmetric and agrees with the tolerance.
    #[test]
    fn test_verifier_is_symmetric(left in amount(), right in amount()) {
        let verifier = BalanceVerifier::default();
        let forward = verifier.verify(left, right);
        let backward = verifier.verify(right, left);

        prop_assert_eq!(forward.is_balanced, backward.is_balanced);
        prop_assert_eq!(forward.difference, backward.difference);
        prop_assert_eq!(forward.signed_difference, -backward.signed_difference);
        prop_assert_eq!(forward.is_balanced, (left - right).abs() <= verifier.tolerance());
    }

    /// Property: rendering the same context twice gives identical output.
    #[test]
    fn test_rendering_is_deterministic(
        records in prop::collection::vec(record(), 1..15),
        kind_idx in 0usize..4,
    ) {
        let kind = StatementKind::ALL[kind_idx];
        let mut ctx = fixed_context().with_company("Property Co");
        ContextMapper::default().map(&mut ctx, &records, kind).unwrap();

        let renderer = StatementRenderer::default();
        let first = renderer.render(kind, &ctx).unwrap();
        let second = renderer.render(kind, &ctx).unwrap();

        prop_assert_eq!(first, second);
    }

    /// Property: the balance sheet always satisfies its own totals.
    #[test]
    fn test_balance_sheet_totals_add_up(records in prop::collection::vec(record(), 1..20)) {
        let mut ctx = fixed_context();
        ContextMapper::default().map(&mut ctx, &records, StatementKind::BalanceSheet).unwrap();

        prop_assert_eq!(
            ctx.get("total_assets"),
            ctx.get("total_current_assets") + ctx.get("total_non_current_assets")
        );
        prop_assert_eq!(
            ctx.get("total_liab_equity"),
            ctx.get("total_current_liabilities")
                + ctx.get("total_non_current_liabilities")
                + ctx.get("total_equity")
        );
    }
}
