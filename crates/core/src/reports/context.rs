//! Statement context: the named amounts and metadata a template is filled from.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use finstate_shared::types::parse_amount;
use rust_decimal::Decimal;
use serde::Serialize;

use super::aggregator::checked_sum;
use super::error::ReportError;
use super::types::{AccountRecord, BalanceResult, TypeCount};

/// Format of the `Report Generated` footer.
pub const GENERATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format of the as-of date when none is supplied.
pub const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y";

/// Named amounts plus company and date metadata for one statement.
///
/// Reading a field that was never set yields zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementContext {
    /// Company name shown in the header.
    pub company_name: Option<String>,
    /// As-of / period-end date as it should be displayed.
    pub as_of: Option<String>,
    /// Generation timestamp shown in the footer.
    pub generated_at: NaiveDateTime,
    fields: BTreeMap<String, Decimal>,
    /// Trial balance rows.
    pub accounts: Vec<AccountRecord>,
    /// Account counts per type.
    pub account_type_summary: Vec<TypeCount>,
    /// Explicit balance indicator. When unset, the renderer verifies the
    /// statement's totals itself.
    pub balance: Option<BalanceResult>,
}

impl StatementContext {
    /// Creates an empty context stamped with `generated_at`.
    #[must_use]
    pub fn new(generated_at: NaiveDateTime) -> Self {
        Self {
            company_name: None,
            as_of: None,
            generated_at,
            fields: BTreeMap::new(),
            accounts: Vec::new(),
            account_type_summary: Vec::new(),
            balance: None,
        }
    }

    /// Creates an empty context stamped with the current local time.
    #[must_use]
    pub fn now() -> Self {
        Self::new(Local::now().naive_local())
    }

    /// Sets the company name.
    #[must_use]
    pub fn with_company(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = Some(company_name.into());
        self
    }

    /// Sets the displayed as-of date.
    #[must_use]
    pub fn with_as_of(mut self, as_of: impl Into<String>) -> Self {
        self.as_of = Some(as_of.into());
        self
    }

    /// Sets an explicit balance indicator.
    #[must_use]
    pub fn with_balance(mut self, balance: BalanceResult) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Sets `field` to `value`, replacing any previous amount.
    pub fn set(&mut self, field: impl Into<String>, value: Decimal) {
        self.fields.insert(field.into(), value);
    }

    /// Adds `value` to `field`.
    pub fn add(&mut self, field: &str, value: Decimal) -> Result<(), ReportError> {
        let entry = self.fields.entry(field.to_string()).or_default();
        *entry = entry
            .checked_add(value)
            .ok_or_else(|| ReportError::Overflow(field.to_string()))?;
        Ok(())
    }

    /// Parses `raw` as an amount and stores it in `field`.
    pub fn set_raw(&mut self, field: &str, raw: &str) -> Result<(), ReportError> {
        let value = parse_amount(raw).map_err(|_| ReportError::InvalidAmount {
            field: field.to_string(),
            value: raw.to_string(),
        })?;
        self.set(field, value);
        Ok(())
    }

    /// Returns the amount stored in `field`, or zero.
    #[must_use]
    pub fn get(&self, field: &str) -> Decimal {
        self.fields.get(field).copied().unwrap_or_default()
    }

    /// Returns true if `field` has been set.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Sums the given fields, treating missing ones as zero.
    pub fn sum(&self, fields: &[&str]) -> Result<Decimal, ReportError> {
        checked_sum(fields.iter().map(|f| self.get(f)), &fields.join(" + "))
    }

    /// Iterates over the fields that have been set, in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Returns the as-of date, defaulting to the generation day.
    #[must_use]
    pub fn display_date(&self) -> String {
        self.as_of
            .clone()
            .unwrap_or_else(|| self.generated_at.format(DISPLAY_DATE_FORMAT).to_string())
    }

    /// Returns the footer timestamp.
    #[must_use]
    pub fn generation_date(&self) -> String {
        self.generated_at.format(GENERATION_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(17, 5, 9)
            .unwrap()
    }

    #[test]
    fn test_missing_field_reads_zero() {
        let ctx = StatementContext::new(fixed_time());
        assert_eq!(ctx.get("cash"), Decimal::ZERO);
        assert!(!ctx.contains("cash"));
    }

    #[test]
    fn test_set_add_and_sum() {
        let mut ctx = StatementContext::new(fixed_time());
        ctx.set("cash", dec!(100));
        ctx.add("cash", dec!(25.50)).unwrap();
        ctx.add("inventory", dec!(10)).unwrap();

        assert_eq!(ctx.get("cash"), dec!(125.50));
        assert_eq!(ctx.sum(&["cash", "inventory", "missing"]).unwrap(), dec!(135.50));
        assert_eq!(
            ctx.fields().collect::<Vec<_>>(),
            vec![("cash", dec!(125.50)), ("inventory", dec!(10))]
        );
    }

    #[test]
    fn test_set_raw_parses_amounts() {
        let mut ctx = StatementContext::new(fixed_time());
        ctx.set_raw("ppe", "$1,500.00").unwrap();
        assert_eq!(ctx.get("ppe"), dec!(1500));
    }

    #[test]
    fn test_set_raw_rejects_non_numeric() {
        let mut ctx = StatementContext::new(fixed_time());
        let err = ctx.set_raw("ppe", "lots").unwrap_err();
        assert!(err.is_format_error());
        assert!(!ctx.contains("ppe"));
    }

    #[test]
    fn test_dates() {
        let ctx = StatementContext::new(fixed_time());
        assert_eq!(ctx.display_date(), "March 31, 2024");
        assert_eq!(ctx.generation_date(), "2024-03-31 17:05:09");

        let ctx = ctx.with_as_of("December 31, 2023");
        assert_eq!(ctx.display_date(), "December 31, 2023");
    }

    #[test]
    fn test_add_and_sum_report_overflow() {
        let mut ctx = StatementContext::new(fixed_time());
        ctx.set("cash", Decimal::MAX);

        let err = ctx.add("cash", dec!(1)).unwrap_err();
        assert!(matches!(err, ReportError::Overflow(ref f) if f == "cash"));
        assert_eq!(ctx.get("cash"), Decimal::MAX);

        ctx.set("inventory", dec!(1));
        let err = ctx.sum(&["cash", "inventory"]).unwrap_err();
        assert!(matches!(err, ReportError::Overflow(ref f) if f == "cash + inventory"));
    }
}
