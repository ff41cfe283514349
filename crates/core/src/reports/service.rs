//! Report generation service.
//!
//! Ties the pipeline together: detect the statement kind, map records into
//! a context, compute totals, render, and write the result to disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use finstate_shared::config::ReportsConfig;
use finstate_shared::types::ReportId;
use rust_decimal::Decimal;
use tracing::info;

use super::aggregator::TrialBalanceAggregator;
use super::context::StatementContext;
use super::detection::detect_statement_kind;
use super::error::ReportError;
use super::mapping::ContextMapper;
use super::renderer::StatementRenderer;
use super::templates::TemplateStore;
use super::types::{AccountRecord, StatementKind};
use super::verifier::BalanceVerifier;

/// File-name timestamp of written reports.
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Caller-supplied details that are not part of the records.
#[derive(Debug, Clone, Default)]
pub struct ReportMetadata {
    /// Company name for the header.
    pub company_name: Option<String>,
    /// Displayed as-of date.
    pub as_of: Option<String>,
    /// Raw `field = amount` values applied after mapping, before totals.
    /// Fields the statement derives itself are rejected.
    pub overrides: Vec<(String, String)>,
    /// Fixed generation time; the current local time when unset.
    pub generated_at: Option<NaiveDateTime>,
    /// Where the records came from, for the audit trail.
    pub source: Option<String>,
}

/// A rendered statement.
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    /// Report identifier.
    pub id: ReportId,
    /// Statement kind.
    pub kind: StatementKind,
    /// Template the content was rendered from.
    pub template_name: String,
    /// Rendered Markdown.
    pub content: String,
    /// Context the statement was rendered from.
    pub context: StatementContext,
    /// Where the records came from.
    pub source: Option<String>,
}

impl GeneratedReport {
    /// File name the report is written under.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}.md",
            self.kind.slug(),
            self.context.generated_at.format(FILE_TIMESTAMP_FORMAT)
        )
    }
}

/// Service for generating financial statements.
#[derive(Debug, Clone, Default)]
pub struct ReportService {
    renderer: StatementRenderer,
    mapper: ContextMapper,
}

impl ReportService {
    /// Creates a service reading templates from `store` with the given
    /// balance tolerance.
    #[must_use]
    pub fn new(store: TemplateStore, tolerance: Decimal) -> Self {
        let verifier = BalanceVerifier::new(tolerance);
        Self {
            renderer: StatementRenderer::new(store, verifier),
            mapper: ContextMapper::new(TrialBalanceAggregator::new(verifier)),
        }
    }

    /// Creates a service from the `[reports]` configuration section.
    #[must_use]
    pub fn from_config(config: &ReportsConfig) -> Self {
        let store = config
            .templates_dir
            .as_deref()
            .map_or_else(TemplateStore::builtin, TemplateStore::with_dir);
        Self::new(store, config.balance_tolerance)
    }

    /// Returns the renderer.
    #[must_use]
    pub const fn renderer(&self) -> &StatementRenderer {
        &self.renderer
    }

    /// Generates a statement from `records`.
    ///
    /// The statement kind is detected from the records when `kind` is `None`.
    pub fn generate(
        &self,
        records: &[AccountRecord],
        kind: Option<StatementKind>,
        metadata: &ReportMetadata,
    ) -> Result<GeneratedReport, ReportError> {
        if records.is_empty() {
            return Err(ReportError::NoRecords);
        }

        let kind = kind.unwrap_or_else(|| detect_statement_kind(records));

        let mut ctx = metadata
            .generated_at
            .map_or_else(StatementContext::now, StatementContext::new);
        ctx.company_name.clone_from(&metadata.company_name);
        ctx.as_of.clone_from(&metadata.as_of);

        self.mapper.map_records(&mut ctx, records)?;
        for (field, raw) in &metadata.overrides {
            if ContextMapper::is_computed(kind, field) {
                return Err(ReportError::ComputedField {
                    field: field.clone(),
                    kind,
                });
            }
            ctx.set_raw(field, raw)?;
        }
        ContextMapper::compute_totals(&mut ctx, kind)?;

        let content = self.renderer.render(kind, &ctx)?;
        let report = GeneratedReport {
            id: ReportId::new(),
            kind,
            template_name: kind.template_name().to_string(),
            content,
            context: ctx,
            source: metadata.source.clone(),
        };

        info!(
            report_id = %report.id,
            kind = %report.kind,
            records = records.len(),
            balanced = report.context.balance.is_none_or(|b| b.is_balanced),
            "Generated statement"
        );
        Ok(report)
    }

    /// Writes `report` into `dir`, creating it if needed. Returns the path.
    pub fn write(report: &GeneratedReport, dir: &Path) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(report.file_name());
        fs::write(&path, &report.content)?;
        info!(report_id = %report.id, path = %path.display(), "Saved statement");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::types::AccountType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 0, 5)
            .unwrap()
    }

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            company_name: Some("Acme Ltd".into()),
            as_of: Some("December 31, 2023".into()),
            generated_at: Some(fixed_time()),
            ..ReportMetadata::default()
        }
    }

    fn balance_sheet_records() -> Vec<AccountRecord> {
        vec![
            AccountRecord::new("Cash at Bank", AccountType::Asset, dec!(50000), dec!(0)),
            AccountRecord::new("Accounts Receivable", AccountType::Asset, dec!(20000), dec!(0)),
            AccountRecord::new("Accounts Payable", AccountType::Liability, dec!(0), dec!(15000)),
            AccountRecord::new("Share Capital", AccountType::Equity, dec!(0), dec!(55000)),
        ]
    }

    #[test]
    fn test_empty_records_are_rejected() {
        let err = ReportService::default()
            .generate(&[], None, &metadata())
            .unwrap_err();
        assert!(matches!(err, ReportError::NoRecords));
    }

    #[test]
    fn test_generates_detected_balance_sheet() {
        let report = ReportService::default()
            .generate(&balance_sheet_records(), None, &metadata())
            .unwrap();

        assert_eq!(report.kind, StatementKind::BalanceSheet);
        assert_eq!(report.template_name, "balance_sheet.md");
        assert_eq!(report.context.get("total_current_assets"), dec!(70000));
        assert!(report.content.contains("**Acme Ltd**"));
        assert!(report.content.contains("**As of December 31, 2023**"));
        assert!(report.content.contains("| Cash and Cash Equivalents | $50000.00 |"));
        assert!(report.content.contains("✅ Balanced"));
    }

    #[test]
    fn test_explicit_kind_wins_over_detection() {
        let report = ReportService::default()
            .generate(
                &balance_sheet_records(),
                Some(StatementKind::TrialBalance),
                &metadata(),
            )
            .unwrap();

        assert_eq!(report.kind, StatementKind::TrialBalance);
        assert!(report.content.contains("| Share Capital | Equity | $0.00 | $55000.00 |"));
        assert!(report.content.contains("- **Total Accounts:** 4"));
    }

    #[test]
    fn test_overrides_feed_totals() {
        let meta = ReportMetadata {
            overrides: vec![("ppe".into(), "$30,000".into())],
            ..metadata()
        };

        let report = ReportService::default()
            .generate(&balance_sheet_records(), Some(StatementKind::BalanceSheet), &meta)
            .unwrap();

        assert_eq!(report.context.get("total_non_current_assets"), dec!(30000));
        assert_eq!(report.context.get("total_assets"), dec!(100000));
    }

    #[test]
    fn test_overrides_of_computed_fields_are_rejected() {
        for (kind, field) in [
            (StatementKind::BalanceSheet, "total_assets"),
            (StatementKind::BalanceSheet, "total_debits"),
            (StatementKind::TrialBalance, "total_credits"),
            (StatementKind::ProfitLoss, "net_income"),
            (StatementKind::CashFlow, "ending_cash"),
        ] {
            let meta = ReportMetadata {
                overrides: vec![(field.into(), "1".into())],
                ..metadata()
            };

            let err = ReportService::default()
                .generate(&balance_sheet_records(), Some(kind), &meta)
                .unwrap_err();

            assert!(
                matches!(err, ReportError::ComputedField { field: ref f, kind: k } if f == field && k == kind),
                "{kind} {field}: {err}"
            );
        }
    }

    #[test]
    fn test_cash_flow_accepts_explicit_net_income() {
        let meta = ReportMetadata {
            overrides: vec![
                ("net_income".into(), "18000".into()),
                ("beginning_cash".into(), "2000".into()),
            ],
            ..metadata()
        };

        let report = ReportService::default()
            .generate(&balance_sheet_records(), Some(StatementKind::CashFlow), &meta)
            .unwrap();

        assert_eq!(report.context.get("net_income"), dec!(18000));
        assert_eq!(report.context.get("operating_cash_flow"), dec!(18000));
        assert_eq!(report.context.get("ending_cash"), dec!(20000));
    }

    #[test]
    fn test_trial_balance_status_follows_records_not_overrides() {
        let meta = ReportMetadata {
            overrides: vec![("cash".into(), "1".into())],
            ..metadata()
        };

        let report = ReportService::default()
            .generate(&balance_sheet_records(), Some(StatementKind::TrialBalance), &meta)
            .unwrap();

        assert!(report.context.balance.unwrap().is_balanced);
        assert!(report.content.contains("✅ **Trial Balance is BALANCED**"));
    }

    #[test]
    fn test_bad_override_is_a_format_error() {
        let meta = ReportMetadata {
            overrides: vec![("ppe".into(), "thirty".into())],
            ..metadata()
        };

        let err = ReportService::default()
            .generate(&balance_sheet_records(), None, &meta)
            .unwrap_err();

        assert!(err.is_format_error());
    }

    #[test]
    fn test_unbalanced_records_surface_difference() {
        let records = vec![
            AccountRecord::new("Cash", AccountType::Asset, dec!(390000), dec!(0)),
            AccountRecord::new("Term Loan", AccountType::Liability, dec!(0), dec!(95000)),
            AccountRecord::new("Share Capital", AccountType::Equity, dec!(0), dec!(215000)),
        ];

        let report = ReportService::default()
            .generate(&records, Some(StatementKind::BalanceSheet), &metadata())
            .unwrap();

        assert!(report.content.contains("❌ Not Balanced (Difference: $80000.00)"));
    }

    #[test]
    fn test_write_names_file_by_kind_and_time() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/output");
        let report = ReportService::default()
            .generate(&balance_sheet_records(), None, &metadata())
            .unwrap();

        let path = ReportService::write(&report, &out).unwrap();

        assert_eq!(path, out.join("balance_sheet_20240115_080005.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), report.content);
    }

    #[test]
    fn test_from_config_uses_template_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("trial_balance.md"), "TB {{money total_debits}}").unwrap();
        let config = ReportsConfig {
            templates_dir: Some(dir.path().display().to_string()),
            ..ReportsConfig::default()
        };

        let report = ReportService::from_config(&config)
            .generate(
                &balance_sheet_records(),
                Some(StatementKind::TrialBalance),
                &metadata(),
            )
            .unwrap();

        assert_eq!(report.content, "TB 70000.00");
    }
}
