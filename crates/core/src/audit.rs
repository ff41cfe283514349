//! Append-only audit trail of statement runs.
//!
//! Each render attempt, successful or not, adds one JSON object per line to
//! `audit.jsonl`. [`AuditStats`] summarizes the log.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use finstate_shared::types::ReportId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::reports::{BalanceResult, GeneratedReport, ReportError, StatementKind, ValidationReport};

/// File name of the audit log inside the audit directory.
pub const AUDIT_FILE: &str = "audit.jsonl";

/// Number of runs listed in [`AuditStats::recent`].
const RECENT_RUNS: usize = 10;

/// Hex SHA-256 of an input file's bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// A statement was produced.
    Completed,
    /// The run stopped with an error.
    Failed,
}

/// Validation outcome stored with a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// True when validation found no errors.
    pub is_valid: bool,
    /// Number of validation errors.
    pub errors: usize,
    /// Number of validation warnings.
    pub warnings: usize,
    /// Absolute difference between debits and credits.
    pub balance_difference: Decimal,
}

impl From<&ValidationReport> for ValidationSummary {
    fn from(report: &ValidationReport) -> Self {
        Self {
            is_valid: report.is_valid,
            errors: report.errors.len(),
            warnings: report.warnings.len(),
            balance_difference: report.balance_difference,
        }
    }
}

/// One audit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Report identifier; failed runs get a fresh one.
    pub report_id: ReportId,
    /// Run outcome.
    pub status: AuditStatus,
    /// Statement kind, when known.
    pub kind: Option<StatementKind>,
    /// Template used, when rendering got that far.
    pub template: Option<String>,
    /// Input the records were read from.
    pub source: Option<String>,
    /// SHA-256 of the input bytes.
    #[serde(default)]
    pub input_hash: Option<String>,
    /// Number of records rendered.
    pub record_count: usize,
    /// Balance indicator, when one was computed.
    pub balance: Option<BalanceResult>,
    /// Validation outcome, when validation ran.
    #[serde(default)]
    pub validation: Option<ValidationSummary>,
    /// Error messages.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Warning messages.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Where the report was written.
    pub output_path: Option<PathBuf>,
    /// Generation timestamp.
    pub generated_at: NaiveDateTime,
    /// Wall-clock duration of the run in milliseconds.
    #[serde(default)]
    pub duration_ms: u64,
}

impl AuditRecord {
    /// Builds the audit line for a rendered `report`.
    #[must_use]
    pub fn completed(report: &GeneratedReport, output_path: Option<&Path>) -> Self {
        Self {
            report_id: report.id,
            status: AuditStatus::Completed,
            kind: Some(report.kind),
            template: Some(report.template_name.clone()),
            source: report.source.clone(),
            input_hash: None,
            record_count: report.context.accounts.len(),
            balance: report.context.balance,
            validation: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            output_path: output_path.map(Path::to_path_buf),
            generated_at: report.context.generated_at,
            duration_ms: 0,
        }
    }

    /// Builds the audit line for a run that stopped with `error`.
    #[must_use]
    pub fn failed(
        source: Option<String>,
        kind: Option<StatementKind>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            report_id: ReportId::new(),
            status: AuditStatus::Failed,
            kind,
            template: kind.map(|k| k.template_name().to_string()),
            source,
            input_hash: None,
            record_count: 0,
            balance: None,
            validation: None,
            errors: vec![error.into()],
            warnings: Vec::new(),
            output_path: None,
            generated_at: Local::now().naive_local(),
            duration_ms: 0,
        }
    }

    /// Sets the input fingerprint.
    #[must_use]
    pub fn with_input_hash(mut self, hash: Option<String>) -> Self {
        self.input_hash = hash;
        self
    }

    /// Records the validation outcome. Its errors and warnings are kept
    /// ahead of any already present.
    #[must_use]
    pub fn with_validation(mut self, report: &ValidationReport) -> Self {
        self.validation = Some(ValidationSummary::from(report));
        self.errors.splice(0..0, report.errors.iter().cloned());
        self.warnings.splice(0..0, report.warnings.iter().cloned());
        if self.record_count == 0 {
            self.record_count = report.records_processed;
        }
        self
    }

    /// Sets the run duration.
    #[must_use]
    pub fn with_duration(mut self, elapsed: Duration) -> Self {
        self.duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Summary of the runs in an audit log.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AuditStats {
    /// Runs considered.
    pub total_runs: usize,
    /// Runs that produced a statement.
    pub completed: usize,
    /// Runs that failed.
    pub failed: usize,
    /// Distinct inputs, by fingerprint when present and by source otherwise.
    pub files_processed: usize,
    /// Mean run duration, when any run recorded one.
    pub average_duration_ms: Option<u64>,
    /// Runs per template.
    pub template_usage: BTreeMap<String, usize>,
    /// Error occurrences, keyed by message up to the first colon.
    pub error_summary: BTreeMap<String, usize>,
    /// Latest runs, newest first.
    pub recent: Vec<AuditRecord>,
}

impl AuditStats {
    /// Summarizes `entries`, keeping those generated at or after `since`.
    #[must_use]
    pub fn from_entries(entries: &[AuditRecord], since: Option<NaiveDateTime>) -> Self {
        let selected: Vec<&AuditRecord> = entries
            .iter()
            .filter(|e| since.is_none_or(|cutoff| e.generated_at >= cutoff))
            .collect();

        let mut stats = Self {
            total_runs: selected.len(),
            ..Self::default()
        };

        let mut inputs = HashSet::new();
        let mut durations = Vec::new();
        for entry in &selected {
            match entry.status {
                AuditStatus::Completed => stats.completed += 1,
                AuditStatus::Failed => stats.failed += 1,
            }
            if let Some(input) = entry.input_hash.as_ref().or(entry.source.as_ref()) {
                inputs.insert(input.as_str());
            }
            if entry.duration_ms > 0 {
                durations.push(entry.duration_ms);
            }
            let template = entry.template.as_deref().unwrap_or("unknown");
            *stats.template_usage.entry(template.to_string()).or_insert(0) += 1;
            for error in &entry.errors {
                let key = error.split(':').next().unwrap_or(error).trim();
                *stats.error_summary.entry(key.to_string()).or_insert(0) += 1;
            }
        }

        stats.files_processed = inputs.len();
        let runs = u64::try_from(durations.len()).unwrap_or(u64::MAX);
        stats.average_duration_ms = durations
            .iter()
            .copied()
            .try_fold(0u64, u64::checked_add)
            .and_then(|total| total.checked_div(runs));
        stats.recent = selected
            .iter()
            .rev()
            .take(RECENT_RUNS)
            .map(|e| (*e).clone())
            .collect();
        stats
    }
}

/// Appends [`AuditRecord`]s to `<dir>/audit.jsonl`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Creates a log inside `dir`. Nothing is written until the first append.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(AUDIT_FILE),
        }
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record, creating the directory and file if needed.
    pub fn append(&self, record: &AuditRecord) -> Result<(), ReportError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;

        debug!(
            report_id = %record.report_id,
            status = ?record.status,
            path = %self.path.display(),
            "Audit record appended"
        );
        Ok(())
    }

    /// Reads every record back, oldest first. A missing file is an empty
    /// log; lines that no longer parse are skipped with a warning.
    pub fn entries(&self) -> Result<Vec<AuditRecord>, ReportError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = idx + 1, error = %e, "Skipping unreadable audit line"),
            }
        }
        Ok(entries)
    }

    /// Summarizes the runs of the last `days` days, or all runs when `None`.
    pub fn stats(&self, days: Option<u32>) -> Result<AuditStats, ReportError> {
        let since = days.and_then(|d| {
            Local::now()
                .naive_local()
                .checked_sub_signed(TimeDelta::days(i64::from(d)))
        });
        Ok(AuditStats::from_entries(&self.entries()?, since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{AccountRecord, AccountType, RecordValidator, ReportMetadata, ReportService};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, day)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
    }

    fn records() -> Vec<AccountRecord> {
        vec![
            AccountRecord::new("Cash", AccountType::Asset, dec!(100), dec!(0)),
            AccountRecord::new("Loan", AccountType::Liability, dec!(0), dec!(60)),
        ]
    }

    fn report() -> GeneratedReport {
        let meta = ReportMetadata {
            source: Some("tb.csv".into()),
            generated_at: Some(at(29)),
            ..ReportMetadata::default()
        };
        ReportService::default()
            .generate(&records(), Some(StatementKind::TrialBalance), &meta)
            .unwrap()
    }

    fn failed_at(day: u32, source: &str, error: &str) -> AuditRecord {
        let mut record = AuditRecord::failed(Some(source.into()), None, error);
        record.generated_at = at(day);
        record
    }

    #[test]
    fn test_fingerprint_is_sha256_hex() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());
        assert!(log.entries().unwrap().is_empty());
        assert_eq!(log.stats(None).unwrap(), AuditStats::default());
    }

    #[test]
    fn test_append_writes_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("audit"));
        let report = report();
        let validation = RecordValidator::default().validate(&records());

        let first = AuditRecord::completed(&report, Some(Path::new("out/tb.md")))
            .with_input_hash(Some(fingerprint(b"Cash,100,")))
            .with_validation(&validation)
            .with_duration(Duration::from_millis(42));
        let second = AuditRecord::failed(
            Some("broken.csv".into()),
            Some(StatementKind::BalanceSheet),
            "Missing required column: account name",
        );
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let raw = fs::read_to_string(log.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let entries = log.entries().unwrap();
        assert_eq!(entries, vec![first, second]);

        let done = &entries[0];
        assert_eq!(done.status, AuditStatus::Completed);
        assert_eq!(done.record_count, 2);
        assert_eq!(done.kind, Some(StatementKind::TrialBalance));
        assert_eq!(done.template.as_deref(), Some("trial_balance.md"));
        assert_eq!(done.source.as_deref(), Some("tb.csv"));
        assert_eq!(done.input_hash.as_ref().map(String::len), Some(64));
        assert_eq!(done.output_path.as_deref(), Some(Path::new("out/tb.md")));
        assert_eq!(done.duration_ms, 42);
        let summary = done.validation.as_ref().unwrap();
        assert!(!summary.is_valid);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.balance_difference, dec!(40));
        assert_eq!(done.errors.len(), 1);
        let balance = done.balance.unwrap();
        assert!(!balance.is_balanced);
        assert_eq!(balance.difference, dec!(40));

        let failed = &entries[1];
        assert_eq!(failed.status, AuditStatus::Failed);
        assert_eq!(failed.template.as_deref(), Some("balance_sheet.md"));
        assert_eq!(failed.errors, vec!["Missing required column: account name".to_string()]);
        assert_eq!(failed.output_path, None);
    }

    #[test]
    fn test_unreadable_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path());
        log.append(&failed_at(1, "a.csv", "boom")).unwrap();
        let mut raw = fs::read_to_string(log.path()).unwrap();
        raw.push_str("{not json}\n");
        fs::write(log.path(), raw).unwrap();

        assert_eq!(log.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_stats_count_outcomes_templates_and_errors() {
        let completed = AuditRecord::completed(&report(), None)
            .with_input_hash(Some(fingerprint(b"one")))
            .with_duration(Duration::from_millis(30));
        let again = AuditRecord::completed(&report(), None)
            .with_input_hash(Some(fingerprint(b"one")))
            .with_duration(Duration::from_millis(10));
        let entries = vec![
            failed_at(1, "old.csv", "Template not found: x.md"),
            completed,
            again,
            failed_at(20, "a.csv", "Missing required column: account name"),
            failed_at(21, "b.csv", "Missing required column: account name"),
        ];

        let stats = AuditStats::from_entries(&entries, None);

        assert_eq!(stats.total_runs, 5);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.files_processed, 4);
        assert_eq!(stats.average_duration_ms, Some(20));
        assert_eq!(stats.template_usage.get("trial_balance.md"), Some(&2));
        assert_eq!(stats.template_usage.get("unknown"), Some(&3));
        assert_eq!(stats.error_summary.get("Missing required column"), Some(&2));
        assert_eq!(stats.error_summary.get("Template not found"), Some(&1));
        assert_eq!(stats.recent.len(), 5);
        assert_eq!(stats.recent[0].source.as_deref(), Some("b.csv"));
    }

    #[test]
    fn test_stats_window_drops_older_runs() {
        let entries = vec![
            failed_at(1, "old.csv", "boom"),
            failed_at(20, "new.csv", "boom"),
        ];

        let stats = AuditStats::from_entries(&entries, Some(at(10)));

        assert_eq!(stats.total_runs, 1);
        assert_eq!(stats.recent[0].source.as_deref(), Some("new.csv"));
        assert_eq!(stats.average_duration_ms, None);
    }

    #[test]
    fn test_recent_runs_are_capped() {
        let entries: Vec<AuditRecord> = (1..=15)
            .map(|day| failed_at(day, &format!("{day}.csv"), "boom"))
            .collect();

        let stats = AuditStats::from_entries(&entries, None);

        assert_eq!(stats.recent.len(), RECENT_RUNS);
        assert_eq!(stats.recent[0].source.as_deref(), Some("15.csv"));
    }
}
