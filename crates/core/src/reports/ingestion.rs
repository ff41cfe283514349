//! Reading account records from CSV.
//!
//! Column headers are matched loosely (case and punctuation are ignored) so
//! exports from different bookkeeping tools can be read without a mapping
//! file.

use std::fs;
use std::io::Read;
use std::path::Path;

use finstate_shared::types::parse_amount;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::categorize::categorize_account;
use super::error::ReportError;
use super::types::{AccountRecord, AccountType};

/// Role a source column plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    AccountType,
    Category,
    Debit,
    Credit,
    Balance,
    Amount,
    Direction,
    Description,
}

/// Maps header positions to column roles.
#[derive(Debug, Default)]
struct ColumnMap {
    columns: Vec<(usize, Column, String)>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut map = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let clean = normalize_header(header);
            let role = if clean.contains("account")
                && (clean.contains("type") || clean.contains("class"))
            {
                Some(Column::AccountType)
            } else if clean.contains("account") && !map.has(Column::Name) {
                Some(Column::Name)
            } else if clean.contains("name") && !clean.contains("account") && !map.has(Column::Name)
            {
                Some(Column::Name)
            } else if clean.contains("debit") {
                Some(Column::Debit)
            } else if clean.contains("credit") {
                Some(Column::Credit)
            } else if clean.contains("balance") {
                Some(Column::Balance)
            } else if ["amount", "value", "total"].iter().any(|k| clean.contains(k))
                && !map.has(Column::Amount)
            {
                Some(Column::Amount)
            } else if clean.contains("type") || clean == "drcr" || clean == "side" {
                Some(Column::Direction)
            } else if clean.contains("category") {
                Some(Column::Category)
            } else if clean.contains("description") || clean.contains("memo") {
                Some(Column::Description)
            } else {
                None
            };

            if let Some(role) = role {
                debug!(header, ?role, "mapped column");
                map.columns.push((idx, role, header.to_string()));
            }
        }
        map
    }

    fn has(&self, role: Column) -> bool {
        self.columns.iter().any(|(_, r, _)| *r == role)
    }

    fn cell<'a>(&self, row: &'a csv::StringRecord, role: Column) -> Option<(&'a str, &str)> {
        self.columns
            .iter()
            .find(|(_, r, _)| *r == role)
            .and_then(|(idx, _, header)| row.get(*idx).map(|v| (v.trim(), header.as_str())))
    }

    fn amount(
        &self,
        row: &csv::StringRecord,
        role: Column,
        row_number: usize,
    ) -> Result<Decimal, ReportError> {
        match self.cell(row, role) {
            Some((raw, header)) => parse_amount(raw).map_err(|_| ReportError::InvalidCell {
                row: row_number,
                column: header.to_string(),
                value: raw.to_string(),
            }),
            None => Ok(Decimal::ZERO),
        }
    }

    fn text(&self, row: &csv::StringRecord, role: Column) -> Option<String> {
        self.cell(row, role)
            .map(|(v, _)| v)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Lowercases and strips everything but letters, digits, `_` and spaces.
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

/// Reads account records from CSV input.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvIngestor;

impl CsvIngestor {
    /// Reads records from a CSV file.
    pub fn read_path(path: impl AsRef<Path>) -> Result<Vec<AccountRecord>, ReportError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Reading account records");
        Self::read_bytes(&fs::read(path)?)
    }

    /// Reads records from raw CSV bytes. Input that is not valid UTF-8 is
    /// decoded as Latin-1, which maps every byte to a character.
    pub fn read_bytes(bytes: &[u8]) -> Result<Vec<AccountRecord>, ReportError> {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return Self::read(text.as_bytes());
        }
        debug!("Input is not UTF-8, decoding as Latin-1");
        let text: String = bytes.iter().map(|&b| char::from(b)).collect();
        Self::read(text.as_bytes())
    }

    /// Reads records from any CSV source with a header row.
    ///
    /// Rows whose cells are all blank are skipped. Unparseable amounts fail
    /// the whole read.
    pub fn read<R: Read>(reader: R) -> Result<Vec<AccountRecord>, ReportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns = ColumnMap::from_headers(csv_reader.headers()?);
        if !columns.has(Column::Name) {
            return Err(ReportError::MissingColumn("account name"));
        }

        let mut records = Vec::new();
        for (idx, row) in csv_reader.records().enumerate() {
            let row = row?;
            if row.iter().all(str::is_empty) {
                continue;
            }
            records.push(Self::record_from_row(&columns, &row, idx + 1)?);
        }

        info!(records = records.len(), "Read account records");
        Ok(records)
    }

    fn record_from_row(
        columns: &ColumnMap,
        row: &csv::StringRecord,
        row_number: usize,
    ) -> Result<AccountRecord, ReportError> {
        let name = columns.text(row, Column::Name).unwrap_or_default();
        let mut debit = columns.amount(row, Column::Debit, row_number)?;
        let mut credit = columns.amount(row, Column::Credit, row_number)?;
        let source_balance = columns.amount(row, Column::Balance, row_number)?;

        if debit.is_zero() && credit.is_zero() && columns.has(Column::Amount) {
            let amount = columns.amount(row, Column::Amount, row_number)?;
            let direction = columns
                .text(row, Column::Direction)
                .map(|d| d.to_lowercase());
            match direction {
                Some(d) if d.contains("credit") || d.contains("cr") => credit = amount.abs(),
                Some(_) => debit = amount.abs(),
                None if amount.is_sign_negative() => credit = amount.abs(),
                None => debit = amount,
            }
        }

        if debit.is_zero() && credit.is_zero() && !source_balance.is_zero() {
            if source_balance.is_sign_negative() {
                credit = source_balance.abs();
            } else {
                debit = source_balance;
            }
        }

        let balance = if columns.has(Column::Balance) {
            source_balance
        } else {
            debit
                .checked_sub(credit)
                .ok_or_else(|| ReportError::Overflow(format!("balance of row {row_number}")))?
        };

        let (inferred_type, inferred_category) = categorize_account(&name);
        let account_type = columns
            .text(row, Column::AccountType)
            .map_or(inferred_type, AccountType::from);
        let category = columns
            .text(row, Column::Category)
            .unwrap_or_else(|| inferred_category.to_string());

        Ok(AccountRecord {
            name,
            account_type,
            category: Some(category),
            debit,
            credit,
            balance,
            description: columns.text(row, Column::Description),
        })
    }
}
