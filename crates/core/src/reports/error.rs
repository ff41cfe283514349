//! Report error types.

use finstate_shared::AppError;
use thiserror::Error;

use super::types::StatementKind;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// No template with this name exists in the store.
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Unknown statement kind.
    #[error("Unknown statement kind: {0}")]
    UnknownStatementKind(String),

    /// A context field was given a non-numeric value.
    #[error("Invalid amount for field '{field}': {value:?}")]
    InvalidAmount {
        /// Context field name.
        field: String,
        /// The rejected input.
        value: String,
    },

    /// An input cell could not be read as an amount.
    #[error("Invalid amount in row {row}, column '{column}': {value:?}")]
    InvalidCell {
        /// 1-based data row number (header excluded).
        row: usize,
        /// Source column header.
        column: String,
        /// The rejected input.
        value: String,
    },

    /// Input lacks a required column.
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    /// No records were supplied.
    #[error("No records provided for statement generation")]
    NoRecords,

    /// A total left the representable amount range.
    #[error("Amount overflow while computing {0}")]
    Overflow(String),

    /// An override named a field the statement computes itself.
    #[error("Field '{field}' is computed for the {} and cannot be overridden", kind.title())]
    ComputedField {
        /// Context field name.
        field: String,
        /// Statement being generated.
        kind: StatementKind,
    },

    /// Template source failed to parse.
    #[error("Template {name} is invalid: {message}")]
    InvalidTemplate {
        /// Template name.
        name: String,
        /// Parser message.
        message: String,
    },

    /// Template failed to render.
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReportError {
    /// Returns true for malformed numeric input.
    #[must_use]
    pub const fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidAmount { .. } | Self::InvalidCell { .. })
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        let message = err.to_string();
        match err {
            ReportError::TemplateNotFound(_) => Self::NotFound(message),
            ReportError::InvalidAmount { .. }
            | ReportError::InvalidCell { .. }
            | ReportError::UnknownStatementKind(_)
            | ReportError::Csv(_) => Self::Format(message),
            ReportError::MissingColumn(_)
            | ReportError::NoRecords
            | ReportError::Overflow(_)
            | ReportError::ComputedField { .. } => Self::Validation(message),
            ReportError::InvalidTemplate { .. } | ReportError::Render(_) => {
                Self::Template(message)
            }
            ReportError::Io(_) => Self::Io(message),
            ReportError::Serialization(_) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_errors_are_flagged() {
        let err = ReportError::InvalidAmount {
            field: "cash".into(),
            value: "abc".into(),
        };
        assert!(err.is_format_error());
        assert!(!ReportError::NoRecords.is_format_error());
    }

    #[test]
    fn test_conversion_to_app_error() {
        let not_found: AppError = ReportError::TemplateNotFound("x.md".into()).into();
        assert_eq!(not_found.error_code(), "NOT_FOUND");
        assert_eq!(not_found.to_string(), "Not found: Template not found: x.md");

        let format: AppError = ReportError::InvalidCell {
            row: 3,
            column: "Debit".into(),
            value: "n/a".into(),
        }
        .into();
        assert_eq!(format.error_code(), "FORMAT_ERROR");

        let overflow: AppError = ReportError::Overflow("total debits".into()).into();
        assert_eq!(overflow.error_code(), "VALIDATION_ERROR");

        let render: AppError = ReportError::Render("boom".into()).into();
        assert_eq!(render.error_code(), "TEMPLATE_ERROR");
    }
}
