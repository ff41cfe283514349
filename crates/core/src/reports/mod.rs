//! Financial statement generation.
//!
//! Records flow through ingestion, validation and mapping into a
//! [`StatementContext`], which the [`StatementRenderer`] fills into one of
//! the statement templates:
//! - Balance Sheet
//! - Profit & Loss
//! - Trial Balance
//! - Cash Flow

pub mod aggregator;
pub mod categorize;
pub mod context;
pub mod detection;
pub mod error;
pub mod ingestion;
pub mod mapping;
pub mod renderer;
pub mod service;
pub mod templates;
pub mod types;
pub mod validation;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use aggregator::TrialBalanceAggregator;
pub use context::StatementContext;
pub use detection::detect_statement_kind;
pub use error::ReportError;
pub use ingestion::CsvIngestor;
pub use mapping::ContextMapper;
pub use renderer::StatementRenderer;
pub use service::{GeneratedReport, ReportMetadata, ReportService};
pub use templates::{TemplateInfo, TemplateSource, TemplateStore};
pub use types::*;
pub use validation::{RecordSummary, RecordValidator, ValidationReport};
pub use verifier::BalanceVerifier;
