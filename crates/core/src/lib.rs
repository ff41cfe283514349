//! Core statement logic for finstate.
//!
//! This crate turns account records into rendered financial statements. It
//! has no network or database dependencies; the only I/O is reading CSV
//! input, template files and writing reports.
//!
//! # Modules
//!
//! - `reports` - Ingestion, mapping, balance verification and rendering
//! - `audit` - Append-only log of generated statements

pub mod audit;
pub mod reports;
