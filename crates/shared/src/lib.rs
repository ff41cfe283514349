//! Shared types, errors, and configuration for finstate.
//!
//! This crate provides common types used across all other crates:
//! - Decimal amount formatting and parsing
//! - Typed IDs for generated reports
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
