//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Report generation configuration.
    #[serde(default)]
    pub reports: ReportsConfig,
    /// Record validation configuration.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Report generation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    /// Directory holding template overrides. Built-in templates are used when unset.
    #[serde(default)]
    pub templates_dir: Option<String>,
    /// Directory rendered statements are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Directory the audit log is appended to.
    #[serde(default = "default_audit_dir")]
    pub audit_dir: String,
    /// Company name used when none is given on the command line.
    #[serde(default = "default_company_name")]
    pub company_name: String,
    /// Largest difference still reported as balanced.
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: Decimal,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            templates_dir: None,
            output_dir: default_output_dir(),
            audit_dir: default_audit_dir(),
            company_name: default_company_name(),
            balance_tolerance: default_balance_tolerance(),
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_audit_dir() -> String {
    "audit".to_string()
}

fn default_company_name() -> String {
    "Your Company Name".to_string()
}

fn default_balance_tolerance() -> Decimal {
    Decimal::new(5, 3) // 0.005
}

/// Record validation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Debit/credit difference above which a record set fails validation.
    #[serde(default = "default_validation_tolerance")]
    pub tolerance: Decimal,
    /// Account names shorter than this are flagged.
    #[serde(default = "default_min_account_name_length")]
    pub min_account_name_length: usize,
    /// Amounts above this are flagged as suspiciously large.
    #[serde(default = "default_max_amount")]
    pub max_amount: Decimal,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tolerance: default_validation_tolerance(),
            min_account_name_length: default_min_account_name_length(),
            max_amount: default_max_amount(),
        }
    }
}

fn default_validation_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

fn default_min_account_name_length() -> usize {
    2
}

fn default_max_amount() -> Decimal {
    Decimal::new(99_999_999_999, 2) // 999,999,999.99
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "finstate=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_with_file(None)
    }

    /// Loads configuration, layering `file` (if given) over the default files
    /// and under the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `file` is missing or any source fails to parse.
    pub fn load_with_file(file: Option<&str>) -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false));

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("FINSTATE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
