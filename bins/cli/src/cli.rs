//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use finstate_core::reports::StatementKind;

/// Generate financial statements from trial balance CSV exports.
#[derive(Parser, Debug)]
#[command(name = "finstate", version, about)]
pub struct Cli {
    /// Extra configuration file layered over `config/default`
    #[arg(long, global = true, env = "FINSTATE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a statement from a CSV file
    Render(RenderArgs),

    /// Render statements from several CSV files, continuing past failures
    Batch(BatchArgs),

    /// Check a CSV file for balance and data problems
    Validate {
        /// CSV file with account records
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Manage statement templates
    Templates {
        #[command(subcommand)]
        action: TemplatesCommand,
    },

    /// Compare two totals with the configured tolerance
    Verify {
        /// Left-hand total (assets or debits)
        #[arg(allow_hyphen_values = true)]
        left: String,
        /// Right-hand total (liabilities and equity, or credits)
        #[arg(allow_hyphen_values = true)]
        right: String,
    },

    /// Inspect the audit trail
    Audit {
        #[command(subcommand)]
        action: AuditCommand,
    },
}

/// Arguments of `finstate render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// CSV file with account records
    #[arg(long, short)]
    pub input: PathBuf,

    #[command(flatten)]
    pub options: RenderOptions,

    /// Print the statement instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

/// Arguments of `finstate batch`.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// CSV files with account records
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub options: RenderOptions,
}

/// Statement options shared by `render` and `batch`.
#[derive(Args, Debug, Clone, Default)]
pub struct RenderOptions {
    /// Statement to produce
    #[arg(long, short, value_enum, default_value_t = KindArg::Auto)]
    pub kind: KindArg,

    /// Company name shown in the header
    #[arg(long)]
    pub company: Option<String>,

    /// As-of date shown in the header, e.g. "December 31, 2024"
    #[arg(long)]
    pub date: Option<String>,

    /// Set a statement field, e.g. `--set ppe=150000` (repeatable)
    #[arg(long = "set", value_name = "FIELD=AMOUNT", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,

    /// Directory the statement is written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Statement selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KindArg {
    /// Detect from the account types
    #[default]
    Auto,
    /// Balance sheet
    BalanceSheet,
    /// Profit & loss statement
    ProfitLoss,
    /// Trial balance
    TrialBalance,
    /// Cash flow statement
    CashFlow,
}

impl KindArg {
    /// The explicit statement kind, or `None` for detection.
    pub const fn statement_kind(self) -> Option<StatementKind> {
        match self {
            Self::Auto => None,
            Self::BalanceSheet => Some(StatementKind::BalanceSheet),
            Self::ProfitLoss => Some(StatementKind::ProfitLoss),
            Self::TrialBalance => Some(StatementKind::TrialBalance),
            Self::CashFlow => Some(StatementKind::CashFlow),
        }
    }
}

/// `finstate templates` subcommands.
#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    /// List available templates
    List,
    /// Write the built-in templates into the templates directory
    Install {
        /// Target directory (defaults to the configured templates directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Show a template's variables and size
    Show {
        /// Template name, with or without `.md`
        name: String,
    },
}

/// `finstate audit` subcommands.
#[derive(Subcommand, Debug)]
pub enum AuditCommand {
    /// Summarize recorded runs
    Stats {
        /// Only count runs from the last N days
        #[arg(long)]
        days: Option<u32>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parses `field=amount`.
fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=AMOUNT, got {raw:?}"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in {raw:?}"));
    }
    Ok((field.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("ppe=150000", ("ppe", "150000"))]
    #[case(" cash = $1,200.50 ", ("cash", "$1,200.50"))]
    #[case("dividends=-500", ("dividends", "-500"))]
    fn test_parse_override(#[case] raw: &str, #[case] expected: (&str, &str)) {
        assert_eq!(
            parse_override(raw).unwrap(),
            (expected.0.to_string(), expected.1.to_string())
        );
    }

    #[rstest]
    #[case("ppe")]
    #[case("=100")]
    fn test_parse_override_rejects(#[case] raw: &str) {
        assert!(parse_override(raw).is_err());
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::try_parse_from([
            "finstate",
            "render",
            "--input",
            "tb.csv",
            "--kind",
            "profit-loss",
            "--set",
            "cogs=100",
            "--set",
            "interest_income=5",
            "--stdout",
        ])
        .unwrap();

        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.options.kind.statement_kind(), Some(StatementKind::ProfitLoss));
        assert_eq!(args.options.overrides.len(), 2);
        assert!(args.stdout);
    }

    #[test]
    fn test_kind_defaults_to_auto() {
        let cli = Cli::try_parse_from(["finstate", "render", "-i", "tb.csv"]).unwrap();
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.options.kind, KindArg::Auto);
        assert_eq!(args.options.kind.statement_kind(), None);
    }

    #[test]
    fn test_verify_accepts_negative_totals() {
        let cli = Cli::try_parse_from(["finstate", "verify", "-10", "(10)"]).unwrap();
        assert!(matches!(cli.command, Command::Verify { left, right } if left == "-10" && right == "(10)"));
    }

    #[test]
    fn test_batch_takes_several_inputs() {
        let cli = Cli::try_parse_from([
            "finstate",
            "batch",
            "jan.csv",
            "feb.csv",
            "--kind",
            "trial-balance",
            "--output-dir",
            "out",
        ])
        .unwrap();

        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.inputs, vec![PathBuf::from("jan.csv"), PathBuf::from("feb.csv")]);
        assert_eq!(args.options.kind, KindArg::TrialBalance);
        assert_eq!(args.options.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_batch_requires_an_input() {
        assert!(Cli::try_parse_from(["finstate", "batch"]).is_err());
    }

    #[test]
    fn test_audit_stats_args() {
        let cli = Cli::try_parse_from(["finstate", "audit", "stats", "--days", "30", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Audit { action: AuditCommand::Stats { days: Some(30), json: true } }
        ));
    }
}
