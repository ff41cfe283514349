//! finstate command-line tool
//!
//! Reads trial balance exports and renders financial statements as Markdown.

mod cli;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use finstate_core::audit::{self, AuditLog, AuditRecord, AuditStats};
use finstate_core::reports::{
    BalanceVerifier, CsvIngestor, GeneratedReport, RecordSummary, RecordValidator, ReportMetadata,
    ReportService, TemplateStore, ValidationReport,
};
use finstate_shared::config::LoggingConfig;
use finstate_shared::types::{format_amount, parse_amount};
use finstate_shared::{AppConfig, AppError};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{AuditCommand, BatchArgs, Cli, Command, RenderArgs, RenderOptions, TemplatesCommand};

/// Templates directory used by `templates install` when none is configured.
const DEFAULT_TEMPLATES_DIR: &str = "templates";

fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = match AppConfig::load_with_file(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let err = AppError::from(e);
            eprintln!("error: {err}");
            return exit_code(&err);
        }
    };

    init_tracing(&config.logging);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("error: {err:#}");
            err.downcast_ref::<AppError>()
                .map_or(ExitCode::FAILURE, exit_code)
        }
    }
}

/// Logs go to stderr so statements printed with `--stdout` stay clean.
fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| config.filter.as_str().into());
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn exit_code(err: &AppError) -> ExitCode {
    u8::try_from(err.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

fn run(command: Command, config: &AppConfig) -> anyhow::Result<ExitCode> {
    match command {
        Command::Render(args) => render(&args, config),
        Command::Batch(args) => batch(&args, config),
        Command::Validate { input } => validate(&input, config),
        Command::Templates { action } => templates(action, config),
        Command::Verify { left, right } => verify(&left, &right, config),
        Command::Audit { action } => audit_command(action, config),
    }
}

fn render(args: &RenderArgs, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let rendered = render_file(&args.input, &args.options, args.stdout, config)?;

    match rendered.path {
        Some(path) => println!("{} saved to {}", rendered.report.kind.title(), path.display()),
        None => print!("{}", rendered.report.content),
    }
    Ok(ExitCode::SUCCESS)
}

fn batch(args: &BatchArgs, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let total = args.inputs.len();
    info!(files = total, "Starting batch");

    let mut succeeded = 0;
    for (idx, input) in args.inputs.iter().enumerate() {
        info!(file = %input.display(), position = idx + 1, of = total, "Processing file");
        match render_file(input, &args.options, false, config) {
            Ok(rendered) => {
                succeeded += 1;
                if let Some(path) = rendered.path {
                    println!("✅ {} -> {}", input.display(), path.display());
                }
            }
            Err(err) => {
                warn!(file = %input.display(), error = %err, "File processing failed");
                println!("❌ {}: {err}", input.display());
            }
        }
    }

    info!(succeeded, files = total, "Batch complete");
    println!("{succeeded}/{total} files processed successfully");
    Ok(if succeeded == total {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// A statement produced by [`render_file`].
#[derive(Debug)]
struct Rendered {
    report: GeneratedReport,
    /// Where the statement was written; `None` when it goes to stdout.
    path: Option<PathBuf>,
}

/// What a run learned before it finished or failed, for the audit line.
#[derive(Default)]
struct RunTrail {
    input_hash: Option<String>,
    validation: Option<ValidationReport>,
}

/// Renders one input and appends its audit line, whether the run succeeds
/// or fails.
fn render_file(
    input: &Path,
    options: &RenderOptions,
    stdout: bool,
    config: &AppConfig,
) -> Result<Rendered, AppError> {
    let started = Instant::now();
    let mut trail = RunTrail::default();
    let outcome = produce(input, options, stdout, config, &mut trail);

    let record = match &outcome {
        Ok(rendered) => AuditRecord::completed(&rendered.report, rendered.path.as_deref()),
        Err(err) => AuditRecord::failed(
            Some(input.display().to_string()),
            options.kind.statement_kind(),
            err.to_string(),
        ),
    }
    .with_input_hash(trail.input_hash);
    let record = match &trail.validation {
        Some(validation) => record.with_validation(validation),
        None => record,
    }
    .with_duration(started.elapsed());

    let appended = AuditLog::new(&config.reports.audit_dir).append(&record);
    match (outcome, appended) {
        (Ok(rendered), Ok(())) => Ok(rendered),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(err), appended) => {
            if let Err(e) = appended {
                warn!(error = %e, "Could not record failed run");
            }
            Err(err)
        }
    }
}

fn produce(
    input: &Path,
    options: &RenderOptions,
    stdout: bool,
    config: &AppConfig,
    trail: &mut RunTrail,
) -> Result<Rendered, AppError> {
    let bytes = fs::read(input)?;
    trail.input_hash = Some(audit::fingerprint(&bytes));

    let records = CsvIngestor::read_bytes(&bytes)?;
    let validation = RecordValidator::new(config.validation.clone()).validate(&records);
    for problem in &validation.errors {
        warn!(%problem, "Rendering despite validation error");
    }
    trail.validation = Some(validation);

    let metadata = ReportMetadata {
        company_name: Some(
            options
                .company
                .clone()
                .unwrap_or_else(|| config.reports.company_name.clone()),
        ),
        as_of: options.date.clone(),
        overrides: options.overrides.clone(),
        generated_at: None,
        source: Some(input.display().to_string()),
    };

    let service = ReportService::from_config(&config.reports);
    let report = service.generate(&records, options.kind.statement_kind(), &metadata)?;

    if stdout {
        return Ok(Rendered { report, path: None });
    }

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.reports.output_dir));
    let path = ReportService::write(&report, &output_dir)?;
    Ok(Rendered {
        report,
        path: Some(path),
    })
}

fn validate(input: &Path, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let records = CsvIngestor::read_path(input).map_err(AppError::from)?;
    let report = RecordValidator::new(config.validation.clone()).validate(&records);
    let summary = RecordSummary::from_records(&records).map_err(AppError::from)?;

    println!("Records processed: {}", report.records_processed);
    println!("Total debits:      ${}", format_amount(report.total_debits));
    println!("Total credits:     ${}", format_amount(report.total_credits));
    println!("Difference:        ${}", format_amount(report.balance_difference));
    println!("Largest debit:     ${}", format_amount(summary.largest_debit));
    println!("Largest credit:    ${}", format_amount(summary.largest_credit));
    println!("With description:  {}", summary.accounts_with_description);
    println!("Account types:");
    for (account_type, count) in &summary.account_types {
        println!("  - {account_type}: {count}");
    }
    println!("Categories:");
    for (category, count) in &summary.categories {
        println!("  - {category}: {count}");
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }

    if report.is_valid {
        println!("✅ Validation passed");
        Ok(ExitCode::SUCCESS)
    } else {
        Err(AppError::Validation(report.errors.join("; ")).into())
    }
}

fn templates(action: TemplatesCommand, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let configured_dir = config.reports.templates_dir.as_deref();
    let store = configured_dir.map_or_else(TemplateStore::builtin, TemplateStore::with_dir);

    match action {
        TemplatesCommand::List => {
            for name in store.list().map_err(AppError::from)? {
                let info = store.describe(&name).map_err(AppError::from)?;
                println!("{name}\t{} lines\t{} variables", info.lines, info.variables.len());
            }
        }
        TemplatesCommand::Install { dir } => {
            let dir = dir.unwrap_or_else(|| {
                PathBuf::from(configured_dir.unwrap_or(DEFAULT_TEMPLATES_DIR))
            });
            let written = TemplateStore::install_defaults(&dir).map_err(AppError::from)?;
            for path in &written {
                println!("created {}", path.display());
            }
            info!(dir = %dir.display(), created = written.len(), "Templates installed");
        }
        TemplatesCommand::Show { name } => {
            let info = store.describe(&name).map_err(AppError::from)?;
            println!("Template: {}", info.name);
            println!("Size:     {} bytes, {} lines", info.size, info.lines);
            println!("Variables:");
            for variable in &info.variables {
                println!("  - {variable}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn verify(left: &str, right: &str, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let left = parse_total(left)?;
    let right = parse_total(right)?;

    let result = BalanceVerifier::new(config.reports.balance_tolerance).verify(left, right);
    if result.is_balanced {
        println!("✅ Balanced");
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "❌ Not Balanced (Difference: ${})",
            format_amount(result.difference)
        );
        Ok(ExitCode::FAILURE)
    }
}

fn audit_command(action: AuditCommand, config: &AppConfig) -> anyhow::Result<ExitCode> {
    let AuditCommand::Stats { days, json } = action;
    let stats = AuditLog::new(&config.reports.audit_dir)
        .stats(days)
        .map_err(AppError::from)?;

    if json {
        let out = serde_json::to_string_pretty(&stats)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        println!("{out}");
    } else {
        print_stats(&stats);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_stats(stats: &AuditStats) {
    println!("Runs:            {}", stats.total_runs);
    println!("Completed:       {}", stats.completed);
    println!("Failed:          {}", stats.failed);
    println!("Files processed: {}", stats.files_processed);
    match stats.average_duration_ms {
        Some(ms) => println!("Average time:    {ms} ms"),
        None => println!("Average time:    n/a"),
    }
    if !stats.template_usage.is_empty() {
        println!("Templates:");
        for (template, count) in &stats.template_usage {
            println!("  - {template}: {count}");
        }
    }
    if !stats.error_summary.is_empty() {
        println!("Errors:");
        for (error, count) in &stats.error_summary {
            println!("  - {error}: {count}");
        }
    }
    if !stats.recent.is_empty() {
        println!("Recent runs:");
        for run in &stats.recent {
            println!(
                "  - {} {:?} {}",
                run.generated_at.format("%Y-%m-%d %H:%M:%S"),
                run.status,
                run.source.as_deref().unwrap_or("-")
            );
        }
    }
}

fn parse_total(raw: &str) -> Result<Decimal, AppError> {
    parse_amount(raw).map_err(|e| AppError::Format(e.to_string()))
}
