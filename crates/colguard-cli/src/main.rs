mod logging;
mod run;
mod settings;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use colguard_core::{Error as CoreError, Mode};
use colguard_engine::{MetadataResolver, ResolverOptions};
use colguard_schema::{
    SchemaError, SchemaReport, ValidatedSchema, document_json_schema, load_document_value,
    validate_document,
};
use logging::init_logging;
use run::{load_records, validate_records};
use settings::{LogFormat, ModeSetting, Settings, load_settings};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("invalid schema document: {}", first_issue(.0))]
    InvalidSchema(SchemaReport),
    #[error("invalid records: {0}")]
    Records(String),
    #[error("cannot read settings {path}: {source}")]
    Settings {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    SettingsFormat(#[from] toml::de::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("logging error: {0}")]
    Logging(String),
}

fn first_issue(report: &SchemaReport) -> String {
    match report.errors.first() {
        Some(issue) => format!("{} at {}: {}", issue.code, issue.path, issue.message),
        None => "no details".to_string(),
    }
}

#[derive(Parser, Debug)]
#[command(name = "colguard", version, about = "Pre-write record validation")]
struct Cli {
    /// Settings file (defaults to colguard.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log output format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate JSON records against a schema document.
    Validate(ValidateArgs),
    /// Check a schema document and print the report.
    CheckSchema(CheckSchemaArgs),
    /// Print the JSON Schema of schema documents.
    JsonSchema,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Schema document (JSON or TOML).
    #[arg(long)]
    schema: PathBuf,
    /// Entity type of every record.
    #[arg(long)]
    entity: String,
    /// JSON file with one record object or an array of them.
    #[arg(long)]
    records: PathBuf,
    /// Write mode to validate for.
    #[arg(long, value_enum)]
    mode: Option<ModeSetting>,
    /// Resolve metadata on every record instead of caching descriptors.
    #[arg(long, default_value_t = false)]
    no_cache: bool,
}

#[derive(Args, Debug)]
struct CheckSchemaArgs {
    /// Schema document (JSON or TOML).
    #[arg(long)]
    schema: PathBuf,
}

fn main() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    init_logging(&settings.logging)?;

    let ok = match cli.command {
        Command::Validate(args) => run_validate(args, &settings)?,
        Command::CheckSchema(args) => run_check_schema(&args.schema)?,
        Command::JsonSchema => run_json_schema()?,
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn load_schema(path: &Path) -> Result<ValidatedSchema, CliError> {
    let document = load_document_value(path)?;
    validate_document(&document).map_err(CliError::InvalidSchema)
}

fn run_validate(args: ValidateArgs, settings: &Settings) -> Result<bool, CliError> {
    let ValidateArgs {
        schema,
        entity,
        records,
        mode,
        no_cache,
    } = args;

    let mode = Mode::from(mode.unwrap_or(settings.validator.mode));
    let options = ResolverOptions {
        use_cache: settings.validator.use_cache && !no_cache,
    };

    let run_id = Uuid::new_v4().to_string();
    let started_at = chrono::Utc::now();
    let timer = Instant::now();
    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        started_at = %started_at.to_rfc3339(),
        entity = %entity,
        mode = %mode,
        use_cache = options.use_cache
    );

    let validated = load_schema(&schema)?;
    for warning in &validated.warnings {
        tracing::warn!(
            event = "schema_warning",
            code = %warning.code,
            path = %warning.path,
            message = %warning.message
        );
    }
    tracing::info!(
        event = "schema_loaded",
        path = %schema.display(),
        entities = validated.registry.len()
    );

    let resolver = MetadataResolver::new(validated.registry, options);
    let records = load_records(&records, &entity)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = validate_records(&resolver, records, mode, &mut out)?;
    out.flush()?;

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(
        event = "run_finished",
        run_id = %run_id,
        status = if summary.is_ok() { "success" } else { "failed" },
        records = summary.total,
        failed = summary.failed,
        duration_ms = duration_ms
    );

    Ok(summary.is_ok())
}

fn run_check_schema(path: &Path) -> Result<bool, CliError> {
    let document = load_document_value(path)?;
    let report = match validate_document(&document) {
        Ok(validated) => {
            tracing::info!(
                event = "schema_loaded",
                path = %path.display(),
                entities = validated.registry.len(),
                warnings = validated.warnings.len()
            );
            SchemaReport {
                errors: Vec::new(),
                warnings: validated.warnings,
            }
        }
        Err(report) => report,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(report.is_ok())
}

fn run_json_schema() -> Result<bool, CliError> {
    println!("{}", serde_json::to_string_pretty(&document_json_schema())?);
    Ok(true)
}
