mod config;
mod registry;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use config::{ConfigError, DEFAULT_META_SCHEMA_URL, ImportConfig};
use registry::{
    RegistryError, RunContext, RunOptions, init_logging, init_run_logging, start_run, write_summary,
};
use schemaport_compile::{
    CompiledSchema, SchemaValidator, compile_file, compile_remote, load_meta_schema,
};
use schemaport_core::{DEFAULT_SRID, Error as CoreError, redact_database_url};
use schemaport_ddl::ImportPlan;
use schemaport_import::{
    ChunkSource, FileListSource, ImportContext, ImportSummary, PgImportTarget, ReaderSource,
    RecordBatcher, RenderConfigClient, dataset_files, fetch_rows, write_render_config,
};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "schemaport", version, about = "Dataset schema compiler and bulk importer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a dataset schema, inlining referenced class schemas.
    Compile(CompileArgs),
    /// Compile a dataset published under a schema base URL.
    Check(CheckArgs),
    /// Compile a dataset schema and validate it against the meta-schema.
    Validate(ValidateArgs),
    /// Print the DDL script for a dataset schema.
    Ddl(DdlArgs),
    /// Recreate the dataset tables and load NDJSON records.
    Import(ImportArgs),
    /// Print rows of an imported table as JSON.
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Path to `<dataset>.dataset.schema.json`.
    schema: PathBuf,
    /// Write the compiled schema here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Dataset id under the base URL.
    dataset: String,
    /// Base URL hosting `<dataset>/<dataset>` and its class schemas.
    #[arg(long, value_name = "URL")]
    base_url: String,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    schema: PathBuf,
    /// Meta-schema location (URL or file).
    #[arg(long, value_name = "FILE_OR_URL", default_value = DEFAULT_META_SCHEMA_URL)]
    meta_schema: String,
}

#[derive(Args, Debug)]
struct DdlArgs {
    schema: PathBuf,
    /// SRID for geometry columns of classes without a CRS.
    #[arg(long, default_value_t = DEFAULT_SRID)]
    srid: i32,
}

#[derive(Args, Debug)]
struct ImportArgs {
    schema: PathBuf,
    /// NDJSON files to load; stdin is read when none are given.
    files: Vec<PathBuf>,
    /// Load every `*.ndjson` file next to the schema.
    #[arg(long, default_value_t = false, conflicts_with = "files")]
    dataset_dir: bool,
    /// Database connection string.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Records per batch.
    #[arg(long)]
    batch_size: Option<usize>,
    /// SRID for geometry columns of classes without a CRS.
    #[arg(long)]
    srid: Option<i32>,
    /// Skip meta-schema validation.
    #[arg(long, default_value_t = false)]
    skip_validation: bool,
    /// Render service receiving the compiled schema.
    #[arg(long, value_name = "URL")]
    render_url: Option<String>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FetchArgs {
    dataset: String,
    class: String,
    #[arg(long, default_value_t = 10)]
    limit: i64,
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compile(args) => run_compile(args).await,
        Command::Check(args) => run_check(args).await,
        Command::Validate(args) => run_validate(args).await,
        Command::Ddl(args) => run_ddl(args).await,
        Command::Import(args) => run_import(args).await,
        Command::Fetch(args) => run_fetch(args).await,
    }
}

async fn run_compile(args: CompileArgs) -> Result<(), CliError> {
    init_logging()?;
    let compiled = compile_file(&args.schema).await?;
    let text = serde_json::to_string_pretty(&compiled.document)?;

    match args.out {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&out, text)?;
            tracing::info!(event = "compiled_schema_written", path = %out.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn run_check(args: CheckArgs) -> Result<(), CliError> {
    init_logging()?;
    let compiled = compile_remote(&args.base_url, &args.dataset).await?;
    println!("{}", serde_json::to_string_pretty(&compiled.document)?);
    Ok(())
}

async fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    init_logging()?;
    let compiled = compile_file(&args.schema).await?;
    validate_compiled(&compiled, &args.meta_schema).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "dataset": compiled.id(),
            "valid": true,
        }))?
    );
    Ok(())
}

async fn run_ddl(args: DdlArgs) -> Result<(), CliError> {
    init_logging()?;
    let compiled = compile_file(&args.schema).await?;
    let plan = ImportPlan::build(&compiled.dataset, args.srid)?;
    println!("{}", plan.script);
    Ok(())
}

async fn run_import(args: ImportArgs) -> Result<(), CliError> {
    let mut config = ImportConfig::load(args.config.as_deref())?.with_env();
    if let Some(conn) = args.conn {
        config.database_url = Some(conn);
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(srid) = args.srid {
        config.default_srid = srid;
    }
    if args.skip_validation {
        config.validate = false;
    }
    if let Some(render_url) = args.render_url {
        config.render_url = Some(render_url);
    }
    if let Some(run_dir) = args.run_dir {
        config.run_dir = run_dir;
    }

    if config.batch_size == 0 {
        return Err(CliError::InvalidConfig("batch size must be at least 1".to_string()));
    }
    let database_url = config.database_url.clone().ok_or_else(|| {
        CliError::InvalidConfig(
            "connection string is required (--conn, DATABASE_URL or config file)".to_string(),
        )
    })?;
    let engine = detect_engine(&database_url)?;

    let inputs = if args.dataset_dir {
        dataset_files(schema_dir(&args.schema)).await?
    } else {
        args.files
    };

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir: config.run_dir.clone(),
        schema_path: args.schema.clone(),
        connection: redact_database_url(&database_url),
        options: RunOptions {
            batch_size: config.batch_size,
            default_srid: config.default_srid,
            validate: config.validate,
            render_url: config.render_url.clone(),
            inputs: if inputs.is_empty() {
                vec!["-".to_string()]
            } else {
                inputs.iter().map(|path| path.display().to_string()).collect()
            },
        },
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        engine = %engine,
        run_dir = %run_paths.root.display(),
    );
    let timer = Instant::now();

    let result = import_dataset(&args.schema, &config, &database_url, inputs).await;
    let duration_ms = timer.elapsed().as_millis() as u64;

    match result {
        Ok(summary) => {
            write_summary(&run_paths, &summary)?;
            tracing::info!(event = "summary_written", path = %run_paths.summary_path.display());
            println!("{}", serde_json::to_string_pretty(&summary)?);
            tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                event = "run_finished",
                status = "failure",
                duration_ms = duration_ms,
                error = %err,
            );
            Err(err)
        }
    }
}

async fn import_dataset(
    schema: &Path,
    config: &ImportConfig,
    database_url: &str,
    inputs: Vec<PathBuf>,
) -> Result<ImportSummary, CliError> {
    let compiled = compile_file(schema).await?;

    if config.validate {
        validate_compiled(&compiled, &config.meta_schema_url).await?;
    } else {
        tracing::info!(event = "validation_skipped", dataset = %compiled.id());
    }

    let plan = ImportPlan::build(&compiled.dataset, config.default_srid)?;

    if let Some(render_url) = &config.render_url {
        let client = RenderConfigClient::new(render_url.clone())?;
        let text = client.render(&compiled.document).await?;
        write_render_config(&config.render_dir, compiled.id(), &text).await?;
    }

    let context = ImportContext::connect(database_url, &config.connect_options()).await?;
    tracing::info!(event = "database_connected", connection = %redact_database_url(database_url));

    let result = match context.begin(&plan.dataset).await {
        Ok(target) if inputs.is_empty() => {
            load(&plan, target, ReaderSource::new(tokio::io::stdin()), config.batch_size).await
        }
        Ok(target) => load(&plan, target, FileListSource::new(inputs), config.batch_size).await,
        Err(err) => Err(err),
    };
    context.close().await;

    result.map_err(CliError::from)
}

async fn load<S: ChunkSource>(
    plan: &ImportPlan,
    target: PgImportTarget,
    source: S,
    batch_size: usize,
) -> schemaport_core::Result<ImportSummary> {
    let mut batcher = RecordBatcher::with_batch_size(source, batch_size);
    schemaport_import::run_import(plan, target, &mut batcher).await
}

async fn run_fetch(args: FetchArgs) -> Result<(), CliError> {
    init_logging()?;
    let mut config = ImportConfig::load(args.config.as_deref())?.with_env();
    if let Some(conn) = args.conn {
        config.database_url = Some(conn);
    }
    let database_url = config.database_url.clone().ok_or_else(|| {
        CliError::InvalidConfig("connection string is required".to_string())
    })?;
    detect_engine(&database_url)?;

    let context = ImportContext::connect(&database_url, &config.connect_options()).await?;
    let rows = fetch_rows(context.pool(), &args.dataset, &args.class, args.limit).await;
    context.close().await;

    println!("{}", serde_json::to_string_pretty(&rows?)?);
    Ok(())
}

/// Validate on a blocking thread: the validator may fetch remote
/// references with a blocking HTTP client.
async fn validate_compiled(compiled: &CompiledSchema, meta_schema: &str) -> Result<(), CliError> {
    let meta_schema = load_meta_schema(meta_schema).await?;
    let document: Value = compiled.document.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        let validator = SchemaValidator::new(&meta_schema)?;
        validator.validate(&document).map(|_| ())
    })
    .await?;

    if let Err(CoreError::Validation(failure)) = &outcome {
        for issue in &failure.issues {
            tracing::error!(event = "validation_issue", path = %issue.path, message = %issue.message);
        }
    }
    outcome?;

    tracing::info!(event = "schema_validated", dataset = %compiled.id());
    Ok(())
}

fn schema_dir(schema: &Path) -> &Path {
    schema
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(redact_database_url(conn)))
    }
}
