use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use fs_err as fs;
use seqfix_cli::args::{AuditOptionArgs, DatabaseArgs};
use seqfix_cli::config::{self, CliOverrides, ConfigMerger, MergedConfig};
use seqfix_core::pipeline::{inventory, run_audit};
use seqfix_core::settings::AuditSettings;
use seqfix_core::{RunOptions, ToolError};
use seqfix_pg::PgDatabase;
use seqfix_render::{render_inventory_text, render_report_md, render_text};
use seqfix_types::report::{ReportToolInfo, SeqfixReport};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Nothing broken, nothing failed.
const EXIT_CLEAN: u8 = 0;
/// Broken sequences found (fixed or not) or per-table failures.
const EXIT_BROKEN: u8 = 1;
/// Invalid options, configuration, or connection.
const EXIT_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "seqfix",
    version,
    about = "Audit and repair PostgreSQL identity sequences that lag behind their tables."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find sequences behind their table's max key and move them forward.
    Audit(AuditArgs),
    /// List tables with their identity sequence and current state.
    Tables(TablesArgs),
}

#[derive(Debug, Parser)]
struct AuditArgs {
    #[command(flatten)]
    options: AuditOptionArgs,

    /// Tables audited concurrently.
    #[arg(long)]
    jobs: Option<usize>,

    /// 0: silent, 1: broken or fixed sequences, 2: everything, 3: with increment sources.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=3))]
    verbosity: u8,

    /// Output format on stdout.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Also write the JSON report to this path.
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct TablesArgs {
    #[command(flatten)]
    db: DatabaseArgs,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: ListFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match real_main().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn real_main() -> Result<ExitCode, ToolError> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Audit(args) => cmd_audit(args).await,
        Command::Tables(args) => cmd_tables(args).await,
    }
}

async fn cmd_audit(args: AuditArgs) -> Result<ExitCode, ToolError> {
    // Contradictory options fail before the config file or database is touched.
    let options = args.options.run_options()?;

    let merged = merge_config(&args.options.db, options.database_alias(), args.jobs)?;
    let settings = AuditSettings {
        options,
        sequence_template: merged.sequence_template.clone(),
        schema: Some(merged.schema.clone()),
        jobs: merged.jobs,
        repair_attempts: merged.repair_attempts,
    };
    debug!(
        "merged config: schema={}, jobs={}, repair_attempts={}, template={}",
        settings.schema.as_deref().unwrap_or_default(),
        settings.jobs,
        settings.repair_attempts,
        settings.sequence_template
    );

    let db = connect(&merged).await?;
    let outcome = run_audit(&settings, &db, &db, &db, tool_info()).await?;
    let report = outcome.report;

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&report, args.verbosity)),
        OutputFormat::Json => println!("{}", to_json(&report)?),
        OutputFormat::Markdown => print!("{}", render_report_md(&report)),
    }

    if let Some(path) = &args.report {
        write_json(path, &report)?;
        info!("wrote report to {}", path);
    }

    Ok(exit_code(&report))
}

async fn cmd_tables(args: TablesArgs) -> Result<ExitCode, ToolError> {
    let options = RunOptions::builder()
        .database_alias(args.db.database_alias.clone())
        .build()?;
    let merged = merge_config(&args.db, options.database_alias(), None)?;
    let settings = AuditSettings {
        options,
        sequence_template: merged.sequence_template.clone(),
        schema: Some(merged.schema.clone()),
        jobs: merged.jobs,
        repair_attempts: merged.repair_attempts,
    };

    let db = connect(&merged).await?;
    let rows = inventory(&settings, &db, &db).await?;

    match args.format {
        ListFormat::Text => print!("{}", render_inventory_text(&rows)),
        ListFormat::Json => println!("{}", to_json(&rows)?),
    }
    Ok(ExitCode::from(EXIT_CLEAN))
}

fn merge_config(
    db: &DatabaseArgs,
    alias: &str,
    jobs: Option<usize>,
) -> Result<MergedConfig, ToolError> {
    let cwd = std::env::current_dir().context("read current directory")?;
    let cwd = Utf8PathBuf::from_path_buf(cwd)
        .map_err(|p| anyhow::anyhow!("current directory is not UTF-8: {}", p.display()))?;
    let file_config =
        config::load_or_default(db.config.as_deref(), &cwd).context("load seqfix.toml config")?;

    let cli = CliOverrides {
        database_alias: alias.to_string(),
        database_url: db.database_url.clone(),
        schema: db.schema.clone(),
        jobs,
    };
    let merged = ConfigMerger::new(file_config).merge(&cli, std::env::var("DATABASE_URL").ok())?;
    Ok(merged)
}

async fn connect(merged: &MergedConfig) -> anyhow::Result<PgDatabase> {
    let db = PgDatabase::connect(&merged.database_url, merged.max_connections)
        .await?
        .with_schema(merged.schema.clone());
    debug!("connected; schema {}", db.schema());
    Ok(db)
}

fn exit_code(report: &SeqfixReport) -> ExitCode {
    if report.broken_found || !report.errors.is_empty() || report.summary.repair_failed > 0 {
        ExitCode::from(EXIT_BROKEN)
    } else {
        ExitCode::from(EXIT_CLEAN)
    }
}

fn to_json<T: serde::Serialize>(v: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(v).context("serialize json")
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    fs::write(path, to_json(v)?).with_context(|| format!("write {}", path))?;
    Ok(())
}

fn tool_info() -> ReportToolInfo {
    ReportToolInfo {
        name: "seqfix".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
