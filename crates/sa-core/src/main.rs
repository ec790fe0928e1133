//! sa-core: operator CLI for the support analytics pipeline.

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use sa_artifact::pretty_rows;
use sa_common::contract::{contract_schemas, CONTRACT_NAMES};
use sa_common::{ArtifactRow, CallId, Error, ResolutionStatus};
use sa_config::{resolve_config, AnalyticsConfig, ConfigOverrides};
use sa_core::aggregate::{Bucket, Dimension, KpiMetric};
use sa_core::exit_codes::ExitCode;
use sa_core::logging::init_logging;
use sa_core::refresh::RefreshHistory;
use sa_core::{
    AnalyticsService, BuildError, CallFilters, CancelToken, EtlCompiler, EtlInputs,
    RefreshCoordinator,
};
use sa_manifest::ManifestStore;
use serde::Serialize;
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "sa-core", version, about = "Support analytics ETL and query CLI")]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (default layout for inputs, manifest, artifacts)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Manifest path
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Log filter, e.g. `debug` or `sa_core=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
    /// ASCII table (query only; other commands fall back to text)
    Table,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate, join, and publish a new artifact
    Build(BuildArgs),
    /// Show the published manifest
    Manifest {
        /// Include artifact file size and modification time
        #[arg(long)]
        describe: bool,
    },
    /// Filter and paginate calls
    Query(QueryArgs),
    /// Show one call with its agent fields
    Call {
        id: String,
    },
    /// Agent leaderboard
    Agents {
        /// Show only the first N agents
        #[arg(long)]
        limit: Option<usize>,
    },
    /// KPI time-series
    Kpi {
        #[arg(long, value_enum, default_value_t = Bucket::Day)]
        bucket: Bucket,
        #[arg(long, value_enum, default_value_t = KpiMetric::CallVolume)]
        metric: KpiMetric,
    },
    /// Call counts by category
    Breakdown {
        #[arg(long, value_enum, default_value_t = Dimension::IssueType)]
        by: Dimension,
    },
    /// Serving state of the published artifact
    Health,
    /// Recent refresh attempts, newest first
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print JSON schemas for the data contracts
    Schema {
        /// Contract name; all contracts when omitted
        name: Option<String>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Raw calls source (.json, .jsonl, .csv)
    #[arg(long)]
    calls: Option<PathBuf>,

    /// Raw agents source (.json, .jsonl, .csv)
    #[arg(long)]
    agents: Option<PathBuf>,

    /// Artifact directory
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Validate and fingerprint without publishing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    region: Option<String>,

    #[arg(long)]
    issue_type: Option<String>,

    /// Resolved, Escalated, Pending, or Abandoned
    #[arg(long)]
    status: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long)]
    per_page: Option<u32>,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let format = cli.global.format;

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "sa-core", &mut io::stdout());
        return ExitCode::Clean.into();
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => return fail(format, &e, None).into(),
    };
    init_logging(&config.log);

    let code = match run(&cli.command, &config, format) {
        Ok(code) => code,
        Err(Failure::Build(e)) => {
            let details = build_details(&e);
            fail(format, &Error::from(e), details)
        }
        Err(Failure::Other(e)) => fail(format, &e, None),
    };
    code.into()
}

enum Failure {
    Build(BuildError),
    Other(Error),
}

macro_rules! into_failure {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Failure {
                fn from(err: $ty) -> Self {
                    Failure::Other(err.into())
                }
            }
        )*
    };
}

into_failure!(
    Error,
    sa_artifact::ArtifactError,
    sa_manifest::ManifestError,
    sa_core::refresh::HistoryError,
    serde_json::Error,
);

type CmdResult = Result<ExitCode, Failure>;

fn load_config(cli: &Cli) -> Result<AnalyticsConfig, Error> {
    let mut overrides = ConfigOverrides {
        config_path: cli.global.config.clone(),
        data_dir: cli.global.data_dir.clone(),
        manifest_path: cli.global.manifest.clone(),
        log_level: cli.global.log_level.clone(),
        log_json: cli.global.log_json.then_some(true),
        ..Default::default()
    };
    if let Commands::Build(args) = &cli.command {
        overrides.calls_path = args.calls.clone();
        overrides.agents_path = args.agents.clone();
        overrides.artifact_dir = args.artifact_dir.clone();
    }
    resolve_config(&overrides).map_err(|e| Error::Config(e.to_string()))
}

fn run(command: &Commands, config: &AnalyticsConfig, format: OutputFormat) -> CmdResult {
    match command {
        Commands::Build(args) => cmd_build(config, args.dry_run, format),
        Commands::Manifest { describe } => cmd_manifest(config, *describe, format),
        Commands::Query(args) => cmd_query(config, args, format),
        Commands::Call { id } => cmd_call(config, id, format),
        Commands::Agents { limit } => cmd_agents(config, *limit, format),
        Commands::Kpi { bucket, metric } => cmd_kpi(config, *bucket, *metric, format),
        Commands::Breakdown { by } => cmd_breakdown(config, *by, format),
        Commands::Health => cmd_health(config, format),
        Commands::History { limit } => cmd_history(config, *limit, format),
        Commands::Schema { name } => cmd_schema(name.as_deref()),
        Commands::Completions { .. } => Ok(ExitCode::Clean),
    }
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<(), Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text | OutputFormat::Table => println!("{}", text()),
    }
    Ok(())
}

fn fail(format: OutputFormat, err: &Error, details: Option<serde_json::Value>) -> ExitCode {
    let code = ExitCode::for_error(err);
    match format {
        OutputFormat::Json => {
            let mut body = json!({
                "error": {
                    "code": err.code(),
                    "exit_code": code.as_u8(),
                    "message": err.to_string(),
                }
            });
            if let Some(details) = details {
                body["error"]["details"] = details;
            }
            println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
        }
        OutputFormat::Text | OutputFormat::Table => eprintln!("error: {err}"),
    }
    code
}

fn build_details(err: &BuildError) -> Option<serde_json::Value> {
    match err {
        BuildError::Validation {
            invalid_record_count,
            sample_errors,
        } => Some(json!({
            "invalid_record_count": invalid_record_count,
            "sample_errors": sample_errors,
        })),
        _ => None,
    }
}

fn cmd_build(config: &AnalyticsConfig, dry_run: bool, format: OutputFormat) -> CmdResult {
    let compiler = EtlCompiler::new(config);
    let inputs = EtlInputs::from_config(config);
    let cancel = CancelToken::new();

    if dry_run {
        let output = compiler.build(&inputs, &cancel).map_err(Failure::Build)?;
        let body = json!({ "manifest": output.manifest, "stats": output.stats, "published": false });
        emit(format, &body, || {
            format!(
                "dry run: {} rows, hash {} ({})",
                output.stats.rows,
                output.manifest.short_hash(),
                output.manifest.notes
            )
        })?;
        return Ok(ExitCode::Clean);
    }

    let store = Arc::new(ManifestStore::new(&config.manifest_path));
    let history = RefreshHistory::with_log(config.history_path(), config.refresh.history_limit)?;
    let coordinator = RefreshCoordinator::new(compiler, store, history);
    let manifest = coordinator.refresh(&inputs, &cancel).map_err(Failure::Build)?;
    emit(format, &manifest, || {
        format!(
            "published {} ({} rows): {}",
            manifest.path, manifest.row_count, manifest.notes
        )
    })?;
    Ok(ExitCode::Clean)
}

fn cmd_manifest(config: &AnalyticsConfig, describe: bool, format: OutputFormat) -> CmdResult {
    let store = ManifestStore::new(&config.manifest_path);
    if describe {
        let info = store.describe()?;
        emit(format, &info, || {
            let size = info
                .size_bytes
                .map_or_else(|| "missing".to_string(), |s| format!("{s} bytes"));
            format!(
                "path: {}\nhash: {}\nrows: {}\ngenerated_at: {}\nnotes: {}\nartifact: {} ({size})",
                info.manifest.path,
                info.manifest.hash,
                info.manifest.row_count,
                info.manifest.generated_at,
                info.manifest.notes,
                info.artifact_path
            )
        })?;
    } else {
        let manifest = store.load()?;
        emit(format, &manifest, || {
            format!(
                "path: {}\nhash: {}\nrows: {}\ngenerated_at: {}\nnotes: {}",
                manifest.path, manifest.hash, manifest.row_count, manifest.generated_at, manifest.notes
            )
        })?;
    }
    Ok(ExitCode::Clean)
}

fn cmd_query(config: &AnalyticsConfig, args: &QueryArgs, format: OutputFormat) -> CmdResult {
    let status = args
        .status
        .as_deref()
        .map(str::parse::<ResolutionStatus>)
        .transpose()
        .map_err(Error::InvalidArgument)?;
    let filters = CallFilters {
        region: args.region.clone(),
        issue_type: args.issue_type.clone(),
        status,
    };

    let service = AnalyticsService::open(config)?;
    let snapshot = service.engine().snapshot();
    let per_page = args.per_page.unwrap_or(config.query.default_per_page);
    let page = snapshot.query(&filters, args.page, per_page, config.query.max_per_page);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Text => {
            for call in &page.rows {
                println!(
                    "{}\t{}\t{}\t{}\t{}s\t{}",
                    call.id,
                    call.agent_id,
                    call.customer_region,
                    call.issue_type,
                    call.duration_seconds,
                    call.resolution_status
                );
            }
            println!(
                "page {}/{} ({} matched)",
                page.page, page.total_pages, page.total_matched
            );
        }
        OutputFormat::Table => {
            let rows: Vec<ArtifactRow> = page
                .rows
                .iter()
                .filter_map(|call| snapshot.get_call(&call.id).cloned())
                .collect();
            println!("{}", pretty_rows(&rows)?);
        }
    }
    Ok(if page.total_matched == 0 {
        ExitCode::Empty
    } else {
        ExitCode::Clean
    })
}

fn cmd_call(config: &AnalyticsConfig, id: &str, format: OutputFormat) -> CmdResult {
    let service = AnalyticsService::open(config)?;
    let Some(row) = service.get_call(&CallId::from(id)) else {
        emit(format, &json!({ "id": id, "found": false }), || {
            format!("call {id} not found")
        })?;
        return Ok(ExitCode::Empty);
    };
    emit(format, &row, || {
        format!(
            "{} agent={} ({}) region={} issue={} duration={}s status={} rating={}",
            row.call.id,
            row.call.agent_id,
            row.agent_name.as_deref().unwrap_or("unknown"),
            row.call.customer_region,
            row.call.issue_type,
            row.call.duration_seconds,
            row.call.resolution_status,
            row.call
                .rating
                .map_or_else(|| "-".to_string(), |r| format!("{r:.1}"))
        )
    })?;
    Ok(ExitCode::Clean)
}

fn cmd_agents(config: &AnalyticsConfig, limit: Option<usize>, format: OutputFormat) -> CmdResult {
    let service = AnalyticsService::open(config)?;
    let mut stats = service.agent_stats();
    if let Some(limit) = limit {
        stats.truncate(limit);
    }
    emit(format, &stats, || {
        stats
            .iter()
            .map(|s| {
                format!(
                    "{:<12} {:<20} calls={:<5} avg_rating={:<5} avg_seconds={:.1}",
                    s.agent_id,
                    s.agent_name.as_deref().unwrap_or("-"),
                    s.total_calls,
                    s.avg_rating
                        .map_or_else(|| "-".to_string(), |r| format!("{r:.2}")),
                    s.avg_resolution_seconds
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    Ok(if stats.is_empty() {
        ExitCode::Empty
    } else {
        ExitCode::Clean
    })
}

fn cmd_kpi(config: &AnalyticsConfig, bucket: Bucket, metric: KpiMetric, format: OutputFormat) -> CmdResult {
    let service = AnalyticsService::open(config)?;
    let series = service.kpi_series(bucket, metric);
    emit(format, &series, || {
        series
            .iter()
            .map(|p| {
                let delta = p.delta.map_or_else(String::new, |d| format!(" ({d:+.2})"));
                format!("{}  {:.2}{delta}", p.timestamp.format("%Y-%m-%d"), p.value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    Ok(if series.is_empty() {
        ExitCode::Empty
    } else {
        ExitCode::Clean
    })
}

fn cmd_breakdown(config: &AnalyticsConfig, by: Dimension, format: OutputFormat) -> CmdResult {
    let service = AnalyticsService::open(config)?;
    let entries = service.breakdown(by);
    emit(format, &entries, || {
        entries
            .iter()
            .map(|e| format!("{:<20} {:>6} {:>6.1}%", e.key, e.count, e.share * 100.0))
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    Ok(ExitCode::Clean)
}

fn cmd_health(config: &AnalyticsConfig, format: OutputFormat) -> CmdResult {
    let service = AnalyticsService::open(config)?;
    let health = service.health();
    emit(format, &health, || {
        format!(
            "{:?}: serving {} ({} rows, loaded {})",
            health.status,
            &health.fingerprint[..16.min(health.fingerprint.len())],
            health.row_count,
            health.loaded_at.to_rfc3339()
        )
    })?;
    Ok(ExitCode::Clean)
}

fn cmd_history(config: &AnalyticsConfig, limit: usize, format: OutputFormat) -> CmdResult {
    let history = RefreshHistory::with_log(config.history_path(), limit)?;
    let events = history.events();
    emit(format, &events, || {
        events
            .iter()
            .map(|e| {
                format!(
                    "{} {:?} {}ms {}",
                    e.timestamp.to_rfc3339(),
                    e.result,
                    e.duration_ms,
                    e.note
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    Ok(ExitCode::Clean)
}

/// Schemas are always printed as JSON.
fn cmd_schema(name: Option<&str>) -> CmdResult {
    let mut schemas = contract_schemas()?;
    let value = match name {
        Some(name) => schemas.remove(name).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unknown contract '{name}' (expected one of: {})",
                CONTRACT_NAMES.join(", ")
            ))
        })?,
        None => serde_json::to_value(&schemas)?,
    };
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(ExitCode::Clean)
}
