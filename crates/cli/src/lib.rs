use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use scout_pipeline::{
    normalize, ContextResolver, HttpMetadataSource, Orchestrator, Outcome, PipelineConfig,
    PipelineError, ResponseShape, DEFAULT_CAMPAIGN,
};
use scout_protocol::{ContextOption, ErrorBody, ErrorEnvelope, Query, ReportArtifact};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

pub mod http_api;
mod interactive;
mod render;

use render::RoundOutput;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Resolve a player by name and generate a scouting report", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON and reports)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML config file (overridden by SCOUT_* env vars and flags)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Resolution backend endpoint (env: SCOUT_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Season metadata base URL (env: SCOUT_METADATA_URL)
    #[arg(long, global = true)]
    metadata_url: Option<String>,

    /// Backend deadline in seconds (env: SCOUT_BACKEND_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one disambiguation round and print the candidates
    Search(SearchArgs),

    /// List the seasons available for a player id
    Seasons(SeasonsArgs),

    /// Generate a report for a known player id without prompts
    Report(ReportArgs),

    /// Interactive flow: search, pick a player, pick a season, generate
    Run(RunArgs),

    /// Print JSON schemas of the proxy request and domain types
    Schema,

    /// Serve the generate proxy over HTTP (POST /api/generate)
    ServeHttp(ServeArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Player name
    #[arg(long, default_value = "")]
    player: String,

    /// Club name to narrow the search
    #[arg(long)]
    club: Option<String>,

    /// Team id, used when no player name is given
    #[arg(long)]
    team_id: Option<String>,

    /// Report language (e.g. English, German)
    #[arg(long)]
    lang: Option<String>,
}

impl QueryArgs {
    fn query(&self) -> Query {
        Query {
            primary_name: self.player.clone(),
            secondary_name: self.club.clone(),
            language: self.lang.clone().unwrap_or_default(),
            organization_id: self.team_id.clone(),
        }
    }
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Write a report to this file or directory instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct SeasonsArgs {
    /// Player id
    id: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReportArgs {
    /// Player id (from `scout search`)
    #[arg(long)]
    player_id: String,

    /// Season id (from `scout seasons`)
    #[arg(long)]
    season_id: Option<String>,

    /// Tournament id (from `scout seasons`)
    #[arg(long)]
    tournament_id: Option<String>,

    /// Campaign label sent with the request
    #[arg(long)]
    campaign: Option<String>,

    /// Report language
    #[arg(long)]
    lang: Option<String>,

    /// Write the report to this file or directory instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    query: QueryArgs,

    /// Write the report to this file or directory instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:3000
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Auto-enable quiet mode when --json is used (to keep stdout clean for JSON parsing)
    let json_output = match &cli.command {
        Commands::Search(args) => args.json,
        Commands::Seasons(args) => args.json,
        Commands::Report(args) => args.json,
        Commands::Schema => true,
        _ => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match dispatch(cli).await {
        Ok(()) => Ok(()),
        Err(err) if json_output => {
            print_stdout(&serde_json::to_string_pretty(&ErrorBody {
                error: error_envelope(&err),
            })?)?;
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

fn error_envelope(err: &anyhow::Error) -> ErrorEnvelope {
    match err.downcast_ref::<PipelineError>() {
        Some(pipeline) => pipeline.envelope(),
        None => ErrorEnvelope {
            code: "internal".to_string(),
            message: format!("{err:#}"),
            retryable: false,
            hint: None,
        },
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    match cli.command {
        Commands::Search(args) => run_search(args, &config).await,
        Commands::Seasons(args) => run_seasons(args, &config).await,
        Commands::Report(args) => run_report(args, &config).await,
        Commands::Run(args) => run_interactive(args, &config).await,
        Commands::Schema => run_schema(),
        Commands::ServeHttp(args) => serve_http(args, &config).await,
    }
}

/// Defaults, then `--config`, then `SCOUT_*` env vars, then flags.
fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;
    if let Some(url) = &cli.backend_url {
        config.backend_url = url.clone();
    }
    if let Some(url) = &cli.metadata_url {
        config.metadata_base_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        config.backend_timeout_secs = secs;
    }
    log::debug!(
        "Backend {:?}, metadata {:?}, deadline {}s",
        config.backend_url,
        config.metadata_base_url,
        config.backend_timeout_secs
    );
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    print_stdout(&serde_json::to_string_pretty(value)?)
}

fn deliver_report(artifact: &ReportArtifact, out: Option<PathBuf>, json: bool) -> Result<()> {
    let path = render::store_artifact(artifact, out.as_deref())?;
    if json {
        return print_json(&render::report_output(artifact, path));
    }
    match path {
        Some(path) => print_stdout(&format!("Report written to {}", path.display())),
        None => print_stdout(&artifact.text_lossy()),
    }
}

fn print_candidates(candidates: Vec<scout_protocol::Candidate>, json: bool) -> Result<()> {
    if json {
        return print_json(&RoundOutput::Candidates { candidates });
    }
    if candidates.is_empty() {
        print_stdout("No players matched.")?;
    }
    for (i, candidate) in candidates.iter().enumerate() {
        print_stdout(&format!("{}. {}", i + 1, render::candidate_line(candidate)))?;
    }
    Ok(())
}

async fn run_search(args: SearchArgs, config: &PipelineConfig) -> Result<()> {
    let query = args.query.query();
    if query.is_empty() {
        return Err(PipelineError::InvalidQuery.into());
    }
    let orchestrator = Orchestrator::from_config(config)?;
    let mut session = orchestrator.session();

    match session.search(query).await? {
        Outcome::Candidates(candidates) => print_candidates(candidates, args.json),
        Outcome::Report(artifact) => deliver_report(&artifact, args.out, args.json),
    }
}

async fn run_seasons(args: SeasonsArgs, config: &PipelineConfig) -> Result<()> {
    let source = HttpMetadataSource::from_config(config)?;
    let resolver = ContextResolver::new(Arc::new(source), config.metadata_timeout());
    let options = resolver.resolve(&args.id).await;

    if args.json {
        return print_json(&options);
    }
    for option in &options {
        print_stdout(&render::context_line(option))?;
    }
    Ok(())
}

async fn run_report(args: ReportArgs, config: &PipelineConfig) -> Result<()> {
    let player_id = args.player_id.trim().to_string();
    if player_id.is_empty() {
        return Err(PipelineError::InvalidQuery.into());
    }
    let orchestrator = Orchestrator::from_config(config)?;
    let query = Query::new(player_id.clone()).with_language(args.lang.unwrap_or_default());

    let context = (args.season_id.is_some()
        || args.tournament_id.is_some()
        || args.campaign.is_some())
    .then(|| ContextOption {
        label: args
            .campaign
            .unwrap_or_else(|| DEFAULT_CAMPAIGN.to_string()),
        season_id: args.season_id.unwrap_or_default(),
        tournament_id: args.tournament_id.unwrap_or_default(),
        sort_year: String::new(),
    });
    let request = orchestrator
        .requests()
        .final_for(&player_id, &query, context.as_ref());

    match orchestrator.round(&request).await? {
        ResponseShape::CandidateList(raw) => {
            log::warn!("Backend answered the report request with a candidate list");
            print_candidates(normalize(&raw), args.json)
        }
        ResponseShape::ReportObject(artifact) | ResponseShape::OpaqueDocument(artifact) => {
            deliver_report(&artifact, args.out, args.json)
        }
    }
}

async fn run_interactive(args: RunArgs, config: &PipelineConfig) -> Result<()> {
    let query = args.query.query();
    if query.is_empty() {
        return Err(PipelineError::InvalidQuery.into());
    }
    let orchestrator = Orchestrator::from_config(config)?;
    let artifact = interactive::run(orchestrator, query).await?;
    deliver_report(&artifact, args.out, false)
}

fn run_schema() -> Result<()> {
    let schemas = scout_protocol::wire_schemas().context("Failed to build schemas")?;
    print_json(&schemas)
}

async fn serve_http(args: ServeArgs, config: &PipelineConfig) -> Result<()> {
    let orchestrator =
        Orchestrator::from_config(config).context("Proxy needs a valid backend configuration")?;
    let app = http_api::router(orchestrator);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving generate proxy: {base_url}/api/generate"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    print_stdout(&format!("Try: curl {base_url}/health"))?;
    print_stdout(&format!(
        "Try: curl -X POST {base_url}/api/generate -H 'Content-Type: application/json' -d '{{\"player_name\":\"Harry Kane\"}}'"
    ))?;
    axum::serve(listener, app).await?;
    Ok(())
}
