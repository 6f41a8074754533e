mod config;
mod error;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mcp::{McpConnector, McpSession, ToolSession};
use runtime::{OpenAiBackend, Orchestrator, build_catalog};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "switchboard.toml";

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Route a model's tool calls across MCP servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (.toml, or .json in the mcpServers layout)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one query, printing the full transcript as JSON
    Ask {
        query: String,
        /// Request a streamed completion
        #[arg(long)]
        stream: bool,
    },
    /// Connect to every server and print the merged tool catalog
    Tools,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();
    let config = load_config(cli.config.as_deref())?.with_env(|key| std::env::var(key).ok());

    match cli.command {
        Commands::Ask { query, stream } => cmd_ask(&config, &query, stream).await,
        Commands::Tools => cmd_tools(&config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

async fn cmd_ask(config: &Config, query: &str, stream: bool) -> Result<()> {
    let api_key = config.model.api_key.clone().ok_or(Error::MissingApiKey)?;
    let backend = OpenAiBackend::builder(api_key, &config.model.name)
        .base_url(&config.model.base_url)
        .stream(stream || config.model.stream)
        .build();
    info!(%backend, "using model");

    let sessions = connect(config).await?;
    let outcome = ask(config, backend, &sessions, query).await;
    close(&sessions).await;

    print_json(&outcome?)
}

async fn ask(
    config: &Config,
    backend: OpenAiBackend,
    sessions: &[Arc<McpSession>],
    query: &str,
) -> Result<Vec<runtime::Message>> {
    let (catalog, routes) = build_catalog(sessions, config.orchestrator.duplicate_tools).await?;
    info!(tools = catalog.len(), "catalog ready");

    let agent = Orchestrator::new(backend, catalog, routes).with_config(config.orchestrator.limits());
    Ok(agent.process_query(query).await?)
}

async fn cmd_tools(config: &Config) -> Result<()> {
    let sessions = connect(config).await?;
    let outcome = build_catalog(&sessions, config.orchestrator.duplicate_tools).await;
    close(&sessions).await;

    let (catalog, _) = outcome?;
    print_json(catalog.specs())
}

async fn connect(config: &Config) -> Result<Vec<Arc<McpSession>>> {
    let descriptors = config.descriptors()?;
    let sessions = mcp::connect_all(&McpConnector, &descriptors).await?;
    Ok(sessions.into_iter().map(Arc::new).collect())
}

async fn close(sessions: &[Arc<McpSession>]) {
    for session in sessions {
        session.close().await;
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
