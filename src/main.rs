use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowrun_core::config::AppConfig;
use flowrun_engine::{validate_and_plan, FlowEngine, ReqwestClient};
use flowrun_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "flowrun", version, about = "Execute no-code flow graphs")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "flowrun.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default)
    Serve,
    /// Execute a flow graph from a JSON file and print the run result
    Run {
        /// Graph file: {"nodes": [...], "edges": [...]}
        file: PathBuf,
    },
    /// Validate a flow graph and print its execution order
    Validate {
        file: PathBuf,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowrun=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        warn!(path = %cli.config.display(), "Config file not found, using environment");
        AppConfig::from_env()
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Validate { file } => {
            let payload = read_payload(&file)?;
            let (graph, plan) = validate_and_plan(&payload)?;
            println!(
                "valid: {} nodes, {} edges, {} chain(s)",
                graph.nodes.len(),
                graph.edges.len(),
                plan.chains.len()
            );
            for (i, chain) in plan.chains.iter().enumerate() {
                let ids: Vec<&str> = chain
                    .steps
                    .iter()
                    .map(|s| graph.nodes[s.index].id.as_str())
                    .collect();
                println!("  chain {}: {}", i + 1, ids.join(" -> "));
            }
        }
        Commands::Run { file } => {
            let payload = read_payload(&file)?;
            let engine = build_engine(config)?;

            let cancel = CancellationToken::new();
            let cancel_clone = cancel.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Cancelling run...");
                cancel_clone.cancel();
            });

            let run = engine.execute_payload(&payload, cancel).await?;
            println!("{}", serde_json::to_string_pretty(&run)?);
            if !run.success {
                std::process::exit(1);
            }
        }
        Commands::Serve => {
            let gateway_config = config.gateway.clone().unwrap_or_default();
            let engine = Arc::new(build_engine(config)?);
            info!(bind = %gateway_config.bind, "Starting flow gateway");
            let server = GatewayServer::new(gateway_config, engine);

            let cancel = CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
    }

    Ok(())
}

fn build_engine(config: AppConfig) -> anyhow::Result<FlowEngine> {
    let http = ReqwestClient::new(&config.engine)?;
    Ok(FlowEngine::new(config, Arc::new(http)))
}

fn read_payload(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}
