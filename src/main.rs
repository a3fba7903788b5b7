// src/main.rs
//! Transaction risk monitor entry point
use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tx_risk_monitor::api::MonitorServer;
use tx_risk_monitor::dashboard::Dashboard;
use tx_risk_monitor::risk_detection::{JsonReportWriter, MonitorConfig, TransactionSummary};
use tx_risk_monitor::service::RiskMonitor;

#[derive(Parser)]
#[command(name = "tx-risk-monitor")]
#[command(about = "Blockchain transaction risk monitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API (and the terminal dashboard when enabled)
    Serve {
        /// Port to bind, overrides the configuration
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Classify a single transaction summary and print the result
    Analyze(AnalyzeArgs),
    /// Print the validated signature table
    Signatures {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(ClapArgs)]
struct AnalyzeArgs {
    /// JSON file holding one transaction summary
    #[arg(long)]
    input: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging()?;

    info!("Starting transaction risk monitor v{}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Some(Commands::Serve { port, config }) => serve(load_config(config.as_deref())?, port).await,
        Some(Commands::Analyze(analyze_args)) => {
            let config = load_config(analyze_args.config.as_deref())?;
            analyze(config, &analyze_args.input).await
        }
        Some(Commands::Signatures { config }) => print_signatures(&load_config(config.as_deref())?),
        None => {
            info!("No command specified, starting server");
            serve(load_config(None)?, None).await
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=info,h2=info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    let config = match path {
        Some(path) => MonitorConfig::load_from(path),
        None => MonitorConfig::load(),
    };
    config.context("failed to load monitor configuration")
}

async fn serve(config: MonitorConfig, port: Option<u16>) -> Result<()> {
    let monitor = Arc::new(RiskMonitor::from_config(&config)?);
    let shutdown = CancellationToken::new();

    let dashboard = if config.dashboard.enabled {
        let dashboard = Dashboard::new(
            monitor.clone(),
            Duration::from_secs(config.dashboard.refresh_secs),
        );
        Some(tokio::spawn(dashboard.run(shutdown.clone())))
    } else {
        None
    };

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
        signal_token.cancel();
    });

    let port = port.unwrap_or(config.server.port);
    info!("Starting server on port {}", port);
    let result = MonitorServer::new(monitor, config.server.host.clone(), port)
        .start(shutdown.clone())
        .await;

    shutdown.cancel();
    if let Some(handle) = dashboard {
        let _ = handle.await;
    }
    result
}

async fn analyze(config: MonitorConfig, input: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let summary: TransactionSummary =
        serde_json::from_str(&content).context("input is not a transaction summary")?;

    // The report is awaited below instead of spawned by the monitor
    let mut monitor_config = config.clone();
    monitor_config.reports.enabled = false;
    let monitor = RiskMonitor::from_config(&monitor_config)?;

    let result = if config.reports.enabled {
        let writer = JsonReportWriter::new(config.reports.directory.clone());
        monitor.classify_and_persist(summary, &writer).await?
    } else {
        monitor.classify_and_record(summary).await?
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_signatures(config: &MonitorConfig) -> Result<()> {
    let matcher = config.build_matcher()?;
    for (priority, signature) in matcher.signatures().iter().enumerate() {
        println!(
            "{:>2}. {:<12} {:<8} {}",
            priority + 1,
            signature.pattern,
            signature.tier.as_str(),
            signature.message
        );
    }
    Ok(())
}
