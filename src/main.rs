//! Wolfpack - Leader Election and Failure Detection
//!
//! Daemon entry point: loads the configuration, resolves the local node's
//! identity, and supervises the long-lived tasks.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfpack::config::{sample_config, WolfpackConfig};
use wolfpack::console::Console;
use wolfpack::error::Result;
use wolfpack::health::{HealthMonitor, Prober};
use wolfpack::identity::Node;
use wolfpack::network::discovery;
use wolfpack::network::{ControlListener, HealthResponder, UdpTransport};
use wolfpack::state::ClusterState;

/// Wolfpack - Leader Election and Failure Detection
#[derive(Parser)]
#[command(name = "wolfpack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfpack.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Wolfpack node
    Start,

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfpack.toml")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show node information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Start => run_start(cli.config).await,
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(cli.config),
        Commands::Info => run_info(cli.config),
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Start the Wolfpack node
async fn run_start(config_path: PathBuf) -> Result<()> {
    tracing::info!("Starting Wolfpack node...");

    // Load configuration
    let config = match WolfpackConfig::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load configuration from {:?}: {}", config_path, e);
            tracing::error!("Please check that the config file exists and is valid TOML");
            return Err(e);
        }
    };

    // Resolve the local identity. This is the only fatal runtime check:
    // a node that is not in the configured deployment cannot participate.
    let local_addr = match discovery::resolve_local_addr(&config) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("{}", e);
            tracing::error!("Add this machine's address to cluster.peers or set node.address");
            return Err(e);
        }
    };

    let local = Node::new(local_addr);
    let peers: Vec<Node> = config
        .cluster
        .peers
        .iter()
        .filter(|&&addr| addr != local_addr)
        .map(|&addr| Node::new(addr))
        .collect();

    tracing::info!("Local node: {}", local);
    tracing::info!("Configured peers: {}", peers.len());

    // Bind the two channels
    let transport = Arc::new(UdpTransport::bind(&config.cluster).await?);
    tracing::info!(
        "Channels bound: control {}, health {}",
        transport.control_port(),
        transport.health_port()
    );

    // Shared cluster state; the active set starts as the local node alone
    let state = Arc::new(ClusterState::new(local));

    // Announce ourselves to the other peers
    discovery::connect_sweep(&transport, &peers).await;

    // Spawn the long-lived loops
    let responder_handle = tokio::spawn(HealthResponder::new(Arc::clone(&transport)).run());

    let listener_handle = tokio::spawn(
        ControlListener::new(Arc::clone(&transport), Arc::clone(&state)).run(),
    );

    let prober: Arc<dyn Prober> = Arc::clone(&transport) as Arc<dyn Prober>;
    let monitor_handle = tokio::spawn(
        HealthMonitor::new(
            prober,
            Arc::clone(&state),
            peers.clone(),
            config.probe_interval(),
        )
        .run(),
    );

    let console_handle = tokio::spawn(
        Console::new(Arc::clone(&transport), Arc::clone(&state), peers).run(),
    );

    // Run until the operator stops us
    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    // Cleanup
    console_handle.abort();
    monitor_handle.abort();
    listener_handle.abort();
    responder_handle.abort();

    tracing::info!("Wolfpack shutdown complete");
    Ok(())
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    std::fs::write(&output, sample_config())?;
    println!("Configuration file created: {}", output.display());
    println!("\nEdit cluster.peers to list every node in the deployment.");
    println!("Then start with: wolfpack start --config {}", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: PathBuf) -> Result<()> {
    match WolfpackConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Peers:        {}", config.cluster.peers.len());
            println!("  Control Port: {}", config.cluster.control_port);
            println!("  Health Port:  {}", config.cluster.health_port);
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show node information
fn run_info(config_path: PathBuf) -> Result<()> {
    let config = WolfpackConfig::from_file(&config_path)?;

    println!("Wolfpack Node Information");
    println!("=========================");
    println!();
    match discovery::resolve_local_addr(&config) {
        Ok(addr) => println!("Local Node:       {}", Node::new(addr)),
        Err(_) => println!("Local Node:       (not in configured peers)"),
    }
    println!("Control Port:     {}", config.cluster.control_port);
    println!("Health Port:      {}", config.cluster.health_port);
    println!();
    println!("Cluster Members:");
    for &addr in &config.cluster.peers {
        println!("  {}", Node::new(addr));
    }
    println!();
    println!("Timing:");
    println!("  Sweep Interval: {} ms", config.cluster.probe_interval_ms);
    println!("  Probe Timeout:  {} ms", config.cluster.probe_timeout_ms);
    println!("  Recv Timeout:   {} ms", config.cluster.recv_timeout_ms);

    Ok(())
}
