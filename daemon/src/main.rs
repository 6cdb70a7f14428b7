//! HappyUC daemon — entry point for running a full node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use huc_core::Manager;
use huc_node::{init_logging, HucNode, LogFormat, NodeConfig, ServiceContext, ShutdownController};
use huc_nullables::NullSubsystems;
use huc_store_lmdb::LmdbOpener;
use huc_types::{Address, U256};

#[derive(Parser)]
#[command(name = "huc", about = "HappyUC full node daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// flags and environment variables override them.
    #[arg(long, env = "HUC_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the chain database and engine caches.
    #[arg(long, default_value = "./huc_data", env = "HUC_DATA_DIR")]
    data_dir: PathBuf,

    /// Network identifier.
    #[arg(long, env = "HUC_NETWORK_ID")]
    network_id: Option<u64>,

    /// Blockchain sync mode: "fast" or "full".
    #[arg(long, env = "HUC_SYNC_MODE")]
    syncmode: Option<String>,

    /// Maximum number of network peers.
    #[arg(long, default_value_t = 25, env = "HUC_MAX_PEERS")]
    max_peers: usize,

    /// Percentage of time allowed for serving light clients (0 disables).
    #[arg(long, env = "HUC_LIGHT_SERV")]
    light_serv: Option<u32>,

    /// Maximum number of light client peers.
    #[arg(long, env = "HUC_LIGHT_PEERS")]
    light_peers: Option<usize>,

    /// Megabytes of memory allocated to the chain database.
    #[arg(long, env = "HUC_CACHE")]
    cache: Option<usize>,

    /// Address receiving mining rewards.
    #[arg(long, env = "HUC_COINBASE")]
    coinbase: Option<Address>,

    /// Minimal gas price to accept for mining, in wei.
    #[arg(long, env = "HUC_GAS_PRICE")]
    gas_price: Option<u64>,

    /// Block extra data set by the miner.
    #[arg(long, env = "HUC_EXTRA_DATA")]
    extra_data: Option<String>,

    /// Start mining once the node is up.
    #[arg(long, env = "HUC_MINE")]
    mine: bool,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "HUC_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "HUC_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node until SIGINT or SIGTERM.
    Run,
    /// Print the effective configuration as TOML and exit.
    DumpConfig,
}

impl Cli {
    /// The file configuration (or defaults) with flags applied on top.
    fn node_config(&self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_toml_file(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => NodeConfig::default(),
        };
        if let Some(network_id) = self.network_id {
            config.network_id = network_id;
        }
        if let Some(mode) = &self.syncmode {
            config.sync_mode = mode.clone();
        }
        if let Some(light_serv) = self.light_serv {
            config.light_serv = light_serv;
        }
        if let Some(light_peers) = self.light_peers {
            config.light_peers = light_peers;
        }
        if let Some(cache) = self.cache {
            config.database_cache = cache;
        }
        if self.coinbase.is_some() {
            config.coinbase = self.coinbase;
        }
        if let Some(price) = self.gas_price {
            config.gas_price = U256::from(price);
        }
        if let Some(extra) = &self.extra_data {
            config.extra_data = extra.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.node_config()?;

    if let Command::DumpConfig = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(config.log_format, &config.log_level)?;
    tracing::info!(
        data_dir = %cli.data_dir.display(),
        network = config.network_id,
        sync_mode = %config.sync_mode,
        "Starting HappyUC node"
    );

    std::fs::create_dir_all(&cli.data_dir)
        .with_context(|| format!("creating data directory {}", cli.data_dir.display()))?;
    let ctx = ServiceContext::new(
        Some(cli.data_dir.clone()),
        Arc::new(LmdbOpener::new(&cli.data_dir)),
        Arc::new(Manager::default()),
        // Chain, pool, miner and protocol layers run in-process without peers.
        Arc::new(NullSubsystems::new()),
    );

    let mut node = HucNode::new(&ctx, config)?;
    node.start(cli.max_peers)?;
    if cli.mine {
        if let Err(e) = node.mining().start_mining(true) {
            tracing::error!(error = %e, "cannot start mining");
        }
    }

    ShutdownController::wait_for_signal().await;
    tracing::info!("Shutdown signal received — stopping node");
    node.stop().await?;

    tracing::info!("HappyUC daemon exited cleanly");
    Ok(())
}
