use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ledgerdb::blockstore::BlockStore;
use ledgerdb::config::NodeConfig;
use ledgerdb::processor::{BlockProcessor, ProcessorConfig};
use ledgerdb::queue::BlockQueue;
use ledgerdb::types::{Block, ConfigTx, ConfigTxEnvelope, Payload};
use ledgerdb::worldstate::WorldState;

#[derive(Parser)]
#[command(author, version, about = "Permissioned transaction-ledger node")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node using the provided configuration file
    Start {
        #[arg(short, long, default_value = "config/node.toml")]
        config: PathBuf,
    },
    /// Generate a default node configuration file
    GenerateConfig {
        #[arg(short, long, default_value = "config/node.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => start_node(config).await?,
        Commands::GenerateConfig { path } => generate_config(path)?,
    }

    Ok(())
}

async fn start_node(config_path: PathBuf) -> Result<()> {
    let config = if config_path.exists() {
        NodeConfig::load(&config_path)?
    } else {
        let config = NodeConfig::default();
        config.save(&config_path)?;
        config
    };
    config.ensure_directories()?;

    let block_store = Arc::new(BlockStore::open(&config.block_store_dir())?);
    let worldstate = Arc::new(WorldState::open(&config.world_state_dir())?);
    let queue = Arc::new(BlockQueue::new(config.block_queue_size));

    let processor = BlockProcessor::new(ProcessorConfig {
        block_queue: queue.clone(),
        block_store: block_store.clone(),
        worldstate,
    });
    let handle = processor.start()?;

    if block_store.height()? == 0 {
        enqueue_genesis_block(&config, &queue)?;
    }

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.stop();
    Ok(())
}

/// Builds block 1 from the configured genesis membership. The bootstrap
/// config transaction carries no signature; there is no committed identity
/// yet to verify it against.
fn enqueue_genesis_block(config: &NodeConfig, queue: &BlockQueue) -> Result<()> {
    if config.genesis.is_empty() {
        warn!("no genesis configuration provided; waiting for an external genesis block");
        return Ok(());
    }

    let new_config = config.genesis.cluster_config()?;
    let user_id = new_config
        .admins
        .first()
        .map(|admin| admin.id.clone())
        .unwrap_or_default();
    let genesis = Block::new(
        1,
        Payload::ConfigTx(ConfigTxEnvelope {
            payload: ConfigTx {
                user_id,
                read_old_config_version: None,
                new_config,
            },
            signature: Vec::new(),
        }),
    );
    info!("enqueuing genesis configuration block");
    queue.enqueue(genesis);
    Ok(())
}

fn generate_config(path: PathBuf) -> Result<()> {
    let config = NodeConfig::default();
    config.ensure_directories()?;
    config.save(&path)?;
    info!(?path, "wrote default configuration");
    Ok(())
}
