//! Ledger node CLI
//!
//! Creates wallets, writes a genesis chain, and runs a gossiping node.

use clap::{Parser, Subcommand};
use ledger_node::api::{create_router, ApiState};
use ledger_node::core::{Block, Blockchain};
use ledger_node::network::{Node, NodeConfig};
use ledger_node::storage::{Storage, StorageConfig};
use ledger_node::wallet::Wallet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ledger-node")]
#[command(version = "0.1.0")]
#[command(about = "A minimal peer-to-peer UTXO ledger node", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet operations
    Wallet {
        #[command(subcommand)]
        action: WalletCommands,
    },

    /// Write a chain holding only a genesis block
    Genesis {
        /// Wallet credited by the genesis transaction
        #[arg(short, long)]
        wallet: PathBuf,

        /// Amount credited
        #[arg(short, long, default_value = "100")]
        amount: u64,

        /// Data directory for blockchain storage
        #[arg(short, long, default_value = ".ledger_data")]
        data_dir: PathBuf,

        /// Overwrite an existing chain
        #[arg(long)]
        force: bool,
    },

    /// Run a node
    Node(NodeArgs),
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Create a new wallet file
    New {
        /// Output file
        #[arg(short, long, default_value = "wallet.json")]
        out: PathBuf,
    },

    /// Show a wallet's public key and address
    Show {
        #[arg(short, long, default_value = "wallet.json")]
        path: PathBuf,
    },
}

#[derive(clap::Args)]
struct NodeArgs {
    /// Host part of the address announced to peers
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8333")]
    port: u16,

    /// Seed peers (comma-separated ip:port)
    #[arg(short, long, value_delimiter = ',', default_value = "127.0.0.1:8333")]
    seeds: Vec<String>,

    /// Data directory for blockchain storage
    #[arg(short, long, default_value = ".ledger_data")]
    data_dir: PathBuf,

    /// Minimum seconds between packing attempts
    #[arg(long, default_value = "1")]
    pack_min: u64,

    /// Maximum seconds between packing attempts
    #[arg(long, default_value = "10")]
    pack_max: u64,

    /// Seconds between heartbeat sweeps
    #[arg(long, default_value = "30")]
    heartbeat: u64,

    /// Per-request peer timeout in seconds
    #[arg(long, default_value = "5")]
    peer_timeout: u64,

    /// Keep the chain in memory only
    #[arg(long)]
    no_persist: bool,
}

impl From<NodeArgs> for NodeConfig {
    fn from(args: NodeArgs) -> Self {
        NodeConfig {
            host: args.host,
            port: args.port,
            seed_peers: args.seeds,
            data_dir: args.data_dir,
            pack_interval_min: Duration::from_secs(args.pack_min),
            pack_interval_max: Duration::from_secs(args.pack_max),
            heartbeat_interval: Duration::from_secs(args.heartbeat),
            peer_timeout: Duration::from_secs(args.peer_timeout),
            persist: !args.no_persist,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Wallet { action } => match action {
            WalletCommands::New { out } => cmd_wallet_new(&out)?,
            WalletCommands::Show { path } => cmd_wallet_show(&path)?,
        },
        Commands::Genesis {
            wallet,
            amount,
            data_dir,
            force,
        } => cmd_genesis(&wallet, amount, data_dir, force)?,
        Commands::Node(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_node(args.into()))?;
        }
    }

    Ok(())
}

fn cmd_wallet_new(out: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    if out.exists() {
        return Err(format!("{} already exists", out.display()).into());
    }
    let wallet = Wallet::new();
    wallet.save(out)?;

    println!("✅ Created wallet {}", out.display());
    println!("   Address:    {}", wallet.address());
    println!("   Public key: {}", wallet.public_key());
    Ok(())
}

fn cmd_wallet_show(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let wallet = Wallet::load(path)?;
    println!("👛 Wallet {}", path.display());
    println!("   Address:    {}", wallet.address());
    println!("   Public key: {}", wallet.public_key());
    Ok(())
}

fn cmd_genesis(
    wallet_path: &PathBuf,
    amount: u64,
    data_dir: PathBuf,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::new(StorageConfig {
        data_dir,
        ..Default::default()
    })?;
    if storage.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            storage.blockchain_path().display()
        )
        .into());
    }

    let wallet = Wallet::load(wallet_path)?;
    let genesis = Block::genesis(&wallet.public_key(), amount);
    let chain = Blockchain::with_genesis(genesis)?;
    storage.save(&chain)?;

    println!("⛓️  Genesis written to {}", storage.blockchain_path().display());
    println!("   Block:  {}", chain.tip_hash());
    println!("   Credit: {} to {}", amount, wallet.address());
    Ok(())
}

async fn run_node(config: NodeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let bind_addr = format!("{}:{}", config.host, config.port);
    let node = Arc::new(Node::open(config)?);

    let status = node.status().await;
    println!("🌐 Node {} starting", status.address);
    println!("   Height: {}  Tip: {}", status.height, status.tip_hash);
    println!("   Peers:  {}", status.peers);

    let tasks = node.spawn_background_tasks();

    // Handle Ctrl+C
    let signal_node = Arc::clone(&node);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n📴 Shutting down node...");
            signal_node.shutdown();
        }
    });

    let app = create_router(ApiState {
        node: Arc::clone(&node),
    });
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("Listening on {}", bind_addr);

    let token = node.shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    for task in tasks {
        if let Err(e) = task.await {
            log::error!("Background task failed: {}", e);
        }
    }

    let status = node.status().await;
    println!("✅ Node stopped at height {}", status.height);
    Ok(())
}
