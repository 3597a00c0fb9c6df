//! Command-line entry point for the ledger node: wallet management,
//! one-shot transactions and mining against a local chain file, and a
//! long-running gossip node.

mod chain_file;
mod error;
mod network;
mod wallet;

use chain_core::Transaction;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::chain_file::ChainFile;
use crate::error::AppResult;
use crate::wallet::Wallet;

const DEFAULT_CHAIN_FILE: &str = "chain.json";
const DEFAULT_WALLET_FILE: &str = "wallet.json";
const DEFAULT_DIFFICULTY: u32 = chain_core::blockchain::DEFAULT_DIFFICULTY;
const DEFAULT_PORT: u16 = 8333;
const MAX_GOSSIP_WORKERS: usize = 16;

#[derive(Parser)]
#[command(name = "ledger-node", about = "A pedagogical UTXO blockchain node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generates a new wallet keypair and writes it to disk.
    CreateWallet {
        #[arg(long, default_value = DEFAULT_WALLET_FILE)]
        output: PathBuf,
    },
    /// Prints the confirmed balance of an address.
    Balance {
        address: String,
        #[arg(long, default_value = DEFAULT_CHAIN_FILE)]
        chain_file: PathBuf,
    },
    /// Builds, signs, and queues a transaction against the local chain file.
    Send {
        #[arg(long, default_value = DEFAULT_WALLET_FILE)]
        wallet: PathBuf,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        #[arg(long, default_value_t = 0)]
        fee: u64,
        #[arg(long, default_value = DEFAULT_CHAIN_FILE)]
        chain_file: PathBuf,
        /// Peer addresses (host:port) to gossip the transaction to.
        #[arg(long)]
        broadcast: Vec<SocketAddr>,
    },
    /// Mines a block from the current mempool, rewarding `reward_address`.
    Mine {
        #[arg(long)]
        reward_address: String,
        #[arg(long, default_value = DEFAULT_CHAIN_FILE)]
        chain_file: PathBuf,
        /// Peer addresses (host:port) to announce the new block to.
        #[arg(long)]
        broadcast: Vec<SocketAddr>,
    },
    /// Prints the chain, human-readable or as JSON.
    Show {
        #[arg(long, default_value = DEFAULT_CHAIN_FILE)]
        chain_file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Runs a long-lived gossip node serving this chain file over TCP.
    StartNode {
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value = "0.0.0.0")]
        bind_address: String,
        #[arg(long, default_value = DEFAULT_CHAIN_FILE)]
        chain_file: PathBuf,
        /// Peers to sync with at startup and to notify of locally mined blocks.
        #[arg(long)]
        connect: Vec<SocketAddr>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> AppResult<()> {
    match command {
        Command::CreateWallet { output } => create_wallet(&output),
        Command::Balance { address, chain_file } => balance(&address, &chain_file),
        Command::Send { wallet, to, amount, fee, chain_file, broadcast } => {
            send(&wallet, &to, amount, fee, &chain_file, &broadcast).await
        }
        Command::Mine { reward_address, chain_file, broadcast } => {
            mine(&reward_address, &chain_file, &broadcast).await
        }
        Command::Show { chain_file, json } => show(&chain_file, json),
        Command::StartNode { port, bind_address, chain_file, connect } => {
            start_node(&bind_address, port, &chain_file, &connect).await
        }
    }
}

fn create_wallet(output: &Path) -> AppResult<()> {
    let wallet = Wallet::create(output)?;
    info!(address = %wallet.address, path = %output.display(), "wallet created");
    println!("{}", wallet.address);
    Ok(())
}

fn balance(address: &str, chain_file: &Path) -> AppResult<()> {
    let blockchain = ChainFile::load_or_genesis(chain_file, DEFAULT_DIFFICULTY)?.into_blockchain()?;
    println!("{}", blockchain.get_balance(&address.to_string()));
    Ok(())
}

async fn send(
    wallet_path: &Path,
    to: &str,
    amount: u64,
    fee: u64,
    chain_file_path: &Path,
    broadcast: &[SocketAddr],
) -> AppResult<()> {
    let wallet = Wallet::load(wallet_path)?;
    let chain_file = ChainFile::load_or_genesis(chain_file_path, DEFAULT_DIFFICULTY)?;
    let mut keystore: BTreeMap<String, shared::PublicKey> = chain_file.keystore.clone();
    keystore.insert(wallet.address.clone(), wallet.keypair.public_key.clone());

    let mut blockchain = chain_file.into_blockchain()?;
    blockchain.register_public_key(wallet.address.clone(), wallet.keypair.public_key.clone());

    let timestamp = current_timestamp();
    let tx: Transaction = blockchain.create_transaction(
        &wallet.keypair,
        &wallet.address,
        to.to_string(),
        amount,
        fee,
        timestamp,
    )?;

    if !blockchain.add_transaction(tx.clone()) {
        return Err(error::AppError::TransactionRejected);
    }

    ChainFile::from_blockchain(&blockchain, keystore).save(chain_file_path)?;
    info!(tx_id = %tx.id, "transaction queued");

    for peer in broadcast {
        match network::push_transaction(*peer, &tx).await {
            Ok(()) => info!(%peer, "gossiped transaction"),
            Err(e) => error!(%peer, error = %e, "failed to gossip transaction"),
        }
    }

    println!("{}", tx.id);
    Ok(())
}

async fn mine(
    reward_address: &str,
    chain_file_path: &Path,
    broadcast: &[SocketAddr],
) -> AppResult<()> {
    let chain_file = ChainFile::load_or_genesis(chain_file_path, DEFAULT_DIFFICULTY)?;
    let keystore = chain_file.keystore.clone();
    let mut blockchain = chain_file.into_blockchain()?;

    let timestamp = current_timestamp();
    let mined = blockchain.mine_pending_transactions(&reward_address.to_string(), timestamp);
    if !mined {
        println!("no block mined: consensus rejected the candidate block");
        return Ok(());
    }

    ChainFile::from_blockchain(&blockchain, keystore).save(chain_file_path)?;
    let height = blockchain.height();
    info!(height, "block mined");

    for peer in broadcast {
        match network::announce_new_block(*peer).await {
            Ok(()) => info!(%peer, "announced new block"),
            Err(e) => error!(%peer, error = %e, "failed to announce new block"),
        }
    }

    println!("{height}");
    Ok(())
}

fn show(chain_file_path: &Path, json: bool) -> AppResult<()> {
    let chain_file = ChainFile::load_or_genesis(chain_file_path, DEFAULT_DIFFICULTY)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&chain_file)?);
        return Ok(());
    }

    for block in &chain_file.chain {
        println!(
            "#{:<5} hash={} prev={} txs={} nonce={}",
            block.index,
            block.hash,
            block.previous_hash,
            block.transactions.len(),
            block.nonce,
        );
    }
    Ok(())
}

async fn start_node(
    bind_address: &str,
    port: u16,
    chain_file_path: &Path,
    connect: &[SocketAddr],
) -> AppResult<()> {
    let chain_file = ChainFile::load_or_genesis(chain_file_path, DEFAULT_DIFFICULTY)?;
    let keystore = chain_file.keystore.clone();
    let mut blockchain = chain_file.into_blockchain()?;

    for peer in connect {
        match network::request_blockchain(*peer).await {
            Ok(candidate) => {
                let replaced = blockchain.replace_chain(candidate);
                info!(%peer, replaced, "synced with peer at startup");
            }
            Err(e) => error!(%peer, error = %e, "could not reach peer at startup"),
        }
    }

    let blockchain = Arc::new(Mutex::new(blockchain));
    let known_peers = Arc::new(connect.to_vec());

    let listener = TcpListener::bind((bind_address, port)).await?;
    let server = tokio::spawn(network::run_server(
        listener,
        blockchain.clone(),
        known_peers,
        MAX_GOSSIP_WORKERS,
    ));

    tokio::select! {
        result = server => {
            if let Ok(Err(e)) = result {
                error!(error = %e, "gossip server exited with an error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    let chain = blockchain.lock().await;
    ChainFile::from_blockchain(&chain, keystore).save(chain_file_path)?;
    info!(path = %chain_file_path.display(), "chain file saved");
    Ok(())
}

fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_secs() as i64
}
