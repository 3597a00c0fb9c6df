//! Peer gossip: the JSON-over-TCP protocol from the base spec's §6,
//! implemented as a bounded worker pool rather than one thread per
//! connection (the redesign note in §9 that supersedes). Every inbound
//! message is marshaled onto the single [`tokio::sync::Mutex`] guarding
//! the blockchain, matching the single-writer discipline in §5.

use chain_core::{Block, Blockchain, Transaction};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

/// Caps an inbound message at 64 MiB — generous for a gossiped chain,
/// small enough that a misbehaving peer can't exhaust memory.
const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PeerMessage {
    GetBlockchain,
    /// `data` is the chain serialized to a JSON *string*, matching the
    /// base spec's documented shape (`{type, data: <chain JSON string>}`)
    /// rather than a nested JSON array.
    Blockchain { data: String },
    NewTransaction { data: Transaction },
    NewBlock,
}

/// Runs the gossip server until the process is asked to shut down. Each
/// accepted connection is handled by a task drawn from a pool bounded to
/// `max_workers` concurrent handlers; excess connections queue at
/// `accept()` rather than spawning unboundedly.
pub async fn run_server(
    listener: TcpListener,
    blockchain: Arc<Mutex<Blockchain>>,
    known_peers: Arc<Vec<SocketAddr>>,
    max_workers: usize,
) -> AppResult<()> {
    let local_addr = listener.local_addr().ok();
    info!(?local_addr, max_workers, "gossip server listening");
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));

    loop {
        let (socket, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed");
        let blockchain = blockchain.clone();
        let known_peers = known_peers.clone();

        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = handle_connection(socket, blockchain, known_peers).await {
                warn!(%peer_addr, error = %e, "gossip peer dropped");
            }
        });
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    blockchain: Arc<Mutex<Blockchain>>,
    known_peers: Arc<Vec<SocketAddr>>,
) -> AppResult<()> {
    let message = read_message(&mut socket).await?;

    match message {
        PeerMessage::GetBlockchain => {
            let chain = blockchain.lock().await.chain().to_vec();
            let data = serde_json::to_string(&chain)?;
            write_message(&mut socket, &PeerMessage::Blockchain { data }).await?;
        }
        PeerMessage::NewTransaction { data } => {
            let accepted = blockchain.lock().await.add_transaction(data);
            debug!(accepted, "received gossiped transaction");
        }
        PeerMessage::Blockchain { data } => {
            let candidate: Vec<Block> = serde_json::from_str(&data)?;
            let replaced = blockchain.lock().await.replace_chain(candidate);
            debug!(replaced, "received unsolicited chain");
        }
        PeerMessage::NewBlock => {
            debug!("peer announced a new block; re-requesting chains from known peers");
            for peer in known_peers.iter() {
                match request_blockchain(*peer).await {
                    Ok(candidate) => {
                        let replaced = blockchain.lock().await.replace_chain(candidate);
                        debug!(%peer, replaced, "applied longest-valid-chain rule");
                    }
                    Err(e) => warn!(%peer, error = %e, "could not fetch peer's chain"),
                }
            }
        }
    }

    Ok(())
}

/// Connects to `peer`, requests its chain, and returns it unvalidated —
/// the caller applies [`Blockchain::replace_chain`] (structural validity
/// plus the longest-chain rule) before trusting it.
///
/// # Errors
/// Returns an error if the connection, request, or response fails.
pub async fn request_blockchain(peer: SocketAddr) -> AppResult<Vec<Block>> {
    let mut socket = TcpStream::connect(peer)
        .await
        .map_err(|_| AppError::PeerUnreachable(peer.to_string()))?;
    write_message(&mut socket, &PeerMessage::GetBlockchain).await?;
    socket.shutdown().await.ok();

    match read_message(&mut socket).await? {
        PeerMessage::Blockchain { data } => Ok(serde_json::from_str(&data)?),
        _ => Err(AppError::ChainFileInvalid(
            "peer did not respond with its chain".to_string(),
        )),
    }
}

/// Gossips `tx` to `peer` as `{type: "new_transaction", data: tx}`.
///
/// # Errors
/// Returns an error if the connection or send fails.
pub async fn push_transaction(peer: SocketAddr, tx: &Transaction) -> AppResult<()> {
    let mut socket = TcpStream::connect(peer)
        .await
        .map_err(|_| AppError::PeerUnreachable(peer.to_string()))?;
    write_message(&mut socket, &PeerMessage::NewTransaction { data: tx.clone() }).await?;
    socket.shutdown().await.ok();
    Ok(())
}

/// Announces a freshly mined block to `peer` as `{type: "new_block"}`,
/// per the base spec's protocol — the peer is expected to re-request the
/// full chain rather than receive it inline.
///
/// # Errors
/// Returns an error if the connection or send fails.
pub async fn announce_new_block(peer: SocketAddr) -> AppResult<()> {
    let mut socket = TcpStream::connect(peer)
        .await
        .map_err(|_| AppError::PeerUnreachable(peer.to_string()))?;
    write_message(&mut socket, &PeerMessage::NewBlock).await?;
    socket.shutdown().await.ok();
    Ok(())
}

async fn read_message(socket: &mut TcpStream) -> AppResult<PeerMessage> {
    let mut buffer = Vec::new();
    socket
        .take(MAX_MESSAGE_BYTES as u64)
        .read_to_end(&mut buffer)
        .await?;
    serde_json::from_slice(&buffer).map_err(AppError::from)
}

async fn write_message(socket: &mut TcpStream, message: &PeerMessage) -> AppResult<()> {
    let bytes = serde_json::to_vec(message)?;
    socket.write_all(&bytes).await?;
    Ok(())
}
