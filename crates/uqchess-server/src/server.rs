//! TCP listener and accept loop.
//!
//! Binds on loopback only; clients are same-host tooling, and the chosen
//! port is announced on the diagnostic stream for them. Each
//! accepted connection gets a `ClientId`, an outbound channel, a registry
//! entry (which doubles as the engine-death notify list) and a session
//! task. The loop never returns under normal operation.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};

use crate::client;
use crate::engine::EngineHandle;
use crate::matchmaker::WaitList;
use crate::types::{ClientId, ClientRegistry};

/// Counter for assigning unique `ClientId`s.
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Fresh, empty client registry.
pub fn new_registry() -> ClientRegistry {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Bind the listener. `port` is the command-line text; anything that does
/// not parse as a port number fails here, like any other unusable port.
pub async fn bind(port: &str) -> io::Result<TcpListener> {
    let port: u16 = port
        .parse()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "port is not a number"))?;
    TcpListener::bind(("127.0.0.1", port)).await
}

/// Accept connections forever, spawning a session per client.
pub async fn serve(
    listener: TcpListener,
    engine: EngineHandle,
    waitlist: Arc<WaitList>,
    registry: ClientRegistry,
) {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                tracing::warn!(%error, "accept failed");
                continue;
            }
        };

        let id = next_client_id();
        tracing::info!(client = id.0, %peer_addr, "accepted connection");

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        registry.write().await.insert(id, out_tx.clone());

        let engine = engine.clone();
        let waitlist = waitlist.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            client::run_client(id, stream, engine, waitlist, registry, out_tx, out_rx).await;
        });
    }
}
