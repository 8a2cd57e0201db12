//! Shared types for the chess server.
//!
//! This module defines:
//! - `ClientId`: a lightweight handle for connected clients
//! - the outbound channel aliases and the client registry
//! - `EngineRequest`: messages flowing from sessions to the engine task
//!
//! The registry doubles as the engine-death notify list: when the engine
//! subprocess dies, every registered outbound channel receives one
//! `error engine` before the server exits.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use uqchess_protocol::{BoardSnapshot, PositionStatus, Reply};

/// Identifier for a connected client.
///
/// Opaque; unique over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Outbound replies to a given client, drained by its writer task.
pub type OutboundTx = mpsc::UnboundedSender<Reply>;
pub type OutboundRx = mpsc::UnboundedReceiver<Reply>;

/// Registry of connected clients and their outbound channels.
pub type ClientRegistry = Arc<RwLock<HashMap<ClientId, OutboundTx>>>;

/// The result of a move the engine accepted: the new position plus its
/// classification (check / checkmate / stalemate / nothing special).
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub snapshot: BoardSnapshot,
    pub status: PositionStatus,
}

/// One request into the engine task.
///
/// Each variant is a complete engine round trip; the mailbox serializes
/// them, so no two conversations with the subprocess ever interleave.
/// `PlayMove` deliberately bundles move application *and* the follow-up
/// position analysis: splitting them would let another session reposition
/// the engine in between.
#[derive(Debug)]
pub enum EngineRequest {
    /// `go movetime 500 depth 15` on the given position.
    BestMove {
        fen: String,
        reply: oneshot::Sender<String>,
    },
    /// `go perft 1` on the given position; possibly empty.
    LegalMoves {
        fen: String,
        reply: oneshot::Sender<Vec<String>>,
    },
    /// `d` on the given position.
    Snapshot {
        fen: String,
        reply: oneshot::Sender<BoardSnapshot>,
    },
    /// Apply `mv` to `fen`. `None` means the engine rejected the move
    /// (the position did not change).
    PlayMove {
        fen: String,
        mv: String,
        reply: oneshot::Sender<Option<MoveOutcome>>,
    },
}

/// Channel from sessions → engine task.
pub type EngineTx = mpsc::UnboundedSender<EngineRequest>;
pub type EngineRx = mpsc::UnboundedReceiver<EngineRequest>;
