//! The engine subprocess driver.
//!
//! One task owns the child process and both pipe ends, and serves requests
//! from a mailbox; sessions hold an [`EngineHandle`] and get their answer
//! back on a per-request oneshot. Because the engine has a single
//! conversation channel, every request is one complete round trip: the
//! mailbox is the exclusivity lock.
//!
//! Requests that the protocol needs to be atomic (apply a move, then
//! classify the resulting position) are single [`EngineRequest`] variants,
//! never sequences of them.
//!
//! Failure model: any write failure or EOF on the pipes means the engine is
//! gone. That is terminal for the whole server: the driver reaps the
//! child, pushes `error engine` to every registered client, prints the
//! fatal line and exits with the dedicated status. There is no restart.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};
use uqchess_protocol::{
    bestmove_target, BoardReader, BoardSnapshot, ErrorKind, PerftReader, PositionStatus, Reply,
};

use crate::config::EXIT_ENGINE_DIED;
use crate::types::{ClientRegistry, EngineRequest, EngineRx, EngineTx, MoveOutcome};

/// The engine task has terminated; the session holding the handle should
/// wind down quietly (every client has already been told `error engine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineGone;

impl std::fmt::Display for EngineGone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chess engine task has terminated")
    }
}

impl std::error::Error for EngineGone {}

/// Cheap cloneable handle sessions use to talk to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: EngineTx,
}

impl EngineHandle {
    pub fn new(tx: EngineTx) -> EngineHandle {
        EngineHandle { tx }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> EngineRequest,
    ) -> Result<T, EngineGone> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(make(tx)).map_err(|_| EngineGone)?;
        rx.await.map_err(|_| EngineGone)
    }

    /// Engine's preferred move in the given position.
    pub async fn best_move(&self, fen: &str) -> Result<String, EngineGone> {
        let fen = fen.to_string();
        self.request(|reply| EngineRequest::BestMove { fen, reply })
            .await
    }

    /// All legal moves in the given position; empty at checkmate/stalemate.
    pub async fn legal_moves(&self, fen: &str) -> Result<Vec<String>, EngineGone> {
        let fen = fen.to_string();
        self.request(|reply| EngineRequest::LegalMoves { fen, reply })
            .await
    }

    /// Rendered board, canonical FEN and check information.
    pub async fn snapshot(&self, fen: &str) -> Result<BoardSnapshot, EngineGone> {
        let fen = fen.to_string();
        self.request(|reply| EngineRequest::Snapshot { fen, reply })
            .await
    }

    /// Apply a move; `None` when the engine rejected it.
    pub async fn play_move(&self, fen: &str, mv: &str) -> Result<Option<MoveOutcome>, EngineGone> {
        let fen = fen.to_string();
        let mv = mv.to_string();
        self.request(|reply| EngineRequest::PlayMove { fen, mv, reply })
            .await
    }
}

pub struct EngineDriver {
    child: Child,
    to_engine: ChildStdin,
    from_engine: BufReader<ChildStdout>,
    registry: ClientRegistry,
}

impl EngineDriver {
    /// Spawn the engine and complete the startup handshake
    /// (`isready`/`readyok`, then `uci`/`uciok`).
    ///
    /// Any spawn failure, write failure or premature EOF is a startup
    /// failure; the caller reports it and exits with the startup code.
    pub async fn spawn(program: &str, registry: ClientRegistry) -> io::Result<EngineDriver> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        let to_engine = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("engine stdin not captured"))?;
        let from_engine = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("engine stdout not captured"))?;

        let mut driver = EngineDriver {
            child,
            to_engine,
            from_engine: BufReader::new(from_engine),
            registry,
        };
        driver.ready_check().await?;
        driver.send("uci").await?;
        driver.expect("uciok").await?;
        Ok(driver)
    }

    /// Create the mailbox pair for this driver.
    pub fn channel() -> (EngineTx, EngineRx) {
        mpsc::unbounded_channel()
    }

    /// Serve requests until the mailbox closes or the engine dies.
    ///
    /// An engine failure does not return: the whole server terminates.
    pub async fn run(mut self, mut rx: EngineRx) {
        while let Some(request) = rx.recv().await {
            if let Err(error) = self.handle(request).await {
                tracing::error!(%error, "engine conversation failed");
                self.die().await;
                return;
            }
        }
        tracing::debug!("engine mailbox closed, driver task exiting");
    }

    async fn handle(&mut self, request: EngineRequest) -> io::Result<()> {
        match request {
            EngineRequest::BestMove { fen, reply } => {
                let best = self.best_move(&fen).await?;
                let _ = reply.send(best);
            }
            EngineRequest::LegalMoves { fen, reply } => {
                let moves = self.legal_moves(&fen).await?;
                let _ = reply.send(moves);
            }
            EngineRequest::Snapshot { fen, reply } => {
                self.set_position(&fen).await?;
                let snapshot = self.read_snapshot().await?;
                let _ = reply.send(snapshot);
            }
            EngineRequest::PlayMove { fen, mv, reply } => {
                let outcome = self.play_move(&fen, &mv).await?;
                let _ = reply.send(outcome);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Engine conversation primitives
    // ------------------------------------------------------------------

    async fn send(&mut self, command: &str) -> io::Result<()> {
        tracing::trace!(%command, "to engine");
        self.to_engine.write_all(command.as_bytes()).await?;
        self.to_engine.write_all(b"\n").await?;
        self.to_engine.flush().await
    }

    /// Read one line, newline stripped. EOF is an error: the engine never
    /// goes quiet on us mid-conversation unless it is gone.
    async fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        let n = self.from_engine.read_line(&mut line).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        tracing::trace!(line = %line, "from engine");
        Ok(line)
    }

    /// Discard lines until one equals `expected`.
    async fn expect(&mut self, expected: &str) -> io::Result<()> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    async fn ready_check(&mut self) -> io::Result<()> {
        self.send("isready").await?;
        self.expect("readyok").await
    }

    async fn set_position(&mut self, fen: &str) -> io::Result<()> {
        self.send("ucinewgame").await?;
        self.ready_check().await?;
        self.send(&format!("position fen {fen}")).await
    }

    async fn best_move(&mut self, fen: &str) -> io::Result<String> {
        self.set_position(fen).await?;
        self.send("go movetime 500 depth 15").await?;
        loop {
            let line = self.read_line().await?;
            if let Some(result) = bestmove_target(&line) {
                return result.map_err(invalid_data);
            }
        }
    }

    async fn legal_moves(&mut self, fen: &str) -> io::Result<Vec<String>> {
        self.set_position(fen).await?;
        self.send("go perft 1").await?;
        self.read_perft().await
    }

    async fn read_perft(&mut self) -> io::Result<Vec<String>> {
        let mut reader = PerftReader::new();
        loop {
            let line = self.read_line().await?;
            if reader.push(&line) {
                return Ok(reader.into_moves());
            }
        }
    }

    /// Issue `d` and parse the dump. The engine must already be positioned.
    async fn read_snapshot(&mut self) -> io::Result<BoardSnapshot> {
        self.send("d").await?;
        let mut reader = BoardReader::new();
        loop {
            let line = self.read_line().await?;
            if reader.push(&line) {
                return reader.finish().map_err(invalid_data);
            }
        }
    }

    /// Apply `mv` to `fen`. Rejection is detected the way the engine
    /// exposes it: the position's FEN comes back unchanged. On acceptance
    /// the new position is analysed in the same conversation.
    async fn play_move(&mut self, fen: &str, mv: &str) -> io::Result<Option<MoveOutcome>> {
        self.send("ucinewgame").await?;
        self.ready_check().await?;
        self.send(&format!("position fen {fen} moves {mv}")).await?;
        let snapshot = self.read_snapshot().await?;
        if snapshot.fen == fen {
            return Ok(None);
        }
        self.send("go perft 1").await?;
        let moves = self.read_perft().await?;
        let status = PositionStatus::classify(snapshot.checkers.is_some(), !moves.is_empty());
        Ok(Some(MoveOutcome { snapshot, status }))
    }

    // ------------------------------------------------------------------
    // Death
    // ------------------------------------------------------------------

    /// Terminal cleanup after the engine vanished: reap the child, tell
    /// every connected client, and take the whole server down. Never
    /// returns.
    async fn die(&mut self) {
        let _ = self.child.start_kill();
        let _ = self.child.wait().await;

        {
            let clients = self.registry.read().await;
            for out in clients.values() {
                let _ = out.send(Reply::Error(ErrorKind::Engine));
            }
        }
        // give the per-client writer tasks a moment to drain the error
        tokio::time::sleep(Duration::from_millis(200)).await;

        eprintln!("uqchessserver: chess engine exited unexpectedly");
        std::process::exit(EXIT_ENGINE_DIED);
    }
}

fn invalid_data<E>(error: E) -> io::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}
