//! Per-client session handling.
//!
//! Each accepted connection gets:
//! - a writer task draining the client's outbound channel onto the socket
//!   (everyone who talks to a client, including the opponent's session
//!   and the engine-death broadcast, goes through that channel, which is
//!   what keeps each client's replies in order), and
//! - this reader loop, which parses command lines and drives the game.
//!
//! A session is in one of three implicit states, derived from its fields:
//! no game or an ended one (commands other than `start` get `error game`),
//! waiting for a human partner (`pairing` holds the matchmaker's oneshot),
//! or playing. While waiting, the loop selects between the socket and the
//! oneshot so a partner's arrival wakes it immediately.
//!
//! Peer EOF is an implicit resignation when a game is running; the
//! survivor is notified and the game marked ended. A write failure to the
//! peer only stops that client's writer task; the session notices on its
//! next read.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use uqchess_protocol::{
    format_reply, move_string_valid, parse_command, Colour, ColourPreference, Command, ErrorKind,
    GameOverReason, HintKind, OpponentKind, PositionStatus, Reply,
};

use crate::engine::{EngineGone, EngineHandle};
use crate::game::{Game, GameState};
use crate::matchmaker::{provisional_colour, MatchOutcome, WaitList};
use crate::types::{ClientId, ClientRegistry, OutboundRx, OutboundTx};

struct Session {
    id: ClientId,
    out: OutboundTx,
    engine: EngineHandle,
    waitlist: Arc<WaitList>,
    game: Option<Arc<Game>>,
    /// Pending matchmaking oneshot; `Some` exactly while on the wait list.
    pairing: Option<oneshot::Receiver<Colour>>,
    /// Meaningful only while `game` is set.
    colour: Colour,
    vs_human: bool,
}

/// Run the I/O loops for one connection. Returns when the peer goes away
/// or the engine dies.
pub async fn run_client(
    id: ClientId,
    stream: TcpStream,
    engine: EngineHandle,
    waitlist: Arc<WaitList>,
    registry: ClientRegistry,
    out_tx: OutboundTx,
    mut out_rx: OutboundRx,
) {
    let (read_half, mut write_half) = stream.into_split();

    // Writer task: everything queued for this client goes out here. A
    // vanished peer surfaces as a write error; we just stop writing.
    let writer = tokio::spawn(async move {
        while let Some(reply) = out_rx.recv().await {
            let bytes = format_reply(&reply);
            if let Err(error) = write_half.write_all(bytes.as_bytes()).await {
                tracing::debug!(client = id.0, %error, "client write failed");
                break;
            }
        }
    });

    let mut session = Session {
        id,
        out: out_tx,
        engine,
        waitlist,
        game: None,
        pairing: None,
        colour: Colour::White,
        vs_human: false,
    };

    let mut lines = BufReader::new(read_half).lines();

    let clean = loop {
        // While waiting for a partner, also listen for the matchmaker.
        let next = if let Some(mut paired) = session.pairing.take() {
            tokio::select! {
                outcome = &mut paired => {
                    if let Ok(colour) = outcome {
                        session.colour = colour;
                    }
                    continue;
                }
                line = lines.next_line() => {
                    // a pairing may have landed in the same instant; adopt
                    // it now so the line is handled with the real colour
                    match paired.try_recv() {
                        Ok(colour) => session.colour = colour,
                        Err(oneshot::error::TryRecvError::Empty) => {
                            session.pairing = Some(paired);
                        }
                        Err(oneshot::error::TryRecvError::Closed) => {}
                    }
                    line
                }
            }
        } else {
            lines.next_line().await
        };

        match next {
            Ok(Some(line)) => match session.handle_line(&line).await {
                Ok(()) => {}
                Err(EngineGone) => break false,
            },
            // EOF or read error: the peer is gone either way.
            Ok(None) => break true,
            Err(error) => {
                tracing::debug!(client = id.0, %error, "client read failed");
                break true;
            }
        }
    };

    if clean {
        session.disconnect().await;
    }

    registry.write().await.remove(&id);
    drop(session); // closes the outbound channel → writer drains and stops
    let _ = writer.await;
    tracing::info!(client = id.0, "client disconnected");
}

impl Session {
    async fn handle_line(&mut self, line: &str) -> Result<(), EngineGone> {
        tracing::debug!(client = self.id.0, line, "command received");
        match parse_command(line) {
            Ok(Command::Start {
                opponent,
                preference,
            }) => self.handle_start(opponent, preference).await,
            Ok(Command::Board) => self.handle_board().await,
            Ok(Command::Move(mv)) => self.handle_move(&mv).await,
            Ok(Command::Hint(option)) => self.handle_hint(&option).await,
            Ok(Command::Resign) => self.handle_resign().await,
            Err(error) => {
                tracing::debug!(client = self.id.0, %error, "unparseable command");
                self.send(Reply::Error(ErrorKind::Command));
                Ok(())
            }
        }
    }

    fn send(&self, reply: Reply) {
        let _ = self.out.send(reply);
    }

    /// The game an in-game command may act on. `None` while idle, and also
    /// while the pairing oneshot is still pending: a game that started in
    /// the last instant is not actionable until our colour has arrived.
    fn active_game(&self) -> Option<Arc<Game>> {
        if self.pairing.is_some() {
            return None;
        }
        self.game.clone()
    }

    // ------------------------------------------------------------------
    // start
    // ------------------------------------------------------------------

    async fn handle_start(
        &mut self,
        opponent: OpponentKind,
        preference: ColourPreference,
    ) -> Result<(), EngineGone> {
        self.leave_wait_list().await;
        self.abandon_game().await;
        self.game = None;

        match opponent {
            OpponentKind::Computer => {
                self.vs_human = false;
                // `either` against the computer means white
                self.colour = provisional_colour(preference);
                let game = Game::new_started(self.colour, self.out.clone());
                self.game = Some(game.clone());
                self.send(Reply::Started(self.colour));

                if self.colour == Colour::Black {
                    let mut state = game.lock().await;
                    self.computer_move(&mut state).await?;
                }
            }
            OpponentKind::Human => {
                self.vs_human = true;
                let outcome = self
                    .waitlist
                    .find_or_enqueue(self.id, preference, self.out.clone())
                    .await;
                match outcome {
                    MatchOutcome::Paired { game, colour } => {
                        self.game = Some(game);
                        self.colour = colour;
                    }
                    MatchOutcome::Enqueued { game, paired } => {
                        self.game = Some(game);
                        self.colour = provisional_colour(preference);
                        self.pairing = Some(paired);
                    }
                }
            }
        }
        Ok(())
    }

    /// Leave the wait list if we are on it. Losing the removal race means
    /// a partner arrived concurrently: adopt the pairing, then fall
    /// through to the abandoned-game path like any other started game.
    async fn leave_wait_list(&mut self) {
        let Some(paired) = self.pairing.take() else {
            return;
        };
        if self.waitlist.remove(self.id).await {
            self.game = None;
            return;
        }
        // a missed removal means the matchmaker took our entry; the
        // colour arrives as soon as it finishes the pairing
        if let Ok(colour) = paired.await {
            self.colour = colour;
        }
    }

    /// Vacate the current game before a new `start` takes effect. A game
    /// still in progress gets the resign-equivalent cleanup; an ended one
    /// just loses this player's seat (the seat holds our outbound sender,
    /// which must not outlive our membership in the game).
    async fn abandon_game(&mut self) {
        let Some(game) = self.game.clone() else {
            return;
        };
        let mut state = game.lock().await;
        if state.started {
            self.announce_resignation(&state);
            state.started = false;
        }
        state.set_slot(self.colour, None);
    }

    // ------------------------------------------------------------------
    // board / hint
    // ------------------------------------------------------------------

    async fn handle_board(&mut self) -> Result<(), EngineGone> {
        let Some(game) = self.active_game() else {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        };
        let state = game.lock().await;
        if !state.started {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        }
        let snapshot = self.engine.snapshot(&state.fen).await?;
        self.send(Reply::Board(snapshot.board));
        Ok(())
    }

    async fn handle_hint(&mut self, option: &str) -> Result<(), EngineGone> {
        let Some(game) = self.active_game() else {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        };
        let state = game.lock().await;
        if !state.started {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        }
        if state.to_move() != self.colour {
            self.send(Reply::Error(ErrorKind::Turn));
            return Ok(());
        }
        // only a live, on-turn hint has its option word inspected
        let Some(kind) = HintKind::from_token(option) else {
            self.send(Reply::Error(ErrorKind::Command));
            return Ok(());
        };
        let moves = match kind {
            HintKind::Best => vec![self.engine.best_move(&state.fen).await?],
            HintKind::All => self.engine.legal_moves(&state.fen).await?,
        };
        self.send(Reply::Moves(moves));
        Ok(())
    }

    // ------------------------------------------------------------------
    // move
    // ------------------------------------------------------------------

    async fn handle_move(&mut self, mv: &str) -> Result<(), EngineGone> {
        let Some(game) = self.active_game() else {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        };
        let mut state = game.lock().await;
        if !state.started {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        }
        if !move_string_valid(mv) {
            self.send(Reply::Error(ErrorKind::Command));
            return Ok(());
        }
        if state.to_move() != self.colour {
            self.send(Reply::Error(ErrorKind::Turn));
            return Ok(());
        }

        let Some(outcome) = self.engine.play_move(&state.fen, mv).await? else {
            self.send(Reply::Error(ErrorKind::Move));
            return Ok(());
        };

        state.fen = outcome.snapshot.fen.clone();
        self.send(Reply::Ok);
        if self.vs_human {
            state.notify_opponent(self.colour, Reply::Moved(mv.to_string()));
        }
        self.announce_position(&mut state, outcome.status);

        // the engine replies immediately unless the client just ended the game
        if !self.vs_human && !outcome.status.is_game_over() {
            self.computer_move(&mut state).await?;
        }
        Ok(())
    }

    /// Have the engine play its reply move in a computer game. Called with
    /// the game lock held so the client cannot slip a command in between.
    async fn computer_move(&mut self, state: &mut GameState) -> Result<(), EngineGone> {
        let best = self.engine.best_move(&state.fen).await?;
        let Some(outcome) = self.engine.play_move(&state.fen, &best).await? else {
            // the engine refusing its own best move means the position was
            // already terminal; nothing to announce
            tracing::warn!(client = self.id.0, best, "engine rejected its own move");
            return Ok(());
        };
        state.fen = outcome.snapshot.fen.clone();
        self.send(Reply::Moved(best));
        self.announce_position(state, outcome.status);
        Ok(())
    }

    /// Tell this client (and the human opponent, if any) about a check
    /// or game-ending position, and mark the game over if it is.
    fn announce_position(&self, state: &mut GameState, status: PositionStatus) {
        match status {
            PositionStatus::Normal => return,
            PositionStatus::Check => {
                self.send(Reply::Check);
                if self.vs_human {
                    state.notify_opponent(self.colour, Reply::Check);
                }
            }
            PositionStatus::Checkmate => {
                let reply = Reply::GameOver(GameOverReason::Checkmate(state.winner()));
                self.send(reply.clone());
                if self.vs_human {
                    state.notify_opponent(self.colour, reply);
                }
            }
            PositionStatus::Stalemate => {
                let reply = Reply::GameOver(GameOverReason::Stalemate);
                self.send(reply.clone());
                if self.vs_human {
                    state.notify_opponent(self.colour, reply);
                }
            }
        }
        if status.is_game_over() {
            state.started = false;
        }
    }

    // ------------------------------------------------------------------
    // resign / disconnect
    // ------------------------------------------------------------------

    async fn handle_resign(&mut self) -> Result<(), EngineGone> {
        let Some(game) = self.active_game() else {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        };
        let mut state = game.lock().await;
        if !state.started {
            self.send(Reply::Error(ErrorKind::Game));
            return Ok(());
        }
        self.announce_resignation(&state);
        state.started = false;
        Ok(())
    }

    fn announce_resignation(&self, state: &GameState) {
        let reply = Reply::GameOver(GameOverReason::Resignation(state.winner()));
        self.send(reply.clone());
        if self.vs_human {
            state.notify_opponent(self.colour, reply);
        }
    }

    /// Peer-gone cleanup: resign any running game on the departing
    /// client's behalf and vacate its seat.
    async fn disconnect(&mut self) {
        self.leave_wait_list().await;
        let Some(game) = self.game.clone() else {
            return;
        };
        let mut state = game.lock().await;
        if state.started {
            let reply = Reply::GameOver(GameOverReason::Resignation(state.winner()));
            if self.vs_human {
                state.notify_opponent(self.colour, reply);
            }
            state.started = false;
        }
        state.set_slot(self.colour, None);
    }
}
