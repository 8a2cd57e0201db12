//! Shared per-game state.
//!
//! A `Game` is the single source of truth for one game's position and
//! participants. It is `Arc`-shared by at most two sessions (one in a
//! computer game); each player slot holds that player's outbound channel so
//! either session can notify the other. A departing side clears its own
//! slot (the survivor then simply sees no opponent) and dropping the last
//! `Arc` reclaims the state.
//!
//! The inner mutex is a `tokio::sync::Mutex` because it is held across the
//! engine round trips of a move: the two players of one game serialize on
//! it, and the engine task never takes it, so the engine-before-game
//! acquisition order is a straight line rather than a cycle.

use std::sync::Arc;

use tokio::sync::Mutex;
use uqchess_protocol::{side_to_move, Colour, Reply, INITIAL_FEN};

use crate::types::OutboundTx;

pub struct Game {
    state: Mutex<GameState>,
}

pub struct GameState {
    white: Option<OutboundTx>,
    black: Option<OutboundTx>,
    pub started: bool,
    pub fen: String,
}

impl Game {
    /// A started game against the computer: one human slot, the opponent
    /// slot stays empty for good.
    pub fn new_started(colour: Colour, out: OutboundTx) -> Arc<Game> {
        Arc::new(Game {
            state: Mutex::new(GameState::with_slot(colour, out, true)),
        })
    }

    /// A provisional game owned by a client on the wait list. The
    /// matchmaker fills both slots and flips `started` when a partner
    /// arrives.
    pub fn new_waiting(colour: Colour, out: OutboundTx) -> Arc<Game> {
        Arc::new(Game {
            state: Mutex::new(GameState::with_slot(colour, out, false)),
        })
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, GameState> {
        self.state.lock().await
    }
}

impl GameState {
    fn with_slot(colour: Colour, out: OutboundTx, started: bool) -> GameState {
        let (white, black) = match colour {
            Colour::White => (Some(out), None),
            Colour::Black => (None, Some(out)),
        };
        GameState {
            white,
            black,
            started,
            fen: INITIAL_FEN.to_string(),
        }
    }

    /// Whose turn it is, per the current FEN.
    pub fn to_move(&self) -> Colour {
        // the FEN always comes from the engine or the initial constant
        side_to_move(&self.fen).unwrap_or(Colour::White)
    }

    /// Winner of any game that ends in this position: the side not on move.
    pub fn winner(&self) -> Colour {
        self.to_move().opposite()
    }

    pub fn set_slot(&mut self, colour: Colour, out: Option<OutboundTx>) {
        match colour {
            Colour::White => self.white = out,
            Colour::Black => self.black = out,
        }
    }

    /// The outbound channel of `mine`'s opponent, if that seat is occupied.
    pub fn opponent(&self, mine: Colour) -> Option<&OutboundTx> {
        match mine {
            Colour::White => self.black.as_ref(),
            Colour::Black => self.white.as_ref(),
        }
    }

    /// Send a reply to `mine`'s opponent if there is one; a vanished
    /// opponent is not an error.
    pub fn notify_opponent(&self, mine: Colour, reply: Reply) {
        if let Some(opponent) = self.opponent(mine) {
            let _ = opponent.send(reply);
        }
    }
}
