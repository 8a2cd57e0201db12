//! Parsing of the engine's reply stream.
//!
//! The server speaks a UCI-ish dialect to the engine and needs three reply
//! shapes out of it:
//!
//! - `bestmove <m> [ponder <m>]` after `go movetime … depth …`
//! - the per-move lines of `go perft 1`, terminated by `Nodes searched: N`:
//!
//! ```text
//! e2e4: 1
//! d2d4: 1
//!
//! Nodes searched: 20
//! ```
//!
//! - the `d` position dump: a rendered board block, then `Fen:`, `Key:` and
//!   `Checkers:` lines:
//!
//! ```text
//!  +---+---+---+---+---+---+---+---+
//!  | r | n | b | q | k | b | n | r |
//!  +---+---+---+---+---+---+---+---+
//!  …
//!    a   b   c   d   e   f   g   h
//!
//! Fen: rnbqkbnr/… w KQkq - 0 1
//! Key: 8F8F01D4562F59FB
//! Checkers:
//! ```
//!
//! The readers here are push-style accumulators: the driver feeds them one
//! line at a time (newline stripped) and stops when `push` reports the
//! terminating line has been seen. Nothing here does I/O, which keeps the
//! formats testable against canned captures.

use std::fmt;

use crate::fen::side_to_move;
use crate::types::{BoardSnapshot, Colour};

/// Errors raised when the engine's output doesn't have the expected shape.
///
/// The driver treats any of these as an engine failure; a half-spoken
/// protocol is as dead as a closed pipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciParseError {
    /// `d` output finished without a `Fen:` line.
    MissingFen,
    /// The FEN on a `Fen:` line had no readable side-to-move field.
    BadFen(String),
    /// A `bestmove` line carried no move token.
    EmptyBestMove,
}

impl fmt::Display for UciParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciParseError::MissingFen => write!(f, "engine position dump had no Fen: line"),
            UciParseError::BadFen(fen) => write!(f, "unreadable FEN from engine: {fen:?}"),
            UciParseError::EmptyBestMove => write!(f, "bestmove line carried no move"),
        }
    }
}

impl std::error::Error for UciParseError {}

/// Extract the move from a `bestmove` line, if this is one.
///
/// Returns `None` for every other line (`info …`, blank, …), so the caller
/// can scan the stream with `find_map`-style logic.
pub fn bestmove_target(line: &str) -> Option<Result<String, UciParseError>> {
    let rest = line.strip_prefix("bestmove")?;
    match rest.split_whitespace().next() {
        Some(mv) => Some(Ok(mv.to_string())),
        None => Some(Err(UciParseError::EmptyBestMove)),
    }
}

/// Accumulates the per-move lines of a `go perft 1` reply.
#[derive(Debug, Default)]
pub struct PerftReader {
    moves: Vec<String>,
}

impl PerftReader {
    pub fn new() -> PerftReader {
        PerftReader::default()
    }

    /// Feed one line. Returns `true` when the terminating
    /// `Nodes searched:` summary has been consumed.
    pub fn push(&mut self, line: &str) -> bool {
        if line.starts_with("Nodes searched") {
            return true;
        }
        // move lines look like "e2e4: 1"; anything else (blank lines,
        // info chatter) is skipped
        if let Some((mv, _count)) = line.split_once(':') {
            let mv = mv.trim();
            if !mv.is_empty() && mv.chars().all(|c| c.is_ascii_alphanumeric()) {
                self.moves.push(mv.to_string());
            }
        }
        false
    }

    /// The collected moves, in the order the engine listed them.
    pub fn into_moves(self) -> Vec<String> {
        self.moves
    }
}

/// Accumulates a `d` position dump into a [`BoardSnapshot`].
#[derive(Debug, Default)]
pub struct BoardReader {
    board: String,
    fen: Option<String>,
    checkers: Option<String>,
}

impl BoardReader {
    pub fn new() -> BoardReader {
        BoardReader::default()
    }

    /// Feed one line. Returns `true` once the `Checkers:` line (the last
    /// one the server cares about) has been consumed.
    pub fn push(&mut self, line: &str) -> bool {
        if let Some(rest) = line.strip_prefix("Fen:") {
            self.fen = Some(rest.trim().to_string());
            return false;
        }
        if let Some(rest) = line.strip_prefix("Checkers:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                self.checkers = Some(rest.to_string());
            }
            return true;
        }
        if self.fen.is_none() {
            // still inside the rendered board block; keep it verbatim
            self.board.push_str(line);
            self.board.push('\n');
        }
        // lines between Fen: and Checkers: (e.g. Key:) are irrelevant
        false
    }

    /// Finish parsing and build the snapshot.
    pub fn finish(self) -> Result<BoardSnapshot, UciParseError> {
        let fen = self.fen.ok_or(UciParseError::MissingFen)?;
        let white_to_play = match side_to_move(&fen) {
            Some(colour) => colour == Colour::White,
            None => return Err(UciParseError::BadFen(fen)),
        };
        Ok(BoardSnapshot {
            board: self.board,
            fen,
            checkers: self.checkers,
            white_to_play,
        })
    }
}
