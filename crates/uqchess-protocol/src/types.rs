//! Message types shared between the client codec, the engine codec and the
//! server.
//!
//! These are **transport-agnostic** logical messages:
//! - [`Command`]: what a client asks the server to do.
//! - [`Reply`]: what the server says back.
//!
//! Formatting/parsing of the actual lines lives in
//! [`client_codec`](crate::client_codec); this module is purely logical.

use std::fmt;

/// One side of the board.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Colour {
    White,
    Black,
}

impl Colour {
    /// The other side.
    pub fn opposite(self) -> Colour {
        match self {
            Colour::White => Colour::Black,
            Colour::Black => Colour::White,
        }
    }

    /// Parse from the FEN side-to-move character (`'w'` / `'b'`).
    pub fn from_fen_char(c: char) -> Option<Colour> {
        match c {
            'w' => Some(Colour::White),
            'b' => Some(Colour::Black),
            _ => None,
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Colour::White => write!(f, "white"),
            Colour::Black => write!(f, "black"),
        }
    }
}

/// Colour wish expressed in a `start` command.
///
/// `Either` is only resolved to a concrete [`Colour`] during matchmaking
/// (or immediately, to white, for a computer game).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColourPreference {
    White,
    Black,
    Either,
}

/// Opponent requested in a `start` command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpponentKind {
    Human,
    Computer,
}

/// Which hint a client asked for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HintKind {
    /// The engine's preferred move.
    Best,
    /// Every legal move in the position.
    All,
}

impl HintKind {
    /// Parse the option word of a `hint` command (`"best"` / `"all"`).
    pub fn from_token(token: &str) -> Option<HintKind> {
        match token {
            "best" => Some(HintKind::Best),
            "all" => Some(HintKind::All),
            _ => None,
        }
    }
}

/// A parsed client request.
///
/// The move text in [`Command::Move`] is carried verbatim; whether it is a
/// plausible move string at all is a separate, state-dependent check
/// ([`client_codec::move_string_valid`](crate::client_codec::move_string_valid)),
/// because a malformed move issued outside a game is still a game-state
/// error rather than a syntax error. The option word in [`Command::Hint`]
/// gets the same treatment: it is matched against [`HintKind::from_token`]
/// only once the game and turn gates have passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start {
        opponent: OpponentKind,
        preference: ColourPreference,
    },
    Board,
    Move(String),
    Hint(String),
    Resign,
}

/// The reason a game ended, as reported to the clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOverReason {
    Checkmate(Colour),
    Stalemate,
    Resignation(Colour),
}

/// Error kinds reportable to a client as `error <kind>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The engine subprocess died; fatal for the whole server.
    Engine,
    /// Syntactically invalid or unknown command.
    Command,
    /// Command issued outside a started game.
    Game,
    /// Not this client's turn.
    Turn,
    /// Well-formed move rejected by the engine.
    Move,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Engine => "engine",
            ErrorKind::Command => "command",
            ErrorKind::Game => "game",
            ErrorKind::Turn => "turn",
            ErrorKind::Move => "move",
        }
    }
}

/// A server-to-client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Game has started and the client plays the given colour.
    Started(Colour),
    /// The opponent (human or engine) played this move.
    Moved(String),
    /// The client's own move was accepted.
    Ok,
    /// The side to move is in check and has legal replies.
    Check,
    GameOver(GameOverReason),
    /// Response to `hint`; may be empty.
    Moves(Vec<String>),
    /// Rendered board block, sent between `startboard` and `endboard`.
    /// Each contained line is newline-terminated.
    Board(String),
    Error(ErrorKind),
}

/// Everything the engine's `d` command reports that the server cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    /// The rendered board exactly as the engine printed it, every line
    /// newline-terminated.
    pub board: String,
    /// FEN of the displayed position.
    pub fen: String,
    /// Squares of pieces giving check, `None` when the engine reported none.
    pub checkers: Option<String>,
    pub white_to_play: bool,
}

/// Classification of a position reached after a move.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PositionStatus {
    Normal,
    Check,
    Checkmate,
    Stalemate,
}

impl PositionStatus {
    /// Classify from the two facts the engine gives us: whether the side to
    /// move is in check, and whether it has any legal move.
    pub fn classify(in_check: bool, any_moves: bool) -> PositionStatus {
        match (in_check, any_moves) {
            (true, false) => PositionStatus::Checkmate,
            (true, true) => PositionStatus::Check,
            (false, false) => PositionStatus::Stalemate,
            (false, true) => PositionStatus::Normal,
        }
    }

    /// True when the position terminates the game.
    pub fn is_game_over(self) -> bool {
        matches!(self, PositionStatus::Checkmate | PositionStatus::Stalemate)
    }
}
