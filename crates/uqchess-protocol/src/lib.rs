//! uqchess-protocol
//!
//! Transport-agnostic protocol logic for the uqchess server.
//!
//! This crate is responsible for turning raw text lines into logical
//! messages and back again, on both sides of the server:
//!
//! - [`client_codec`] : the client line protocol (`start`, `move`, `hint`,
//!   …) and the server's reply lines (`started`, `ok`, `gameover`, …)
//! - [`uci_codec`]    : parsing the chess engine's reply stream
//!   (`bestmove`, `go perft 1` move lists, the `d` position dump)
//! - [`fen`]          : the few FEN fields the server actually inspects
//!
//! No I/O happens here; the server crate feeds these parsers lines one at
//! a time and writes formatted replies itself.

pub mod client_codec;
pub mod fen;
pub mod types;
pub mod uci_codec;

pub use client_codec::{format_reply, move_string_valid, parse_command, CommandParseError};
pub use fen::{side_to_move, INITIAL_FEN};
pub use types::{
    BoardSnapshot,
    Colour,
    ColourPreference,
    Command,
    ErrorKind,
    GameOverReason,
    HintKind,
    OpponentKind,
    PositionStatus,
    Reply,
};
pub use uci_codec::{bestmove_target, BoardReader, PerftReader, UciParseError};
