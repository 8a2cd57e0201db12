//! The client line protocol.
//!
//! Client → server (one `\n`-terminated line each):
//!
//! - `start human|computer white|black|either`
//! - `board`
//! - `move <move>`
//! - `hint best` | `hint all`
//! - `resign`
//!
//! Server → client:
//!
//! - `started white|black`
//! - `moved <move>`
//! - `ok` | `check`
//! - `gameover checkmate white|black` | `gameover stalemate`
//!   | `gameover resignation white|black`
//! - `moves [<m1> <m2> …]`
//! - `startboard` … rendered board … `endboard`
//! - `error engine|command|game|turn|move`
//!
//! Tokenization is on single spaces with no empty fields allowed, so
//! doubled spaces or trailing whitespace make a line unparseable.

use std::fmt;

use crate::types::{ColourPreference, Command, GameOverReason, OpponentKind, Reply};

/// Why a client line failed to parse.
///
/// Both variants are reported to the client identically (`error command`);
/// the distinction only matters for logging.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    /// First word is not a known command.
    UnknownCommand,
    /// Known command word with missing, extra or malformed arguments.
    MalformedArguments,
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandParseError::UnknownCommand => write!(f, "unknown command"),
            CommandParseError::MalformedArguments => write!(f, "malformed command arguments"),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Parse one client line (without its trailing newline) into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, CommandParseError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.iter().any(|t| t.is_empty()) {
        // covers the empty line, leading/trailing spaces and doubled spaces
        return Err(CommandParseError::UnknownCommand);
    }

    match tokens[0] {
        "start" => parse_start(&tokens),
        "board" => {
            if tokens.len() == 1 {
                Ok(Command::Board)
            } else {
                Err(CommandParseError::MalformedArguments)
            }
        }
        "move" => {
            if tokens.len() == 2 {
                Ok(Command::Move(tokens[1].to_string()))
            } else {
                Err(CommandParseError::MalformedArguments)
            }
        }
        "hint" => parse_hint(&tokens),
        "resign" => {
            if tokens.len() == 1 {
                Ok(Command::Resign)
            } else {
                Err(CommandParseError::MalformedArguments)
            }
        }
        _ => Err(CommandParseError::UnknownCommand),
    }
}

fn parse_start(tokens: &[&str]) -> Result<Command, CommandParseError> {
    if tokens.len() != 3 {
        return Err(CommandParseError::MalformedArguments);
    }
    let opponent = match tokens[1] {
        "human" => OpponentKind::Human,
        "computer" => OpponentKind::Computer,
        _ => return Err(CommandParseError::MalformedArguments),
    };
    let preference = match tokens[2] {
        "white" => ColourPreference::White,
        "black" => ColourPreference::Black,
        "either" => ColourPreference::Either,
        _ => return Err(CommandParseError::MalformedArguments),
    };
    Ok(Command::Start {
        opponent,
        preference,
    })
}

fn parse_hint(tokens: &[&str]) -> Result<Command, CommandParseError> {
    if tokens.len() != 2 {
        return Err(CommandParseError::MalformedArguments);
    }
    // the option word is carried raw; like a move's text, its validity is
    // checked behind the game-state gates
    Ok(Command::Hint(tokens[1].to_string()))
}

/// Check that a move string is plausible: 4 or 5 ASCII alphanumerics.
///
/// Whether the move is *legal* is the engine's call, not ours.
pub fn move_string_valid(mv: &str) -> bool {
    (4..=5).contains(&mv.len()) && mv.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Render a [`Reply`] as the exact bytes to put on the wire, trailing
/// newline(s) included.
pub fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::Started(colour) => format!("started {colour}\n"),
        Reply::Moved(mv) => format!("moved {mv}\n"),
        Reply::Ok => "ok\n".to_string(),
        Reply::Check => "check\n".to_string(),
        Reply::GameOver(reason) => format_gameover(reason),
        Reply::Moves(moves) => {
            let mut out = String::from("moves");
            for mv in moves {
                out.push(' ');
                out.push_str(mv);
            }
            out.push('\n');
            out
        }
        Reply::Board(block) => format!("startboard\n{block}endboard\n"),
        Reply::Error(kind) => format!("error {}\n", kind.as_str()),
    }
}

fn format_gameover(reason: &GameOverReason) -> String {
    match reason {
        GameOverReason::Checkmate(winner) => format!("gameover checkmate {winner}\n"),
        GameOverReason::Stalemate => "gameover stalemate\n".to_string(),
        GameOverReason::Resignation(winner) => format!("gameover resignation {winner}\n"),
    }
}
