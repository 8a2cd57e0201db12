//! The small slice of FEN the server needs.
//!
//! The server never interprets piece placement; the engine is authoritative
//! for everything chess. The only field consulted here is the side-to-move
//! flag (second field), which drives turn checks and winner derivation.

use crate::types::Colour;

/// FEN of the initial (startpos) position.
pub const INITIAL_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Extract the side to move from a FEN string.
///
/// Returns `None` if the second field is missing or is not `w`/`b`.
pub fn side_to_move(fen: &str) -> Option<Colour> {
    let field = fen.split_whitespace().nth(1)?;
    let mut chars = field.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Colour::from_fen_char(c)
}
