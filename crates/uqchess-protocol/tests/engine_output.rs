// Parsing the engine's reply stream from canned captures.

use uqchess_protocol::{
    bestmove_target, side_to_move, BoardReader, Colour, PerftReader, UciParseError, INITIAL_FEN,
};

// A real `d` dump, abbreviated to three ranks; shape is what matters.
const D_OUTPUT: &str = "\
 +---+---+---+---+---+---+---+---+
 | r | n | b | q | k | b | n | r |
 +---+---+---+---+---+---+---+---+
 | p | p | p | p | p | p | p | p |
 +---+---+---+---+---+---+---+---+
 | P | P | P | P | P | P | P | P |
 +---+---+---+---+---+---+---+---+
   a   b   c   d   e   f   g   h

Fen: rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1
Key: 8F8F01D4562F59FB
Checkers: ";

fn feed_board(lines: &str) -> BoardReader {
    let mut reader = BoardReader::new();
    for line in lines.lines() {
        if reader.push(line) {
            break;
        }
    }
    reader
}

#[test]
fn d_output_splits_into_fields() {
    let snapshot = feed_board(D_OUTPUT).finish().expect("parseable dump");
    assert_eq!(snapshot.fen, INITIAL_FEN);
    assert_eq!(snapshot.checkers, None);
    assert!(snapshot.white_to_play);
    // the board block is everything before the Fen: line, verbatim
    assert!(snapshot.board.starts_with(" +---+"));
    assert!(snapshot.board.contains("   a   b   c   d   e   f   g   h\n"));
    assert!(snapshot.board.ends_with("\n\n"));
    assert!(!snapshot.board.contains("Fen:"));
    assert!(!snapshot.board.contains("Key:"));
}

#[test]
fn checkers_line_with_squares() {
    let dump = "\
 | k |
   a

Fen: 4k3/8/8/8/8/8/4R3/4K3 b - - 0 1
Key: AA
Checkers: e2 ";
    let snapshot = feed_board(dump).finish().expect("parseable dump");
    assert_eq!(snapshot.checkers.as_deref(), Some("e2"));
    assert!(!snapshot.white_to_play);
}

#[test]
fn dump_without_fen_is_an_error() {
    let mut reader = BoardReader::new();
    reader.push(" | k |");
    reader.push("Checkers: ");
    assert_eq!(reader.finish(), Err(UciParseError::MissingFen));
}

#[test]
fn perft_collects_moves_until_summary() {
    let mut reader = PerftReader::new();
    let output = ["a2a3: 1", "e2e4: 1", "g1f3: 1", "", "Nodes searched: 3"];
    let mut done = false;
    for line in output {
        done = reader.push(line);
        if done {
            break;
        }
    }
    assert!(done);
    assert_eq!(reader.into_moves(), vec!["a2a3", "e2e4", "g1f3"]);
}

#[test]
fn perft_with_no_legal_moves() {
    let mut reader = PerftReader::new();
    assert!(!reader.push(""));
    assert!(reader.push("Nodes searched: 0"));
    assert!(reader.into_moves().is_empty());
}

#[test]
fn perft_skips_info_chatter() {
    let mut reader = PerftReader::new();
    reader.push("info string NNUE evaluation using nn.nnue");
    reader.push("d2d4: 1");
    assert!(reader.push("Nodes searched: 1"));
    assert_eq!(reader.into_moves(), vec!["d2d4"]);
}

#[test]
fn bestmove_extraction() {
    assert_eq!(bestmove_target("info depth 15 score cp 32"), None);
    assert_eq!(bestmove_target(""), None);
    assert_eq!(
        bestmove_target("bestmove e2e4 ponder e7e5"),
        Some(Ok("e2e4".to_string()))
    );
    assert_eq!(bestmove_target("bestmove d7d8q"), Some(Ok("d7d8q".to_string())));
    assert_eq!(
        bestmove_target("bestmove"),
        Some(Err(UciParseError::EmptyBestMove))
    );
}

#[test]
fn fen_side_to_move_field() {
    assert_eq!(side_to_move(INITIAL_FEN), Some(Colour::White));
    assert_eq!(
        side_to_move("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"),
        Some(Colour::Black)
    );
    assert_eq!(side_to_move("8/8/8/8"), None);
    assert_eq!(side_to_move("8/8/8/8 x - - 0 1"), None);
    assert_eq!(side_to_move(""), None);
}
