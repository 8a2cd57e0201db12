// Engine driver against scripted shell "engines".
//
// These exercise the subprocess plumbing end to end: spawn, handshake,
// request round trips. The scripted engine answers the same dialect a real
// one would; chess knowledge is not required.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use uqchess_server::engine::{EngineDriver, EngineHandle};
use uqchess_server::server::new_registry;

/// Write an executable script the driver can spawn as its engine.
fn scripted_engine(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "uqchess-test-engine-{}-{}",
        name,
        std::process::id()
    ));
    fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
    let mut perms = fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod script");
    path
}

const HANDSHAKE_ONLY: &str = r#"
while read line; do
  case "$line" in
    isready) echo readyok ;;
    uci) echo uciok ;;
  esac
done
"#;

#[tokio::test]
async fn handshake_succeeds_against_conforming_engine() {
    let script = scripted_engine("handshake", HANDSHAKE_ONLY);
    let driver = EngineDriver::spawn(script.to_str().expect("utf8 path"), new_registry()).await;
    assert!(driver.is_ok());
    let _ = fs::remove_file(script);
}

#[tokio::test]
async fn silent_engine_fails_the_handshake() {
    // exits immediately: EOF before readyok
    let script = scripted_engine("silent", "exit 0\n");
    let driver = EngineDriver::spawn(script.to_str().expect("utf8 path"), new_registry()).await;
    assert!(driver.is_err());
    let _ = fs::remove_file(script);
}

#[tokio::test]
async fn missing_program_fails_to_spawn() {
    let driver =
        EngineDriver::spawn("/nonexistent/uqchess-no-such-engine", new_registry()).await;
    assert!(driver.is_err());
}

// Speaks enough of the dialect for one best-move query and one move
// application (fixed position dump, one legal reply move).
const PLAYING_ENGINE: &str = r#"
while read line; do
  case "$line" in
    isready) echo readyok ;;
    uci) echo uciok ;;
    "go movetime"*)
      echo "info depth 15 score cp 30"
      echo "bestmove d2d4 ponder d7d5"
      ;;
    "go perft 1")
      echo "e7e5: 1"
      echo ""
      echo "Nodes searched: 1"
      ;;
    d)
      echo " +---+---+"
      echo " | r | n |"
      echo "   a   b"
      echo ""
      echo "Fen: rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1"
      echo "Key: 1234ABCD"
      echo "Checkers: "
      ;;
  esac
done
"#;

#[tokio::test]
async fn best_move_round_trip() {
    let script = scripted_engine("bestmove", PLAYING_ENGINE);
    let driver = EngineDriver::spawn(script.to_str().expect("utf8 path"), new_registry())
        .await
        .expect("handshake");

    let (tx, rx) = EngineDriver::channel();
    tokio::spawn(driver.run(rx));
    let engine = EngineHandle::new(tx);

    let best = engine
        .best_move("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
        .await
        .expect("engine alive");
    assert_eq!(best, "d2d4");
    let _ = fs::remove_file(script);
}

#[tokio::test]
async fn play_move_round_trip_accepts_and_classifies() {
    let script = scripted_engine("playmove", PLAYING_ENGINE);
    let driver = EngineDriver::spawn(script.to_str().expect("utf8 path"), new_registry())
        .await
        .expect("handshake");

    let (tx, rx) = EngineDriver::channel();
    tokio::spawn(driver.run(rx));
    let engine = EngineHandle::new(tx);

    let before = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    let outcome = engine
        .play_move(before, "d2d4")
        .await
        .expect("engine alive")
        .expect("move accepted: dump shows a different position");
    assert_eq!(
        outcome.snapshot.fen,
        "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1"
    );
    assert!(!outcome.snapshot.white_to_play);
    assert!(!outcome.status.is_game_over());
    let _ = fs::remove_file(script);
}

#[tokio::test]
async fn play_move_rejection_is_fen_equality() {
    let script = scripted_engine("reject", PLAYING_ENGINE);
    let driver = EngineDriver::spawn(script.to_str().expect("utf8 path"), new_registry())
        .await
        .expect("handshake");

    let (tx, rx) = EngineDriver::channel();
    tokio::spawn(driver.run(rx));
    let engine = EngineHandle::new(tx);

    // ask from the exact position the scripted dump reports: unchanged FEN
    // means the engine refused the move
    let unchanged = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq d3 0 1";
    let outcome = engine
        .play_move(unchanged, "a7a5")
        .await
        .expect("engine alive");
    assert!(outcome.is_none());
    let _ = fs::remove_file(script);
}
