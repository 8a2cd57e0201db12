//! uqchessserver entry point.
//!
//! Startup order matters and is part of the external contract:
//! arguments → bind (exit 7 on failure) → engine spawn and handshake
//! (exit 11) → bound port printed to stderr → accept loop. Tooling reads
//! the port line, so the tracing subscriber stays silent unless `RUST_LOG`
//! opts in.

use std::process::exit;

use tracing_subscriber::EnvFilter;
use uqchess_server::config::{
    Config, EXIT_ENGINE_START, EXIT_LISTEN, EXIT_USAGE, USAGE,
};
use uqchess_server::engine::{EngineDriver, EngineHandle};
use uqchess_server::matchmaker::WaitList;
use uqchess_server::server;

/// Program the engine child is launched as.
const ENGINE_PROGRAM: &str = "stockfish";

#[tokio::main]
async fn main() {
    // stderr carries the port line and the fatal messages; logging is
    // opt-in via RUST_LOG and otherwise fully off
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(_) => {
            eprintln!("{USAGE}");
            exit(EXIT_USAGE);
        }
    };

    let listener = match server::bind(&config.port).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::debug!(%error, "bind failed");
            eprintln!("uqchessserver: can't listen on port \"{}\"", config.port);
            exit(EXIT_LISTEN);
        }
    };

    let registry = server::new_registry();

    let driver = match EngineDriver::spawn(ENGINE_PROGRAM, registry.clone()).await {
        Ok(driver) => driver,
        Err(error) => {
            tracing::debug!(%error, "engine startup failed");
            eprintln!("uqchessserver: unable to start communication with chess engine");
            exit(EXIT_ENGINE_START);
        }
    };

    let (engine_tx, engine_rx) = EngineDriver::channel();
    tokio::spawn(driver.run(engine_rx));
    let engine = EngineHandle::new(engine_tx);

    // announce the bound port; tooling parses this line
    match listener.local_addr() {
        Ok(addr) => eprintln!("{}", addr.port()),
        Err(error) => {
            tracing::debug!(%error, "local_addr failed");
            eprintln!("uqchessserver: can't listen on port \"{}\"", config.port);
            exit(EXIT_LISTEN);
        }
    }

    server::serve(listener, engine, WaitList::new(), registry).await;
}
