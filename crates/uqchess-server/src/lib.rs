//! uqchess-server
//!
//! A TCP server mediating chess games between connected clients and/or a
//! single shared external chess engine subprocess. Clients speak a
//! line-oriented protocol (see the `uqchess-protocol` crate); the engine
//! is driven over UCI-style pipes by one owning task that all sessions
//! share through a mailbox.
//!
//! - [`config`]     : command line, exit codes
//! - [`engine`]     : engine subprocess driver and its handle
//! - [`game`]       : per-game shared state
//! - [`matchmaker`] : wait list and colour-preference pairing
//! - [`client`]     : per-connection session
//! - [`server`]     : listener and accept loop
//! - [`types`]      : ids, channels, registry

pub mod client;
pub mod config;
pub mod engine;
pub mod game;
pub mod matchmaker;
pub mod server;
pub mod types;
