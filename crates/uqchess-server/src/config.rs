//! Command line handling and the process exit-code table.
//!
//! The server accepts either no arguments (ephemeral port) or exactly one
//! `--listen <port>` pair. An empty-string argument, a repeated `--listen`,
//! a trailing `--listen` with no value, or anything else is a usage error.
//!
//! The port is kept as text: validation happens at bind time, so a
//! non-numeric port surfaces as a listen failure (exit 7), not a usage
//! error.

use std::fmt;

/// Usage error → exit status.
pub const EXIT_USAGE: i32 = 14;
/// Could not listen on the requested port.
pub const EXIT_LISTEN: i32 = 7;
/// Could not establish communication with the engine at startup.
pub const EXIT_ENGINE_START: i32 = 11;
/// The engine subprocess exited while the server was running.
pub const EXIT_ENGINE_DIED: i32 = 5;

/// The one line printed on a usage error.
pub const USAGE: &str = "Usage: ./uqchessserver [--listen portnum]";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on, as given on the command line. `"0"` requests an
    /// ephemeral port.
    pub port: String,
}

/// Invalid command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError;

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{USAGE}")
    }
}

impl std::error::Error for UsageError {}

impl Config {
    /// Construct a `Config` from the program arguments (program name
    /// already stripped).
    pub fn from_args<I>(args: I) -> Result<Config, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let mut port: Option<String> = None;

        let mut i = 0;
        while i < args.len() {
            if args[i].is_empty() {
                return Err(UsageError);
            }
            let value = args.get(i + 1);
            match (args[i].as_str(), value) {
                ("--listen", Some(v)) if !v.is_empty() && port.is_none() => {
                    port = Some(v.clone());
                    i += 2;
                }
                _ => return Err(UsageError),
            }
        }

        Ok(Config {
            port: port.unwrap_or_else(|| "0".to_string()),
        })
    }
}
