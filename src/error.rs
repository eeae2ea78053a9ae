//! Error types for the metrics server.
//!
//! None of these escape [`crate::server::run_server`]; they exist so the
//! server can log a precise reason and so the pieces can be tested alone.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures of the metrics exposition server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured port is not in `1..=65535`.
    #[error("invalid port for metric server: {port}")]
    InvalidPort { port: i64 },

    /// The certificate or private key could not be loaded into an acceptor.
    #[error("failed to load TLS material (cert: {cert}, key: {key}): {details}")]
    Tls {
        cert: PathBuf,
        key: PathBuf,
        details: String,
    },

    /// The listener failed to bind or its accept loop failed.
    #[error("error starting metrics server: {source}")]
    Listener {
        #[from]
        source: io::Error,
    },

    /// Graceful shutdown did not finish before the deadline.
    #[error("error closing metrics server: graceful shutdown exceeded {timeout:?}")]
    ShutdownTimeout { timeout: Duration },
}
