//! Prometheus metrics for the image registry operator, served over HTTPS.
//!
//! The operator's reconciliation code reports into an [`OperatorMetrics`]
//! handle; [`run_server`] exposes the same handle on `GET /metrics` until the
//! caller's stop signal fires.
//!
//! ```no_run
//! use registry_operator_metrics::{run_server, OperatorMetrics, ServerConfig};
//!
//! # async fn example() -> Result<(), prometheus::Error> {
//! let metrics = OperatorMetrics::new()?;
//! let reporter = metrics.clone();
//!
//! let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
//! let server = tokio::spawn(run_server(ServerConfig::new(60000), metrics, async move {
//!     let _ = stop_rx.await;
//! }));
//!
//! reporter.storage_reconfigured();
//! reporter.image_pruner_install_status(true, true);
//! reporter.image_pruner_job_status(false);
//!
//! let _ = stop_tx.send(());
//! let _ = server.await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod server;

pub use config::{Config, ConfigError, ServerConfig};
pub use error::ServerError;
pub use metrics::{OperatorMetrics, PrunerInstallStatus, PrunerJobStatus};
pub use server::run_server;
