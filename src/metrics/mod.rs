//! Operator metrics and their Prometheus exposition.
//!
//! This module owns the collectors the operator reports into and renders them
//! in the Prometheus text format for the `/metrics` endpoint.
//!
//! # Submodules
//!
//! - `prom` - collector definitions, reporting operations and text encoding

pub mod prom;

pub use prom::{OperatorMetrics, PrunerInstallStatus, PrunerJobStatus};
