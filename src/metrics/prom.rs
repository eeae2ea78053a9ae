use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use tracing::debug;

const NAMESPACE: &str = "image_registry";
const SUBSYSTEM: &str = "operator";

/// Installation state of the automatic image pruner CronJob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PrunerInstallStatus {
    NotInstalled,
    /// Installed, but the job is suspended.
    Suspended,
    Enabled,
}

impl PrunerInstallStatus {
    /// `installed == false` always maps to `NotInstalled`, whatever `enabled` says.
    pub fn from_flags(installed: bool, enabled: bool) -> Self {
        match (installed, enabled) {
            (false, _) => PrunerInstallStatus::NotInstalled,
            (true, false) => PrunerInstallStatus::Suspended,
            (true, true) => PrunerInstallStatus::Enabled,
        }
    }

    pub fn value(self) -> i64 {
        match self {
            PrunerInstallStatus::NotInstalled => 0,
            PrunerInstallStatus::Suspended => 1,
            PrunerInstallStatus::Enabled => 2,
        }
    }
}

/// Outcome of the most recent image pruner job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PrunerJobStatus {
    Healthy,
    Failed,
}

impl PrunerJobStatus {
    pub fn from_failed(failed: bool) -> Self {
        if failed {
            PrunerJobStatus::Failed
        } else {
            PrunerJobStatus::Healthy
        }
    }

    pub fn value(self) -> i64 {
        match self {
            PrunerJobStatus::Healthy => 0,
            PrunerJobStatus::Failed => 1,
        }
    }
}

/// Builds "0 = a, 1 = b" style help suffixes from a status enum.
fn encoding_help<T, F>(statuses: impl Iterator<Item = T>, value: F) -> String
where
    T: std::fmt::Display,
    F: Fn(&T) -> i64,
{
    statuses
        .map(|s| format!("{} = {}", value(&s), s))
        .collect::<Vec<_>>()
        .join(", ")
}

fn operator_opts(name: &str, help: String) -> Opts {
    Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(SUBSYSTEM)
}

/// Handle to the operator's metric registry and collectors.
///
/// Clones share the same registry and collectors, so one handle can be given to
/// the exposition server and another to the reconciliation code. All updates
/// are atomic and need no external locking.
#[derive(Clone)]
pub struct OperatorMetrics {
    registry: Registry,
    storage_reconfigured: IntCounter,
    image_pruner_install_status: IntGauge,
    image_pruner_job_status: IntGauge,
}

impl OperatorMetrics {
    /// Creates a fresh registry with the operator collectors registered.
    ///
    /// # Errors
    ///
    /// Returns [`prometheus::Error`] if a collector has invalid options or
    /// collides with an already registered one.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Registers the operator collectors into an existing registry.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let storage_reconfigured = IntCounter::with_opts(operator_opts(
            "storage_reconfigured_total",
            "Number of times the operator reconfigured its underlying storage".to_string(),
        ))?;
        let image_pruner_install_status = IntGauge::with_opts(operator_opts(
            "image_pruner_install_status",
            format!(
                "Installation status of the automatic image pruner: {}",
                encoding_help(PrunerInstallStatus::iter(), |s| s.value())
            ),
        ))?;
        let image_pruner_job_status = IntGauge::with_opts(operator_opts(
            "image_pruner_job_status",
            format!(
                "Status of the last image pruner job run: {}",
                encoding_help(PrunerJobStatus::iter(), |s| s.value())
            ),
        ))?;

        registry.register(Box::new(storage_reconfigured.clone()))?;
        registry.register(Box::new(image_pruner_install_status.clone()))?;
        registry.register(Box::new(image_pruner_job_status.clone()))?;

        Ok(OperatorMetrics {
            registry,
            storage_reconfigured,
            image_pruner_install_status,
            image_pruner_job_status,
        })
    }

    /// Adds the process collector (cpu, memory, fds) to the registry.
    ///
    /// Only available on Linux; elsewhere this is a no-op.
    pub fn register_process_collector(&self) -> Result<(), prometheus::Error> {
        #[cfg(target_os = "linux")]
        {
            let collector = prometheus::process_collector::ProcessCollector::for_self();
            self.registry.register(Box::new(collector))?;
        }
        Ok(())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Records one storage reconfiguration.
    pub fn storage_reconfigured(&self) {
        self.storage_reconfigured.inc();
        debug!(
            total = self.storage_reconfigured.get(),
            "storage reconfiguration recorded"
        );
    }

    /// Reports the installation state of the image pruner CronJob.
    pub fn image_pruner_install_status(&self, installed: bool, enabled: bool) {
        self.set_pruner_install_status(PrunerInstallStatus::from_flags(installed, enabled));
    }

    pub fn set_pruner_install_status(&self, status: PrunerInstallStatus) {
        self.image_pruner_install_status.set(status.value());
        debug!(%status, "image pruner install status reported");
    }

    /// Reports whether the image pruner job is failing.
    pub fn image_pruner_job_status(&self, failed: bool) {
        self.set_pruner_job_status(PrunerJobStatus::from_failed(failed));
    }

    pub fn set_pruner_job_status(&self, status: PrunerJobStatus) {
        self.image_pruner_job_status.set(status.value());
        debug!(%status, "image pruner job status reported");
    }

    pub fn storage_reconfigured_total(&self) -> u64 {
        self.storage_reconfigured.get()
    }

    pub fn pruner_install_status_value(&self) -> i64 {
        self.image_pruner_install_status.get()
    }

    pub fn pruner_job_status_value(&self) -> i64 {
        self.image_pruner_job_status.get()
    }

    /// Gathers every registered collector and encodes it in the text format.
    ///
    /// Returns the content type to serve alongside the body.
    pub fn encode_text(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
