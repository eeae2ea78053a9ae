//! Integration tests for the public API

use std::time::Duration;

use registry_operator_metrics::{
    Config, ConfigError, OperatorMetrics, PrunerInstallStatus, PrunerJobStatus, ServerConfig,
    ServerError,
};

#[test]
fn test_error_types_are_public() {
    fn handle_error(err: ServerError) -> String {
        match err {
            ServerError::InvalidPort { port } => format!("Invalid port {}", port),
            ServerError::Tls { cert, .. } => format!("TLS failed for {}", cert.display()),
            ServerError::Listener { source } => format!("Listener failed: {}", source),
            ServerError::ShutdownTimeout { timeout } => format!("Timeout after {:?}", timeout),
        }
    }

    let msg = handle_error(ServerError::InvalidPort { port: 0 });
    assert_eq!(msg, "Invalid port 0");

    let err: Box<dyn std::error::Error> = Box::new(ConfigError::Validation("bad".to_string()));
    assert_eq!(err.to_string(), "Validation Error: bad");
}

#[test]
fn test_status_types() {
    let install = [
        PrunerInstallStatus::from_flags(false, false),
        PrunerInstallStatus::from_flags(false, true),
        PrunerInstallStatus::from_flags(true, false),
        PrunerInstallStatus::from_flags(true, true),
    ];
    let values: Vec<i64> = install.iter().map(|s| s.value()).collect();
    assert_eq!(values, vec![0, 0, 1, 2]);

    assert_eq!(PrunerJobStatus::from_failed(true).value(), 1);
    assert_eq!(PrunerJobStatus::from_failed(false).value(), 0);
}

#[test]
fn test_reporting_through_public_handle() {
    let metrics = OperatorMetrics::new().unwrap();

    for _ in 0..3 {
        metrics.storage_reconfigured();
    }
    metrics.set_pruner_install_status(PrunerInstallStatus::Suspended);
    metrics.image_pruner_job_status(true);
    metrics.image_pruner_job_status(false);

    assert_eq!(metrics.storage_reconfigured_total(), 3);
    assert_eq!(metrics.pruner_install_status_value(), 1);
    assert_eq!(metrics.pruner_job_status_value(), 0);
}

#[test]
fn test_server_config_builder() {
    let config = ServerConfig::new(8443)
        .with_tls("/tmp/cert.pem", "/tmp/key.pem")
        .with_shutdown_timeout(Duration::from_secs(2));

    assert_eq!(config.port, 8443);
    assert_eq!(config.tls_cert.to_str(), Some("/tmp/cert.pem"));
    assert_eq!(config.tls_key.to_str(), Some("/tmp/key.pem"));
    assert_eq!(config.shutdown_timeout, Duration::from_secs(2));
}

#[test]
fn test_cli_overrides_file_defaults() {
    let config = Config::default().merge_with(Config::from_cli_args(
        Some(9000),
        None,
        None,
        Some(4),
        Some("debug".to_string()),
        None,
    ));

    let server = config.server_config().unwrap();
    assert_eq!(server.port, 9000);
    assert_eq!(server.shutdown_timeout, Duration::from_secs(4));
    assert_eq!(config.log_level(), "debug");
    assert!(!config.process_metrics());
}
