use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use registry_operator_metrics::{run_server, Config, OperatorMetrics};

/// Serve the image registry operator metrics over HTTPS.
#[derive(Parser, Debug)]
#[command(name = "registry-operator-metrics", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to serve /metrics on
    #[arg(short, long, allow_negative_numbers = true)]
    port: Option<i64>,

    /// PEM certificate file
    #[arg(long, value_name = "FILE")]
    tls_cert: Option<PathBuf>,

    /// PEM private key file
    #[arg(long, value_name = "FILE")]
    tls_key: Option<PathBuf>,

    /// Graceful shutdown deadline
    #[arg(long, value_name = "SECONDS")]
    shutdown_timeout: Option<u64>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Export process metrics (Linux only); overrides the config file
    #[arg(long, value_name = "BOOL")]
    process_metrics: Option<bool>,

    /// Print an example configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", Config::example_toml());
        return Ok(());
    }

    let mut config = Config::default();
    if let Some(path) = &cli.config {
        config = config.merge_with(Config::from_file(path)?);
    }
    config = config.merge_with(Config::from_cli_args(
        cli.port,
        cli.tls_cert,
        cli.tls_key,
        cli.shutdown_timeout,
        cli.log_level,
        cli.process_metrics,
    ));

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .init();

    let server_config = config.server_config()?;
    let metrics = OperatorMetrics::new()?;
    if config.process_metrics() {
        if let Err(e) = metrics.register_process_collector() {
            warn!("failed to register process collector: {}", e);
        }
    }

    run_server(server_config, metrics, shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("signal received, shutting down metrics server");
}
