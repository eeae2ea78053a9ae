//! HTTPS exposition server for the operator metrics.
//!
//! The server is a best-effort sidecar: every failure is logged and swallowed
//! so that metrics serving can never take down or block the operator.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_server::tls_openssl::OpenSSLConfig;
use axum_server::Handle;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::metrics::OperatorMetrics;

/// Path of the only route the server exposes.
pub const METRICS_PATH: &str = "/metrics";

/// Runs the metrics server until `stop` resolves.
///
/// Returns immediately, after logging an error, when the port is not in
/// `1..=65535`. Otherwise the listener is started on a background task and
/// this call waits for `stop`. Once it fires, the server drains gracefully
/// within `config.shutdown_timeout`; connections still open after that are
/// closed forcibly. Errors are logged, never returned.
pub async fn run_server<F>(config: ServerConfig, metrics: OperatorMetrics, stop: F)
where
    F: Future<Output = ()>,
{
    let addr = match bind_address(config.port) {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    let handle = Handle::new();
    let listener = tokio::spawn(listen(addr, config.clone(), metrics, handle.clone()));

    stop.await;

    info!(
        %addr,
        connections = handle.connection_count(),
        "stopping metrics server"
    );
    handle.graceful_shutdown(None);

    match drain_within(listener, config.shutdown_timeout).await {
        Ok(Ok(())) => info!(%addr, "metrics server stopped"),
        Ok(Err(e)) => error!(%addr, "metrics server task failed: {}", e),
        Err(e) => {
            error!(%addr, "{}", e);
            handle.shutdown();
        }
    }
}

/// Address the listener binds for `port`, on all IPv4 interfaces.
pub fn bind_address(port: i64) -> Result<SocketAddr, ServerError> {
    match u16::try_from(port) {
        Ok(p) if p > 0 => Ok(SocketAddr::from(([0, 0, 0, 0], p))),
        _ => Err(ServerError::InvalidPort { port }),
    }
}

/// Router with the single `/metrics` route.
pub fn router(metrics: OperatorMetrics) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics_handler))
        .with_state(metrics)
}

/// Encodes the registry on every scrape.
async fn metrics_handler(State(metrics): State<OperatorMetrics>) -> Response {
    encoded_response(metrics.encode_text())
}

/// An encoding failure fails the response with a 500 instead of serving
/// partial output.
fn encoded_response(encoded: Result<(String, Vec<u8>), prometheus::Error>) -> Response {
    match encoded {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            error!("error encoding metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error has occurred while serving metrics:\n\n{}", e),
            )
                .into_response()
        }
    }
}

/// Builds a TLS acceptor from a PEM certificate chain and private key.
pub fn build_acceptor(cert: &Path, key: &Path) -> Result<SslAcceptor, ServerError> {
    let tls_error = |e: openssl::error::ErrorStack| ServerError::Tls {
        cert: cert.to_path_buf(),
        key: key.to_path_buf(),
        details: e.to_string(),
    };

    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).map_err(tls_error)?;
    builder
        .set_private_key_file(key, SslFiletype::PEM)
        .map_err(tls_error)?;
    builder
        .set_certificate_chain_file(cert)
        .map_err(tls_error)?;
    builder.check_private_key().map_err(tls_error)?;

    Ok(builder.build())
}

/// Background half of the server; logs anything but a normal close.
async fn listen(addr: SocketAddr, config: ServerConfig, metrics: OperatorMetrics, handle: Handle) {
    if let Err(e) = serve(addr, &config, metrics, handle).await {
        error!(%addr, "{}", e);
    }
}

async fn serve(
    addr: SocketAddr,
    config: &ServerConfig,
    metrics: OperatorMetrics,
    handle: Handle,
) -> Result<(), ServerError> {
    let acceptor = build_acceptor(&config.tls_cert, &config.tls_key)?;
    let tls = OpenSSLConfig::from_acceptor(Arc::new(acceptor));

    info!(
        %addr,
        path = METRICS_PATH,
        cert = %config.tls_cert.display(),
        "metrics server listening"
    );

    axum_server::bind_openssl(addr, tls)
        .handle(handle)
        .serve(router(metrics).into_make_service())
        .await?;

    Ok(())
}

/// Waits for `drain` to finish, giving up after `deadline`.
async fn drain_within<F: Future>(drain: F, deadline: Duration) -> Result<F::Output, ServerError> {
    tokio::time::timeout(deadline, drain)
        .await
        .map_err(|_| ServerError::ShutdownTimeout { timeout: deadline })
}
