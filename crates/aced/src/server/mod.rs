//! HTTP transport and service launch.
//!
//! The pipeline is synchronous: every request runs on the runtime's
//! blocking pool, which is capped at the configured `concurrency`. Requests
//! beyond that bound queue until a blocking thread frees up.

mod errors;
mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::bootstrap::{Collaborators, Service, SystemConfigLoader, bootstrap_with};
use crate::health::StructuredHealthReporter;

pub use self::errors::{LaunchError, ListenerError};
pub use self::routes::router;

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Runs the service with the production collaborators until SIGINT or
/// SIGTERM.
///
/// # Errors
///
/// Returns a [`LaunchError`] when bootstrap, runtime construction or the
/// listener fails.
pub fn run_server() -> Result<(), LaunchError> {
    let reporter = Arc::new(StructuredHealthReporter::new());
    let service = bootstrap_with(&SystemConfigLoader, reporter, Collaborators::from_config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(service.config().concurrency)
        .build()
        .map_err(|source| LaunchError::Runtime { source })?;
    let listener = runtime.block_on(bind(&service))?;
    runtime.block_on(serve(&service, listener, shutdown_signal()))?;
    info!(target: SERVER_TARGET, "service stopped");
    Ok(())
}

/// Binds the configured listen address and reports it.
///
/// # Errors
///
/// Returns a [`ListenerError`] when the address cannot be bound.
pub async fn bind(service: &Service) -> Result<TcpListener, ListenerError> {
    let address = service.config().listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ListenerError::Bind { address, source })?;
    let local: SocketAddr = listener
        .local_addr()
        .map_err(|source| ListenerError::LocalAddress { source })?;
    service.reporter().listener_ready(local);
    Ok(listener)
}

/// Serves requests on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ListenerError::Serve`] when the listener fails.
pub async fn serve<S>(
    service: &Service,
    listener: TcpListener,
    shutdown: S,
) -> Result<(), ListenerError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let app = router(service.pipeline(), service.reporter());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| ListenerError::Serve { source })
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!(target: SERVER_TARGET, %error, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::warn!(target: SERVER_TARGET, %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
    info!(target: SERVER_TARGET, "shutdown requested");
}
