//! Listener binding and shutdown handling

use anyhow::{Context, Result};
use apksure_core::{format_bytes, Config};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};

fn bind_address(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Serve `app` until the process is asked to stop; in-flight requests finish first.
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let addr = bind_address(config.server_port());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        addr = %addr,
        max_apk_size = %format_bytes(config.max_apk_size_bytes() as u64, 2),
        extensions = %config.allowed_extensions().join(","),
        "APKSure API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(stop_requested())
        .await
        .context("Server terminated with an error")?;

    tracing::info!("APKSure API stopped");
    Ok(())
}

/// Completes on SIGINT, or SIGTERM on unix. A handler that fails to install
/// is logged and never completes.
async fn stop_requested() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    tracing::info!(signal, "Draining connections before shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binds_all_interfaces_on_configured_port() {
        let addr = bind_address(5000);
        assert!(addr.ip().is_unspecified());
        assert_eq!(addr.port(), 5000);
    }
}
