//! HTTP host for the PDF suite.
//!
//! Exposes every whitelisted method under `/api/method/:method` and streams
//! batch progress as Server-Sent Events.

use std::net::SocketAddr;

use tokio::signal;

use pdf_suite::config::load_config_from_env;
use pdf_suite::PdfSuiteService;

mod routes;
mod telemetry;

#[tokio::main]
async fn main() {
    telemetry::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    tracing::info!("Starting PDF suite server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(site = %config.site_directory, workers = config.worker_count, "configuration loaded");

    let service = PdfSuiteService::start(config)?;
    let app = routes::router(service.suite().clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("PDF suite server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Worker threads may still be finishing a job.
    tokio::task::spawn_blocking(move || service.shutdown()).await?;
    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
