//! HTTP server facade for Bookshelf: router assembly, the request proxy, and
//! error rendering.

use anyhow::Context;
use axum::{routing::get, Router};

use bookshelf_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod proxy;
pub mod router;

use router::RouterBuilder;

/// Start the HTTP server and serve until Ctrl-C
pub async fn start_server(registry: &ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    tracing::info!(
        "starting HTTP server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    let app = build_router(registry, settings);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", settings.server.host, settings.server.port))
            .await
            .context("failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}",
        listener.local_addr().context("listener has no local address")?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    // Request ids cover only the routes added before the layer. Module routes
    // are mounted after it so proxied traffic keeps the caller's headers.
    let mut router_builder = RouterBuilder::new()
        .route("/healthz", get(health_check))
        .with_request_id();

    for module in registry.modules() {
        let mount_path = module.mount_path();
        tracing::info!(module = module.name(), "mounting module routes under {}", mount_path);
        router_builder = router_builder.mount_module(&mount_path, module.routes());
    }

    router_builder = router_builder.with_tracing();

    if let Some(timeout_ms) = settings.server.request_timeout_ms {
        router_builder = router_builder.with_timeout(timeout_ms);
    }

    router_builder.build()
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
