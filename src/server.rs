use crate::config::Config;
use crate::error::RedirectError;
use crate::handlers::{
    health_check, link_stats, metrics, missing_short_code, readiness_check, redirect, AppState,
    SharedState,
};
use crate::middleware::{logging_middleware, preflight_middleware};
use crate::store::LinkStore;
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
}

/// Builds the router around prepared state
pub fn create_app(state: SharedState) -> Router {
    Router::new()
        // Operational endpoints, two segments deep so they never match a short code
        .route("/_/health", get(health_check))
        .route("/_/ready", get(readiness_check))
        .route("/_/metrics", get(metrics))
        .route("/api/links/:short_code/stats", get(link_stats))
        // Redirects
        .route("/", get(missing_short_code))
        .route("/:short_code", get(redirect))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(logging_middleware))
                // answers OPTIONS itself, so the CORS layer only decorates GETs
                .layer(middleware::from_fn(preflight_middleware))
                .layer(CorsLayer::new().allow_origin(Any)),
        )
}

impl Server {
    pub fn new(config: &Config, store: Arc<dyn LinkStore>) -> Result<Self, RedirectError> {
        let state = AppState::from_config(config, store)?;

        Ok(Self {
            app: create_app(Arc::new(state)),
            bind_addr: config.bind_addr,
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("Redirector listening on {}", self.bind_addr);
        tracing::info!("Health check available at /_/health");
        tracing::info!("Readiness check available at /_/ready");

        // Run server with graceful shutdown
        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
