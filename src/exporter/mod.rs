//! HTTP server exposing the collected metrics.

use crate::collectors::config::{CollectorConfig, InfluxConfig};
use crate::collectors::registry::CollectorRegistry;
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use ulid::Ulid;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    registry: Arc<CollectorRegistry>,
    config: Arc<InfluxConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: CollectorRegistry, config: InfluxConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config: Arc::new(config),
        }
    }
}

#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Ulid::new().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Start the exporter and serve until `SIGINT`/`SIGTERM`.
///
/// `listen` of `None` binds `::` and falls back to `0.0.0.0` when IPv6 is unavailable.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(
    port: u16,
    listen: Option<String>,
    config: InfluxConfig,
    collectors: Vec<String>,
) -> Result<()> {
    let collector_config = CollectorConfig::new().with_enabled(&collectors);
    let registry = CollectorRegistry::new(&collector_config);

    info!(
        collectors = ?registry.collector_names(),
        hosts = ?config.hosts,
        "starting influxdb exporter"
    );

    let app = router(AppState::new(registry, config));
    let listener = bind(listen.as_deref(), port).await?;

    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("exporter server failed")?;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUlid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

async fn bind(listen: Option<&str>, port: u16) -> Result<TcpListener> {
    if let Some(addr) = listen {
        return TcpListener::bind((addr, port))
            .await
            .with_context(|| format!("failed to bind {addr}:{port}"));
    }

    match TcpListener::bind(("::", port)).await {
        Ok(listener) => Ok(listener),
        Err(e) => {
            warn!(error = %e, "IPv6 unavailable, falling back to 0.0.0.0");
            TcpListener::bind(("0.0.0.0", port))
                .await
                .with_context(|| format!("failed to bind 0.0.0.0:{port}"))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutting down");
}

async fn root() -> Html<&'static str> {
    Html(
        "<html><head><title>InfluxDB Exporter</title></head>\
         <body><h1>InfluxDB Exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body></html>",
    )
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.registry.collect_all(&state.config).await {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to gather metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
