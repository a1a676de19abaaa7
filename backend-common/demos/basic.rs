//! Example service wiring every middleware around a handful of routes.
//!
//! ```text
//! SERVICE_NAME=demo LOG_JSON=false cargo run --example basic
//! curl localhost:3000/hello
//! curl localhost:3000/metrics
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use backend_common::lifecycle::{liveness_handler, readiness_handler, shutdown_signal};
use backend_common::metrics::metrics_handler;
use backend_common::middleware::{self, apply, HttpService, Middleware};
use backend_common::{
    init_logger, CommonConfig, MetricsEmitter, PrometheusMetrics, Readiness, StatsdMetrics,
};
use rand::Rng;
use serde_json::json;
use tracing::info;

async fn hello() -> impl IntoResponse {
    Json(json!({ "message": "hello!" }))
}

async fn barf() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": "stop it" })))
}

async fn random() -> impl IntoResponse {
    let slept = rand::thread_rng().gen_range(0..6000u64);
    tokio::time::sleep(Duration::from_millis(slept)).await;
    Json(json!({ "slept": slept }))
}

async fn flip(State(readiness): State<Readiness>) -> impl IntoResponse {
    let ready = readiness.flip();
    Json(json!({ "ready": ready }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CommonConfig::from_env()?;
    init_logger(&config.logger_config())?;

    let prometheus = Arc::new(PrometheusMetrics::new()?);
    let mut emitter = MetricsEmitter::new().with_sink(prometheus.clone());
    if let Some(statsd) = config.statsd_config() {
        emitter = emitter.with_sink(Arc::new(StatsdMetrics::new(&statsd)?));
    }
    let emitter = Arc::new(emitter);

    let chain: Vec<Middleware> = vec![
        middleware::instrument_route(emitter),
        middleware::logging([]),
        middleware::access_control_allow_origin("*")?,
        middleware::add_headers([("X-Frame-Options", "DENY")])?,
    ];
    let wrap = |handler: MethodRouter| -> HttpService { apply(handler, chain.iter().cloned()) };

    let readiness = Readiness::default();
    let app = Router::new()
        .route_service("/hello", wrap(get(hello)))
        .route_service("/barf", wrap(get(barf)))
        .route_service("/random", wrap(get(random)))
        .route_service("/flip", wrap(get(flip).with_state(readiness.clone())))
        .route("/metrics", get(metrics_handler).with_state(prometheus))
        .route("/live", get(liveness_handler))
        .route("/ready", get(readiness_handler).with_state(readiness));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(listen = %addr, service = %config.service_name, "Server is starting");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server gracefully stopped");
    Ok(())
}
