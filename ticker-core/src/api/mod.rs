// api/mod.rs
//
// HTTP surface: the WebSocket upgrade, the on-demand quote/history lookups,
// health and the metrics exposition. All non-metrics endpoints get
// permissive CORS and an OPTIONS short-circuit.

mod rest;
mod websocket;

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::cache::HotSetCache;
use crate::hub::Hub;
use crate::provider::QuoteProvider;
use ticker_common::validation::SymbolValidator;

#[derive(Clone)]
pub struct ApiState {
    pub hub: Hub,
    pub provider: Arc<dyn QuoteProvider>,
    pub hot_set: Option<Arc<HotSetCache>>,
    pub validator: SymbolValidator,
    /// Outbound queue capacity for each new subscriber
    pub queue_capacity: usize,
}

pub fn create_router(state: ApiState) -> Router {
    // Everything except the metrics exposition gets the CORS treatment, so
    // the layer goes on before /metrics joins the router.
    let api = Router::new()
        .route("/api/quote", get(rest::get_quote))
        .route("/api/history", get(rest::get_history))
        .route("/api/health", get(rest::health))
        .route("/ws", get(websocket::ws_handler))
        .layer(middleware::from_fn(cors));

    Router::new()
        .merge(api)
        .route("/metrics", get(rest::serve_metrics))
        .with_state(state)
}

async fn cors(request: Request, next: Next) -> Response {
    let preflight = request.method() == Method::OPTIONS;

    let mut response = if preflight {
        Response::builder()
            .status(StatusCode::OK)
            .body(axum::body::Body::empty())
            .unwrap_or_default()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );

    response
}
