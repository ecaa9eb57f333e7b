// api/rest.rs

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::ApiState;
use crate::metrics;
use crate::provider::ProviderError;

#[derive(Debug, Deserialize)]
pub(super) struct SymbolQuery {
    symbol: Option<String>,
}

impl SymbolQuery {
    /// Extract and normalize the required `symbol` parameter.
    fn resolve(&self, state: &ApiState) -> Result<String, Response> {
        let Some(symbol) = self.symbol.as_deref() else {
            return Err((StatusCode::BAD_REQUEST, "symbol is required").into_response());
        };
        state
            .validator
            .normalize(symbol)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()).into_response())
    }
}

fn provider_error_response(err: ProviderError) -> Response {
    match err {
        ProviderError::RateLimited => {
            (StatusCode::TOO_MANY_REQUESTS, err.to_string()).into_response()
        }
        ProviderError::Transport(_) | ProviderError::Decode(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub(super) async fn get_quote(
    State(state): State<ApiState>,
    Query(params): Query<SymbolQuery>,
) -> Response {
    let symbol = match params.resolve(&state) {
        Ok(symbol) => symbol,
        Err(response) => return response,
    };

    match state.provider.quote(&symbol).await {
        Ok(quote) => Json(quote).into_response(),
        Err(e) => provider_error_response(e),
    }
}

pub(super) async fn get_history(
    State(state): State<ApiState>,
    Query(params): Query<SymbolQuery>,
) -> Response {
    let symbol = match params.resolve(&state) {
        Ok(symbol) => symbol,
        Err(response) => return response,
    };

    match state.provider.daily_history(&symbol).await {
        Ok(history) => Json(history).into_response(),
        Err(e) => provider_error_response(e),
    }
}

pub(super) async fn health() -> Response {
    Json(json!({"status": "up"})).into_response()
}

pub(super) async fn serve_metrics() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}
