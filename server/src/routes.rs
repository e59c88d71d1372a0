//! HTTP routes.
//!
//! - `POST /api/method/:method`: arguments as a JSON object body
//! - `GET /api/method/:method`: arguments as query parameters
//! - `GET /api/batch/events`: batch progress as Server-Sent Events
//! - `GET /health`

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast::error::RecvError;
use tower_http::trace::TraceLayer;

use pdf_suite::api::is_whitelisted;
use pdf_suite::{ApiResponse, CallContext, PdfSuite};

/// Header naming the calling user.
pub const USER_HEADER: &str = "x-pdf-suite-user";

#[derive(Clone)]
pub struct AppState {
    suite: Arc<PdfSuite>,
}

pub fn router(suite: Arc<PdfSuite>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/method/:method", get(call_get).post(call_post))
        .route("/api/batch/events", get(batch_events))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { suite })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn call_context(headers: &HeaderMap) -> CallContext {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(CallContext::new)
        .unwrap_or_else(CallContext::guest)
}

fn envelope(status: StatusCode, response: ApiResponse) -> Response {
    (status, Json(response)).into_response()
}

/// Runs the method on the blocking pool; PDF work is CPU and subprocess bound.
async fn invoke(
    state: AppState,
    ctx: CallContext,
    method: String,
    args: Map<String, Value>,
) -> Response {
    if !is_whitelisted(&method) {
        tracing::warn!(%method, user = %ctx.user, "rejected call to unknown method");
        return envelope(
            StatusCode::FORBIDDEN,
            ApiResponse::err(format!("Method not whitelisted: {}", method)),
        );
    }

    let suite = state.suite;
    let response =
        match tokio::task::spawn_blocking(move || suite.call(&ctx, &method, args)).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, "method task failed");
                ApiResponse::err(format!("Internal error: {}", e))
            }
        };
    envelope(StatusCode::OK, response)
}

async fn call_post(
    State(state): State<AppState>,
    Path(method): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(Value::Object(args)) => args,
            Ok(_) => {
                return envelope(
                    StatusCode::BAD_REQUEST,
                    ApiResponse::err("Request body must be a JSON object"),
                )
            }
            Err(e) => {
                return envelope(
                    StatusCode::BAD_REQUEST,
                    ApiResponse::err(format!("Invalid JSON body: {}", e)),
                )
            }
        }
    };

    invoke(state, call_context(&headers), method, args).await
}

async fn call_get(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let args = params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    invoke(state, call_context(&headers), method, args).await
}

#[derive(Debug, Default, Deserialize)]
struct EventsQuery {
    /// Only stream events of this batch.
    batch_name: Option<String>,
}

async fn batch_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.suite.progress().subscribe();
    let filter = query.batch_name;

    let stream = stream::unfold(receiver, move |mut receiver| {
        let filter = filter.clone();
        async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if filter.as_deref().is_some_and(|id| id != event.batch_id) {
                            continue;
                        }
                        let sse = Event::default()
                            .event("batch_progress")
                            .json_data(&event)
                            .unwrap_or_else(|e| Event::default().comment(e.to_string()));
                        return Some((Ok(sse), receiver));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "progress subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
