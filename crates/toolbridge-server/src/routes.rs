//! HTTP routes for the server.

use crate::request::{resolve_workspace, ChatRequest};
use crate::sse::{event_stream, sse_response};
use crate::state::AppState;
use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use http_body_util::LengthLimitError;
use toolbridge_core::{EventSink, StreamEvent};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat/stream", any(chat_stream))
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "provider": state.provider(),
        "model": state.model(),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp_millis(),
    }))
}

/// Run one chat request and stream its events.
async fn chat_stream(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    if method != Method::POST {
        warn!(%method, "Rejected chat request method");
        return rejection(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method {method} not allowed; use POST"),
        );
    }

    if let Some(content_type) = request.headers().get(header::CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or_default();
        if !content_type.to_ascii_lowercase().contains("json") {
            return rejection(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("Unsupported content type '{content_type}'; expected application/json"),
            );
        }
    }

    let limit = state.config.max_body_bytes;
    if let Some(length) = content_length(&request) {
        if length > limit {
            return too_large(length, limit);
        }
    }

    let body = match to_bytes(request.into_body(), limit).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, limit, "Failed to read request body");
            return if is_length_limit(e) {
                rejection(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Request body exceeds the {limit} byte limit"),
                )
            } else {
                rejection(
                    StatusCode::BAD_REQUEST,
                    "Failed to read request body".to_string(),
                )
            };
        }
    };

    let request = match ChatRequest::parse(&body) {
        Ok(request) => request,
        Err(message) => return rejection(StatusCode::BAD_REQUEST, message),
    };
    let conversation = match request.conversation() {
        Ok(conversation) => conversation,
        Err(message) => return rejection(StatusCode::BAD_REQUEST, message),
    };

    let workspace = resolve_workspace(state.config.workspace_root(), request.context.as_ref());
    info!(
        messages = conversation.len(),
        workspace = %workspace.root.display(),
        "Chat request"
    );

    let (sink, rx) = EventSink::channel();
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run(conversation, workspace, sink).await;
    });

    sse_response(event_stream(rx)).into_response()
}

fn content_length(request: &Request) -> Option<usize> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Whether a body read failed because the limit was hit.
fn is_length_limit(error: axum::Error) -> bool {
    let inner = error.into_inner();
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&*inner);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn too_large(length: usize, limit: usize) -> Response {
    warn!(length, limit, "Rejected oversized chat request");
    rejection(
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("Request body too large: {length} bytes (limit {limit} bytes)"),
    )
}

/// An event stream holding a single error, followed by `done`.
fn rejection(status: StatusCode, message: String) -> Response {
    let (sink, rx) = EventSink::channel();
    sink.emit(StreamEvent::error(message));
    drop(sink);
    (status, sse_response(event_stream(rx))).into_response()
}
