//! HTTP server for toolbridge.
//!
//! Exposes `POST /chat/stream`, which runs the tool-calling loop and streams
//! its events as Server-Sent Events, and `GET /health`.

pub mod request;
pub mod routes;
pub mod sse;
pub mod state;

pub use request::{resolve_workspace, ChatMessage, ChatRequest, RequestContext};
pub use routes::create_router;
pub use sse::{event_stream, WireEvent, RESULT_PREVIEW_CHARS};
pub use state::AppState;
