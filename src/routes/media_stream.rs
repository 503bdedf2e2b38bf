//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for one telephony call
///
/// # Protocol
///
/// The telephony provider sends JSON text frames tagged by `event`:
/// `connected`, `start` (with `streamSid`), `media` (base64 μ-law),
/// `mark` and `stop`.
///
/// The server answers with paced `media` frames and a `mark` after each
/// fully delivered reply.
///
/// # Example
///
/// ```json
/// // Provider sends
/// {"event": "start", "streamSid": "MZ...", "start": {"callSid": "CA..."}}
/// {"event": "media", "streamSid": "MZ...", "media": {"payload": "//8A..."}}
///
/// // Server responds
/// {"event": "media", "streamSid": "MZ...", "media": {"payload": "..."}}
/// {"event": "mark", "streamSid": "MZ...", "mark": {"name": "reply-1"}}
/// ```
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
