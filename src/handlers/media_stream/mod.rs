//! Telephony media-stream WebSocket
//!
//! Bridges one telephony media stream per connection to a call session.

mod handler;
pub mod messages;

pub use handler::media_stream_handler;
