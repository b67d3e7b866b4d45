//! Realtime stream modules.
//!
//! - `channels`: channel table and subscription control messages.
//! - `session`: reconnecting public/private websocket sessions.

/// Channel table and subscription control messages.
pub mod channels;
/// Reconnecting websocket sessions and the message handler seam.
pub mod session;
