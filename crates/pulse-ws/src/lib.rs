//! WebSocket client for exchange ticker streams.
//!
//! Provides the stream connector of the ingestion core:
//! - Connection lifecycle as an explicit state machine
//! - Linear reconnect backoff with a retry ceiling
//! - Caller-initiated disconnect that cancels any pending reconnect
//! - Lenient parsing of ticker array frames into `RawTick`

pub mod connection;
pub mod error;
pub mod message;
pub mod reconnect;

pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, ConnectionStats, FrameHandler,
    DEFAULT_TICKER_URL,
};
pub use error::{WsError, WsResult};
pub use message::{parse_frame, RawTick};
pub use reconnect::ReconnectPolicy;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any WebSocket connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
