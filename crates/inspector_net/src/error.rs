//! Transport-layer error types.

/// Errors surfaced by the gateway.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to bind or accept on the listener socket.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or protocol error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
