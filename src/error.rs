use thiserror::Error;

/// Result type for channel sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while talking to the lighting server
#[derive(Error, Debug)]
pub enum SyncError {
    /// WebSocket connection error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Connection is not open
    #[error("Connection closed")]
    ConnectionClosed,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame was valid JSON but not a message we understand
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Configuration was rejected by validation
    #[error("Invalid configuration: {0}")]
    Config(String),
}
