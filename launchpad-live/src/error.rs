use thiserror::Error;

/// Error surface for the live status channel.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("failed to connect to live channel at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("websocket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    /// The server (or an in-process hub) refused the request.
    #[error("live channel rejected request: {0}")]
    Rejected(String),
}
