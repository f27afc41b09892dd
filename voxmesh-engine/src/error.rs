use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("invalid signaling url: {0}")]
    InvalidUrl(String),

    #[error("auth token is not a valid header value")]
    InvalidToken,

    #[error("failed to connect to signaling server: {0}")]
    Connect(String),

    #[error("timed out connecting to signaling server")]
    Timeout,

    #[error("failed to encode signaling frame: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh coordinator has stopped")]
    Stopped,

    #[error(transparent)]
    Signaling(#[from] SignalingError),
}
