//! 错误类型

use thiserror::Error;

/// Sign-in callback errors
#[derive(Debug, Error)]
pub enum SignInError {
    /// The request never produced a response (connect, timeout, body read)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered outside the 2xx range
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SignInError {
    /// JSON-RPC error code for this failure
    pub fn rpc_code(&self) -> i32 {
        match self {
            SignInError::Config(_) | SignInError::Json(_) => -32602,
            _ => -32000,
        }
    }
}
