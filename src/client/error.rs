use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server returned {status}: {code}")]
    Http {
        status: u16,
        code: String,
        message: Option<String>,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Wire error code when the server answered, `None` for network failures.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Http { code, .. } => Some(code),
            _ => None,
        }
    }
}
