use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid backend URL: {0}")]
    InvalidBaseUrl(String),

    /// Connection refused, DNS failure, timeout: the backend was never reached.
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// 2xx response whose envelope reported `success: false`.
    #[error("Backend rejected {operation}")]
    Rejected { operation: &'static str },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Map a reqwest failure, separating "never reached the server" from
    /// everything else.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            ClientError::Unreachable(e.to_string())
        } else {
            ClientError::Transport(e)
        }
    }

    /// The backend wraps its own 404s into 500s with a "not found" detail,
    /// so both shapes count.
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::NotFound(_) => true,
            ClientError::Status { detail, .. } => detail.to_lowercase().contains("not found"),
            _ => false,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
