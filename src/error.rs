use thiserror::Error;

/// Errors surfaced by the meeting client
#[derive(Debug, Error)]
pub enum MeetError {
    /// Authentication errors
    #[error("No stored auth token, please log in")]
    MissingToken,

    #[error("Backend rejected the auth token")]
    Unauthorized,

    /// Backend read/write errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Unexpected backend response: {0}")]
    UnexpectedResponse(String),

    /// Hosted SDK errors
    #[error("Failed to connect to the call service: {0}")]
    SdkConnection(String),

    #[error("Call operation failed: {0}")]
    SdkOperation(String),

    /// Local validation errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Password and confirmation do not match")]
    PasswordMismatch,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Token store error: {0}")]
    TokenStore(#[from] std::io::Error),

    #[error("Failed to (de)serialize payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Results using MeetError
pub type Result<T> = std::result::Result<T, MeetError>;

impl MeetError {
    pub fn internal(msg: impl Into<String>) -> Self {
        MeetError::Internal(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        MeetError::Network(msg.into())
    }

    pub fn sdk(msg: impl Into<String>) -> Self {
        MeetError::SdkConnection(msg.into())
    }

    /// True for errors that mean the user has to sign in again
    pub fn is_auth(&self) -> bool {
        matches!(self, MeetError::MissingToken | MeetError::Unauthorized)
    }
}

impl From<reqwest::Error> for MeetError {
    fn from(err: reqwest::Error) -> Self {
        MeetError::Network(err.to_string())
    }
}
