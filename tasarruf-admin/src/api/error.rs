use thiserror::Error;

/// Everything the request pipeline can fail with.
///
/// Screens rarely match on this directly; they convert it into `FetchError`
/// or `MutationError` depending on what kind of call failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ApiError {
    /// Transport failures are the only ones worth retrying.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::BadRequest(_) => Some(400),
            ApiError::Conflict(_) => Some(409),
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server's own message, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            ApiError::Network(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Decoding(msg)
            | ApiError::Serialization(msg) => msg.clone(),
            ApiError::Api { message, .. } => message.clone(),
            ApiError::Unauthenticated => self.to_string(),
        }
    }

    pub(crate) fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            _ => ApiError::Api { status, message },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Serialization(e.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of a read (list, single entity, count).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decoding(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl From<ApiError> for FetchError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Unauthenticated | ApiError::Unauthorized(_) => FetchError::Unauthenticated,
            ApiError::Network(msg) => FetchError::Transport(msg),
            ApiError::Decoding(msg) | ApiError::Serialization(msg) => FetchError::Decoding(msg),
            other => FetchError::Status {
                status: other.status().unwrap_or(0),
                message: other.message(),
            },
        }
    }
}

/// Failure of a create, update, delete or association call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Not logged in")]
    Unauthenticated,

    #[error("Unexpected response: {0}")]
    Decoding(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl From<ApiError> for MutationError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Conflict(msg) => MutationError::Conflict(msg),
            ApiError::BadRequest(msg) => MutationError::Validation(msg),
            ApiError::Network(msg) => MutationError::Transport(msg),
            ApiError::Unauthenticated | ApiError::Unauthorized(_) => MutationError::Unauthenticated,
            ApiError::Decoding(msg) | ApiError::Serialization(msg) => MutationError::Decoding(msg),
            other => MutationError::Status {
                status: other.status().unwrap_or(0),
                message: other.message(),
            },
        }
    }
}
