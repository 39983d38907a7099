use declarest_http::TransportError;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The transport failed, or answered with a rejected status.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Raised by a fallback handler that declined to recover.
    #[error("Fallback rejected: {message}")]
    Recovery { message: String },

    /// Raised while post-processing a successful response.
    #[error("Post-processing failed: {message}")]
    PostProcess { message: String },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("No declared method `{method}` on `{api}`")]
    UnknownMethod { api: String, method: String },

    #[error("Declared methods must be called from within a tokio runtime")]
    NoRuntime,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn recovery(message: impl Into<String>) -> Self {
        ApiError::Recovery {
            message: message.into(),
        }
    }

    pub fn post_process(message: impl Into<String>) -> Self {
        ApiError::PostProcess {
            message: message.into(),
        }
    }

    /// The transport error behind this failure, if that is what it is.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            ApiError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("`{name}` is already registered as `{registered}`, not `{requested}`")]
    TypeMismatch {
        name: String,
        registered: &'static str,
        requested: &'static str,
    },
}
