use crate::types::HttpResponse;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered, but with a status the transport rejects.
    #[error("Request failed with status {status}")]
    Status {
        status: u16,
        response: Box<HttpResponse>,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL: {message}")]
    InvalidUrl { message: String },

    #[error("Invalid HTTP method: {method}")]
    InvalidMethod { method: String },

    #[error("Unsupported content type: {content_type}")]
    InvalidContentType { content_type: String },

    #[error("Unsupported response type: {response_type}")]
    InvalidResponseType { response_type: String },

    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("Request task aborted: {message}")]
    Aborted { message: String },

    #[error("Mock transport failure: {message}")]
    Mock { message: String },
}

impl TransportError {
    /// The response attached to a status failure, if any.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            TransportError::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    /// HTTP status of the failure, when the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
