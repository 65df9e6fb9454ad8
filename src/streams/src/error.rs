use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamsError>;

#[derive(Error, Debug)]
pub enum StreamsError {
    /// Malformed request path or unrecognized artifact filename.
    #[error("{0}")]
    BadRequest(String),

    /// No metadata record for the requested coordinates.
    #[error("{0}")]
    NotFound(String),

    /// A registry value exists but does not decode. Producer-side bug.
    #[error("corrupt registry entry: {0}")]
    DataCorruption(String),

    /// Upstream origin answered with a non-success status or could not be reached.
    #[error("upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StreamsError {
    pub fn status(&self) -> StatusCode {
        match self {
            StreamsError::BadRequest(_) => StatusCode::BAD_REQUEST,
            StreamsError::NotFound(_) => StatusCode::NOT_FOUND,
            StreamsError::Upstream { status, .. } => *status,
            StreamsError::Http(_) => StatusCode::BAD_GATEWAY,
            StreamsError::DataCorruption(_)
            | StreamsError::Store(_)
            | StreamsError::Config(_)
            | StreamsError::Io(_)
            | StreamsError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label used in log fields so producer bugs stand apart from client mistakes.
    pub fn class(&self) -> &'static str {
        match self {
            StreamsError::BadRequest(_) => "client",
            StreamsError::NotFound(_) => "not_found",
            StreamsError::DataCorruption(_) => "data_corruption",
            StreamsError::Upstream { .. } | StreamsError::Http(_) => "upstream",
            _ => "internal",
        }
    }
}

impl IntoResponse for StreamsError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            StreamsError::BadRequest(_) | StreamsError::NotFound(_) => {
                tracing::debug!(error_class = self.class(), status = %status, error = %self, "Request rejected");
            }
            StreamsError::Upstream { .. } | StreamsError::Http(_) => {
                tracing::warn!(error_class = self.class(), status = %status, error = %self, "Upstream fetch failed");
            }
            _ => {
                tracing::error!(error_class = self.class(), status = %status, error = %self, "Request failed");
            }
        }

        let mut response = (status, self.to_string()).into_response();
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}
