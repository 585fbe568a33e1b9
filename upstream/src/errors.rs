use http::StatusCode;
use thiserror::Error;

/// Result type alias for upstream calls
pub type Result<T, E = UpstreamError> = std::result::Result<T, E>;

/// Errors returned by the upstream clients
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("server: {url} respond: 404: not found")]
    NotFound { url: String },

    #[error("server: {url} respond: {status}")]
    UnexpectedStatus { url: String, status: StatusCode },

    #[error("{service} did not respond before the deadline")]
    Timeout { service: &'static str },

    #[error("request to {service} failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode response from {service}: {reason}")]
    Decode { service: &'static str, reason: String },

    #[error("base url of {service} cannot carry a path")]
    InvalidBaseUrl { service: &'static str },

    #[error("image could not be uploaded")]
    EmptyImageId,
}

impl UpstreamError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::NotFound { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UpstreamError::Timeout { .. })
    }
}
