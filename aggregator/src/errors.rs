use http::StatusCode;
use thiserror::Error;
use upstream::UpstreamError;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Errors that can occur while serving a gateway request
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    Upstream(#[from] UpstreamError),

    /// Upstream failure on a proxied endpoint that answers with a fixed status.
    #[error("{source}")]
    Proxy {
        status: StatusCode,
        #[source]
        source: UpstreamError,
    },

    #[error("deadline exceeded waiting for {0}")]
    DeadlineExceeded(String),

    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("No route matched for request")]
    NoRouteMatched,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("error processing request")]
    InjectedFailure,

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("Response serialization error: {0}")]
    ResponseSerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    /// Binding or serving one of the listeners failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Status reported to the caller when this error aborts an operation.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Upstream(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            GatewayError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Proxy { status, .. } => *status,
            GatewayError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::RequestBodyError(_) | GatewayError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::NoRouteMatched => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::InjectedFailure
            | GatewayError::TaskFailed(_)
            | GatewayError::ResponseSerializationError(_)
            | GatewayError::InternalError(_)
            | GatewayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wraps an upstream error so a proxied endpoint answers with `status`.
    pub fn proxy(status: StatusCode) -> impl FnOnce(UpstreamError) -> Self {
        move |source| GatewayError::Proxy { status, source }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::ResponseSerializationError(e.to_string())
    }
}
