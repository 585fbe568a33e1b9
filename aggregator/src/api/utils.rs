use crate::errors::{GatewayError, Result};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode, Uri};
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::http::full_body;

pub type HandlerBody = BoxBody<Bytes, GatewayError>;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Deserializes a JSON request body into the specified type.
pub fn deserialize_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| GatewayError::BadRequest(e.to_string()))
}

/// Serializes a value into a 200 JSON response.
pub fn json_response<T: Serialize>(value: &T) -> Result<Response<HandlerBody>> {
    let bytes = serde_json::to_vec(value).map(Bytes::from)?;
    bytes_response(JSON, bytes)
}

pub fn text_response(text: String) -> Result<Response<HandlerBody>> {
    bytes_response(TEXT, Bytes::from(text))
}

pub fn bytes_response(content_type: &str, bytes: Bytes) -> Result<Response<HandlerBody>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .body(full_body(bytes))
        .map_err(|e| GatewayError::InternalError(format!("Failed to build response: {e}")))
}

pub fn empty_response(status: StatusCode) -> Response<HandlerBody> {
    let mut response = Response::new(full_body(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Renders an error as `{"error": "..."}` with the status it maps to.
pub fn error_response(error: &GatewayError) -> Response<HandlerBody> {
    let body = serde_json::json!({ "error": error.to_string() }).to_string();
    let mut response = Response::new(full_body(body));
    *response.status_mut() = error.status_code();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
    response
}

/// First value of a query parameter, decoded.
pub fn query_param(uri: &Uri, key: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.into_owned())
}
