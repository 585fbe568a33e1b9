//! Image endpoints forwarded to the image service.
//!
//! Each endpoint answers upstream failures with its own fixed status.

use crate::api::utils::{HandlerBody, bytes_response, empty_response, json_response};
use crate::engine::AggregationEngine;
use crate::errors::{GatewayError, Result};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Response, StatusCode};
use hyper::body::Bytes;
use tokio::time::Instant;
use upstream::types::sniff_content_type;

pub async fn get(
    engine: &AggregationEngine,
    image_id: &str,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let blob = engine
        .upstreams()
        .images
        .get(image_id, deadline)
        .await
        .map_err(GatewayError::proxy(StatusCode::NOT_FOUND))?;
    bytes_response(&blob.content_type, blob.data)
}

pub async fn delete(
    engine: &AggregationEngine,
    image_id: &str,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    engine
        .upstreams()
        .images
        .delete(image_id, deadline)
        .await
        .map_err(GatewayError::proxy(StatusCode::BAD_REQUEST))?;
    Ok(empty_response(StatusCode::OK))
}

pub async fn list_for_restaurant(
    engine: &AggregationEngine,
    restaurant_id: &str,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let image_ids = engine
        .upstreams()
        .images
        .list_for_restaurant(restaurant_id, deadline)
        .await
        .map_err(GatewayError::proxy(StatusCode::INTERNAL_SERVER_ERROR))?;
    json_response(&image_ids)
}

/// Forwards the raw request body as a new image of the restaurant.
pub async fn upload(
    engine: &AggregationEngine,
    restaurant_id: &str,
    headers: &HeaderMap,
    body: Bytes,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| sniff_content_type(&body).to_string());

    let image_id = engine
        .upstreams()
        .images
        .upload(restaurant_id, &content_type, body, deadline)
        .await
        .map_err(GatewayError::proxy(StatusCode::INTERNAL_SERVER_ERROR))?;
    json_response(&image_id)
}
