use crate::api::utils::{HandlerBody, text_response};
use crate::engine::AggregationEngine;
use crate::errors::{GatewayError, Result};
use http::{Response, StatusCode};
use hyper::body::Bytes;
use tokio::time::Instant;

/// Posts one integer sample and echoes the new aggregate as plain text.
pub async fn submit(
    engine: &AggregationEngine,
    restaurant_id: &str,
    body: &Bytes,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let sample = parse_sample(body)?;

    let rating = engine
        .upstreams()
        .ratings
        .submit(restaurant_id, sample, deadline)
        .await
        .map_err(GatewayError::proxy(StatusCode::INTERNAL_SERVER_ERROR))?;

    // An unrated restaurant echoes an empty body
    text_response(rating.map(|value| value.to_string()).unwrap_or_default())
}

fn parse_sample(body: &Bytes) -> Result<i64> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| GatewayError::BadRequest("rating must be an integer".into()))
}
