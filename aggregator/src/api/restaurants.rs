//! Composite restaurant endpoints, backed by the aggregation engine.

use crate::api::utils::{HandlerBody, deserialize_body, empty_response, json_response, query_param};
use crate::composer::{RestaurantDraft, RestaurantPatch};
use crate::engine::AggregationEngine;
use crate::errors::Result;
use http::{Response, StatusCode, Uri};
use hyper::body::Bytes;
use tokio::time::Instant;

pub async fn list(
    engine: &AggregationEngine,
    uri: &Uri,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let name = query_param(uri, "name").filter(|name| !name.is_empty());
    let restaurants = engine.get_collection(name.as_deref(), deadline).await?;
    json_response(&restaurants)
}

pub async fn get(
    engine: &AggregationEngine,
    id: &str,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let restaurant = engine.get_one(id, deadline).await?;
    json_response(&restaurant)
}

pub async fn create(
    engine: &AggregationEngine,
    body: &Bytes,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let draft: RestaurantDraft = deserialize_body(body)?;
    let restaurant = engine.create(draft, deadline).await?;
    json_response(&restaurant)
}

pub async fn update(
    engine: &AggregationEngine,
    id: &str,
    body: &Bytes,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    let patch: RestaurantPatch = deserialize_body(body)?;
    let restaurant = engine.update(id, patch, deadline).await?;
    json_response(&restaurant)
}

pub async fn delete(
    engine: &AggregationEngine,
    id: &str,
    deadline: Instant,
) -> Result<Response<HandlerBody>> {
    engine.delete(id, deadline).await?;
    Ok(empty_response(StatusCode::OK))
}
