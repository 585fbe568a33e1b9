use crate::api::utils::{HandlerBody, empty_response, error_response};
use crate::api::{self, Endpoint, images, rating, restaurants};
use crate::config::{Config, Timeouts};
use crate::engine::{AggregationEngine, Upstreams};
use crate::errors::{GatewayError, Result};
use crate::fault_injection::{FaultInjector, FaultOutcome};
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use http::request::Parts;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::service::Service;
use hyper::{Request, Response};
use routing::{RouteActions, RouteMiss};
use shared::{gauge, histogram};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// The public HTTP surface of the gateway.
#[derive(Clone)]
pub struct GatewayService {
    inner: Arc<Inner>,
}

struct Inner {
    engine: AggregationEngine,
    faults: FaultInjector,
    routes: RouteActions<Endpoint>,
    timeouts: Timeouts,
}

impl GatewayService {
    pub fn new(engine: AggregationEngine, faults: FaultInjector, timeouts: Timeouts) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                faults,
                routes: api::routes(),
                timeouts,
            }),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let upstreams = Upstreams::from_config(&config.upstreams)?;
        let engine = AggregationEngine::new(upstreams, config.fan_out.max_concurrent_side_calls);
        let faults = FaultInjector::new(config.fault_injection.enabled);
        Ok(Self::new(engine, faults, config.timeouts.clone()))
    }
}

impl<B> Service<Request<B>> for GatewayService
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Display,
{
    type Response = Response<HandlerBody>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.handle(req).await) })
    }
}

impl Inner {
    async fn handle<B>(&self, req: Request<B>) -> Response<HandlerBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Display,
    {
        let started = Instant::now();
        gauge!(REQUESTS_INFLIGHT).increment(1.0);

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let (endpoint, result) = self.dispatch(req).await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                let status = e.status_code();
                if status.is_server_error() {
                    tracing::error!(%method, %path, status = status.as_u16(), error = %e, "Request failed");
                } else {
                    tracing::debug!(%method, %path, status = status.as_u16(), error = %e, "Request rejected");
                }
                error_response(&e)
            }
        };

        histogram!(
            REQUEST_DURATION,
            "endpoint" => endpoint,
            "status" => response.status().as_u16().to_string()
        )
        .record(started.elapsed().as_secs_f64());
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);

        response
    }

    /// Runs fault injection, routing and the endpoint. Returns the endpoint tag with the outcome.
    async fn dispatch<B>(&self, req: Request<B>) -> (&'static str, Result<Response<HandlerBody>>)
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Display,
    {
        let query = req.uri().query().map(str::to_string);
        match self.faults.apply(query.as_deref()).await {
            Ok(FaultOutcome::Proceed) => {}
            Ok(FaultOutcome::ShortCircuit(status)) => {
                return ("fault_injection", Ok(empty_response(status)));
            }
            Err(e) => return ("fault_injection", Err(e)),
        }

        let (parts, body) = req.into_parts();
        let (endpoint, raw_id) = match self.routes.resolve(&parts.method, parts.uri.path()) {
            Ok(route) => (*route.action, route.param("id").unwrap_or_default().to_string()),
            Err(miss) => {
                tracing::debug!(method = %parts.method, path = parts.uri.path(), ?miss, "No route matched");
                let error = match miss {
                    RouteMiss::NotFound => GatewayError::NoRouteMatched,
                    RouteMiss::MethodNotAllowed => GatewayError::MethodNotAllowed,
                };
                return ("unmatched", Err(error));
            }
        };
        let id = match decode_id(&raw_id) {
            Ok(id) => id,
            Err(e) => return (endpoint.name(), Err(e)),
        };
        tracing::debug!(endpoint = endpoint.name(), id = %id, "Matched route");

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return (
                    endpoint.name(),
                    Err(GatewayError::RequestBodyError(e.to_string())),
                );
            }
        };

        let result = self.call_endpoint(endpoint, &id, parts, body).await;
        (endpoint.name(), result)
    }

    async fn call_endpoint(
        &self,
        endpoint: Endpoint,
        id: &str,
        parts: Parts,
        body: Bytes,
    ) -> Result<Response<HandlerBody>> {
        let engine = &self.engine;
        let timeouts = &self.timeouts;

        match endpoint {
            Endpoint::Root => Ok(empty_response(http::StatusCode::OK)),
            Endpoint::ListRestaurants => {
                restaurants::list(engine, &parts.uri, deadline(timeouts.collection())).await
            }
            Endpoint::GetRestaurant => {
                restaurants::get(engine, id, deadline(timeouts.get_one())).await
            }
            Endpoint::CreateRestaurant => {
                restaurants::create(engine, &body, deadline(timeouts.write())).await
            }
            Endpoint::UpdateRestaurant => {
                restaurants::update(engine, id, &body, deadline(timeouts.write())).await
            }
            Endpoint::DeleteRestaurant => {
                restaurants::delete(engine, id, deadline(timeouts.write())).await
            }
            Endpoint::GetImage => images::get(engine, id, deadline(timeouts.proxy())).await,
            Endpoint::DeleteImage => images::delete(engine, id, deadline(timeouts.proxy())).await,
            Endpoint::ListRestaurantImages => {
                images::list_for_restaurant(engine, id, deadline(timeouts.proxy())).await
            }
            Endpoint::UploadRestaurantImage => {
                images::upload(engine, id, &parts.headers, body, deadline(timeouts.proxy())).await
            }
            Endpoint::SubmitRating => {
                rating::submit(engine, id, &body, deadline(timeouts.proxy())).await
            }
        }
    }
}

fn deadline(timeout: Duration) -> Instant {
    Instant::now() + timeout
}

/// Percent-decodes a captured path id. Upstream clients encode it again when building urls.
fn decode_id(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|id| id.into_owned())
        .map_err(|e| GatewayError::BadRequest(format!("id is not valid UTF-8: {e}")))
}
