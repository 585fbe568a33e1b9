use crate::errors::Result;
use crate::http::{OK_CREATED_ACCEPTED, OK_ONLY, ServiceEndpoint};
use crate::types::Rating;
use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use tokio::time::Instant;
use url::Url;

const SERVICE: &str = "rating service";

/// The rating service.
#[async_trait]
pub trait RatingsApi: Send + Sync {
    async fn get(&self, restaurant_id: &str, deadline: Instant) -> Result<Rating>;

    /// Posts one rating sample and returns the recomputed aggregate.
    async fn submit(&self, restaurant_id: &str, sample: i64, deadline: Instant) -> Result<Rating>;
}

#[derive(Clone, Debug)]
pub struct RatingsClient {
    endpoint: ServiceEndpoint,
}

impl RatingsClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            endpoint: ServiceEndpoint::new(client, base_url, SERVICE),
        }
    }
}

#[async_trait]
impl RatingsApi for RatingsClient {
    async fn get(&self, restaurant_id: &str, deadline: Instant) -> Result<Rating> {
        let url = self.endpoint.url(&["rating", restaurant_id])?;
        let request = self.endpoint.client().get(url);
        self.endpoint.send_json(request, OK_ONLY, deadline).await
    }

    async fn submit(&self, restaurant_id: &str, sample: i64, deadline: Instant) -> Result<Rating> {
        let url = self.endpoint.url(&["rating", restaurant_id])?;
        let request = self
            .endpoint
            .client()
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(sample.to_string());
        self.endpoint
            .send_json(request, OK_CREATED_ACCEPTED, deadline)
            .await
    }
}
