use crate::errors::Result;
use crate::http::{OK_CREATED_ACCEPTED, OK_ONLY, ServiceEndpoint};
use crate::types::{NewRestaurant, RestaurantRecord};
use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

const SERVICE: &str = "restaurant service";

/// The restaurant-record service.
#[async_trait]
pub trait RecordsApi: Send + Sync {
    /// Lists every restaurant, or only those matching `name` when given.
    async fn list(&self, name: Option<&str>, deadline: Instant) -> Result<Vec<RestaurantRecord>>;

    async fn get(&self, id: &str, deadline: Instant) -> Result<RestaurantRecord>;

    /// Creates a restaurant. The returned record carries the id the service assigned.
    async fn create(&self, restaurant: &NewRestaurant, deadline: Instant)
    -> Result<RestaurantRecord>;

    async fn update(
        &self,
        id: &str,
        record: &RestaurantRecord,
        deadline: Instant,
    ) -> Result<RestaurantRecord>;

    async fn delete(&self, id: &str, deadline: Instant) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct RecordsClient {
    endpoint: ServiceEndpoint,
}

impl RecordsClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            endpoint: ServiceEndpoint::new(client, base_url, SERVICE),
        }
    }
}

#[async_trait]
impl RecordsApi for RecordsClient {
    async fn list(&self, name: Option<&str>, deadline: Instant) -> Result<Vec<RestaurantRecord>> {
        let url = self.endpoint.url(&["restaurants"])?;
        let mut request = self.endpoint.client().get(url);
        if let Some(name) = name {
            request = request.query(&[("name", name)]);
        }
        let records: Option<Vec<RestaurantRecord>> =
            self.endpoint.send_json(request, OK_ONLY, deadline).await?;
        Ok(records.unwrap_or_default())
    }

    async fn get(&self, id: &str, deadline: Instant) -> Result<RestaurantRecord> {
        let url = self.endpoint.url(&["restaurants", id])?;
        let request = self.endpoint.client().get(url);
        self.endpoint.send_json(request, OK_ONLY, deadline).await
    }

    async fn create(
        &self,
        restaurant: &NewRestaurant,
        deadline: Instant,
    ) -> Result<RestaurantRecord> {
        let url = self.endpoint.url(&["restaurants"])?;
        let request = self.endpoint.client().post(url).json(restaurant);
        self.endpoint
            .send_json(request, OK_CREATED_ACCEPTED, deadline)
            .await
    }

    async fn update(
        &self,
        id: &str,
        record: &RestaurantRecord,
        deadline: Instant,
    ) -> Result<RestaurantRecord> {
        let url = self.endpoint.url(&["restaurants", id])?;
        let request = self.endpoint.client().patch(url).json(record);
        self.endpoint.send_json(request, OK_ONLY, deadline).await
    }

    async fn delete(&self, id: &str, deadline: Instant) -> Result<()> {
        let url = self.endpoint.url(&["restaurants", id])?;
        let request = self.endpoint.client().delete(url);
        self.endpoint
            .send(request, OK_CREATED_ACCEPTED, deadline)
            .await?;
        Ok(())
    }
}
