//! Restaurant aggregation.
//!
//! Every read fans out to the three upstream services through a
//! [`TaskGroup`]: the base record call is fatal, the image list and rating
//! calls only degrade their field. Writes go to the record service first and
//! treat any follow-up image work as best effort.

use crate::composer::{ComposedRestaurant, RestaurantDraft, RestaurantPatch, compose};
use crate::config;
use crate::errors::{GatewayError, Result};
use crate::metrics_defs::UPSTREAM_DEGRADED;
use crate::task_group::{Criticality, TaskGroup};
use shared::counter;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use upstream::types::{ImageId, NewRestaurant, Rating, RestaurantRecord};
use upstream::{ImagesApi, ImagesClient, RatingsApi, RatingsClient, RecordsApi, RecordsClient};

/// The three upstream services, behind their client traits.
#[derive(Clone)]
pub struct Upstreams {
    pub records: Arc<dyn RecordsApi>,
    pub images: Arc<dyn ImagesApi>,
    pub ratings: Arc<dyn RatingsApi>,
}

impl Upstreams {
    /// HTTP clients for the configured base URLs, sharing one connection pool.
    pub fn from_config(config: &config::Upstreams) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GatewayError::InternalError(format!("http client: {e}")))?;

        Ok(Self {
            records: Arc::new(RecordsClient::new(
                client.clone(),
                config.restaurants.clone(),
            )),
            images: Arc::new(ImagesClient::new(client.clone(), config.images.clone())),
            ratings: Arc::new(RatingsClient::new(client, config.ratings.clone())),
        })
    }
}

/// Non-fatal calls made for every composed restaurant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SideCall {
    Images,
    Rating,
}

impl SideCall {
    const ALL: [SideCall; 2] = [SideCall::Images, SideCall::Rating];

    fn as_str(&self) -> &'static str {
        match self {
            SideCall::Images => "images",
            SideCall::Rating => "rating",
        }
    }
}

enum SideResult {
    Images(Vec<ImageId>),
    Rating(Rating),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Part {
    Record,
    Side(SideCall),
}

enum Fetched {
    Record(RestaurantRecord),
    Side(SideResult),
}

pub struct AggregationEngine {
    upstreams: Upstreams,
    max_concurrent_side_calls: Option<usize>,
}

impl AggregationEngine {
    pub fn new(upstreams: Upstreams, max_concurrent_side_calls: Option<usize>) -> Self {
        Self {
            upstreams,
            max_concurrent_side_calls,
        }
    }

    pub fn upstreams(&self) -> &Upstreams {
        &self.upstreams
    }

    /// Fetches one restaurant with its images and rating.
    ///
    /// Fails only if the record itself cannot be fetched before `deadline`.
    pub async fn get_one(&self, id: &str, deadline: Instant) -> Result<ComposedRestaurant> {
        let mut group = TaskGroup::new(deadline);

        let records = self.upstreams.records.clone();
        let record_id = id.to_string();
        group.spawn(Part::Record, Criticality::Fatal, async move {
            let record = records.get(&record_id, deadline).await?;
            Ok(Fetched::Record(record))
        });

        for call in SideCall::ALL {
            let side = self.side_call(call, id.to_string(), deadline);
            group.spawn(Part::Side(call), Criticality::Degradable, async move {
                side.await.map(Fetched::Side)
            });
        }

        let settled = group.join().await?;

        for (part, error) in &settled.degraded {
            if let Part::Side(call) = part {
                report_degraded(id, call.as_str(), error);
            }
        }

        let mut record = None;
        let mut images = Vec::new();
        let mut rating = None;
        for (_, fetched) in settled.completed {
            match fetched {
                Fetched::Record(r) => record = Some(r),
                Fetched::Side(SideResult::Images(ids)) => images = ids,
                Fetched::Side(SideResult::Rating(r)) => rating = r,
            }
        }

        let record = record.ok_or_else(|| {
            GatewayError::InternalError(format!("record {id} missing from settled group"))
        })?;
        Ok(compose(record, &images, rating))
    }

    /// Lists restaurants, optionally filtered by name, in the order the record
    /// service returned them.
    pub async fn get_collection(
        &self,
        name: Option<&str>,
        deadline: Instant,
    ) -> Result<Vec<ComposedRestaurant>> {
        let list = self.upstreams.records.list(name, deadline);
        let records = tokio::time::timeout_at(deadline, list)
            .await
            .map_err(|_| GatewayError::DeadlineExceeded("restaurant list".into()))??;

        let mut group =
            TaskGroup::new(deadline).with_concurrency_limit(self.max_concurrent_side_calls);
        for (index, record) in records.iter().enumerate() {
            for call in SideCall::ALL {
                let side = self.side_call(call, record.id.clone(), deadline);
                group.spawn((index, call), Criticality::Degradable, side);
            }
        }

        tracing::debug!(
            restaurants = records.len(),
            side_calls = group.len(),
            "Fanning out collection"
        );
        let settled = group.join().await?;

        let mut images: Vec<Vec<ImageId>> = vec![Vec::new(); records.len()];
        let mut ratings: Vec<Rating> = vec![None; records.len()];
        for ((index, _), result) in settled.completed {
            match result {
                SideResult::Images(ids) => {
                    if let Some(slot) = images.get_mut(index) {
                        *slot = ids;
                    }
                }
                SideResult::Rating(rating) => {
                    if let Some(slot) = ratings.get_mut(index) {
                        *slot = rating;
                    }
                }
            }
        }

        for ((index, call), error) in &settled.degraded {
            let restaurant_id = records.get(*index).map(|r| r.id.as_str()).unwrap_or("");
            report_degraded(restaurant_id, call.as_str(), error);
        }

        Ok(records
            .into_iter()
            .zip(images)
            .zip(ratings)
            .map(|((record, images), rating)| compose(record, &images, rating))
            .collect())
    }

    /// Creates the record, then uploads its inline images one by one.
    ///
    /// Uploads that fail are left out of the result.
    pub async fn create(
        &self,
        draft: RestaurantDraft,
        deadline: Instant,
    ) -> Result<ComposedRestaurant> {
        let RestaurantDraft {
            name,
            description,
            images,
        } = draft;

        let record = self
            .upstreams
            .records
            .create(&NewRestaurant { name, description }, deadline)
            .await?;

        let mut uploaded = Vec::with_capacity(images.len());
        for (position, image) in images.into_iter().enumerate() {
            match self
                .upstreams
                .images
                .upload(&record.id, &image.mime_type, image.data, deadline)
                .await
            {
                Ok(image_id) => uploaded.push(image_id),
                Err(e) => {
                    tracing::warn!(
                        restaurant_id = %record.id,
                        position,
                        error = %e,
                        "Image upload failed"
                    );
                    counter!(UPSTREAM_DEGRADED, "call" => "image_upload").increment(1);
                }
            }
        }

        Ok(compose(record, &uploaded, None))
    }

    /// Replaces the record and re-reads its image list. The rating is not fetched.
    pub async fn update(
        &self,
        id: &str,
        mut patch: RestaurantPatch,
        deadline: Instant,
    ) -> Result<ComposedRestaurant> {
        patch.id = id.to_string();
        let record = self.upstreams.records.update(id, &patch, deadline).await?;

        let images = match self
            .upstreams
            .images
            .list_for_restaurant(id, deadline)
            .await
        {
            Ok(images) => images,
            Err(e) => {
                report_degraded(id, SideCall::Images.as_str(), &e.into());
                Vec::new()
            }
        };

        Ok(compose(record, &images, None))
    }

    /// Deletes the record, then removes its images best effort.
    pub async fn delete(&self, id: &str, deadline: Instant) -> Result<()> {
        self.upstreams.records.delete(id, deadline).await?;

        let image_ids = match self
            .upstreams
            .images
            .list_for_restaurant(id, deadline)
            .await
        {
            Ok(image_ids) => image_ids,
            Err(e) => {
                report_degraded(id, SideCall::Images.as_str(), &e.into());
                return Ok(());
            }
        };

        let mut group = TaskGroup::new(deadline);
        for image_id in image_ids {
            let images = self.upstreams.images.clone();
            let key = image_id.clone();
            group.spawn(key, Criticality::Degradable, async move {
                images.delete(&image_id, deadline).await?;
                Ok(())
            });
        }

        let settled = group.join().await?;
        for (image_id, error) in &settled.degraded {
            tracing::warn!(
                restaurant_id = id,
                image_id = %image_id,
                error = %error,
                "Image delete failed"
            );
            counter!(UPSTREAM_DEGRADED, "call" => "image_delete").increment(1);
        }

        Ok(())
    }

    fn side_call(
        &self,
        call: SideCall,
        restaurant_id: String,
        deadline: Instant,
    ) -> impl Future<Output = Result<SideResult>> + Send + 'static {
        let images = self.upstreams.images.clone();
        let ratings = self.upstreams.ratings.clone();
        async move {
            let result = match call {
                SideCall::Images => SideResult::Images(
                    images
                        .list_for_restaurant(&restaurant_id, deadline)
                        .await?,
                ),
                SideCall::Rating => SideResult::Rating(ratings.get(&restaurant_id, deadline).await?),
            };
            Ok(result)
        }
    }
}

fn report_degraded(restaurant_id: &str, call: &'static str, error: &GatewayError) {
    tracing::warn!(restaurant_id, call, error = %error, "Upstream call degraded");
    counter!(UPSTREAM_DEGRADED, "call" => call).increment(1);
}
