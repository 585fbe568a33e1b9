use crate::engine::Upstreams;
use async_trait::async_trait;
use bytes::Bytes;
use http::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, sleep, sleep_until};
use upstream::errors::Result;
use upstream::types::{ImageBlob, ImageId, NewRestaurant, Rating, RestaurantRecord};
use upstream::{ImagesApi, RatingsApi, RecordsApi, UpstreamError};

pub fn record(id: &str, name: &str) -> RestaurantRecord {
    RestaurantRecord {
        id: id.into(),
        name: name.into(),
        description: format!("About {name}"),
        latitude: Some("45.0".into()),
        longitude: Some("7.0".into()),
    }
}

/// Failure and latency controls for [`FakeUpstreams`].
#[derive(Default)]
pub struct Knobs {
    pub fail_records: bool,
    pub fail_images: bool,
    pub fail_ratings: bool,
    pub fail_image_deletes: bool,
    /// Zero-based upload attempts that fail
    pub failing_uploads: HashSet<usize>,
    /// Delay applied to image-list and rating calls for a restaurant id
    pub side_delays: HashMap<String, Duration>,
    /// Stall applied to record fetches by id. Unlike the side delays it ignores the deadline.
    pub record_delays: HashMap<String, Duration>,
    /// Stall applied to the record list, also ignoring the deadline
    pub list_delay: Option<Duration>,
}

#[derive(Default)]
struct State {
    records: Vec<RestaurantRecord>,
    images: HashMap<String, Vec<ImageId>>,
    blobs: HashMap<ImageId, ImageBlob>,
    ratings: HashMap<String, Vec<i64>>,
    fixed_ratings: HashMap<String, f64>,
    next_id: usize,
    uploads: usize,
}

/// In-memory stand-in for all three upstream services.
#[derive(Default)]
pub struct FakeUpstreams {
    state: Mutex<State>,
    knobs: Mutex<Knobs>,
    calls: AtomicUsize,
}

impl FakeUpstreams {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn upstreams(self: &Arc<Self>) -> Upstreams {
        Upstreams {
            records: self.clone(),
            images: self.clone(),
            ratings: self.clone(),
        }
    }

    pub fn knobs(&self, configure: impl FnOnce(&mut Knobs)) {
        configure(&mut self.knobs.lock().unwrap());
    }

    /// Number of upstream calls made so far, across all services.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn add_record(&self, record: RestaurantRecord) {
        self.state.lock().unwrap().records.push(record);
    }

    pub fn record(&self, id: &str) -> Option<RestaurantRecord> {
        let state = self.state.lock().unwrap();
        state.records.iter().find(|r| r.id == id).cloned()
    }

    pub fn set_images(&self, restaurant_id: &str, image_ids: &[&str]) {
        let mut state = self.state.lock().unwrap();
        for image_id in image_ids {
            state.blobs.insert(
                image_id.to_string(),
                ImageBlob {
                    content_type: "image/png".into(),
                    data: Bytes::from(format!("data of {image_id}")),
                },
            );
        }
        state.images.insert(
            restaurant_id.into(),
            image_ids.iter().map(|id| id.to_string()).collect(),
        );
    }

    pub fn images_of(&self, restaurant_id: &str) -> Vec<ImageId> {
        let state = self.state.lock().unwrap();
        state.images.get(restaurant_id).cloned().unwrap_or_default()
    }

    pub fn blob(&self, image_id: &str) -> Option<ImageBlob> {
        self.state.lock().unwrap().blobs.get(image_id).cloned()
    }

    pub fn set_rating(&self, restaurant_id: &str, rating: f64) {
        let mut state = self.state.lock().unwrap();
        state.fixed_ratings.insert(restaurant_id.into(), rating);
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    /// Sleeps for the configured side delay, giving up at `deadline` like the real clients.
    async fn side_delay(&self, restaurant_id: &str, deadline: Instant) -> Result<()> {
        let delay = self.knobs.lock().unwrap().side_delays.get(restaurant_id).copied();
        if let Some(delay) = delay {
            let wake = Instant::now() + delay;
            if wake > deadline {
                sleep_until(deadline).await;
                return Err(UpstreamError::Timeout { service: "fake" });
            }
            sleep_until(wake).await;
        }
        Ok(())
    }

    async fn stall(&self, pick: impl FnOnce(&Knobs) -> Option<Duration>) {
        let delay = pick(&self.knobs.lock().unwrap());
        if let Some(delay) = delay {
            sleep(delay).await;
        }
    }

    fn failing(&self, check: impl FnOnce(&Knobs) -> bool) -> bool {
        check(&self.knobs.lock().unwrap())
    }
}

fn server_error(url: &str) -> UpstreamError {
    UpstreamError::UnexpectedStatus {
        url: url.into(),
        status: StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn not_found(url: &str) -> UpstreamError {
    UpstreamError::NotFound { url: url.into() }
}

#[async_trait]
impl RecordsApi for FakeUpstreams {
    async fn list(&self, name: Option<&str>, _deadline: Instant) -> Result<Vec<RestaurantRecord>> {
        self.hit();
        self.stall(|k| k.list_delay).await;
        if self.failing(|k| k.fail_records) {
            return Err(server_error("restaurants"));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .iter()
            .filter(|r| name.is_none_or(|name| r.name == name))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str, _deadline: Instant) -> Result<RestaurantRecord> {
        self.hit();
        self.stall(|k| k.record_delays.get(id).copied()).await;
        if self.failing(|k| k.fail_records) {
            return Err(server_error("restaurants/{id}"));
        }
        self.record(id).ok_or_else(|| not_found("restaurants/{id}"))
    }

    async fn create(&self, restaurant: &NewRestaurant, _deadline: Instant) -> Result<RestaurantRecord> {
        self.hit();
        if self.failing(|k| k.fail_records) {
            return Err(server_error("restaurants"));
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let record = RestaurantRecord {
            id: format!("generated-{}", state.next_id),
            name: restaurant.name.clone(),
            description: restaurant.description.clone(),
            latitude: None,
            longitude: None,
        };
        state.records.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        record: &RestaurantRecord,
        _deadline: Instant,
    ) -> Result<RestaurantRecord> {
        self.hit();
        if self.failing(|k| k.fail_records) {
            return Err(server_error("restaurants/{id}"));
        }
        let mut state = self.state.lock().unwrap();
        let stored = state
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found("restaurants/{id}"))?;
        *stored = record.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str, _deadline: Instant) -> Result<()> {
        self.hit();
        if self.failing(|k| k.fail_records) {
            return Err(server_error("restaurants/{id}"));
        }
        let mut state = self.state.lock().unwrap();
        let before = state.records.len();
        state.records.retain(|r| r.id != id);
        if state.records.len() == before {
            return Err(not_found("restaurants/{id}"));
        }
        Ok(())
    }
}

#[async_trait]
impl ImagesApi for FakeUpstreams {
    async fn list_for_restaurant(&self, restaurant_id: &str, deadline: Instant) -> Result<Vec<ImageId>> {
        self.hit();
        self.side_delay(restaurant_id, deadline).await?;
        if self.failing(|k| k.fail_images) {
            return Err(server_error("images/restaurant/{id}"));
        }
        Ok(self.images_of(restaurant_id))
    }

    async fn upload(
        &self,
        restaurant_id: &str,
        content_type: &str,
        data: Bytes,
        _deadline: Instant,
    ) -> Result<ImageId> {
        self.hit();
        let attempt = {
            let mut state = self.state.lock().unwrap();
            state.uploads += 1;
            state.uploads - 1
        };
        if self.failing(|k| k.failing_uploads.contains(&attempt)) {
            return Err(server_error("images/restaurant/{id}"));
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let image_id = format!("image-{}", state.next_id);
        state.blobs.insert(
            image_id.clone(),
            ImageBlob {
                content_type: content_type.into(),
                data,
            },
        );
        state
            .images
            .entry(restaurant_id.into())
            .or_default()
            .push(image_id.clone());
        Ok(image_id)
    }

    async fn get(&self, image_id: &str, _deadline: Instant) -> Result<ImageBlob> {
        self.hit();
        if self.failing(|k| k.fail_images) {
            return Err(server_error("images/{id}"));
        }
        self.blob(image_id).ok_or_else(|| not_found("images/{id}"))
    }

    async fn delete(&self, image_id: &str, _deadline: Instant) -> Result<()> {
        self.hit();
        if self.failing(|k| k.fail_image_deletes) {
            return Err(server_error("images/{id}"));
        }
        let mut state = self.state.lock().unwrap();
        if state.blobs.remove(image_id).is_none() {
            return Err(not_found("images/{id}"));
        }
        for images in state.images.values_mut() {
            images.retain(|id| id != image_id);
        }
        Ok(())
    }
}

#[async_trait]
impl RatingsApi for FakeUpstreams {
    async fn get(&self, restaurant_id: &str, deadline: Instant) -> Result<Rating> {
        self.hit();
        self.side_delay(restaurant_id, deadline).await?;
        if self.failing(|k| k.fail_ratings) {
            return Err(server_error("rating/{id}"));
        }
        let state = self.state.lock().unwrap();
        Ok(state.fixed_ratings.get(restaurant_id).copied())
    }

    async fn submit(&self, restaurant_id: &str, sample: i64, _deadline: Instant) -> Result<Rating> {
        self.hit();
        if self.failing(|k| k.fail_ratings) {
            return Err(server_error("rating/{id}"));
        }
        let mut state = self.state.lock().unwrap();
        let samples = state.ratings.entry(restaurant_id.into()).or_default();
        samples.push(sample);
        let average = samples.iter().sum::<i64>() as f64 / samples.len() as f64;
        state.fixed_ratings.insert(restaurant_id.into(), average);
        Ok(Some(average))
    }
}
