use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use upstream::types::{ImageId, Rating, RestaurantRecord};

/// The public view of a restaurant: the stored record plus its images and rating.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ComposedRestaurant {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub rating: Rating,
    /// Gateway-relative image URLs, in the order the image service listed them.
    pub images: Vec<String>,
}

pub fn compose(record: RestaurantRecord, images: &[ImageId], rating: Rating) -> ComposedRestaurant {
    let RestaurantRecord {
        id,
        name,
        description,
        latitude,
        longitude,
    } = record;

    ComposedRestaurant {
        id,
        name,
        description,
        latitude,
        longitude,
        rating,
        images: images.iter().map(|image| image_url(image)).collect(),
    }
}

pub fn image_url(image_id: &str) -> String {
    format!("/images/{image_id}")
}

/// Body of a create request.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RestaurantDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<InlineImage>,
}

/// An image carried inline in a create request.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct InlineImage {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(deserialize_with = "deserialize_base64")]
    pub data: Bytes,
}

/// Body of an update request. Any `id` it carries is replaced by the one in the path.
pub type RestaurantPatch = RestaurantRecord;

fn deserialize_base64<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map(Bytes::from)
        .map_err(serde::de::Error::custom)
}
