use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque id of a binary asset owned by the image service.
pub type ImageId = String;

/// Aggregate rating as reported by the rating service; `None` when no samples exist.
pub type Rating = Option<f64>;

/// A restaurant as stored by the record service.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RestaurantRecord {
    /// Assigned by the record service. Empty until the record has been created.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
}

/// Body posted to the record service to create a restaurant.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct NewRestaurant {
    pub name: String,
    pub description: String,
}

/// Raw image bytes fetched from the image service.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlob {
    pub content_type: String,
    pub data: Bytes,
}

/// Guesses a content type from the leading bytes of an image.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"BM", "image/bmp"),
    ];

    if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return "image/webp";
    }

    SIGNATURES
        .iter()
        .find(|(magic, _)| data.starts_with(magic))
        .map(|(_, content_type)| *content_type)
        .unwrap_or("application/octet-stream")
}
