use crate::errors::{Result, UpstreamError};
use crate::http::{OK_CREATED_ACCEPTED, OK_ONLY, ServiceEndpoint};
use crate::types::{ImageBlob, ImageId, sniff_content_type};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use tokio::time::Instant;
use url::Url;

const SERVICE: &str = "images service";

/// The image-storage service.
#[async_trait]
pub trait ImagesApi: Send + Sync {
    /// Ids of the images attached to a restaurant, in the order the service keeps them.
    async fn list_for_restaurant(&self, restaurant_id: &str, deadline: Instant)
    -> Result<Vec<ImageId>>;

    /// Uploads one image for a restaurant and returns its id.
    async fn upload(
        &self,
        restaurant_id: &str,
        content_type: &str,
        data: Bytes,
        deadline: Instant,
    ) -> Result<ImageId>;

    async fn get(&self, image_id: &str, deadline: Instant) -> Result<ImageBlob>;

    async fn delete(&self, image_id: &str, deadline: Instant) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct ImagesClient {
    endpoint: ServiceEndpoint,
}

impl ImagesClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            endpoint: ServiceEndpoint::new(client, base_url, SERVICE),
        }
    }
}

#[async_trait]
impl ImagesApi for ImagesClient {
    async fn list_for_restaurant(
        &self,
        restaurant_id: &str,
        deadline: Instant,
    ) -> Result<Vec<ImageId>> {
        let url = self.endpoint.url(&["images", "restaurant", restaurant_id])?;
        let request = self.endpoint.client().get(url);
        // The image service answers `null` for a restaurant without images
        let images: Option<Vec<ImageId>> = self.endpoint.send_json(request, OK_ONLY, deadline).await?;
        Ok(images.unwrap_or_default())
    }

    async fn upload(
        &self,
        restaurant_id: &str,
        content_type: &str,
        data: Bytes,
        deadline: Instant,
    ) -> Result<ImageId> {
        let url = self.endpoint.url(&["images", "restaurant", restaurant_id])?;
        let request = self
            .endpoint
            .client()
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .body(data);

        let image_id: ImageId = self
            .endpoint
            .send_json(request, OK_CREATED_ACCEPTED, deadline)
            .await?;
        if image_id.is_empty() {
            return Err(UpstreamError::EmptyImageId);
        }
        Ok(image_id)
    }

    async fn get(&self, image_id: &str, deadline: Instant) -> Result<ImageBlob> {
        let url = self.endpoint.url(&["images", image_id])?;
        let request = self.endpoint.client().get(url);
        let (headers, data) = self.endpoint.send_bytes(request, OK_ONLY, deadline).await?;

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| sniff_content_type(&data).to_string());

        Ok(ImageBlob { content_type, data })
    }

    async fn delete(&self, image_id: &str, deadline: Instant) -> Result<()> {
        let url = self.endpoint.url(&["images", image_id])?;
        let request = self.endpoint.client().delete(url);
        self.endpoint
            .send(request, OK_CREATED_ACCEPTED, deadline)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{MockResponse, start_mock_server};
    use http::{Method, StatusCode};
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn test_list_preserves_order() {
        let server = start_mock_server(|req| {
            assert_eq!(req.path, "/images/restaurant/r1");
            MockResponse::json(StatusCode::OK, r#"["img-3","img-1","img-2"]"#)
        })
        .await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let images = client.list_for_restaurant("r1", deadline()).await.unwrap();
        assert_eq!(images, vec!["img-3", "img-1", "img-2"]);
    }

    #[tokio::test]
    async fn test_null_list_is_empty() {
        let server = start_mock_server(|_| MockResponse::json(StatusCode::OK, "null")).await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let images = client.list_for_restaurant("r1", deadline()).await.unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_restaurant_id_is_encoded_once() {
        let server = start_mock_server(|req| {
            assert_eq!(req.path, "/images/restaurant/a%20b%2Fc");
            MockResponse::json(StatusCode::OK, r#"["img-1"]"#)
        })
        .await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let images = client.list_for_restaurant("a b/c", deadline()).await.unwrap();
        assert_eq!(images, vec!["img-1"]);
    }

    #[tokio::test]
    async fn test_upload_forwards_content_type() {
        let server = start_mock_server(|req| {
            assert_eq!(req.method, Method::POST);
            assert_eq!(req.headers[CONTENT_TYPE], "image/png");
            assert_eq!(req.body.as_ref(), b"pixels");
            MockResponse::json(StatusCode::CREATED, r#""new-image""#)
        })
        .await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let id = client
            .upload("r1", "image/png", Bytes::from_static(b"pixels"), deadline())
            .await
            .unwrap();
        assert_eq!(id, "new-image");
    }

    #[tokio::test]
    async fn test_upload_empty_id_is_an_error() {
        let server = start_mock_server(|_| MockResponse::json(StatusCode::OK, r#""""#)).await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let err = client
            .upload("r1", "image/png", Bytes::from_static(b"x"), deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::EmptyImageId));
    }

    #[tokio::test]
    async fn test_get_uses_upstream_content_type() {
        let server =
            start_mock_server(|_| MockResponse::bytes(Some("image/svg+xml"), b"<svg/>")).await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let blob = client.get("img", deadline()).await.unwrap();
        assert_eq!(blob.content_type, "image/svg+xml");
        assert_eq!(blob.data.as_ref(), b"<svg/>");
    }

    #[tokio::test]
    async fn test_get_sniffs_missing_content_type() {
        let server =
            start_mock_server(|_| MockResponse::bytes(None, b"\x89PNG\r\n\x1a\n0000")).await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let blob = client.get("img", deadline()).await.unwrap();
        assert_eq!(blob.content_type, "image/png");
    }

    #[tokio::test]
    async fn test_delete_failure() {
        let server =
            start_mock_server(|_| MockResponse::status(StatusCode::INTERNAL_SERVER_ERROR)).await;

        let client = ImagesClient::new(reqwest::Client::new(), server.url());
        let err = client.delete("img", deadline()).await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));
    }
}
