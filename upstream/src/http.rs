use crate::errors::{Result, UpstreamError};
use bytes::Bytes;
use http::StatusCode;
use serde::de::DeserializeOwned;
use std::future::Future;
use tokio::time::{Instant, timeout_at};
use url::Url;

/// Statuses accepted from reads and updates.
pub(crate) const OK_ONLY: &[StatusCode] = &[StatusCode::OK];

/// Statuses accepted from creates and deletes.
pub(crate) const OK_CREATED_ACCEPTED: &[StatusCode] =
    &[StatusCode::OK, StatusCode::CREATED, StatusCode::ACCEPTED];

/// One upstream service: a shared reqwest client plus the service base url.
#[derive(Clone, Debug)]
pub(crate) struct ServiceEndpoint {
    client: reqwest::Client,
    base_url: Url,
    service: &'static str,
}

impl ServiceEndpoint {
    pub fn new(client: reqwest::Client, base_url: Url, service: &'static str) -> Self {
        Self {
            client,
            base_url,
            service,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Appends path segments to the base url, keeping any path the base already has.
    ///
    /// Segments are percent-encoded, so ids can never escape their position.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidBaseUrl {
                service: self.service,
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request and checks the status against `accepted`.
    ///
    /// The whole exchange, including reading the body, is bounded by `deadline`.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
        accepted: &[StatusCode],
        deadline: Instant,
    ) -> Result<reqwest::Response> {
        let response = self
            .within(deadline, request.send())
            .await?
            .map_err(|source| UpstreamError::Request {
                service: self.service,
                source,
            })?;

        let status = response.status();
        if accepted.contains(&status) {
            return Ok(response);
        }

        let url = response.url().to_string();
        match status {
            StatusCode::NOT_FOUND => Err(UpstreamError::NotFound { url }),
            _ => Err(UpstreamError::UnexpectedStatus { url, status }),
        }
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        accepted: &[StatusCode],
        deadline: Instant,
    ) -> Result<T> {
        let body = self.send_bytes(request, accepted, deadline).await?.1;
        serde_json::from_slice(&body).map_err(|e| UpstreamError::Decode {
            service: self.service,
            reason: e.to_string(),
        })
    }

    /// Returns the response headers along with the collected body.
    pub async fn send_bytes(
        &self,
        request: reqwest::RequestBuilder,
        accepted: &[StatusCode],
        deadline: Instant,
    ) -> Result<(http::HeaderMap, Bytes)> {
        let response = self.send(request, accepted, deadline).await?;
        let headers = response.headers().clone();
        let body = self
            .within(deadline, response.bytes())
            .await?
            .map_err(|source| UpstreamError::Request {
                service: self.service,
                source,
            })?;
        Ok((headers, body))
    }

    async fn within<F: Future>(&self, deadline: Instant, future: F) -> Result<F::Output> {
        timeout_at(deadline, future)
            .await
            .map_err(|_| UpstreamError::Timeout {
                service: self.service,
            })
    }
}
