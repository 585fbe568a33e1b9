use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

/// What the mock server saw.
pub struct CapturedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub struct MockResponse {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: Bytes,
    delay: Option<Duration>,
}

impl MockResponse {
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            body: Bytes::new(),
            delay: None,
        }
    }

    pub fn json(status: StatusCode, body: &'static str) -> Self {
        Self {
            status,
            content_type: Some("application/json"),
            body: Bytes::from_static(body.as_bytes()),
            delay: None,
        }
    }

    pub fn bytes(content_type: Option<&'static str>, body: &'static [u8]) -> Self {
        Self {
            status: StatusCode::OK,
            content_type,
            body: Bytes::from_static(body),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

pub struct MockServer {
    port: u16,
    hits: Arc<AtomicUsize>,
}

impl MockServer {
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://127.0.0.1:{}", self.port)).unwrap()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a mock HTTP server that answers every request through `handler`
pub async fn start_mock_server<F>(handler: F) -> MockServer
where
    F: Fn(CapturedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handler = Arc::new(handler);
    let hits = Arc::new(AtomicUsize::new(0));
    let server_hits = hits.clone();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let handler = handler.clone();
            let hits = server_hits.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let handler = handler.clone();
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        let (parts, body) = req.into_parts();
                        let body = body.collect().await.unwrap().to_bytes();
                        let mock = handler(CapturedRequest {
                            method: parts.method,
                            path: parts.uri.path().to_string(),
                            query: parts.uri.query().map(str::to_string),
                            headers: parts.headers,
                            body,
                        });

                        if let Some(delay) = mock.delay {
                            tokio::time::sleep(delay).await;
                        }

                        let mut response = Response::new(Full::new(mock.body));
                        *response.status_mut() = mock.status;
                        if let Some(content_type) = mock.content_type {
                            response
                                .headers_mut()
                                .insert(http::header::CONTENT_TYPE, content_type.parse().unwrap());
                        }
                        Ok::<_, Infallible>(response)
                    }
                });

                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    MockServer { port, hits }
}
