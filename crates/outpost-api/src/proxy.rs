use std::{pin::pin, sync::Arc, time::Duration};

use axum::{
    body::{Body, Bytes, HttpBody},
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::{debug, warn};

use crate::{control::ControlState, error::ApiError};

/// Chunks buffered between the upstream body and the client.
const RELAY_BUFFER: usize = 16;
/// How long the rest of an upstream body is read after the client went away.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

const HOP_BY_HOP: [header::HeaderName; 9] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Loopback service behind the control channel.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    addr: String,
}

impl Upstream {
    /// One client shared by every proxied request. Environment proxies are ignored.
    pub fn new(addr: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().no_proxy().build()?;
        Ok(Self {
            client,
            addr: addr.into(),
        })
    }

    #[inline]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn target(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }

    /// Replays `req` against the upstream and streams the answer back.
    ///
    /// The request body is streamed through unbuffered. Only the status code
    /// and body of the answer are relayed; upstream headers are not.
    pub async fn forward(&self, req: Request) -> Response {
        let (parts, body) = req.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.target(path);

        let mut outbound = self
            .client
            .request(parts.method.clone(), &url)
            .headers(forwarded_headers(&parts.headers));
        if body.size_hint().exact() != Some(0) {
            outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        match outbound.send().await {
            Ok(resp) => {
                let status = resp.status();
                debug!(method = %parts.method, %url, status = status.as_u16(), "proxied");
                (status, Body::from_stream(relay(resp, url))).into_response()
            }
            Err(e) => {
                warn!(method = %parts.method, %url, error = %e, "upstream request failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Copies the upstream body into a channel read by the client response.
///
/// If the client goes away first, the rest of the upstream body is still read
/// (bounded by [`DRAIN_TIMEOUT`]) so the pooled connection can be reused.
fn relay(resp: reqwest::Response, url: String) -> ReceiverStream<Result<Bytes, reqwest::Error>> {
    let (tx, rx) = mpsc::channel(RELAY_BUFFER);
    tokio::spawn(async move {
        let mut chunks = pin!(resp.bytes_stream());
        while let Some(chunk) = chunks.next().await {
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() {
                break;
            }
            if failed {
                return;
            }
        }
        if !tx.is_closed() {
            return;
        }

        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            let mut bytes = 0usize;
            while let Some(Ok(chunk)) = chunks.next().await {
                bytes += chunk.len();
            }
            bytes
        })
        .await;
        match drained {
            Ok(bytes) => debug!(%url, bytes, "client went away; upstream body drained"),
            Err(_) => debug!(%url, "client went away; upstream body drain timed out"),
        }
    });
    ReceiverStream::new(rx)
}

fn forwarded_headers(src: &HeaderMap) -> HeaderMap {
    let mut headers = src.clone();
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers
}

pub(crate) async fn proxy(State(state): State<Arc<ControlState>>, req: Request) -> Response {
    state.upstream.forward(req).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::{
        Router,
        http::{HeaderValue, Method},
        routing::{get, post},
    };
    use http_body_util::BodyExt;
    use tokio::net::TcpListener;

    use super::*;

    const CHUNK: usize = 64 * 1024;
    const CHUNKS: usize = 128;

    async fn upstream(finished: Arc<AtomicBool>) -> Upstream {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route(
                "/upload",
                post(|body: Body| async move {
                    let mut n = 0usize;
                    let mut data = body.into_data_stream();
                    while let Some(chunk) = data.next().await {
                        n += chunk.unwrap().len();
                    }
                    n.to_string()
                }),
            )
            .route(
                "/big",
                get(move || async move {
                    let chunks = tokio_stream::iter(0..CHUNKS).map(move |i| {
                        if i == CHUNKS - 1 {
                            finished.store(true, Ordering::SeqCst);
                        }
                        Ok::<_, std::convert::Infallible>(Bytes::from(vec![0u8; CHUNK]))
                    });
                    Body::from_stream(chunks)
                }),
            );
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Upstream::new(addr.to_string()).unwrap()
    }

    #[tokio::test]
    async fn large_request_body_is_streamed_upstream() {
        let up = upstream(Arc::new(AtomicBool::new(false))).await;
        let payload = vec![7u8; 9 * 1024 * 1024];
        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header(header::CONTENT_LENGTH, payload.len())
            .body(Body::from(payload))
            .unwrap();

        let resp = up.forward(req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"9437184");
    }

    #[tokio::test]
    async fn upstream_body_is_drained_after_client_leaves() {
        let finished = Arc::new(AtomicBool::new(false));
        let up = upstream(finished.clone()).await;
        let req = Request::builder().uri("/big").body(Body::empty()).unwrap();

        let resp = up.forward(req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        drop(resp);

        let drained = tokio::time::timeout(Duration::from_secs(5), async {
            while !finished.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(drained.is_ok());
    }

    #[test]
    fn target_keeps_path_and_query() {
        let up = Upstream::new("127.0.0.1:9000").unwrap();
        assert_eq!(up.target("/api/v1/x?y=1"), "http://127.0.0.1:9000/api/v1/x?y=1");
    }

    #[test]
    fn hop_by_hop_headers_are_stripped() {
        let mut h = HeaderMap::new();
        h.insert(header::HOST, HeaderValue::from_static("outpost.example"));
        h.insert(header::CONNECTION, HeaderValue::from_static("close"));
        h.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        h.insert("x-trace", HeaderValue::from_static("abc"));

        let out = forwarded_headers(&h);
        assert_eq!(out.len(), 1);
        assert_eq!(out.get("x-trace").unwrap(), "abc");
    }
}
