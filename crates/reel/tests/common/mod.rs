//! In-process HTTP fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use reel_engine::{DownloaderConfig, create_client};
use tokio::net::TcpListener;
use url::Url;

pub const SEGMENT_COUNT: usize = 4;
pub const MEDIA_LEN: usize = 250_000;
pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub range: Option<String>,
    /// Every `Range` value, to catch duplicated headers.
    pub range_values: Vec<String>,
}

/// Every request the server saw, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<RecordedRequest>>>);

impl RequestLog {
    fn push(&self, request: RecordedRequest) {
        self.0.lock().unwrap().push(request);
    }

    pub fn all(&self) -> Vec<RecordedRequest> {
        self.0.lock().unwrap().clone()
    }

    pub fn gets(&self, path: &str) -> Vec<RecordedRequest> {
        self.all()
            .into_iter()
            .filter(|r| r.method == Method::GET && r.path == path)
            .collect()
    }
}

pub struct TestServer {
    base_url: Url,
    pub log: RequestLog,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Serve the media fixtures on a random localhost port.
    pub async fn start() -> Self {
        Self::with_router(fixture_router()).await
    }

    pub async fn with_router(router: Router) -> Self {
        let log = RequestLog::default();
        let recorder = log.clone();
        let router = router.layer(middleware::from_fn(move |request: Request, next: Next| {
            let recorder = recorder.clone();
            async move {
                recorder.push(RecordedRequest {
                    method: request.method().clone(),
                    path: request.uri().path().to_string(),
                    range: request
                        .headers()
                        .get(header::RANGE)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string),
                    range_values: request
                        .headers()
                        .get_all(header::RANGE)
                        .iter()
                        .filter_map(|v| v.to_str().ok())
                        .map(str::to_string)
                        .collect(),
                });
                next.run(request).await
            }
        }));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            log,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        self.base_url.join(path).unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Client with the engine's defaults, minus environment proxies.
pub fn client() -> reqwest::Client {
    let config = DownloaderConfig::builder().direct().build();
    create_client(&config).unwrap()
}

pub fn segment_body(index: usize) -> Vec<u8> {
    format!("segment-{index}|").into_bytes()
}

pub fn media_bytes() -> Vec<u8> {
    (0..MEDIA_LEN).map(|i| (i % 251) as u8).collect()
}

/// Four 10 second segments, referenced relative to the playlist.
pub fn media_playlist() -> String {
    let mut text = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n");
    for index in 0..SEGMENT_COUNT {
        text.push_str(&format!("#EXTINF:10.0,\nseg{index}.ts\n"));
    }
    text.push_str("#EXT-X-ENDLIST\n");
    text
}

fn fixture_router() -> Router {
    Router::new()
        .route("/hls/index.m3u8", any(|| async { playlist(media_playlist()) }))
        .route(
            "/hls/empty.m3u8",
            any(|| async { playlist("#EXTM3U\n#EXT-X-ENDLIST\n".to_string()) }),
        )
        .route(
            "/hls/broken.m3u8",
            any(|| async {
                playlist("#EXTM3U\n#EXTINF:10,\nseg0.ts\n#EXTINF:10,\nmissing.ts\n#EXTINF:10,\nseg2.ts\n".to_string())
            }),
        )
        .route(
            "/hls/master.m3u8",
            any(|| async {
                playlist(
                    "#EXTM3U\n\
                     #EXT-X-STREAM-INF:BANDWIDTH=400000\n\
                     low/index.m3u8\n\
                     #EXT-X-STREAM-INF:BANDWIDTH=3000000\n\
                     index.m3u8\n"
                        .to_string(),
                )
            }),
        )
        .route("/hls/offline.m3u8", any(offline_playlist))
        .route("/hls/{segment}", any(segment))
        .route("/media/clip.mp4", any(ranged_media))
        .route("/media/norange.mp4", any(unranged_media))
        .route("/media/nohead.pdf", any(no_head))
        .route("/media/untyped", any(untyped))
        .route("/media/probe-hostile", any(probe_hostile))
        .route("/media/gone.mp4", any(|| async { StatusCode::NOT_FOUND }))
        .with_state(FlakyCounter::default())
}

/// Announces a playlist on HEAD but cannot serve it.
async fn offline_playlist(method: Method) -> Response {
    if method == Method::HEAD {
        return playlist(String::new());
    }
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

fn playlist(text: String) -> Response {
    ([(header::CONTENT_TYPE, HLS_CONTENT_TYPE)], text).into_response()
}

/// Fails the first request for `flaky{n}.ts` with a 503.
#[derive(Clone, Default)]
struct FlakyCounter(Arc<Mutex<Vec<String>>>);

async fn segment(State(flaky): State<FlakyCounter>, Path(segment): Path<String>) -> Response {
    if let Some(index) = segment
        .strip_prefix("seg")
        .and_then(|s| s.strip_suffix(".ts"))
        .and_then(|s| s.parse::<usize>().ok())
    {
        return ([(header::CONTENT_TYPE, "video/mp2t")], segment_body(index)).into_response();
    }
    if let Some(index) = segment
        .strip_prefix("flaky")
        .and_then(|s| s.strip_suffix(".ts"))
        .and_then(|s| s.parse::<usize>().ok())
    {
        let mut seen = flaky.0.lock().unwrap();
        if !seen.contains(&segment) {
            seen.push(segment.clone());
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        return segment_body(index).into_response();
    }
    StatusCode::NOT_FOUND.into_response()
}

fn requested_len(headers: &HeaderMap) -> Option<usize> {
    let value = headers.get(header::RANGE)?.to_str().ok()?;
    let end = value.strip_prefix("bytes=0-")?.parse::<usize>().ok()?;
    Some(end + 1)
}

async fn ranged_media(headers: HeaderMap) -> Response {
    let body = media_bytes();
    match requested_len(&headers) {
        Some(len) => {
            let len = len.min(body.len());
            Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, "video/mp4")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes 0-{}/{}", len - 1, body.len()),
                )
                .body(Body::from(body[..len].to_vec()))
                .unwrap()
        }
        None => ([(header::CONTENT_TYPE, "video/mp4")], body).into_response(),
    }
}

async fn unranged_media() -> Response {
    ([(header::CONTENT_TYPE, "video/mp4")], media_bytes()).into_response()
}

async fn no_head(method: Method) -> Response {
    if method == Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    ([(header::CONTENT_TYPE, "application/pdf")], b"%PDF-1.7".to_vec()).into_response()
}

async fn untyped() -> Response {
    Response::builder()
        .body(Body::from(media_bytes()[..1024].to_vec()))
        .unwrap()
}

/// Rejects both probes but serves a plain GET.
async fn probe_hostile(method: Method, headers: HeaderMap) -> Response {
    if method == Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    if headers.contains_key(header::RANGE) {
        return StatusCode::RANGE_NOT_SATISFIABLE.into_response();
    }
    ([(header::CONTENT_TYPE, "video/mp4")], media_bytes()).into_response()
}
