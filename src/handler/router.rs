//! Request routing dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation, route matching, and dispatching.

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::media::{self, Delivery};
use crate::handler::upload;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use crate::storage::Collection;
use hyper::body::{Body, Bytes};
use hyper::header::HeaderValue;
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Resolved target of a request path
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Listing(Collection),
    Upload,
    Media {
        collection: Collection,
        name: &'a str,
        delivery: Delivery,
    },
    Unknown,
}

fn match_route(path: &str) -> Route<'_> {
    match path {
        "/api/health" => return Route::Health,
        "/api/videos" => return Route::Listing(Collection::Videos),
        "/api/files" => return Route::Listing(Collection::Downloads),
        "/api/upload" => return Route::Upload,
        _ => {}
    }

    let prefixes = [
        ("/api/stream/", Collection::Videos, Delivery::Inline),
        ("/api/download/", Collection::Downloads, Delivery::Attachment),
        // Static aliases, always inline
        ("/videos/", Collection::Videos, Delivery::Inline),
        ("/downloads/", Collection::Downloads, Delivery::Inline),
    ];

    prefixes
        .into_iter()
        .find_map(|(prefix, collection, delivery)| {
            path.strip_prefix(prefix)
                .filter(|name| !name.is_empty())
                .map(|name| Route::Media {
                    collection,
                    name,
                    delivery,
                })
        })
        .unwrap_or(Route::Unknown)
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let mut response = route_request(&parts, body, &state).await;

    if state.config.http.enable_cors {
        http::apply_cors(&mut response);
    }
    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert("Server", server);
    }

    if state.config.logging.access_log {
        log_access(&parts, &response, peer_addr, started, &state);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request<B>(parts: &Parts, body: B, state: &AppState) -> Response<ResponseBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    if parts.method == Method::OPTIONS {
        return http::build_options_response(state.config.http.enable_cors);
    }

    let is_read = parts.method == Method::GET || parts.method == Method::HEAD;

    match match_route(parts.uri.path()) {
        Route::Upload if parts.method == Method::POST => {
            upload::handle_upload(parts, body, state).await
        }
        Route::Health if is_read => listing::serve_health(),
        Route::Listing(collection) if is_read => listing::serve_listing(state, collection).await,
        Route::Media {
            collection,
            name,
            delivery,
        } if is_read => {
            media::serve_media(
                state,
                collection,
                name,
                delivery,
                &parts.headers,
                parts.method == Method::HEAD,
            )
            .await
        }
        Route::Unknown => http::build_error_response(&crate::error::MediaError::NotFound),
        _ => {
            logger::log_warning(&format!(
                "Method not allowed: {} {}",
                parts.method,
                parts.uri.path()
            ));
            http::build_405_response()
        }
    }
}

fn log_access(
    parts: &Parts,
    response: &Response<ResponseBody>,
    peer_addr: SocketAddr,
    started: Instant,
    state: &AppState,
) {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    entry.range = header("range");
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

    logger::log_access(&entry, &state.config.logging.access_log_format);
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::{BodyExt, Full};
    use hyper::StatusCode;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    const BOUNDARY: &str = "----mediaserver-test-boundary";

    struct TestServer {
        root: TempDir,
        state: Arc<AppState>,
    }

    impl TestServer {
        fn new() -> Self {
            Self::with_config(|_| {})
        }

        fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
            let root = tempdir().unwrap();
            let mut cfg = Config::load_from("definitely-not-a-config-file").unwrap();
            cfg.storage.videos_dir = dir_string(&root.path().join("videos"));
            cfg.storage.downloads_dir = dir_string(&root.path().join("downloads"));
            cfg.logging.access_log = false;
            adjust(&mut cfg);

            let state = AppState::new(&cfg);
            state.storage.ensure_dirs().unwrap();
            Self {
                root,
                state: Arc::new(state),
            }
        }

        fn put(&self, collection: &str, name: &str, data: &[u8]) {
            std::fs::write(self.root.path().join(collection).join(name), data).unwrap();
        }

        async fn send(&self, req: Request<Full<Bytes>>) -> Response<ResponseBody> {
            handle_request(req, Arc::clone(&self.state), "127.0.0.1:40000".parse().unwrap())
                .await
                .unwrap()
        }

        async fn get(&self, path: &str, range: Option<&str>) -> Response<ResponseBody> {
            let mut builder = Request::get(path);
            if let Some(r) = range {
                builder = builder.header("Range", r);
            }
            self.send(builder.body(Full::new(Bytes::new())).unwrap()).await
        }
    }

    fn dir_string(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| u8::try_from(i % 256).unwrap()).collect()
    }

    async fn body_bytes(resp: Response<ResponseBody>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    async fn body_json(resp: Response<ResponseBody>) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(resp).await).unwrap()
    }

    fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\nholiday\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: video/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(body: Vec<u8>) -> Request<Full<Bytes>> {
        Request::post("/api/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    #[test]
    fn test_match_route() {
        assert_eq!(match_route("/api/health"), Route::Health);
        assert_eq!(
            match_route("/api/videos"),
            Route::Listing(Collection::Videos)
        );
        assert_eq!(
            match_route("/api/download/a.pdf"),
            Route::Media {
                collection: Collection::Downloads,
                name: "a.pdf",
                delivery: Delivery::Attachment
            }
        );
        assert_eq!(
            match_route("/videos/clip.mp4"),
            Route::Media {
                collection: Collection::Videos,
                name: "clip.mp4",
                delivery: Delivery::Inline
            }
        );
        assert_eq!(match_route("/api/stream/"), Route::Unknown);
        assert_eq!(match_route("/elsewhere"), Route::Unknown);
    }

    #[tokio::test]
    async fn test_open_range_scenario() {
        let server = TestServer::new();
        let data = sample(1000);
        server.put("videos", "clip.mp4", &data);

        let resp = server.get("/api/stream/clip.mp4", Some("bytes=500-")).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["Content-Range"], "bytes 500-999/1000");
        assert_eq!(resp.headers()["Content-Length"], "500");
        assert_eq!(resp.headers()["Accept-Ranges"], "bytes");
        assert_eq!(resp.headers()["Content-Type"], "video/mp4");
        assert_eq!(body_bytes(resp).await, &data[500..]);
    }

    #[tokio::test]
    async fn test_unsatisfiable_scenario() {
        let server = TestServer::new();
        server.put("videos", "clip.mp4", &sample(1000));

        let resp = server
            .get("/api/stream/clip.mp4", Some("bytes=2000-3000"))
            .await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()["Content-Range"], "bytes */1000");
        assert_eq!(resp.headers()["Accept-Ranges"], "bytes");
    }

    #[tokio::test]
    async fn test_full_content_scenario() {
        let server = TestServer::new();
        let data = sample(1000);
        server.put("videos", "clip.mp4", &data);

        let resp = server.get("/api/stream/clip.mp4", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Length"], "1000");
        assert!(resp.headers().get("Content-Range").is_none());
        assert_eq!(body_bytes(resp).await, &data[..]);
    }

    #[tokio::test]
    async fn test_missing_resource_scenario() {
        let server = TestServer::new();

        server.put("videos", ".upload-1700-42-0.part", b"growing");

        for path in [
            "/api/stream/.upload-1700-42-0.part",
            "/videos/.upload-1700-42-0.part",
            "/api/stream/nope.mp4",
            "/api/download/nope.zip",
            "/api/stream/..%2Fdownloads%2Fsecret.txt",
        ] {
            let resp = server.get(path, Some("bytes=0-")).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
            assert_eq!(resp.headers()["Accept-Ranges"], "bytes");
        }
    }

    #[tokio::test]
    async fn test_download_is_attachment() {
        let server = TestServer::new();
        server.put("downloads", "my report.pdf", b"%PDF-1.4");
        server.put("downloads", "data.unknownext", b"??");

        let resp = server
            .get("/api/download/my%20report.pdf", Some("bytes=0-3"))
            .await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["Content-Type"], "application/pdf");
        assert_eq!(
            resp.headers()["Content-Disposition"],
            "attachment; filename=\"my%20report.pdf\""
        );
        assert_eq!(body_bytes(resp).await, &b"%PDF"[..]);

        let resp = server.get("/api/download/data.unknownext", None).await;
        assert_eq!(resp.headers()["Content-Type"], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_stream_fallback_type_and_static_alias() {
        let server = TestServer::new();
        server.put("videos", "capture.bin", &sample(10));

        let resp = server.get("/api/stream/capture.bin", None).await;
        assert_eq!(resp.headers()["Content-Type"], "video/mp4");
        assert!(resp.headers().get("Content-Disposition").is_none());

        let resp = server.get("/videos/capture.bin", Some("bytes=-4")).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["Content-Range"], "bytes 6-9/10");
    }

    #[tokio::test]
    async fn test_head_request() {
        let server = TestServer::new();
        server.put("videos", "clip.webm", &sample(300));

        let req = Request::head("/api/stream/clip.webm")
            .header("Range", "bytes=100-199")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = server.send(req).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["Content-Length"], "100");
        assert_eq!(resp.headers()["Content-Type"], "video/webm");
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_resource() {
        let server = TestServer::new();
        server.put("downloads", "empty.txt", b"");

        let resp = server.get("/api/download/empty.txt", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["Content-Length"], "0");
        assert!(resp.headers().get("Content-Disposition").is_some());

        let resp = server.get("/api/download/empty.txt", Some("bytes=0-")).await;
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()["Content-Range"], "bytes */0");
    }

    #[tokio::test]
    async fn test_video_listing() {
        let server = TestServer::new();
        server.put("videos", "b clip.mp4", &sample(20));
        server.put("videos", "a.webm", &sample(10));
        server.put("videos", "notes.txt", b"skip");

        let resp = server.get("/api/videos", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        let items = json["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["name"], "a.webm");
        assert_eq!(items[0]["size_bytes"], 10);
        assert_eq!(items[1]["url"], "/api/stream/b%20clip.mp4");
        assert!(items[1]["created_at"].is_string());
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_listing_unavailable_directory_degrades() {
        let server = TestServer::new();
        std::fs::remove_dir(server.root.path().join("downloads")).unwrap();

        let resp = server.get("/api/files", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["items"].as_array().unwrap().len(), 0);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_upload_then_stream() {
        let server = TestServer::new();
        let data = sample(2048);

        let resp = server
            .send(upload_request(multipart_body("video", "my clip.webm", &data)))
            .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        let name = json["name"].as_str().unwrap().to_string();
        assert!(name.starts_with("my-clip-") && name.ends_with(".webm"));
        assert_eq!(json["size_bytes"], 2048);
        assert_eq!(json["original_name"], "my clip.webm");
        assert_eq!(json["content_type"], "video/webm");
        assert_eq!(json["url"], format!("/api/stream/{name}"));

        let listing = body_json(server.get("/api/videos", None).await).await;
        assert_eq!(listing["items"][0]["name"], name.as_str());

        let resp = server
            .get(&format!("/api/stream/{name}"), Some("bytes=1024-"))
            .await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_bytes(resp).await, &data[1024..]);
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let server = TestServer::new();
        let resp = server
            .send(upload_request(multipart_body("other", "x.webm", b"abc")))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "No video file received");
    }

    #[tokio::test]
    async fn test_upload_requires_multipart() {
        let server = TestServer::new();
        let req = Request::post("/api/upload")
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();
        assert_eq!(server.send(req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_size_limits() {
        let server = TestServer::with_config(|cfg| cfg.storage.max_upload_size = 512);
        let body = multipart_body("video", "big.webm", &sample(4096));

        // Declared too large
        let mut req = upload_request(body.clone());
        req.headers_mut()
            .insert("Content-Length", HeaderValue::from(body.len()));
        assert_eq!(
            server.send(req).await.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        // Undeclared, caught while streaming
        assert_eq!(
            server.send(upload_request(body)).await.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        let listing = body_json(server.get("/api/videos", None).await).await;
        assert_eq!(listing["items"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_methods_and_cors() {
        let server = TestServer::new();

        let req = Request::delete("/api/stream/clip.mp4")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = server.send(req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers()["Access-Control-Allow-Origin"], "*");

        let req = Request::get("/api/upload")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(
            server.send(req).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );

        let req = Request::options("/api/stream/clip.mp4")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = server.send(req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers()["Access-Control-Allow-Headers"],
            "Content-Type, Range"
        );

        let resp = server.get("/api/health", None).await;
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_access_log_enabled() {
        let server = TestServer::with_config(|cfg| cfg.logging.access_log = true);
        server.put("videos", "clip.mp4", &sample(100));

        let resp = server.get("/api/stream/clip.mp4", Some("bytes=0-9")).await;
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_bytes(resp).await.len(), 10);
    }

    #[tokio::test]
    async fn test_cors_disabled() {
        let server = TestServer::with_config(|cfg| cfg.http.enable_cors = false);
        let resp = server.get("/api/health", None).await;
        assert!(resp.headers().get("Access-Control-Allow-Origin").is_none());
    }
}
