//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: resolves the route, dispatches to
//! the PGN handlers, adds the shared headers and writes the access log.

use crate::config::AppState;
use crate::handler::{listing, reader, upload};
use crate::http;
use crate::logger::{self, AccessLogEntry};
use crate::routing::Endpoint;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{REFERER, USER_AGENT};
use hyper::{HeaderMap, Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    let access_entry = state
        .config
        .logging
        .access_log
        .then(|| access_log_entry(&req, peer_addr));

    let endpoint = state.routes.resolve(&method, uri.path());
    let mut response = match endpoint {
        Endpoint::Preflight => http::build_preflight_response(),
        Endpoint::ListFiles => listing::list_files(uri.query(), &state).await,
        Endpoint::ReadFile => {
            reader::read_file(uri.path(), method == Method::HEAD, &state).await
        }
        Endpoint::SaveFile => upload::save_file(req, &state).await,
        Endpoint::Health => http::build_health_response("ok"),
        Endpoint::NotFound => http::build_not_found_page(),
    };

    http::apply_common_headers(&mut response, &state.config.http);

    if let Some(mut entry) = access_entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

fn access_log_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header_string(req.headers(), REFERER.as_str());
    entry.user_agent = header_string(req.headers(), USER_AGENT.as_str());
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use http_body_util::BodyExt;
    use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
    use hyper::StatusCode;

    const BOUNDARY: &str = "----pgnboundary7MA4YWxk";

    struct TestServer {
        _dir: tempfile::TempDir,
        state: Arc<AppState>,
    }

    impl TestServer {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            for (name, data) in files {
                std::fs::write(dir.path().join(name), data).unwrap();
            }
            let mut config = Config::defaults().unwrap();
            config.storage.dir = dir.path().to_str().unwrap().to_string();
            config.logging.access_log = false;
            Self {
                _dir: dir,
                state: Arc::new(AppState::new(config)),
            }
        }

        async fn send(&self, req: Request<Full<Bytes>>) -> (StatusCode, HeaderMap, Bytes) {
            let peer: SocketAddr = "127.0.0.1:50000".parse().unwrap();
            let resp = handle_request(req, Arc::clone(&self.state), peer)
                .await
                .unwrap();
            let (parts, body) = resp.into_parts();
            let body = body.collect().await.unwrap().to_bytes();
            (parts.status, parts.headers, body)
        }

        async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
            self.send(request(Method::GET, uri)).await
        }

        async fn get_json(&self, uri: &str) -> serde_json::Value {
            let (status, _, body) = self.get(uri).await;
            assert_eq!(status, StatusCode::OK);
            serde_json::from_slice(&body).unwrap()
        }

        async fn upload(&self, file_name: &str, content: &str) -> (StatusCode, HeaderMap, Bytes) {
            self.send(multipart_request(file_name, content)).await
        }
    }

    fn request(method: Method, uri: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn multipart_request(file_name: &str, content: &str) -> Request<Full<Bytes>> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"comment\"\r\n\r\n\
             ignored\r\n\
             --{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method(Method::POST)
            .uri("/api/pgn-files-save")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }

    fn file_names(listing: &serde_json::Value) -> Vec<&str> {
        listing["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["fileName"].as_str().unwrap())
            .collect()
    }

    fn five_games() -> TestServer {
        TestServer::new(&[
            ("anand_carlsen_2013.pgn", "1. e4"),
            ("carlsen_caruana_2018.pgn", "1. e4"),
            ("carlsen_nepo_2021.pgn", "1. d4"),
            ("ding_nepo_2023.pgn", "1. c4"),
            ("magnus_hikaru_2021.pgn", "1. Nf3"),
            ("readme.txt", "not a game"),
        ])
    }

    #[tokio::test]
    async fn test_list_default_page() {
        let server = five_games();
        let listing = server.get_json("/api/pgn-files").await;
        assert_eq!(
            file_names(&listing),
            vec![
                "anand_carlsen_2013.pgn",
                "carlsen_caruana_2018.pgn",
                "carlsen_nepo_2021.pgn"
            ]
        );
        assert_eq!(listing["totalPages"], 2);
        assert_eq!(listing["currentPage"], 1);
        assert_eq!(listing["files"][0]["friendlyName"], "Anand vs Carlsen - 2013");
    }

    #[tokio::test]
    async fn test_list_second_page() {
        let server = five_games();
        let listing = server.get_json("/api/pgn-files?page=2&limit=3").await;
        assert_eq!(
            file_names(&listing),
            vec!["ding_nepo_2023.pgn", "magnus_hikaru_2021.pgn"]
        );
        assert_eq!(listing["totalPages"], 2);
        assert_eq!(listing["currentPage"], 2);
    }

    #[tokio::test]
    async fn test_list_search() {
        let server = five_games();
        let listing = server.get_json("/api/pgn-files?search=hikaru").await;
        assert_eq!(file_names(&listing), vec!["magnus_hikaru_2021.pgn"]);
        assert_eq!(listing["files"][0]["friendlyName"], "Magnus vs Hikaru - 2021");
        assert_eq!(listing["totalPages"], 1);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let server = TestServer::new(&[]);
        std::fs::remove_dir(server._dir.path()).unwrap();

        let (status, headers, body) = server.get("/api/pgn-files").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(&body[..], br#"{"error":"Failed to read directory"}"#);
    }

    #[tokio::test]
    async fn test_read_file() {
        let server = TestServer::new(&[("a_b_2020.pgn", "[Event \"Casual\"]\n\n1. e4 e5 *\n")]);

        let (status, headers, body) = server.get("/api/pgn-files/a_b_2020.pgn").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
        assert_eq!(&body[..], b"[Event \"Casual\"]\n\n1. e4 e5 *\n");
    }

    #[tokio::test]
    async fn test_read_head() {
        let server = TestServer::new(&[("a_b_2020.pgn", "1. e4 e5")]);

        let (status, headers, body) = server.send(request(Method::HEAD, "/api/pgn-files/a_b_2020.pgn")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["Content-Length"], "8");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let server = TestServer::new(&[]);
        let (status, headers, body) = server.get("/api/pgn-files/nobody_none_1900.pgn").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(&body[..], br#"{"error":"File not found"}"#);
    }

    #[tokio::test]
    async fn test_read_rejects_unsafe_names() {
        let server = TestServer::new(&[]);
        for uri in ["/api/pgn-files/", "/api/pgn-files/..", "/api/pgn-files/."] {
            let (status, _, body) = server.get(uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(&body[..], br#"{"error":"Invalid file name"}"#);
        }
    }

    #[tokio::test]
    async fn test_read_percent_encoded_name() {
        let server = TestServer::new(&[("a b_c_2020.pgn", "1. c4")]);

        let listing = server.get_json("/api/pgn-files").await;
        assert_eq!(file_names(&listing), vec!["a b_c_2020.pgn"]);

        let (status, _, body) = server.get("/api/pgn-files/a%20b_c_2020.pgn").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"1. c4");

        let (status, _, body) = server.get("/api/pgn-files/..%2Fa%20b_c_2020.pgn").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], br#"{"error":"Invalid file name"}"#);

        let (status, _, _) = server.get("/api/pgn-files/%FF.pgn").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_read_uses_last_segment_only() {
        let server = TestServer::new(&[("a_b_2020.pgn", "1. e4")]);
        let (status, _, body) = server.get("/api/pgn-files/../../a_b_2020.pgn").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"1. e4");
    }

    #[tokio::test]
    async fn test_upload_then_list_and_read() {
        let server = TestServer::new(&[]);

        let (status, _, body) = server.upload("a_b_2020.pgn", "1. e4 e5 2. Nf3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], br#"{"message":"File uploaded successfully"}"#);

        let listing = server.get_json("/api/pgn-files").await;
        assert_eq!(file_names(&listing), vec!["a_b_2020.pgn"]);
        assert_eq!(listing["files"][0]["friendlyName"], "A vs B - 2020");

        let (_, _, body) = server.get("/api/pgn-files/a_b_2020.pgn").await;
        assert_eq!(&body[..], b"1. e4 e5 2. Nf3");
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let server = TestServer::new(&[("a_b_2020.pgn", "old moves")]);

        let (status, _, _) = server.upload("a_b_2020.pgn", "new moves").await;
        assert_eq!(status, StatusCode::OK);

        let (_, _, body) = server.get("/api/pgn-files/a_b_2020.pgn").await;
        assert_eq!(&body[..], b"new moves");

        let listing = server.get_json("/api/pgn-files").await;
        assert_eq!(file_names(&listing), vec!["a_b_2020.pgn"]);
    }

    #[tokio::test]
    async fn test_upload_without_recognized_extension_is_not_listed() {
        let server = TestServer::new(&[]);
        let (status, _, _) = server.upload("notes.txt", "hello").await;
        assert_eq!(status, StatusCode::OK);

        let listing = server.get_json("/api/pgn-files").await;
        assert!(file_names(&listing).is_empty());
    }

    #[tokio::test]
    async fn test_upload_malformed_body() {
        let server = TestServer::new(&[]);

        let no_boundary = Request::builder()
            .method(Method::POST)
            .uri("/api/pgn-files-save")
            .header(CONTENT_TYPE, "text/plain")
            .body(Full::new(Bytes::from("1. e4")))
            .unwrap();
        let (status, headers, _) = server.send(no_boundary).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let truncated = Request::builder()
            .method(Method::POST)
            .uri("/api/pgn-files-save")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Full::new(Bytes::from(format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a_b_2020.pgn\"\r\n\r\n1. e4"
            ))))
            .unwrap();
        let (status, _, body) = server.send(truncated).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].is_string());

        // Nothing was stored, not even a temporary file
        assert_eq!(std::fs::read_dir(server._dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_upload_unsafe_file_name() {
        let server = TestServer::new(&[]);
        let (status, _, body) = server.upload("..", "1. e4").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], br#"{"error":"Invalid file name"}"#);
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let mut server = TestServer::new(&[]);
        let mut config = server.state.config.clone();
        config.http.max_body_size = 16;
        server.state = Arc::new(AppState::new(config));

        let (status, _, _) = server.upload("a_b_2020.pgn", "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6").await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_options_preflight_any_path() {
        let server = TestServer::new(&[]);
        for uri in ["/api/pgn-files", "/api/pgn-files-save", "/whatever"] {
            let (status, headers, body) = server.send(request(Method::OPTIONS, uri)).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
            assert!(body.is_empty());
            assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            assert_eq!(headers["Access-Control-Allow-Headers"], "Content-Type");
        }
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let server = TestServer::new(&[]);
        for (method, uri) in [
            (Method::GET, "/"),
            (Method::GET, "/api/unknown"),
            (Method::POST, "/api/pgn-files"),
        ] {
            let (status, headers, body) = server.send(request(method, uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(headers[CONTENT_TYPE], "text/html");
            assert_eq!(headers["my-own-header"], "hello-world");
            assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            assert_eq!(&body[..], b"<h1>Page not found!</h1>");
        }
    }

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::new(&[]);
        let (status, _, body) = server.get("/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"ok");
    }

    #[test]
    fn test_access_log_entry() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/pgn-files?search=nepo")
            .header(USER_AGENT, "curl/8.0")
            .body(())
            .unwrap();
        let entry = access_log_entry(&req, "10.0.0.7:41000".parse().unwrap());
        assert_eq!(entry.remote_addr, "10.0.0.7");
        assert_eq!(entry.path, "/api/pgn-files");
        assert_eq!(entry.query.as_deref(), Some("search=nepo"));
        assert_eq!(entry.http_version, "1.1");
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(entry.referer, None);
    }
}
