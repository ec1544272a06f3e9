//! In-process mock of the archive service for integration tests
//!
//! Serves the validate, listing, generate and playable endpoints plus the media files the
//! playable URIs point at. Every API request has its signature recomputed with the shared
//! test secret; requests that do not verify are answered with 401 and counted.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use reqwest::Method;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use proxy_fetcher::app::client::{ArchiveClient, ClientConfig, RequestSigner, SignatureScheme};
use proxy_fetcher::app::content_id::ContentId;
use proxy_fetcher::app::models::{file_name, ProxyType};

pub const SECRET: &str = "integration-secret";
pub const COLLECTION: &str = "media-bucket";

/// One request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Request target exactly as sent, path and query
    pub target: String,
    /// Percent-decoded path segments
    pub segments: Vec<String>,
    pub route: &'static str,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    /// Decoded content id the request refers to, if any
    pub fn content_id(&self) -> Option<&str> {
        let index = match self.route {
            "validate" => 2,
            "generate" => 3,
            "all" | "playable" => 2,
            "media" => 1,
            _ => return None,
        };
        self.segments.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
struct MockProxy {
    proxy_type: ProxyType,
    bucket_path: String,
}

#[derive(Default)]
struct ArchiveState {
    assets: HashMap<String, Vec<MockProxy>>,
    broken_listings: HashSet<String>,
    failing_verify: HashSet<String>,
    failing_media: HashSet<(String, ProxyType)>,
    media_delay: Duration,
    requests: Vec<RecordedRequest>,
    rejected_signatures: usize,
}

/// Running mock archive
pub struct MockArchive {
    addr: SocketAddr,
    scheme: SignatureScheme,
    state: Arc<Mutex<ArchiveState>>,
}

impl MockArchive {
    /// Start serving on an ephemeral local port
    pub async fn start(scheme: SignatureScheme) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ArchiveState::default()));
        let base = Url::parse(&format!("http://{addr}/")).unwrap();

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = shared.clone();
                let base = base.clone();
                tokio::spawn(async move {
                    handle_connection(stream, state, scheme, base).await;
                });
            }
        });

        Self {
            addr,
            scheme,
            state,
        }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).unwrap()
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url(), SECRET)
            .with_scheme(self.scheme)
            .with_rate_limit(1000)
    }

    pub fn client(&self) -> Arc<ArchiveClient> {
        Arc::new(ArchiveClient::new(self.client_config()).unwrap())
    }

    /// Register a source file with the given proxies; returns its content id
    pub fn add_asset(&self, path: &str, proxies: &[ProxyType]) -> ContentId {
        let id = ContentId::new(COLLECTION, path);
        let name = file_name(path);
        let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);

        let entries = proxies
            .iter()
            .map(|proxy_type| MockProxy {
                proxy_type: *proxy_type,
                bucket_path: format!(
                    "proxies/{}{}.{}",
                    stem,
                    proxy_type.file_suffix(),
                    proxy_type.default_extension()
                ),
            })
            .collect();

        self.state
            .lock()
            .unwrap()
            .assets
            .insert(id.as_str().to_string(), entries);
        id
    }

    /// List a proxy for an existing asset with no stored file yet
    pub fn add_pending_proxy(&self, path: &str, proxy_type: ProxyType) {
        let id = ContentId::new(COLLECTION, path);
        self.state
            .lock()
            .unwrap()
            .assets
            .entry(id.as_str().to_string())
            .or_default()
            .push(MockProxy {
                proxy_type,
                bucket_path: String::new(),
            });
    }

    /// Listing for this path returns a body that is not valid JSON
    pub fn break_listing(&self, path: &str) {
        let id = ContentId::new(COLLECTION, path);
        self.state
            .lock()
            .unwrap()
            .broken_listings
            .insert(id.as_str().to_string());
    }

    /// Validate for this path answers 500
    pub fn fail_verify(&self, path: &str) {
        let id = ContentId::new(COLLECTION, path);
        self.state
            .lock()
            .unwrap()
            .failing_verify
            .insert(id.as_str().to_string());
    }

    /// Media download of this proxy answers 500
    pub fn fail_download(&self, path: &str, proxy_type: ProxyType) {
        let id = ContentId::new(COLLECTION, path);
        self.state
            .lock()
            .unwrap()
            .failing_media
            .insert((id.as_str().to_string(), proxy_type));
    }

    /// Delay every media response
    pub fn set_media_delay(&self, delay: Duration) {
        self.state.lock().unwrap().media_delay = delay;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of requests that hit a route
    pub fn count(&self, route: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.route == route)
            .count()
    }

    pub fn rejected_signatures(&self) -> usize {
        self.state.lock().unwrap().rejected_signatures
    }

    /// Expected body of a downloaded proxy
    pub fn media_body(id: &ContentId, proxy_type: ProxyType) -> String {
        format!("{} proxy of {}", proxy_type.as_str(), id.as_str())
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<Mutex<ArchiveState>>,
    scheme: SignatureScheme,
    base: Url,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }

    let (status, payload) = respond(&state, scheme, &base, method, target, headers, &body).await;
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        payload.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.write_all(payload.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn respond(
    state: &Arc<Mutex<ArchiveState>>,
    scheme: SignatureScheme,
    base: &Url,
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: &[u8],
) -> (u16, String) {
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.clone(), None),
    };
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().to_string())
        .collect();
    let route = route_of(&method, &segments);

    let signed_ok =
        route == "media" || signature_valid(scheme, base, &method, &target, &headers, body);

    let media_delay = {
        let mut state = state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            target: target.clone(),
            segments: segments.clone(),
            route,
            headers,
        });
        if !signed_ok {
            state.rejected_signatures += 1;
        }
        state.media_delay
    };

    if !signed_ok {
        return (401, r#"{"status":"error","detail":"bad signature"}"#.to_string());
    }

    if route == "media" && !media_delay.is_zero() {
        tokio::time::sleep(media_delay).await;
    }

    let state = state.lock().unwrap();
    let id = |index: usize| segments.get(index).cloned().unwrap_or_default();

    match route {
        "validate" => {
            let id = id(2);
            if state.failing_verify.contains(&id) {
                (500, r#"{"status":"error"}"#.to_string())
            } else if state.assets.contains_key(&id) {
                (200, r#"{"status":"ok"}"#.to_string())
            } else {
                (404, r#"{"status":"notfound"}"#.to_string())
            }
        }
        "all" => {
            let id = id(2);
            if state.broken_listings.contains(&id) {
                return (200, "<html>not json</html>".to_string());
            }
            let Some(proxies) = state.assets.get(&id) else {
                return (404, r#"{"status":"notfound"}"#.to_string());
            };
            let entries: Vec<_> = proxies
                .iter()
                .enumerate()
                .map(|(n, p)| {
                    json!({
                        "fileId": id,
                        "proxyId": format!("proxy-{n}"),
                        "proxyType": p.proxy_type.as_str(),
                        "bucketName": "proxy-bucket",
                        "bucketPath": p.bucket_path,
                        "region": "eu-west-1",
                    })
                })
                .collect();
            let body = json!({ "entries": entries, "entryCount": entries.len() });
            (200, body.to_string())
        }
        "generate" => (200, r#"{"status":"ok"}"#.to_string()),
        "playable" => {
            let id = id(2);
            let requested = query
                .as_deref()
                .and_then(|q| q.strip_prefix("proxyType="))
                .map(str::to_string)
                .unwrap_or_default();
            let known = state
                .assets
                .get(&id)
                .map(|proxies| proxies.iter().any(|p| p.proxy_type.as_str() == requested))
                .unwrap_or(false);
            if !known {
                return (404, r#"{"status":"notfound"}"#.to_string());
            }
            let mut uri = base.clone();
            uri.path_segments_mut()
                .unwrap()
                .clear()
                .push("media")
                .push(&id)
                .push(&requested);
            (200, json!({ "uri": uri.as_str() }).to_string())
        }
        "media" => {
            let id = id(1);
            let Ok(proxy_type) = id_type(&segments) else {
                return (404, String::new());
            };
            if state.failing_media.contains(&(id.clone(), proxy_type)) {
                return (500, "boom".to_string());
            }
            (
                200,
                MockArchive::media_body(&ContentId::from_encoded(id), proxy_type),
            )
        }
        _ => (404, r#"{"status":"notfound"}"#.to_string()),
    }
}

fn id_type(segments: &[String]) -> Result<ProxyType, ()> {
    let raw = segments.get(2).ok_or(())?;
    raw.parse::<ProxyType>().map_err(|_| ())
}

fn route_of(method: &str, segments: &[String]) -> &'static str {
    let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
    match (method, parts.as_slice()) {
        ("GET", ["api", "validate", _]) => "validate",
        ("POST", ["api", "proxy", "generate", _, _]) => "generate",
        ("GET", ["api", "proxy", _, "all"]) => "all",
        ("GET", ["api", "proxy", _, "playable"]) => "playable",
        ("GET", ["media", _, _]) => "media",
        _ => "unknown",
    }
}

fn signature_valid(
    scheme: SignatureScheme,
    base: &Url,
    method: &str,
    target: &str,
    headers: &HashMap<String, String>,
    body: &[u8],
) -> bool {
    let (date_header, token_header) = match scheme {
        SignatureScheme::PathOnly => ("x-gu-tools-hmac-date", "x-gu-tools-hmac-token"),
        SignatureScheme::ContentAware => ("date", "authorization"),
    };

    let Some(date) = headers.get(date_header) else {
        return false;
    };
    let Ok(timestamp) = DateTime::parse_from_rfc2822(date) else {
        return false;
    };
    let (Ok(url), Ok(method)) = (base.join(target), Method::from_bytes(method.as_bytes())) else {
        return false;
    };

    let signer = RequestSigner::new(SECRET, scheme).unwrap();
    let Ok(expected) = signer.sign_at(&method, &url, body, timestamp.with_timezone(&Utc)) else {
        return false;
    };

    let token_ok =
        headers.get(token_header).map(String::as_str) == Some(expected.authorization());
    let checksum_ok = match scheme {
        SignatureScheme::PathOnly => true,
        SignatureScheme::ContentAware => {
            headers.get("x-sha384-checksum").map(String::as_str) == expected.checksum()
        }
    };
    token_ok && checksum_ok
}
