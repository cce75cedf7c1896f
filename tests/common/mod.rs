#![allow(dead_code)]
// common/mod.rs - In-process mock storage endpoint for integration tests

use perforator::EnumConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

pub const SINGLE_OBJECT_LISTING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>assets</Name>
  <Contents>
    <Key>index.html</Key>
    <LastModified>2024-05-01T10:00:00.000Z</LastModified>
    <Size>512</Size>
  </Contents>
</ListBucketResult>"#;

pub const EMPTY_LISTING: &str =
    r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>empty</Name></ListBucketResult>"#;

pub const DIRECTORY_INDEX: &str = r#"<html><head><title>Index of /docs</title></head><body>
<h1>Index of /docs</h1><hr>
<a href="guide.pdf">guide.pdf</a>
<a href="notes.txt">notes.txt</a>
</body></html>"#;

pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub content_type: Option<&'static str>,
    pub location: Option<String>,
    pub delay: Duration,
}

impl MockReply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            content_type: None,
            location: None,
            delay: Duration::ZERO,
        }
    }

    /// 302 pointing at `location`
    pub fn redirect(location: &str) -> Self {
        Self {
            location: Some(location.to_string()),
            ..Self::status(302)
        }
    }

    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            content_type: Some("text/plain"),
            location: None,
            delay: Duration::ZERO,
        }
    }

    pub fn xml(body: &str) -> Self {
        Self {
            content_type: Some("application/xml"),
            ..Self::ok(body)
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            content_type: Some("text/html"),
            ..Self::ok(body)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Split a request target into path and query
pub fn split_url(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

/// Counts requests being served at the same time and remembers the peak
#[derive(Clone, Default)]
pub struct InFlightGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl InFlightGauge {
    /// Occupy one slot for `duration`; call from a request handler
    pub fn hold(&self, duration: Duration) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(duration);
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct MockStorage {
    server: Arc<Server>,
    pub base_url: String,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockStorage {
    /// Serve `handler(method, url)` on a random loopback port, one thread
    /// per request
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&Method, &str) -> MockReply + Send + Sync + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind mock server"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("mock server has an IP address")
            .port();

        let handler = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let listener = Arc::clone(&server);
        let log = Arc::clone(&requests);
        thread::spawn(move || {
            for request in listener.incoming_requests() {
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    let method = request.method().clone();
                    let url = request.url().to_string();
                    log.lock().unwrap().push((method.to_string(), url.clone()));

                    let reply = handler(&method, &url);
                    if !reply.delay.is_zero() {
                        thread::sleep(reply.delay);
                    }

                    // from_data carries no default Content-Type
                    let mut response = Response::from_data(reply.body.into_bytes())
                        .with_status_code(reply.status);
                    if let Some(content_type) = reply.content_type {
                        let header =
                            Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes())
                                .expect("valid header");
                        response.add_header(header);
                    }
                    if let Some(location) = &reply.location {
                        let header = Header::from_bytes(&b"Location"[..], location.as_bytes())
                            .expect("valid header");
                        response.add_header(header);
                    }
                    let _ = request.respond(response);
                });
            }
        });

        Self {
            server,
            base_url: format!("http://127.0.0.1:{}", port),
            requests,
        }
    }

    /// Requests seen so far as (METHOD, url)
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|(m, u)| m == method && u == url)
            .count()
    }

    /// Quiet config pointed at this server with fast failure settings
    pub fn config(&self) -> EnumConfig {
        let mut config = EnumConfig::with_base_url(&self.base_url);
        config.quiet = true;
        config.timeout_secs = 5;
        config.max_retries = 0;
        config.backoff_base_ms = 1;
        config.workers = 8;
        config
    }
}

impl Drop for MockStorage {
    fn drop(&mut self) {
        self.server.unblock();
    }
}
