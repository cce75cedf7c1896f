// http_client.rs - Shared HTTP Client with Bounded Retry
// Purpose: Issue HEAD/GET probes with per-request timeout, a pooled connection
//          set, and exponential backoff on transient failures

use anyhow::{bail, Context, Result};
use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Response};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::EnumConfig;

/// Statuses that trigger another attempt
pub const RETRY_STATUSES: &[u16] = &[429, 500, 502, 503, 504];

/// Upper bound for a server supplied Retry-After delay
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// A fully received response
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    /// Empty for HEAD requests
    pub body: Vec<u8>,
}

impl ProbeResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Cheap to clone; clones share the connection pools
#[derive(Clone)]
pub struct ProbeClient {
    /// Follows redirects; used for every method but HEAD
    client: Client,
    /// Never follows redirects, so a HEAD probe reports the raw 3xx status
    head_client: Client,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
}

impl ProbeClient {
    pub fn new(config: &EnumConfig) -> Result<Self> {
        let client = build_client(config, Policy::limited(10))?;
        let head_client = build_client(config, Policy::none())?;

        Ok(Self {
            client,
            head_client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        })
    }

    pub async fn head(&self, url: &str) -> Result<ProbeResponse> {
        self.request(Method::HEAD, url).await
    }

    pub async fn get(&self, url: &str) -> Result<ProbeResponse> {
        self.request(Method::GET, url).await
    }

    /// GET that stops reading the body once `max_bytes` have arrived. The
    /// rest of the payload is never downloaded.
    pub async fn get_prefix(&self, url: &str, max_bytes: usize) -> Result<ProbeResponse> {
        self.execute(Method::GET, url, Some(max_bytes)).await
    }

    /// Send `method` to `url`, retrying idempotent methods on transient
    /// statuses and connection failures. Never panics; every failure mode
    /// comes back as `Err`.
    pub async fn request(&self, method: Method, url: &str) -> Result<ProbeResponse> {
        self.execute(method, url, None).await
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body_limit: Option<usize>,
    ) -> Result<ProbeResponse> {
        let retryable = is_idempotent(&method);
        let mut attempt: u32 = 0;

        loop {
            match self.send_once(method.clone(), url, body_limit).await {
                Ok(response) => {
                    if !retryable || !RETRY_STATUSES.contains(&response.status) {
                        return Ok(response);
                    }
                    if attempt >= self.max_retries {
                        bail!(
                            "{} {} failed: too many retries (last status {})",
                            method,
                            url,
                            response.status
                        );
                    }
                    let delay = retry_after(&response).unwrap_or_else(|| self.backoff_delay(attempt));
                    attempt += 1;
                    sleep(delay).await;
                }
                Err(e) => {
                    let transient = e.is_timeout() || e.is_connect();
                    if !retryable || !transient || attempt >= self.max_retries {
                        return Err(e).with_context(|| format!("{} {} failed", method, url));
                    }
                    let delay = self.backoff_delay(attempt);
                    attempt += 1;
                    sleep(delay).await;
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body_limit: Option<usize>,
    ) -> reqwest::Result<ProbeResponse> {
        let is_head = method == Method::HEAD;
        let client = if is_head { &self.head_client } else { &self.client };
        let response = client
            .request(method, url)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = if is_head {
            Vec::new()
        } else {
            read_body(response, body_limit).await?
        };

        Ok(ProbeResponse { status, headers, body })
    }

    /// base * 2^attempt plus up to 25% jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_base.as_millis() as u64;
        let exp = base.saturating_mul(1u64 << attempt.min(16));
        let jitter = if exp >= 4 {
            rand::thread_rng().gen_range(0..=exp / 4)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }
}

fn build_client(config: &EnumConfig, redirect: Policy) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .pool_max_idle_per_host(config.workers.max(1))
        .redirect(redirect)
        .build()
        .context("Failed to create HTTP client")
}

async fn read_body(mut response: Response, limit: Option<usize>) -> reqwest::Result<Vec<u8>> {
    let Some(limit) = limit else {
        return Ok(response.bytes().await?.to_vec());
    };

    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await? {
            Some(chunk) => body.extend_from_slice(&chunk),
            None => break,
        }
    }
    body.truncate(limit);
    Ok(body)
}

fn is_idempotent(method: &Method) -> bool {
    *method == Method::HEAD || *method == Method::GET || *method == Method::OPTIONS
}

fn retry_after(response: &ProbeResponse) -> Option<Duration> {
    if response.status != 429 && response.status != 503 {
        return None;
    }
    response
        .header(RETRY_AFTER.as_str())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(status: u16, headers: &[(&str, &str)]) -> ProbeResponse {
        ProbeResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn test_idempotent_methods() {
        assert!(is_idempotent(&Method::HEAD));
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::OPTIONS));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PUT));
    }

    #[test]
    fn test_retry_after_is_capped() {
        let resp = response_with(429, &[("retry-after", "120")]);
        assert_eq!(retry_after(&resp), Some(Duration::from_secs(MAX_RETRY_AFTER_SECS)));

        let resp = response_with(503, &[("retry-after", "2")]);
        assert_eq!(retry_after(&resp), Some(Duration::from_secs(2)));

        // Only honored on throttling statuses
        let resp = response_with(500, &[("retry-after", "2")]);
        assert_eq!(retry_after(&resp), None);
    }

    #[test]
    fn test_backoff_grows() {
        let config = EnumConfig {
            backoff_base_ms: 100,
            ..EnumConfig::default()
        };
        let client = ProbeClient::new(&config).unwrap();

        let first = client.backoff_delay(0);
        let third = client.backoff_delay(2);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(500));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = response_with(200, &[("content-type", "text/plain")]);
        assert_eq!(resp.header("Content-Type"), Some("text/plain"));
        assert_eq!(resp.header("content-length"), None);
    }
}
