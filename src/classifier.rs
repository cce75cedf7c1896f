// classifier.rs - Endpoint Response Classification
// Purpose: Turn a HEAD probe (plus an optional follow-up GET) into an
//          existence/accessibility record for one endpoint variant

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::http_client::ProbeClient;

/// Characters of body kept on an endpoint record
pub const SNIPPET_LIMIT: usize = 500;

/// Outcome of probing one URL variant of a candidate bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Status present and not 404
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EndpointResult {
    /// Record for a request that never produced a usable response
    pub fn failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            http_status: None,
            headers: BTreeMap::new(),
            exists: false,
            content_snippet: None,
            content_length: None,
            error: Some(error),
        }
    }

    /// Exists and carries no error
    pub fn is_positive(&self) -> bool {
        self.error.is_none() && self.exists && self.http_status.is_some()
    }
}

/// 403 means "exists but forbidden": no point downloading the body
pub fn needs_body_fetch(status: u16) -> bool {
    status != 404 && status != 403
}

/// Probe `url`. Failures are folded into the returned record.
pub async fn probe_endpoint(client: &ProbeClient, url: &str) -> EndpointResult {
    match classify(client, url).await {
        Ok(result) => result,
        Err(e) => EndpointResult::failed(url, format!("{:#}", e)),
    }
}

async fn classify(client: &ProbeClient, url: &str) -> Result<EndpointResult> {
    let head = client.head(url).await?;

    let mut result = EndpointResult {
        url: url.to_string(),
        http_status: Some(head.status),
        headers: head.headers,
        exists: head.status != 404,
        content_snippet: None,
        content_length: None,
        error: None,
    };

    if needs_body_fetch(head.status) {
        let get = client.get(url).await?;
        result.content_snippet = Some(truncate_chars(&get.text(), SNIPPET_LIMIT));
        result.content_length = Some(get.body.len());
    }

    Ok(result)
}

/// First `max` characters of `text`, never splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_fetch_only_when_promising() {
        assert!(needs_body_fetch(200));
        assert!(needs_body_fetch(301));
        assert!(needs_body_fetch(500));
        assert!(!needs_body_fetch(403));
        assert!(!needs_body_fetch(404));
    }

    #[test]
    fn test_failed_record_is_never_positive() {
        let result = EndpointResult::failed("http://x/a", "timed out".to_string());
        assert!(!result.exists);
        assert!(!result.is_positive());
        assert_eq!(result.http_status, None);
        assert_eq!(result.error.as_deref(), Some("timed out"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars(&"x".repeat(900), SNIPPET_LIMIT).len(), SNIPPET_LIMIT);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_error_record() {
        let config = crate::config::EnumConfig {
            timeout_secs: 2,
            max_retries: 0,
            ..crate::config::EnumConfig::default()
        };
        let client = ProbeClient::new(&config).unwrap();

        // Grab a free port and release it so nothing is listening there
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/bucket", port);

        let result = probe_endpoint(&client, &url).await;
        assert!(result.error.is_some());
        assert!(!result.is_positive());
    }
}
