// enumerator.rs - Object Enumeration for a Confirmed Bucket
// Purpose: Try structured listing first, then brute-force a fixed object
//          wordlist in parallel, then check common directory prefixes

use anyhow::Result;
use colored::*;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::classifier::truncate_chars;
use crate::config::EnumConfig;
use crate::http_client::ProbeClient;
use crate::listing::{parse_listing, ObjectDescriptor, UNKNOWN};
use crate::progress::ProgressTracker;
use crate::sensitivity::{is_sensitive, CONTENT_SCAN_LIMIT};

pub const STAGE_NAME: &str = "Object brute force";

/// Characters of body kept on an accessible object
pub const PREVIEW_LIMIT: usize = 200;

/// Bytes of an accessible object downloaded for the preview and keyword
/// scan. Four bytes per character covers the window for any UTF-8 text.
pub const BODY_READ_LIMIT: usize =
    4 * if CONTENT_SCAN_LIMIT > PREVIEW_LIMIT { CONTENT_SCAN_LIMIT } else { PREVIEW_LIMIT };

/// Listed keys echoed to the console after a successful listing
const LISTING_PREVIEW_COUNT: usize = 10;

/// Outcome of the HEAD (+GET) check of one candidate object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectAccessResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub size: String,
    pub content_type: String,
    /// Status was exactly 200
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_sensitive: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ObjectAccessResult {
    pub fn failed(url: &str, error: String) -> Self {
        Self {
            url: url.to_string(),
            status: None,
            size: UNKNOWN.to_string(),
            content_type: UNKNOWN.to_string(),
            accessible: false,
            content_preview: None,
            is_sensitive: None,
            error: Some(error),
        }
    }
}

/// An entry of a bucket's findings: a listed key or a brute-force hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FoundObject {
    Listed(ObjectDescriptor),
    Accessed(ObjectAccessResult),
}

impl FoundObject {
    /// Key for listed objects, URL for brute-force hits
    pub fn identifier(&self) -> &str {
        match self {
            FoundObject::Listed(descriptor) => &descriptor.key,
            FoundObject::Accessed(result) => &result.url,
        }
    }

    pub fn is_sensitive(&self) -> bool {
        match self {
            FoundObject::Listed(_) => false,
            FoundObject::Accessed(result) => result.is_sensitive.unwrap_or(false),
        }
    }
}

/// Listing URL variants for `path` (a bucket, or bucket/directory)
pub fn listing_endpoints(base_url: &str, path: &str) -> [String; 4] {
    let base = format!("{}/{}", base_url, path);
    [
        format!("{}?list-type=2&max-keys=1000", base),
        format!("{}?max-keys=1000", base),
        format!("{}?delimiter=/", base),
        format!("{}/", base),
    ]
}

pub struct ObjectEnumerator {
    client: ProbeClient,
    base_url: String,
    workers: usize,
    common_objects: Vec<String>,
    common_directories: Vec<String>,
    tracker: ProgressTracker,
}

impl ObjectEnumerator {
    pub fn new(client: ProbeClient, config: &EnumConfig, tracker: ProgressTracker) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            workers: config.workers.max(1),
            common_objects: config.common_objects.clone(),
            common_directories: config.common_directories.clone(),
            tracker,
        }
    }

    /// Listing-derived descriptors first, then accessible brute-force hits.
    /// Directory hits are only reported through the tracker.
    pub async fn enumerate(&self, bucket_name: &str) -> Vec<FoundObject> {
        self.tracker
            .print(format!("\n[*] Enumerating objects in bucket: {}", bucket_name).cyan().bold());

        self.tracker.info("Attempting to list bucket contents...");
        let listed = self.list_bucket_contents(bucket_name).await;
        if listed.is_empty() {
            self.tracker
                .print("[-] No objects found via listing, trying brute-force...".to_string().red());
        } else {
            self.tracker.listing_found(bucket_name, listed.len());
            for object in listed.iter().take(LISTING_PREVIEW_COUNT) {
                self.tracker
                    .print(format!("    {} ({} bytes)", object.key, object.size).normal());
            }
            if listed.len() > LISTING_PREVIEW_COUNT {
                self.tracker.print(
                    format!("    ... and {} more objects", listed.len() - LISTING_PREVIEW_COUNT)
                        .normal(),
                );
            }
        }

        let accessed = self.brute_force_objects(bucket_name).await;

        self.check_directories(bucket_name).await;

        listed
            .into_iter()
            .map(FoundObject::Listed)
            .chain(accessed.into_iter().map(FoundObject::Accessed))
            .collect()
    }

    /// Try each listing variant in order; the first 200 ends the search,
    /// whatever its body parses to.
    pub async fn list_bucket_contents(&self, path: &str) -> Vec<ObjectDescriptor> {
        for endpoint in listing_endpoints(&self.base_url, path) {
            match self.client.get(&endpoint).await {
                Ok(response) if response.status == 200 => {
                    return parse_listing(&response.text());
                }
                Ok(_) | Err(_) => continue,
            }
        }
        Vec::new()
    }

    /// Accessible hits from the object wordlist, in completion order
    pub async fn brute_force_objects(&self, bucket_name: &str) -> Vec<ObjectAccessResult> {
        self.tracker.stage_started(STAGE_NAME, self.common_objects.len());

        let mut stream = stream::iter(self.common_objects.iter())
            .map(|object_name| async move { self.check_object_access(bucket_name, object_name).await })
            .buffer_unordered(self.workers);

        let mut found = Vec::new();
        while let Some(result) = stream.next().await {
            self.tracker.tick();
            if result.accessible {
                self.tracker.object_found(
                    &result.url,
                    &result.size,
                    result.is_sensitive.unwrap_or(false),
                    result.content_preview.as_deref(),
                );
                found.push(result);
            }
        }

        self.tracker.stage_completed(STAGE_NAME, found.len());
        found
    }

    pub async fn check_object_access(&self, bucket_name: &str, object_name: &str) -> ObjectAccessResult {
        let url = format!("{}/{}/{}", self.base_url, bucket_name, object_name);
        match self.fetch_object(&url, object_name).await {
            Ok(result) => result,
            Err(e) => ObjectAccessResult::failed(&url, format!("{:#}", e)),
        }
    }

    async fn fetch_object(&self, url: &str, object_name: &str) -> Result<ObjectAccessResult> {
        let head = self.client.head(url).await?;

        let mut result = ObjectAccessResult {
            url: url.to_string(),
            status: Some(head.status),
            size: head.header("content-length").unwrap_or(UNKNOWN).to_string(),
            content_type: head.header("content-type").unwrap_or(UNKNOWN).to_string(),
            accessible: head.status == 200,
            content_preview: None,
            is_sensitive: None,
            error: None,
        };

        if result.accessible {
            let body = self.client.get_prefix(url, BODY_READ_LIMIT).await?.text();
            result.content_preview = Some(truncate_chars(&body, PREVIEW_LIMIT));
            result.is_sensitive = Some(is_sensitive(object_name, &body));
        }

        Ok(result)
    }

    /// Sequential listing attempts under each common directory. Returns the
    /// non-empty ones with their object counts.
    pub async fn check_directories(&self, bucket_name: &str) -> Vec<(String, usize)> {
        self.tracker.info(&format!(
            "Checking {} common directories...",
            self.common_directories.len()
        ));

        let mut hits = Vec::new();
        for directory in &self.common_directories {
            let path = format!("{}/{}", bucket_name, directory);
            let objects = self.list_bucket_contents(&path).await;
            if !objects.is_empty() {
                self.tracker.directory_found(bucket_name, directory, objects.len());
                hits.push((directory.clone(), objects.len()));
            }
        }
        hits
    }
}
