// prober.rs - Bucket Existence Prober
// Purpose: Fan out existence checks over candidate bucket names under a
//          worker limit and pick the most informative verdict per name

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use crate::classifier::{probe_endpoint, EndpointResult};
use crate::config::EnumConfig;
use crate::http_client::ProbeClient;
use crate::progress::ProgressTracker;

pub const STAGE_NAME: &str = "Bucket probing";

/// The four URL variants checked for one candidate name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub candidate_name: String,
    pub endpoints: [String; 4],
}

impl ProbeTarget {
    pub fn new(base_url: &str, candidate_name: &str) -> Self {
        let base = format!("{}/{}", base_url, candidate_name);
        Self {
            candidate_name: candidate_name.to_string(),
            endpoints: [
                base.clone(),
                format!("{}/", base),
                format!("{}?list-type=2&max-keys=1", base),
                format!("{}?max-keys=1", base),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketVerdict {
    pub bucket_name: String,
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_result: Option<EndpointResult>,
    pub all_results: Vec<EndpointResult>,
}

impl BucketVerdict {
    pub fn from_results(bucket_name: &str, all_results: Vec<EndpointResult>) -> Self {
        let best_index = select_best(&all_results);
        Self {
            bucket_name: bucket_name.to_string(),
            accessible: best_index.is_some(),
            best_result: best_index.map(|i| all_results[i].clone()),
            all_results,
        }
    }

    /// Status of the best endpoint, if any
    pub fn status(&self) -> Option<u16> {
        self.best_result.as_ref().and_then(|r| r.http_status)
    }
}

/// Index of the best positive result. The first exact 200 wins outright;
/// before one appears the lowest status seen so far is kept, earlier
/// results winning ties. `None` means no result was positive.
pub fn select_best(results: &[EndpointResult]) -> Option<usize> {
    let mut best: Option<(usize, u16)> = None;

    for (index, result) in results.iter().enumerate() {
        if !result.is_positive() {
            continue;
        }
        let Some(status) = result.http_status else {
            continue;
        };
        if status == 200 {
            return Some(index);
        }
        match best {
            Some((_, best_status)) if best_status <= status => {}
            _ => best = Some((index, status)),
        }
    }

    best.map(|(index, _)| index)
}

pub struct BucketProber {
    client: ProbeClient,
    base_url: String,
    workers: usize,
    tracker: ProgressTracker,
}

impl BucketProber {
    pub fn new(client: ProbeClient, config: &EnumConfig, tracker: ProgressTracker) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            workers: config.workers.max(1),
            tracker,
        }
    }

    /// Probe the four endpoint variants of one name, one after another
    pub async fn check_bucket_existence(&self, bucket_name: &str) -> BucketVerdict {
        let target = ProbeTarget::new(&self.base_url, bucket_name);
        let mut results = Vec::with_capacity(target.endpoints.len());

        for endpoint in &target.endpoints {
            results.push(probe_endpoint(&self.client, endpoint).await);
        }

        BucketVerdict::from_results(&target.candidate_name, results)
    }

    /// One verdict per input name, in completion order
    pub async fn probe(&self, names: &[String]) -> Vec<BucketVerdict> {
        self.tracker.stage_started(STAGE_NAME, names.len());

        let mut stream = stream::iter(names.iter().cloned())
            .map(|name| async move { self.check_bucket_existence(&name).await })
            .buffer_unordered(self.workers);

        let mut verdicts = Vec::with_capacity(names.len());
        while let Some(verdict) = stream.next().await {
            self.tracker.tick();
            if verdict.accessible {
                self.tracker.bucket_found(&verdict.bucket_name, verdict.status());
            } else {
                self.tracker.bucket_missing(&verdict.bucket_name);
            }
            verdicts.push(verdict);
        }

        let found = verdicts.iter().filter(|v| v.accessible).count();
        self.tracker.stage_completed(STAGE_NAME, found);
        verdicts
    }
}
