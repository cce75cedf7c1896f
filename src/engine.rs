// engine.rs - Enumeration Run Orchestration
// Purpose: Wire the client, prober, enumerator, and aggregator into the two
//          run modes: full discovery and single-bucket targeting

use anyhow::Result;
use chrono::Utc;
use std::collections::BTreeMap;

use crate::config::{normalize_base_url, EnumConfig};
use crate::enumerator::{FoundObject, ObjectEnumerator};
use crate::http_client::ProbeClient;
use crate::progress::ProgressTracker;
use crate::prober::{BucketProber, BucketVerdict};
use crate::report::{aggregate, BucketFindings, Report, RunInfo};

pub struct Perforator {
    config: EnumConfig,
    prober: BucketProber,
    enumerator: ObjectEnumerator,
    tracker: ProgressTracker,
}

impl Perforator {
    /// Normalizes and validates `config`, then builds the shared client
    pub fn new(mut config: EnumConfig) -> Result<Self> {
        config.base_url = normalize_base_url(&config.base_url);
        config.validate()?;

        let client = ProbeClient::new(&config)?;
        let tracker = ProgressTracker::new(uuid::Uuid::new_v4().to_string(), config.quiet);
        let prober = BucketProber::new(client.clone(), &config, tracker.clone());
        let enumerator = ObjectEnumerator::new(client, &config, tracker.clone());

        Ok(Self {
            config,
            prober,
            enumerator,
            tracker,
        })
    }

    pub fn config(&self) -> &EnumConfig {
        &self.config
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Probe the configured bucket patterns; returns accessible buckets only
    pub async fn enumerate_buckets(&self) -> Vec<BucketVerdict> {
        self.tracker.info(&format!(
            "Checking {} potential buckets...",
            self.config.bucket_patterns.len()
        ));

        self.prober
            .probe(&self.config.bucket_patterns)
            .await
            .into_iter()
            .filter(|verdict| verdict.accessible)
            .collect()
    }

    /// Every verdict for `names`, accessible or not, in completion order
    pub async fn probe_buckets(&self, names: &[String]) -> Vec<BucketVerdict> {
        self.prober.probe(names).await
    }

    pub async fn enumerate_objects_in_bucket(&self, bucket_name: &str) -> Vec<FoundObject> {
        self.enumerator.enumerate(bucket_name).await
    }

    /// Discovery then enumeration. Probing finishes completely before any
    /// bucket is enumerated; buckets are enumerated one at a time.
    pub async fn full_enumeration(&self) -> Report {
        let run = self.start_run();

        let accessible = self.enumerate_buckets().await;
        if accessible.is_empty() {
            self.tracker.warning("No accessible buckets found");
        } else {
            self.tracker
                .info(&format!("Found {} accessible buckets", accessible.len()));
        }

        let mut findings = BTreeMap::new();
        for verdict in accessible {
            let objects = self.enumerate_objects_in_bucket(&verdict.bucket_name).await;
            findings.insert(
                verdict.bucket_name.clone(),
                BucketFindings {
                    bucket_name: verdict.bucket_name.clone(),
                    verdict,
                    objects,
                },
            );
        }

        self.finish_run(&run, &findings)
    }

    /// Enumerate one named bucket whatever its probe verdict
    pub async fn enumerate_target(&self, bucket_name: &str) -> Report {
        let run = self.start_run();
        self.tracker
            .info(&format!("Targeting specific bucket: {}", bucket_name));

        let verdict = self.prober.check_bucket_existence(bucket_name).await;
        if verdict.accessible {
            self.tracker.bucket_found(bucket_name, verdict.status());
        } else {
            self.tracker.bucket_missing(bucket_name);
        }

        let objects = self.enumerate_objects_in_bucket(bucket_name).await;

        let mut findings = BTreeMap::new();
        findings.insert(
            bucket_name.to_string(),
            BucketFindings {
                bucket_name: bucket_name.to_string(),
                verdict,
                objects,
            },
        );

        self.finish_run(&run, &findings)
    }

    /// Full enumeration, or the configured target bucket if set
    pub async fn run(&self) -> Report {
        match self.config.target_bucket.clone() {
            Some(bucket) => self.enumerate_target(&bucket).await,
            None => self.full_enumeration().await,
        }
    }

    fn start_run(&self) -> RunInfo {
        self.tracker.scan_started(&self.config.base_url);
        RunInfo {
            scan_id: self.tracker.scan_id().to_string(),
            base_url: self.config.base_url.clone(),
            started_at: Utc::now(),
        }
    }

    fn finish_run(&self, run: &RunInfo, findings: &BTreeMap<String, BucketFindings>) -> Report {
        let report = aggregate(run, findings);
        self.tracker
            .scan_completed(report.total_buckets, report.total_objects);
        report
    }
}
