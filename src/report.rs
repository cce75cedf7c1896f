// report.rs - Findings Aggregation and Summary Output
// Purpose: Merge per-bucket findings into a run report and print it

use chrono::{DateTime, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::enumerator::FoundObject;
use crate::prober::BucketVerdict;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketFindings {
    pub bucket_name: String,
    pub verdict: BucketVerdict,
    pub objects: Vec<FoundObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub scan_id: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub buckets: BTreeMap<String, BucketFindings>,
    pub total_buckets: usize,
    pub total_objects: usize,
    /// "bucket/key-or-url" for every object flagged sensitive
    pub sensitive_objects: Vec<String>,
}

/// Run identity carried onto the report
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub scan_id: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
}

/// Build the report from `findings` without touching them
pub fn aggregate(run: &RunInfo, findings: &BTreeMap<String, BucketFindings>) -> Report {
    let total_objects = findings.values().map(|f| f.objects.len()).sum();

    let sensitive_objects = findings
        .iter()
        .flat_map(|(bucket_name, bucket)| {
            bucket
                .objects
                .iter()
                .filter(|object| object.is_sensitive())
                .map(move |object| format!("{}/{}", bucket_name, object.identifier()))
        })
        .collect();

    let finished_at = Utc::now();
    let duration_seconds = (finished_at - run.started_at)
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    Report {
        scan_id: run.scan_id.clone(),
        base_url: run.base_url.clone(),
        started_at: run.started_at,
        finished_at,
        duration_seconds,
        buckets: findings.clone(),
        total_buckets: findings.len(),
        total_objects,
        sensitive_objects,
    }
}

pub fn print_report(report: &Report) {
    println!("\n{}", "═══════════════════════════════════════════════════════════════".yellow().bold());
    println!("{}", "  ENUMERATION REPORT".yellow().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════".yellow().bold());

    for (bucket_name, bucket) in &report.buckets {
        let status = bucket
            .verdict
            .status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "n/a".to_string());

        println!("\n{}", format!("BUCKET: {}", bucket_name).cyan().bold());
        println!("   Status: {}", status);
        println!("   Objects found: {}", bucket.objects.len());

        for object in bucket.objects.iter().filter(|o| o.is_sensitive()) {
            println!("{}", format!("   SENSITIVE: {}", object.identifier()).red().bold());
        }
    }

    println!("\n{}", "SUMMARY:".cyan().bold());
    println!("   Total accessible buckets: {}", report.total_buckets);
    println!("   Total objects found: {}", report.total_objects);
    println!("   Sensitive objects: {}", report.sensitive_objects.len());
    println!("   Duration: {:.1}s", report.duration_seconds);

    if !report.sensitive_objects.is_empty() {
        println!("\n{}", "SENSITIVE FILES FOUND:".red().bold());
        for sensitive_file in &report.sensitive_objects {
            println!("{}", format!("   - {}", sensitive_file).red());
        }
    }
}
