// progress.rs - Run Progress Tracking and Console Output
// Purpose: Record every notable step of a run as an in-memory event, print
//          colored status lines, and drive a progress bar per fan-out stage

use chrono::{DateTime, Utc};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub timestamp: DateTime<Utc>,
    pub scan_id: String,
    pub event_type: EventType,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventType {
    ScanStarted { base_url: String },
    StageStarted { stage: String, total: usize },
    BucketFound { bucket: String, status: Option<u16> },
    BucketMissing { bucket: String },
    ListingFound { bucket: String, count: usize },
    ObjectFound { url: String, sensitive: bool },
    DirectoryFound { bucket: String, directory: String, count: usize },
    StageCompleted { stage: String, found: usize },
    Warning { detail: String },
    ScanCompleted { buckets: usize, objects: usize },
}

/// Cheap to clone; clones share the event log and the active bar
#[derive(Clone)]
pub struct ProgressTracker {
    scan_id: String,
    quiet: bool,
    events: Arc<Mutex<Vec<ProgressEvent>>>,
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl ProgressTracker {
    pub fn new(scan_id: String, quiet: bool) -> Self {
        Self {
            scan_id,
            quiet,
            events: Arc::new(Mutex::new(Vec::new())),
            bar: Arc::new(Mutex::new(None)),
        }
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    /// Record an event and print its line unless quiet
    pub fn add_event(&self, event_type: EventType, message: String, line: ColoredString) {
        let event = ProgressEvent {
            timestamp: Utc::now(),
            scan_id: self.scan_id.clone(),
            event_type,
            message,
        };

        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }

        self.print(line);
    }

    /// Print a line without recording it
    pub fn print(&self, line: ColoredString) {
        if self.quiet {
            return;
        }
        match self.active_bar() {
            Some(bar) => bar.suspend(|| println!("{}", line)),
            None => println!("{}", line),
        }
    }

    pub fn info(&self, message: &str) {
        self.print(format!("[*] {}", message).cyan());
    }

    pub fn get_events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // STAGES
    // ═══════════════════════════════════════════════════════════════════════

    pub fn stage_started(&self, stage: &str, total: usize) {
        self.add_event(
            EventType::StageStarted {
                stage: stage.to_string(),
                total,
            },
            format!("{}: {} units", stage, total),
            format!("[*] {}: {} candidates...", stage, total).cyan(),
        );

        let bar = if self.quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new(total as u64);
            let style = ProgressStyle::with_template("    {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style.progress_chars("=> "));
            bar
        };

        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    pub fn tick(&self) {
        if let Some(bar) = self.active_bar() {
            bar.inc(1);
        }
    }

    pub fn stage_completed(&self, stage: &str, found: usize) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(bar) = slot.take() {
                bar.finish_and_clear();
            }
        }

        self.add_event(
            EventType::StageCompleted {
                stage: stage.to_string(),
                found,
            },
            format!("{} complete: {} found", stage, found),
            format!("[+] {} complete: {} found", stage, found).green().bold(),
        );
    }

    fn active_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|slot| slot.clone())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // FINDINGS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn scan_started(&self, base_url: &str) {
        self.add_event(
            EventType::ScanStarted {
                base_url: base_url.to_string(),
            },
            format!("Starting enumeration on {}", base_url),
            format!("[*] Starting enumeration on {}", base_url).cyan().bold(),
        );
    }

    pub fn bucket_found(&self, bucket: &str, status: Option<u16>) {
        let status_text = status.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string());
        self.add_event(
            EventType::BucketFound {
                bucket: bucket.to_string(),
                status,
            },
            format!("Found accessible bucket: {} (status {})", bucket, status_text),
            format!("[+] Found accessible bucket: {} (Status: {})", bucket, status_text).green(),
        );
    }

    pub fn bucket_missing(&self, bucket: &str) {
        self.add_event(
            EventType::BucketMissing {
                bucket: bucket.to_string(),
            },
            format!("{}: not accessible", bucket),
            format!("[-] {}: Not accessible", bucket).red(),
        );
    }

    pub fn listing_found(&self, bucket: &str, count: usize) {
        self.add_event(
            EventType::ListingFound {
                bucket: bucket.to_string(),
                count,
            },
            format!("{} objects listed in {}", count, bucket),
            format!("[+] Found {} objects via listing", count).green(),
        );
    }

    pub fn object_found(&self, url: &str, size: &str, sensitive: bool, preview: Option<&str>) {
        let line = if sensitive {
            format!("[!] SENSITIVE: {} ({} bytes)", url, size).red().bold()
        } else {
            format!("[+] Regular: {} ({} bytes)", url, size).green()
        };
        self.add_event(
            EventType::ObjectFound {
                url: url.to_string(),
                sensitive,
            },
            format!("Accessible object {}", url),
            line,
        );

        if sensitive {
            if let Some(preview) = preview {
                let short: String = preview.chars().take(100).collect();
                self.print(format!("    Preview: {}...", short).yellow());
            }
        }
    }

    pub fn directory_found(&self, bucket: &str, directory: &str, count: usize) {
        self.add_event(
            EventType::DirectoryFound {
                bucket: bucket.to_string(),
                directory: directory.to_string(),
                count,
            },
            format!("Directory {}/{} lists {} objects", bucket, directory, count),
            format!("[+] Found directory: {}/ with {} objects", directory, count).green(),
        );
    }

    pub fn warning(&self, detail: &str) {
        self.add_event(
            EventType::Warning {
                detail: detail.to_string(),
            },
            detail.to_string(),
            format!("[!] {}", detail).yellow(),
        );
    }

    pub fn scan_completed(&self, buckets: usize, objects: usize) {
        self.add_event(
            EventType::ScanCompleted { buckets, objects },
            format!("Enumeration complete: {} buckets, {} objects", buckets, objects),
            format!("[+] Enumeration complete: {} buckets, {} objects", buckets, objects)
                .green()
                .bold(),
        );
    }
}
