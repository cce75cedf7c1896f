// main.rs - Perforator CLI
// Purpose: Parse arguments, run the enumeration engine, and print the report

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;

use perforator::config::{normalize_base_url, DEFAULT_BASE_URL};
use perforator::report::print_report;
use perforator::{EnumConfig, Perforator};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Standard,
    Aggressive,
    Respectful,
}

/// Perforator - object storage bucket enumeration for authorized testing
#[derive(Parser, Debug)]
#[command(
    name = "perforator",
    version,
    about = "Discover accessible storage buckets and enumerate their objects",
    after_help = r#"EXAMPLES:

  Guess bucket names on an endpoint and enumerate what is found:
    perforator --url https://storage.example.com

  Enumerate a single known bucket:
    perforator --url https://storage.example.com --bucket assets

  Machine readable output:
    perforator --url http://127.0.0.1:9000 --json > report.json
"#
)]
struct Args {
    /// Base storage endpoint URL
    #[arg(long, default_value = DEFAULT_BASE_URL, value_name = "URL")]
    url: String,

    /// Specific bucket to enumerate (skips name guessing)
    #[arg(long, value_name = "NAME")]
    bucket: Option<String>,

    /// Request timeout in seconds [default: 10]
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Max concurrent workers per stage [default: 20]
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Retries on transient statuses (429, 5xx) and connection failures [default: 3]
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Base profile; explicit --timeout/--workers/--retries override it
    #[arg(long, value_enum, default_value_t = Preset::Standard)]
    preset: Preset,

    /// Accept invalid TLS certificates
    #[arg(long)]
    insecure: bool,

    /// Print the report as JSON (implies --quiet)
    #[arg(long)]
    json: bool,

    /// No progress output
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> EnumConfig {
        let base = match self.preset {
            Preset::Standard => EnumConfig::default(),
            Preset::Aggressive => EnumConfig::aggressive(),
            Preset::Respectful => EnumConfig::respectful(),
        };

        let timeout_secs = self.timeout.unwrap_or(base.timeout_secs);
        let workers = self.workers.unwrap_or(base.workers);
        let max_retries = self.retries.unwrap_or(base.max_retries);

        EnumConfig {
            base_url: normalize_base_url(&self.url),
            target_bucket: self.bucket,
            timeout_secs,
            workers,
            max_retries,
            accept_invalid_certs: self.insecure,
            quiet: self.quiet || self.json,
            ..base
        }
    }
}

fn print_banner() {
    println!("{}", "═══════════════════════════════════════════════════════════════".red().bold());
    println!("{}", "  PERFORATOR - storage bucket enumeration".red().bold());
    println!("{}", "═══════════════════════════════════════════════════════════════".red().bold());
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let json = args.json;
    let config = args.into_config();

    if !config.quiet {
        print_banner();
    }

    let engine = Perforator::new(config).context("Invalid configuration")?;
    let report = engine.run().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.total_buckets == 0 {
        println!("{}", "\n[-] No accessible buckets found".red());
    } else {
        print_report(&report);
    }

    Ok(())
}
