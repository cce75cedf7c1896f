// config.rs - Run Configuration and Built-in Wordlists
// Purpose: Hold every knob of an enumeration run plus the default name lists

use anyhow::{bail, Context, Result};
use reqwest::Url;

// ═══════════════════════════════════════════════════════════════════════════
// BUILT-IN WORDLISTS
// ═══════════════════════════════════════════════════════════════════════════

/// Bucket names guessed during discovery
pub const BUCKET_PATTERNS: &[&str] = &[
    "assets", "uploads", "static", "media", "files",
    "backups", "logs", "data", "config", "docs",
];

/// Object keys tried against every confirmed bucket
pub const COMMON_OBJECTS: &[&str] = &[
    // Entry pages
    "index.html", "index.htm", "default.html",
    // App configuration
    "config.json", "config.js", "config.xml", "config.yml", "config.yaml",
    // Frontend bundles
    "app.js", "main.js", "bundle.js", "app.min.js",
    "main.css", "style.css", "app.css", "styles.css",
    // Package manifests
    "manifest.json", "package.json", "composer.json",
    // Environment files
    ".env", ".env.local", ".env.production", ".env.development",
    "settings.json", "settings.js", "settings.xml",
    // Databases and dumps
    "database.yml", "database.json", "db.json",
    "backup.sql", "dump.sql", "database.sql",
    "users.json", "users.xml", "userlist.txt",
    // API descriptions
    "api.json", "endpoints.json", "routes.json",
    // Secrets
    "keys.json", "secrets.json", "credentials.json",
    // Logs
    "error.log", "access.log", "debug.log",
    // Misc
    "robots.txt", "sitemap.xml", ".htaccess",
    "README.md", "README.txt", "CHANGELOG.md",
    "version.txt", "VERSION", "build.json",
    "swagger.json", "openapi.json", "api-docs.json",
];

/// Directory prefixes checked for listable sub-paths
pub const COMMON_DIRECTORIES: &[&str] = &[
    "static", "assets", "js", "css", "img", "images",
    "uploads", "files", "docs", "backup", "backups",
    "admin", "api", "app", "src", "public",
    "private", "internal", "logs", "tmp", "temp",
    "cache", "data", "db", "config", "conf",
];

pub const DEFAULT_BASE_URL: &str = "https://storage.example.com";

// ═══════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct EnumConfig {
    /// Storage endpoint, without trailing slash
    pub base_url: String,
    /// Single bucket to enumerate instead of guessing names
    pub target_bucket: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Concurrent units per fan-out stage
    pub workers: usize,
    /// Retries after the first attempt on transient failures
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub backoff_base_ms: u64,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
    /// Suppress console output and progress bars
    pub quiet: bool,
    pub bucket_patterns: Vec<String>,
    pub common_objects: Vec<String>,
    pub common_directories: Vec<String>,
}

impl Default for EnumConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            target_bucket: None,
            timeout_secs: 10,
            workers: 20,
            max_retries: 3,
            backoff_base_ms: 100,
            user_agent: format!("perforator/{}", env!("CARGO_PKG_VERSION")),
            accept_invalid_certs: false,
            quiet: false,
            bucket_patterns: to_owned_list(BUCKET_PATTERNS),
            common_objects: to_owned_list(COMMON_OBJECTS),
            common_directories: to_owned_list(COMMON_DIRECTORIES),
        }
    }
}

impl EnumConfig {
    /// Default configuration pointed at `base_url`
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            ..Self::default()
        }
    }

    /// More workers, shorter timeout, a single retry
    pub fn aggressive() -> Self {
        Self {
            timeout_secs: 5,
            workers: 50,
            max_retries: 1,
            backoff_base_ms: 50,
            ..Self::default()
        }
    }

    /// Fewer workers and a gentler retry schedule
    pub fn respectful() -> Self {
        Self {
            timeout_secs: 20,
            workers: 5,
            max_retries: 3,
            backoff_base_ms: 500,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            bail!("Base URL must not be empty");
        }
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("Unsupported URL scheme '{}' (expected http or https)", url.scheme());
        }
        if self.workers == 0 {
            bail!("Worker count must be at least 1");
        }
        if self.timeout_secs == 0 {
            bail!("Timeout must be at least 1 second");
        }
        if let Some(bucket) = &self.target_bucket {
            if bucket.trim().is_empty() {
                bail!("Target bucket name must not be empty");
            }
        }
        Ok(())
    }
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EnumConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.workers, 20);
        assert_eq!(config.bucket_patterns.len(), BUCKET_PATTERNS.len());
        assert_eq!(config.common_objects.len(), 56);
        assert_eq!(config.common_directories.len(), 26);
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let config = EnumConfig::with_base_url("http://127.0.0.1:9000///");
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_aggressive_config() {
        let config = EnumConfig::aggressive();
        assert!(config.workers > EnumConfig::default().workers);
        assert!(config.max_retries < EnumConfig::default().max_retries);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(EnumConfig::with_base_url("").validate().is_err());
        assert!(EnumConfig::with_base_url("ftp://host").validate().is_err());
        assert!(EnumConfig::with_base_url("not a url").validate().is_err());

        let mut config = EnumConfig::with_base_url("http://localhost");
        config.workers = 0;
        assert!(config.validate().is_err());

        assert!(EnumConfig::with_base_url("http://localhost").validate().is_ok());
    }
}
