use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Listwatch
///
/// Every section and field has a default, so an empty file (or no file at all)
/// yields a working configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub fetch: FetchConfig,
    /// Static request headers, sent on every request
    pub headers: HeaderConfig,
    pub storage: StorageConfig,
}

/// What to search and where
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Scheme and host of the listing site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Query used when none is given on the command line
    #[serde(rename = "default-query")]
    pub default_query: String,

    /// Build later page URLs from result offsets when a page has no next link
    #[serde(rename = "legacy-offset-pagination")]
    pub legacy_offset_pagination: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://listado.mercadolibre.com.ar".to_string(),
            default_query: "Toyota Corolla Cross".to_string(),
            legacy_offset_pagination: false,
        }
    }
}

/// Request pacing and retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts per URL, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Lower bound of the random delay before each fetch (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the random delay before each fetch (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Lower bound of the random wait between attempts (milliseconds)
    #[serde(rename = "min-backoff-ms")]
    pub min_backoff_ms: u64,

    /// Upper bound of the random wait between attempts (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Substrings of the final URL that mark a block or challenge page
    #[serde(rename = "anomaly-markers")]
    pub anomaly_markers: Vec<String>,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configuration with no waiting at all, for tests against local servers
    pub fn without_delays() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
            min_backoff_ms: 0,
            max_backoff_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_secs: 10,
            min_delay_ms: 2_000,
            max_delay_ms: 5_000,
            min_backoff_ms: 5_000,
            max_backoff_ms: 10_000,
            anomaly_markers: vec!["captcha".to_string(), "error".to_string()],
        }
    }
}

/// Header name to value, e.g. `"User-Agent" = "Mozilla/5.0 ..."`
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct HeaderConfig(pub BTreeMap<String, String>);

impl Default for HeaderConfig {
    fn default() -> Self {
        let headers = [
            (
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
            (
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,\
                 image/webp,image/apng,*/*;q=0.8",
            ),
            ("Accept-Language", "es-ES,es;q=0.9,en;q=0.8"),
            ("Accept-Encoding", "gzip, deflate, br"),
            ("Connection", "keep-alive"),
            ("Referer", "https://www.mercadolibre.com.ar/"),
            ("Upgrade-Insecure-Requests", "1"),
            ("Cache-Control", "no-cache"),
            ("Pragma", "no-cache"),
        ];

        Self(
            headers
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        )
    }
}

/// Snapshot storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding snapshots and their logs; relative paths are resolved
    /// against the directory of the executable
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    /// Number of snapshots kept per query
    pub keep: usize,
}

impl StorageConfig {
    /// Resolves `data_dir` against `base` unless it is already absolute
    pub fn resolve_data_dir(&self, base: &Path) -> PathBuf {
        if self.data_dir.is_absolute() {
            self.data_dir.clone()
        } else {
            base.join(&self.data_dir)
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            keep: 3,
        }
    }
}
