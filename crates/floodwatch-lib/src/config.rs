//! Runtime configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::shelter::DEFAULT_SEARCH_RADIUS_M;

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_TEXTGEN_URL: &str = "https://bedrock-runtime.us-east-1.amazonaws.com";
pub const DEFAULT_TEXTGEN_MODEL: &str = "amazon.titan-text-express-v1";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 8000;
pub const DEFAULT_STATUS_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_DB_PATH: &str = "floodwatch.db";

/// Endpoints, credentials and limits for the downstream collaborators.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodwatchConfig {
    pub overpass_url: String,
    pub osrm_url: String,
    pub textgen_url: String,
    pub textgen_model: String,
    /// Missing key means text generation is reported unavailable.
    #[serde(skip_serializing)]
    pub textgen_api_key: Option<String>,
    pub http_timeout_ms: u64,
    pub status_timeout_ms: u64,
    pub db_path: PathBuf,
    pub search_radius_m: f64,
}

impl Default for FloodwatchConfig {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            osrm_url: DEFAULT_OSRM_URL.to_string(),
            textgen_url: DEFAULT_TEXTGEN_URL.to_string(),
            textgen_model: DEFAULT_TEXTGEN_MODEL.to_string(),
            textgen_api_key: None,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            status_timeout_ms: DEFAULT_STATUS_TIMEOUT_MS,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
        }
    }
}

impl FloodwatchConfig {
    /// Read `FLOODWATCH_*` variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Self {
            overpass_url: text("FLOODWATCH_OVERPASS_URL", defaults.overpass_url),
            osrm_url: text("FLOODWATCH_OSRM_URL", defaults.osrm_url),
            textgen_url: text("FLOODWATCH_TEXTGEN_URL", defaults.textgen_url),
            textgen_model: text("FLOODWATCH_TEXTGEN_MODEL", defaults.textgen_model),
            textgen_api_key: lookup("FLOODWATCH_TEXTGEN_API_KEY")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            http_timeout_ms: parsed(&lookup, "FLOODWATCH_HTTP_TIMEOUT_MS", defaults.http_timeout_ms),
            status_timeout_ms: parsed(
                &lookup,
                "FLOODWATCH_STATUS_TIMEOUT_MS",
                defaults.status_timeout_ms,
            ),
            db_path: lookup("FLOODWATCH_DB_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            search_radius_m: parsed(&lookup, "FLOODWATCH_SEARCH_RADIUS_M", defaults.search_radius_m),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }

    pub fn textgen_enabled(&self) -> bool {
        self.textgen_api_key.is_some()
    }
}

trait Positive {
    fn is_positive(&self) -> bool;
}

impl Positive for u64 {
    fn is_positive(&self) -> bool {
        *self > 0
    }
}

impl Positive for f64 {
    fn is_positive(&self) -> bool {
        self.is_finite() && *self > 0.0
    }
}

fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Positive,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value.is_positive() => value,
            _ => {
                warn!(key, value = %raw, "ignoring invalid configuration value");
                default
            }
        },
    }
}

impl std::fmt::Debug for FloodwatchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloodwatchConfig")
            .field("overpass_url", &self.overpass_url)
            .field("osrm_url", &self.osrm_url)
            .field("textgen_url", &self.textgen_url)
            .field("textgen_model", &self.textgen_model)
            .field("textgen_api_key", &self.textgen_api_key.as_ref().map(|_| "<redacted>"))
            .field("http_timeout_ms", &self.http_timeout_ms)
            .field("status_timeout_ms", &self.status_timeout_ms)
            .field("db_path", &self.db_path)
            .field("search_radius_m", &self.search_radius_m)
            .finish()
    }
}
