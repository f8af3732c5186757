//! Load config from file and environment.

use std::path::PathBuf;
use std::time::Duration;

use parker_core::{Coordinate, DEFAULT_CENTER, DEFAULT_SEARCH_LIMIT};
use serde::Deserialize;
use tracing::{debug, warn};

/// Client configuration. File: ~/.config/parker/config.toml or /etc/parker/config.toml.
/// Env overrides: PARKER_API_URL, PARKER_SEARCH_LIMIT, PARKER_REQUEST_TIMEOUT_SECS,
/// PARKER_DEFAULT_LATITUDE, PARKER_DEFAULT_LONGITUDE.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Spots requested per search (default 100).
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Per-request timeout in seconds (default 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Query center before the first real fix.
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
}

fn default_api_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_latitude() -> f64 {
    DEFAULT_CENTER.latitude
}
fn default_longitude() -> f64 {
    DEFAULT_CENTER.longitude
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            search_limit: default_search_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
        }
    }
}

impl ClientConfig {
    pub fn default_center(&self) -> Coordinate {
        Coordinate::new(self.default_latitude, self.default_longitude)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> ClientConfig {
    let mut c = load_file().unwrap_or_default();
    apply_env(&mut c, |k| std::env::var(k).ok());
    c
}

/// Apply overrides from `get`. Values that fail to parse are ignored.
fn apply_env(c: &mut ClientConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(s) = get("PARKER_API_URL") {
        c.api_base_url = s;
    }
    override_parsed(&get, "PARKER_SEARCH_LIMIT", &mut c.search_limit);
    override_parsed(&get, "PARKER_REQUEST_TIMEOUT_SECS", &mut c.request_timeout_secs);
    override_parsed(&get, "PARKER_DEFAULT_LATITUDE", &mut c.default_latitude);
    override_parsed(&get, "PARKER_DEFAULT_LONGITUDE", &mut c.default_longitude);
}

fn override_parsed<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    slot: &mut T,
) {
    if let Some(s) = get(key) {
        match s.parse::<T>() {
            Ok(v) => *slot = v,
            Err(_) => warn!(key, value = %s, "ignoring unparseable override"),
        }
    }
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/parker/config.toml"));
    }
    out.push(PathBuf::from("/etc/parker/config.toml"));
    out
}

fn load_file() -> Option<ClientConfig> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                match toml::from_str::<ClientConfig>(&s) {
                    Ok(c) => {
                        debug!(path = %p.display(), "loaded config");
                        return Some(c);
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "invalid config, using defaults")
                    }
                }
            }
            break;
        }
    }
    None
}
