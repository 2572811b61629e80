// Runtime configuration.
// Reads bind address, cache windows, and upstream settings from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{self, DEFAULT_SWEEP_INTERVAL, TtlPolicy};
use crate::error::{Error, Result};

pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_PORT: u16 = 8787;
const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Where cache entries live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Dir(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub ttl: TtlPolicy,
    pub upstream_timeout: Duration,
    pub raw_base: String,
    pub api_base: String,
    pub github_token: Option<String>,
    pub store: StoreConfig,
    /// Collapse concurrent revalidations of one key into a single upstream fetch.
    pub coalesce: bool,
    /// Minimum time between sweeps that drop expired entries from the store.
    pub sweep_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            ttl: TtlPolicy::default(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            raw_base: DEFAULT_RAW_BASE.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            github_token: None,
            store: StoreConfig::Memory,
            coalesce: false,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Config {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("MDCACHE_BIND").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&lookup, "PORT")?.unwrap_or(DEFAULT_PORT);
        let addr = format!("{}:{}", host, port);
        let bind = addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid bind address {}: {}", addr, e)))?;

        let revalidate = parse_var::<u64, _>(&lookup, "MDCACHE_REVALIDATE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.ttl.revalidate());
        let stale_for = parse_var::<u64, _>(&lookup, "MDCACHE_STALE_FOR_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.ttl.stale_for());
        let ttl = TtlPolicy::new(revalidate, stale_for)?;

        let upstream_timeout = parse_var::<u64, _>(&lookup, "MDCACHE_UPSTREAM_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.upstream_timeout);

        let sweep_interval = parse_var::<u64, _>(&lookup, "MDCACHE_SWEEP_INTERVAL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);

        let store = match lookup("MDCACHE_CACHE_DIR").filter(|v| !v.is_empty()) {
            None => StoreConfig::Memory,
            Some(dir) if dir == "default" => cache::cache_dir()
                .map(StoreConfig::Dir)
                .ok_or_else(|| Error::Config("no platform cache directory".to_string()))?,
            Some(dir) => StoreConfig::Dir(PathBuf::from(dir)),
        };

        let coalesce = match lookup("MDCACHE_COALESCE").as_deref() {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(Error::Config(format!(
                    "MDCACHE_COALESCE must be true or false, got {}",
                    other
                )));
            }
        };

        Ok(Self {
            bind,
            ttl,
            upstream_timeout,
            raw_base: lookup("MDCACHE_RAW_BASE").unwrap_or(defaults.raw_base),
            api_base: lookup("MDCACHE_API_BASE").unwrap_or(defaults.api_base),
            github_token: lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()),
            store,
            coalesce,
            sweep_interval,
        })
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("{} has invalid value {:?}: {}", name, raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind.port(), 8787);
        assert_eq!(config.ttl.revalidate(), Duration::from_secs(300));
        assert_eq!(config.ttl.stale_for(), Duration::from_secs(2 * 24 * 60 * 60));
        assert_eq!(config.store, StoreConfig::Memory);
        assert!(!config.coalesce);
        assert_eq!(config.sweep_interval, Duration::from_secs(600));
        assert!(config.github_token.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("MDCACHE_REVALIDATE_SECS", "60"),
            ("MDCACHE_STALE_FOR_SECS", "3600"),
            ("MDCACHE_CACHE_DIR", "/tmp/mdcache"),
            ("MDCACHE_COALESCE", "true"),
            ("MDCACHE_SWEEP_INTERVAL_SECS", "30"),
            ("GITHUB_TOKEN", "ghp_test"),
        ]))
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.ttl.revalidate(), Duration::from_secs(60));
        assert_eq!(config.ttl.stale_for(), Duration::from_secs(3600));
        assert_eq!(config.store, StoreConfig::Dir(PathBuf::from("/tmp/mdcache")));
        assert!(config.coalesce);
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
        assert_eq!(config.github_token.as_deref(), Some("ghp_test"));
    }

    #[test]
    fn test_revalidate_must_precede_expiry() {
        let result = Config::from_lookup(lookup_from(&[
            ("MDCACHE_REVALIDATE_SECS", "600"),
            ("MDCACHE_STALE_FOR_SECS", "600"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
