//! Configuration types for the DuckDNS updater
//!
//! These structures are deserialized by the daemon (file + environment) and
//! validated here. Library users can also build them directly.

use crate::duration::{format_duration, serde_duration, serde_duration_list};
use crate::retry::RetryPolicy;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// DuckDNS update endpoint
pub const DEFAULT_BASE_URL: &str = "https://www.duckdns.org/update";

/// Default check interval (5 minutes)
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Longest accepted check interval (one year)
pub const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Default per-request HTTP timeout
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default IP discovery services, tried in order
pub const DEFAULT_IP_SOURCES: &[&str] = &[
    "https://api.ipify.org",
    "https://ifconfig.me/ip",
    "https://icanhazip.com",
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// DuckDNS account settings
    #[serde(default)]
    pub duckdns: AccountConfig,

    /// Scheduling and retry settings
    #[serde(default)]
    pub update: UpdateConfig,

    /// Ordered IP discovery endpoints (failover priority)
    #[serde(default = "default_ip_sources")]
    pub ip_sources: Vec<String>,

    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            duckdns: AccountConfig::default(),
            update: UpdateConfig::default(),
            ip_sources: default_ip_sources(),
            log: LogConfig::default(),
        }
    }
}

/// DuckDNS domain and token
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountConfig {
    /// Subdomain to update (without `.duckdns.org`)
    #[serde(default, deserialize_with = "scalar_string")]
    pub domain: String,

    /// Account token
    /// ⚠️ NEVER log this value
    #[serde(default, deserialize_with = "scalar_string")]
    pub token: String,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("domain", &self.domain)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Scheduling, retry and HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Time between checks
    #[serde(default = "default_interval", with = "serde_duration")]
    pub interval: Duration,

    /// Retries after the first failed update attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Sleep before each retry; the last value repeats
    #[serde(default = "default_backoff", with = "serde_duration_list")]
    pub backoff: Vec<Duration>,

    /// Per-request HTTP timeout
    #[serde(default = "default_timeout", with = "serde_duration")]
    pub timeout: Duration,

    /// Update endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl UpdateConfig {
    /// The retry policy these settings describe
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff.clone())
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_retries: default_max_retries(),
            backoff: default_backoff(),
            timeout: default_timeout(),
            base_url: default_base_url(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    #[serde(default = "default_log_level", deserialize_with = "scalar_string")]
    pub level: String,

    /// text or json
    #[serde(default = "default_log_format", deserialize_with = "scalar_string")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), crate::Error> {
        let mut problems = Vec::new();

        if self.duckdns.domain.trim().is_empty() {
            problems.push(
                "DuckDNS domain is not set (duckdns.domain or DUCKDNS_DOMAIN)".to_string(),
            );
        }
        if self.duckdns.token.trim().is_empty() {
            problems.push("DuckDNS token is not set (duckdns.token or DUCKDNS_TOKEN)".to_string());
        }

        if self.update.interval.is_zero() {
            problems.push(
                "update interval must be positive (update.interval or DUCKDNS_INTERVAL, e.g. \"5m\")"
                    .to_string(),
            );
        } else if self.update.interval > MAX_INTERVAL {
            problems.push(format!(
                "update interval {} exceeds the maximum of {}",
                format_duration(self.update.interval),
                format_duration(MAX_INTERVAL)
            ));
        }
        if self.update.timeout.is_zero() {
            problems.push("update.timeout must be positive".to_string());
        }
        if !is_http_url(&self.update.base_url) {
            problems.push(format!(
                "update.base_url {:?} is not a valid http(s) URL",
                self.update.base_url
            ));
        }

        if self.ip_sources.is_empty() {
            problems.push("no IP sources configured (ip_sources)".to_string());
        }
        for (i, source) in self.ip_sources.iter().enumerate() {
            if source.trim().is_empty() {
                problems.push(format!("ip_sources[{i}] is empty"));
            } else if !is_http_url(source) {
                problems.push(format!("ip_sources[{i}] {source:?} is not a valid http(s) URL"));
            }
        }

        if !LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            problems.push(format!(
                "invalid log level {:?} (valid: trace, debug, info, warn, error)",
                self.log.level
            ));
        }
        if !LOG_FORMATS.contains(&self.log.format.to_lowercase().as_str()) {
            problems.push(format!(
                "invalid log format {:?} (valid: text, json)",
                self.log.format
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::InvalidConfig(problems))
        }
    }
}

/// Accept any scalar for a text field.
///
/// Environment providers type values like `12345` or `true` before they reach
/// serde, and YAML does the same for unquoted scalars. An all-digit subdomain
/// is still a subdomain.
fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    struct ScalarString;

    impl<'de> Visitor<'de> for ScalarString {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or a scalar value")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_char<E: de::Error>(self, v: char) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    d.deserialize_any(ScalarString)
}

fn is_http_url(s: &str) -> bool {
    match url::Url::parse(s) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}

fn default_ip_sources() -> Vec<String> {
    DEFAULT_IP_SOURCES.iter().map(|s| s.to_string()).collect()
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_max_retries() -> usize {
    crate::retry::DEFAULT_MAX_RETRIES
}

fn default_backoff() -> Vec<Duration> {
    crate::retry::DEFAULT_BACKOFF.to_vec()
}

fn default_timeout() -> Duration {
    DEFAULT_HTTP_TIMEOUT
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
