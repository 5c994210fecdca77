//! Configuration loading: defaults, then an optional YAML file, then
//! `DUCKDNS_*` environment variables.

use anyhow::{Context, Result, bail};
use duckdns_core::AppConfig;
use figment::providers::{Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;

/// Environment variables that override file values, and the keys they set
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DUCKDNS_DOMAIN", "duckdns.domain"),
    ("DUCKDNS_TOKEN", "duckdns.token"),
    ("DUCKDNS_INTERVAL", "update.interval"),
    ("DUCKDNS_LOG_LEVEL", "log.level"),
    ("DUCKDNS_LOG_FORMAT", "log.format"),
];

/// Build the layered figment
///
/// Overrides are merged as raw strings: `DUCKDNS_TOKEN=0123` stays `"0123"`
/// rather than becoming the integer 123. Unset or blank variables leave the
/// file value alone.
pub fn figment(path: Option<&Path>) -> Figment {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = path {
        figment = figment.merge(Yaml::file(path));
    }

    for (var, key) in ENV_OVERRIDES {
        if let Some(value) = env_override(var) {
            figment = figment.merge(Serialized::default(key, value));
        }
    }
    figment
}

/// Value of `var`, or `None` if it is unset or blank
fn env_override(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.trim().is_empty())
}

/// Load the configuration; validation is left to the caller
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path
        && !path.exists()
    {
        bail!("configuration file not found: {}", path.display());
    }

    figment(path)
        .extract()
        .context("failed to load configuration")
}
