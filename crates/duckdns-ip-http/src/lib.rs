// # HTTP IP Source
//
// This crate discovers the host's public IPv4 address by asking external
// "what is my IP" services over HTTP.
//
// ## Components
//
// - [`validate_ipv4`]: strict dotted-quad check (pattern + address parse)
// - [`HttpIpSource`]: one endpoint, one GET, bounded timeout
// - [`FailoverIpSource`]: an ordered list of endpoints, first success wins
//
// ## Cancellation
//
// Every request races the caller's `CancellationToken`. A cancelled lookup
// returns `Error::Cancelled` at once, and a failover sequence stops instead
// of moving on to the next source.

use duckdns_core::error::{SourceFailure, SourceFailureReason};
use duckdns_core::traits::IpSource;
use duckdns_core::{Error, Result};

use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default per-request timeout
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("duckdns-updater/", env!("CARGO_PKG_VERSION"));

static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3})\.(\d{1,3})\.(\d{1,3})\.(\d{1,3})$").expect("IPv4 pattern is valid")
});

/// Validate `text` as a dotted-quad IPv4 address
///
/// Both checks must pass: the four-octet pattern, then strict parsing into
/// [`Ipv4Addr`] (which rejects octets above 255 and leading zeros). IPv6
/// literals such as `::1` are rejected rather than mapped.
pub fn validate_ipv4(text: &str) -> Result<Ipv4Addr> {
    if text.is_empty() {
        return Err(Error::validation(text, "address is empty"));
    }

    if !IPV4_PATTERN.is_match(text) {
        return Err(Error::validation(text, "does not match the IPv4 dotted-quad form"));
    }

    text.parse::<Ipv4Addr>()
        .map_err(|e| Error::validation(text, format!("not a valid IPv4 address: {e}")))
}

/// Build the HTTP client shared by IP sources
///
/// The client carries the user agent; timeouts are set per request so one
/// client can serve sources with different limits.
pub fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Single-endpoint IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// Per-request timeout
    timeout: Duration,

    /// HTTP client (cheap to clone, pools connections)
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source with the default 10 second timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a source with a custom timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self::with_client(url, timeout, default_client())
    }

    /// Create a source that reuses an existing client
    pub fn with_client(url: impl Into<String>, timeout: Duration, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            timeout,
            client,
        }
    }

    /// The endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// GET the endpoint and validate the body
    async fn fetch_ip(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::request(&self.url, e))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::request(&self.url, format!("failed to read response: {e}")))?;

        let ip_text = body.trim();
        if ip_text.is_empty() {
            return Err(Error::EmptyResponse {
                url: self.url.clone(),
            });
        }

        validate_ipv4(ip_text)
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self, cancel: &CancellationToken) -> Result<Ipv4Addr> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.fetch_ip() => result,
        }
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Ordered-failover IP source
///
/// Tries each URL in order and returns the first valid address. Blank
/// entries are skipped and noted. When every source fails the error lists
/// each attempt with its index, URL and message.
#[derive(Debug, Clone)]
pub struct FailoverIpSource {
    /// Endpoints in priority order
    urls: Vec<String>,

    /// Timeout applied to each attempt
    timeout: Duration,

    /// Shared by every attempt
    client: reqwest::Client,
}

impl FailoverIpSource {
    /// Create a failover source with the default timeout
    pub fn new(urls: Vec<String>) -> Self {
        Self::with_timeout(urls, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a failover source with a custom per-attempt timeout
    pub fn with_timeout(urls: Vec<String>, timeout: Duration) -> Self {
        Self {
            urls,
            timeout,
            client: default_client(),
        }
    }

    /// Configured endpoints
    pub fn urls(&self) -> &[String] {
        &self.urls
    }
}

#[async_trait::async_trait]
impl IpSource for FailoverIpSource {
    async fn current(&self, cancel: &CancellationToken) -> Result<Ipv4Addr> {
        if self.urls.is_empty() {
            return Err(Error::NoSourcesConfigured);
        }

        let mut failures = Vec::new();

        for (index, url) in self.urls.iter().enumerate() {
            if url.trim().is_empty() {
                tracing::warn!(index, url = %url, "IP source URL is empty, skipping");
                failures.push(SourceFailure {
                    index,
                    url: url.clone(),
                    reason: SourceFailureReason::Skipped,
                });
                continue;
            }

            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            tracing::info!(index, url = %url, timeout = ?self.timeout, "fetching IP");

            let source = HttpIpSource::with_client(url.as_str(), self.timeout, self.client.clone());
            match source.current(cancel).await {
                Ok(ip) => {
                    tracing::info!(index, url = %url, %ip, "fetched IP");
                    return Ok(ip);
                }
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    tracing::warn!(index, url = %url, error = %e, "IP source failed");
                    failures.push(SourceFailure {
                        index,
                        url: url.clone(),
                        reason: SourceFailureReason::Failed(e.to_string()),
                    });
                }
            }
        }

        tracing::error!(attempts = failures.len(), "all IP sources failed");
        Err(Error::AllSourcesFailed(failures))
    }

    fn describe(&self) -> String {
        format!("failover({})", self.urls.len())
    }
}
