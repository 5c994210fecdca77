// # DuckDNS Provider
//
// This crate implements the DuckDNS update API for the updater.
//
// ## Behaviour
//
// - One GET per `update_record` call, with `domains`, `token` and `ip`
//   query parameters
// - The response body is a bare marker: `OK` on success, `KO` on refusal
// - Bounded retry with backoff comes from `DnsProvider::update_record_with_retry`
//   and this client's `RetryPolicy`
// - No per-call state: one client serves any number of concurrent callers
//
// ## Security Requirements
//
// - The token NEVER appears in logs, error messages or `Debug` output
//
// ## API Reference
//
// - https://www.duckdns.org/spec.jsp
// - `GET https://www.duckdns.org/update?domains=<d>&token=<t>&ip=<ip>`

use async_trait::async_trait;
use duckdns_core::config::{DEFAULT_BASE_URL, UpdateConfig};
use duckdns_core::retry::RetryPolicy;
use duckdns_core::traits::DnsProvider;
use duckdns_core::{Error, Result};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default HTTP timeout for update requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("duckdns-updater/", env!("CARGO_PKG_VERSION"));

/// What the update endpoint answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateReply {
    /// `OK`
    Accepted,
    /// `KO`
    Rejected,
    /// Anything else, verbatim
    Unexpected(String),
}

impl UpdateReply {
    /// Classify a response body (surrounding whitespace ignored)
    pub fn parse(body: &str) -> Self {
        match body.trim() {
            "OK" => UpdateReply::Accepted,
            "KO" => UpdateReply::Rejected,
            other => UpdateReply::Unexpected(other.to_string()),
        }
    }

    /// `Ok(())` for [`UpdateReply::Accepted`], [`Error::Rejected`] with the raw text otherwise
    pub fn into_result(self) -> Result<()> {
        match self {
            UpdateReply::Accepted => Ok(()),
            UpdateReply::Rejected => Err(Error::Rejected {
                response: "KO".to_string(),
            }),
            UpdateReply::Unexpected(response) => Err(Error::Rejected { response }),
        }
    }
}

/// DuckDNS update client
///
/// Holds only static configuration. The Debug implementation never shows
/// request URLs, which carry the token.
#[derive(Clone)]
pub struct DuckDnsClient {
    /// HTTP client for API requests
    client: reqwest::Client,

    /// Update endpoint
    base_url: String,

    /// Per-request timeout
    timeout: Duration,

    /// Attempts and backoff for `update_record_with_retry`
    retry: RetryPolicy,
}

impl std::fmt::Debug for DuckDnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl DuckDnsClient {
    /// Create a client for the public DuckDNS endpoint with default retry
    pub fn new() -> Self {
        Self::with_options(None, DEFAULT_BASE_URL, RetryPolicy::default())
    }

    /// Create a client with explicit transport, endpoint and retry policy
    ///
    /// `client: None` builds a default client. An empty `base_url` falls back
    /// to the public DuckDNS endpoint.
    pub fn with_options(
        client: Option<reqwest::Client>,
        base_url: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        let client = client.unwrap_or_else(|| {
            reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default()
        });

        let mut base_url = base_url.into();
        if base_url.trim().is_empty() {
            base_url = DEFAULT_BASE_URL.to_string();
        }

        Self {
            client,
            base_url,
            timeout: DEFAULT_HTTP_TIMEOUT,
            retry,
        }
    }

    /// Create a client from the `update` section of the configuration
    pub fn from_config(config: &UpdateConfig) -> Self {
        Self::with_options(None, config.base_url.clone(), config.retry_policy())
            .with_timeout(config.timeout)
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The update endpoint
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One update request, without cancellation handling
    async fn send_update(&self, domain: &str, token: &str, ip: Ipv4Addr) -> Result<()> {
        tracing::info!(domain, %ip, url = %self.base_url, "sending DuckDNS update");

        let ip_param = ip.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("domains", domain), ("token", token), ("ip", ip_param.as_str())])
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            // reqwest errors embed the full URL, token included
            .map_err(|e| Error::request(&self.base_url, e.without_url()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::error!(domain, status = status.as_u16(), "DuckDNS returned non-200 status");
            return Err(Error::Status {
                url: self.base_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| {
            Error::request(&self.base_url, format!("failed to read response: {}", e.without_url()))
        })?;

        match UpdateReply::parse(&body) {
            UpdateReply::Accepted => {
                tracing::info!(domain, %ip, "DuckDNS update accepted");
                Ok(())
            }
            reply => {
                tracing::error!(domain, %ip, response = body.trim(), "DuckDNS update rejected");
                reply.into_result()
            }
        }
    }
}

impl Default for DuckDnsClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsProvider for DuckDnsClient {
    async fn update_record(
        &self,
        cancel: &CancellationToken,
        domain: &str,
        token: &str,
        ip: Ipv4Addr,
    ) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.send_update(domain, token, ip) => result,
        }
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn provider_name(&self) -> &'static str {
        "duckdns"
    }
}
