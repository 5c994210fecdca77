// # DNS Provider Trait
//
// Defines the interface for pushing an address to a dynamic-DNS provider.
//
// ## Implementations
//
// - DuckDNS: `duckdns-provider` crate
//
// ## Usage
//
// ```rust,ignore
// use duckdns_core::DnsProvider;
// use tokio_util::sync::CancellationToken;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let cancel = CancellationToken::new();
//
//     provider
//         .update_record_with_retry(&cancel, "my-domain", "token", [1, 2, 3, 4].into())
//         .await?;
//
//     Ok(())
// }
// ```

use crate::retry::{RetryPolicy, retry_with_backoff};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use tokio_util::sync::CancellationToken;

/// Trait for DNS provider implementations
///
/// Implementations must be thread-safe and hold no per-call mutable state,
/// so one instance can serve concurrent callers.
///
/// Implementors write the single-shot [`DnsProvider::update_record`]; the
/// bounded, cancellable retry in [`DnsProvider::update_record_with_retry`]
/// comes for free from the provider's [`RetryPolicy`].
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Make exactly one update request
    ///
    /// # Parameters
    ///
    /// - `cancel`: Aborts the request at its next await point
    /// - `domain`: The dynamic-DNS name to update
    /// - `token`: Account credential (never logged)
    /// - `ip`: The new address
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The provider confirmed the update
    /// - `Err(Error)`: Transport, status or provider-level failure
    async fn update_record(
        &self,
        cancel: &CancellationToken,
        domain: &str,
        token: &str,
        ip: Ipv4Addr,
    ) -> Result<(), crate::Error>;

    /// The retry policy used by [`DnsProvider::update_record_with_retry`]
    fn retry_policy(&self) -> &RetryPolicy;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Call [`DnsProvider::update_record`] up to `1 + max_retries` times
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Cancelled`]: cancelled before an attempt began
    /// - [`crate::Error::CancelledDuringBackoff`]: cancelled between attempts
    /// - [`crate::Error::RetriesExhausted`]: every attempt failed
    async fn update_record_with_retry(
        &self,
        cancel: &CancellationToken,
        domain: &str,
        token: &str,
        ip: Ipv4Addr,
    ) -> Result<(), crate::Error> {
        tracing::info!(
            provider = self.provider_name(),
            domain,
            %ip,
            max_retries = self.retry_policy().max_retries(),
            "starting update"
        );

        retry_with_backoff(self.retry_policy(), cancel, self.provider_name(), move |_attempt| {
            self.update_record(cancel, domain, token, ip)
        })
        .await
        .inspect_err(|e| {
            if e.is_cancellation() {
                tracing::info!(provider = self.provider_name(), domain, %ip, "update cancelled");
            } else {
                tracing::error!(provider = self.provider_name(), domain, %ip, error = %e, "update failed");
            }
        })
    }
}
