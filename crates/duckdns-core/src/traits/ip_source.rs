// # IP Source Trait
//
// Defines the interface for discovering the current public IPv4 address.
//
// ## Implementations
//
// - `duckdns-ip-http::HttpIpSource`: one HTTP endpoint
// - `duckdns-ip-http::FailoverIpSource`: ordered list of endpoints
//
// ## Usage
//
// ```rust,ignore
// use duckdns_core::IpSource;
// use tokio_util::sync::CancellationToken;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//     let cancel = CancellationToken::new();
//
//     let ip = source.current(&cancel).await?;
//     println!("public IP: {ip}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;
use tokio_util::sync::CancellationToken;

/// Trait for IP source implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - The returned address has already been validated as IPv4.
/// - `cancel` must be observed at every await point. A cancelled lookup
///   returns [`crate::Error::Cancelled`] rather than waiting out its timeout.
/// - No shared state is mutated. Deciding whether the address changed is the
///   [`crate::Scheduler`]'s job.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Fetch the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current address
    /// - `Err(Error)`: If no address could be determined
    async fn current(&self, cancel: &CancellationToken) -> Result<Ipv4Addr, crate::Error>;

    /// Short description for logs (e.g. the URL or "failover(3)")
    fn describe(&self) -> String;
}
