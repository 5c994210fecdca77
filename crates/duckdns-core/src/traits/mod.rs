//! Core traits for the DuckDNS updater
//!
//! - [`IpSource`]: Discover the current public IPv4 address
//! - [`DnsProvider`]: Push a new address to the dynamic-DNS provider

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::DnsProvider;
