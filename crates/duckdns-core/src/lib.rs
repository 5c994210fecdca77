// # duckdns-core
//
// Core library for the DuckDNS updater.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for discovering the current public IPv4 address
// - **DnsProvider**: Trait for pushing an address to the dynamic-DNS provider,
//   with bounded, cancellable retry built in
// - **Scheduler**: Periodic fetch → compare → update loop with change detection
// - **RetryPolicy**: Immutable retry count + backoff sequence
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP implementations
// 2. **Explicit Cancellation**: One `CancellationToken` is threaded through every call
// 3. **Change Detection**: The provider is only called when the IP changed
// 4. **Library-First**: The daemon is a thin wrapper around this crate

pub mod traits;
pub mod scheduler;
pub mod retry;
pub mod config;
pub mod duration;
pub mod error;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerEvent, CheckOutcome};
pub use retry::RetryPolicy;
pub use config::AppConfig;
pub use error::{Error, ErrorKind, Result, SourceFailure, SourceFailureReason};
