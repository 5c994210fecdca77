//! Periodic check-and-update scheduler
//!
//! The Scheduler is responsible for:
//! - Fetching the current public IP via an IpSource
//! - Comparing it to the last successfully published IP
//! - Calling the DnsProvider (with retry) only when it changed
//! - Recording the new IP after a confirmed update
//!
//! ## Architecture
//!
//! ```text
//!             tick / startup
//!                   │
//!                   ▼
//!           ┌──────────────┐   current()   ┌─────────────┐
//!           │  Scheduler   │──────────────▶│  IpSource   │
//!           │  (last_ip)   │               └─────────────┘
//!           └──────────────┘
//!                   │ changed?
//!                   ▼
//!           ┌──────────────────────────┐
//!           │ DnsProvider              │
//!           │ update_record_with_retry │
//!           └──────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! Idle ⇄ Executing-check, then Stopped once the cancellation token fires.
//! Cycles never overlap: a check (including its retries and backoff sleeps)
//! finishes before the next tick is considered.

use crate::config::MAX_INTERVAL;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpSource};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the scheduler's event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Scheduler started
    Started {
        interval: Duration,
    },

    /// Current IP fetched
    IpFetched {
        ip: Ipv4Addr,
    },

    /// No IP could be fetched this cycle
    FetchFailed {
        error: String,
    },

    /// Fetched IP differs from the last published one
    IpChangeDetected {
        previous_ip: Option<Ipv4Addr>,
        new_ip: Ipv4Addr,
    },

    /// Update skipped (no change)
    UpdateSkipped {
        current_ip: Ipv4Addr,
    },

    /// Provider confirmed the update
    UpdateSucceeded {
        previous_ip: Option<Ipv4Addr>,
        new_ip: Ipv4Addr,
    },

    /// Update failed after retries
    UpdateFailed {
        ip: Ipv4Addr,
        error: String,
    },

    /// Scheduler stopped
    Stopped {
        reason: String,
    },
}

/// What a single check cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Fetching failed; state untouched
    FetchFailed,
    /// Fetched IP equals the last published IP; provider not called
    Unchanged(Ipv4Addr),
    /// Provider confirmed the new IP; state updated
    Updated(Ipv4Addr),
    /// Provider failed; state untouched so the next cycle tries again
    UpdateFailed(Ipv4Addr),
    /// The cancellation token ended the cycle; state untouched
    Cancelled,
}

/// Static settings for a [`Scheduler`]
#[derive(Clone)]
pub struct SchedulerConfig {
    /// Time between checks
    pub interval: Duration,
    /// Domain to keep up to date
    pub domain: String,
    /// Provider credential
    /// ⚠️ NEVER log this value
    pub token: String,
    /// Capacity of the event channel
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    /// Create settings with the default event channel capacity
    pub fn new(interval: Duration, domain: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            interval,
            domain: domain.into(),
            token: token.into(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::config("scheduler interval must be positive"));
        }
        if self.interval > MAX_INTERVAL {
            return Err(Error::config(format!(
                "scheduler interval {:?} exceeds the maximum of {:?}",
                self.interval, MAX_INTERVAL
            )));
        }
        if self.domain.trim().is_empty() {
            return Err(Error::config("domain cannot be empty"));
        }
        if self.token.trim().is_empty() {
            return Err(Error::config("token cannot be empty"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("interval", &self.interval)
            .field("domain", &self.domain)
            .field("token", &"<REDACTED>")
            .field("event_channel_capacity", &self.event_channel_capacity)
            .finish()
    }
}

/// Periodic IP check and DNS update driver
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Start with [`Scheduler::run()`], passing a cancellation token
/// 3. Runs until the token is cancelled
///
/// ## Threading
///
/// All work happens on the task that calls `run()`. `last_ip` is only ever
/// touched from there, so no locking is needed.
pub struct Scheduler {
    /// Where the current IP comes from
    ip_source: Box<dyn IpSource>,

    /// Where updates go
    provider: Box<dyn DnsProvider>,

    /// Interval, domain and token
    config: SchedulerConfig,

    /// Last IP the provider confirmed; `None` until the first success
    last_ip: Option<Ipv4Addr>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields scheduler events
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the interval is zero or above
    /// [`crate::config::MAX_INTERVAL`], or the domain or token is blank.
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: SchedulerConfig,
    ) -> Result<(Self, mpsc::Receiver<SchedulerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        info!(
            interval = ?config.interval,
            domain = %config.domain,
            source = %ip_source.describe(),
            provider = provider.provider_name(),
            "scheduler initialized"
        );

        let scheduler = Self {
            ip_source,
            provider,
            config,
            last_ip: None,
            event_tx: tx,
        };

        Ok((scheduler, rx))
    }

    /// Last IP the provider confirmed
    pub fn last_ip(&self) -> Option<Ipv4Addr> {
        self.last_ip
    }

    /// Run until `cancel` fires
    ///
    /// Performs one check immediately, then one per interval. Fetch and
    /// update failures are logged and never end the loop.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(interval = ?self.config.interval, domain = %self.config.domain, "scheduler starting");
        self.emit_event(SchedulerEvent::Started {
            interval: self.config.interval,
        });

        if !cancel.is_cancelled() {
            self.check_and_update(&cancel).await;
        }

        let mut interval = tokio::time::interval_at(
            Instant::now() + self.config.interval,
            self.config.interval,
        );
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(interval);

        loop {
            tokio::select! {
                // Cancellation wins over a tick that is ready at the same time
                biased;

                _ = cancel.cancelled() => {
                    info!("scheduler stopping: cancelled");
                    self.emit_event(SchedulerEvent::Stopped {
                        reason: "cancelled".to_string(),
                    });
                    break;
                }

                Some(_) = ticks.next() => {
                    self.check_and_update(&cancel).await;
                }
            }
        }
    }

    /// Run one fetch / compare / update cycle
    pub async fn check_and_update(&mut self, cancel: &CancellationToken) -> CheckOutcome {
        debug!("starting IP check");

        let current_ip = match self.ip_source.current(cancel).await {
            Ok(ip) => ip,
            Err(e) if e.is_cancellation() => {
                info!("IP check interrupted by shutdown");
                return CheckOutcome::Cancelled;
            }
            Err(e) => {
                error!(error = %e, "failed to fetch current IP");
                self.emit_event(SchedulerEvent::FetchFailed {
                    error: e.to_string(),
                });
                return CheckOutcome::FetchFailed;
            }
        };

        debug!(ip = %current_ip, "fetched current IP");
        self.emit_event(SchedulerEvent::IpFetched { ip: current_ip });

        if self.last_ip == Some(current_ip) {
            info!(ip = %current_ip, "IP unchanged, skipping update");
            self.emit_event(SchedulerEvent::UpdateSkipped {
                current_ip,
            });
            return CheckOutcome::Unchanged(current_ip);
        }

        info!(
            old_ip = ?self.last_ip,
            new_ip = %current_ip,
            domain = %self.config.domain,
            "IP change detected"
        );
        self.emit_event(SchedulerEvent::IpChangeDetected {
            previous_ip: self.last_ip,
            new_ip: current_ip,
        });

        let result = self
            .provider
            .update_record_with_retry(cancel, &self.config.domain, &self.config.token, current_ip)
            .await;

        if let Err(e) = result {
            if e.is_cancellation() {
                info!(domain = %self.config.domain, ip = %current_ip, "DNS update interrupted by shutdown");
                return CheckOutcome::Cancelled;
            }
            error!(error = %e, domain = %self.config.domain, ip = %current_ip, "DNS update failed");
            self.emit_event(SchedulerEvent::UpdateFailed {
                ip: current_ip,
                error: e.to_string(),
            });
            return CheckOutcome::UpdateFailed(current_ip);
        }

        let previous_ip = self.last_ip.replace(current_ip);
        info!(domain = %self.config.domain, ip = %current_ip, "DNS update succeeded");
        self.emit_event(SchedulerEvent::UpdateSucceeded {
            previous_ip,
            new_ip: current_ip,
        });

        CheckOutcome::Updated(current_ip)
    }

    /// Emit a scheduler event
    fn emit_event(&self, event: SchedulerEvent) {
        // A full or closed channel must never stall the scheduler
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full or closed, dropping scheduler event");
        }
    }
}
