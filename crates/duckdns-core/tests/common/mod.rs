//! Test doubles and common utilities for scheduler contract tests
//!
//! These doubles stand in for the HTTP-backed implementations so the
//! scheduler and retry contracts can be checked without a network.

#![allow(dead_code)]

use duckdns_core::error::{Error, Result};
use duckdns_core::retry::RetryPolicy;
use duckdns_core::traits::{DnsProvider, IpSource};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// An IpSource that replays a script of results, repeating the last one
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<std::result::Result<Ipv4Addr, String>>>>,
    last: Arc<Mutex<Option<std::result::Result<Ipv4Addr, String>>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// Always return `ip`
    pub fn fixed(ip: Ipv4Addr) -> Self {
        Self::scripted(vec![Ok(ip)])
    }

    /// Return each entry once, then keep returning the last entry
    pub fn scripted(script: Vec<std::result::Result<Ipv4Addr, String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(None)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times current() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self, cancel: &CancellationToken) -> Result<Ipv4Addr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(entry) = next {
            *last = Some(entry);
        }

        match last.clone() {
            Some(Ok(ip)) => Ok(ip),
            Some(Err(msg)) => Err(Error::request("scripted://source", msg)),
            None => Err(Error::NoSourcesConfigured),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// A DnsProvider that records calls and fails a scripted number of times
#[derive(Clone)]
pub struct MockDnsProvider {
    /// Call counter for update_record()
    update_call_count: Arc<AtomicUsize>,
    /// Addresses passed to update_record(), in order
    updated_ips: Arc<Mutex<Vec<Ipv4Addr>>>,
    /// Number of upcoming calls that should fail
    failures_remaining: Arc<AtomicUsize>,
    retry: RetryPolicy,
}

impl MockDnsProvider {
    /// A provider that always succeeds and never retries
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::new(0, vec![Duration::from_millis(1)]))
    }

    pub fn with_policy(retry: RetryPolicy) -> Self {
        Self {
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updated_ips: Arc::new(Mutex::new(Vec::new())),
            failures_remaining: Arc::new(AtomicUsize::new(0)),
            retry,
        }
    }

    /// Make the next `n` calls fail with a provider rejection
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Get the addresses that were sent
    pub fn updated_ips(&self) -> Vec<Ipv4Addr> {
        self.updated_ips.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn update_record(
        &self,
        cancel: &CancellationToken,
        _domain: &str,
        _token: &str,
        ip: Ipv4Addr,
    ) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.updated_ips.lock().unwrap().push(ip);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::Rejected {
                response: "KO".to_string(),
            });
        }
        Ok(())
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Scheduler settings used across tests
pub fn test_config(interval: Duration) -> duckdns_core::SchedulerConfig {
    duckdns_core::SchedulerConfig::new(interval, "my-domain", "test-token")
}

pub fn ip(a: u8, b: u8, c: u8, d: u8) -> Ipv4Addr {
    Ipv4Addr::new(a, b, c, d)
}
