//! Contract Test: Change Detection
//!
//! Constraints verified:
//! - The first cycle always publishes (nothing observed yet)
//! - An unchanged IP never reaches the provider
//! - State only moves after a confirmed update
//! - Fetch and update failures are absorbed, never fatal

mod common;

use common::*;
use duckdns_core::{CheckOutcome, Scheduler, SchedulerEvent};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn first_cycle_updates_once_and_second_cycle_skips() {
    let source = ScriptedIpSource::fixed(ip(1, 2, 3, 4));
    let provider = MockDnsProvider::new();

    let (mut scheduler, _events) = Scheduler::new(
        Box::new(source.clone()),
        Box::new(provider.clone()),
        test_config(Duration::from_secs(60)),
    )
    .expect("scheduler construction succeeds");
    let cancel = CancellationToken::new();

    assert_eq!(scheduler.last_ip(), None);

    let first = scheduler.check_and_update(&cancel).await;
    assert_eq!(first, CheckOutcome::Updated(ip(1, 2, 3, 4)));
    assert_eq!(provider.update_call_count(), 1);
    assert_eq!(scheduler.last_ip(), Some(ip(1, 2, 3, 4)));

    let second = scheduler.check_and_update(&cancel).await;
    assert_eq!(second, CheckOutcome::Unchanged(ip(1, 2, 3, 4)));
    assert_eq!(
        provider.update_call_count(),
        1,
        "unchanged IP must not trigger a provider call"
    );
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn changed_ip_triggers_new_update() {
    let source = ScriptedIpSource::scripted(vec![Ok(ip(1, 2, 3, 4)), Ok(ip(5, 6, 7, 8))]);
    let provider = MockDnsProvider::new();

    let (mut scheduler, mut events) = Scheduler::new(
        Box::new(source),
        Box::new(provider.clone()),
        test_config(Duration::from_secs(60)),
    )
    .unwrap();
    let cancel = CancellationToken::new();

    scheduler.check_and_update(&cancel).await;
    scheduler.check_and_update(&cancel).await;

    assert_eq!(provider.updated_ips(), vec![ip(1, 2, 3, 4), ip(5, 6, 7, 8)]);
    assert_eq!(scheduler.last_ip(), Some(ip(5, 6, 7, 8)));

    let mut succeeded = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SchedulerEvent::UpdateSucceeded { previous_ip, new_ip } = event {
            succeeded.push((previous_ip, new_ip));
        }
    }
    assert_eq!(
        succeeded,
        vec![(None, ip(1, 2, 3, 4)), (Some(ip(1, 2, 3, 4)), ip(5, 6, 7, 8))]
    );
}

#[tokio::test]
async fn failed_update_leaves_state_so_next_cycle_retries() {
    let source = ScriptedIpSource::fixed(ip(10, 0, 0, 1));
    let provider = MockDnsProvider::new();
    provider.fail_next(1);

    let (mut scheduler, _events) = Scheduler::new(
        Box::new(source),
        Box::new(provider.clone()),
        test_config(Duration::from_secs(60)),
    )
    .unwrap();
    let cancel = CancellationToken::new();

    let first = scheduler.check_and_update(&cancel).await;
    assert_eq!(first, CheckOutcome::UpdateFailed(ip(10, 0, 0, 1)));
    assert_eq!(scheduler.last_ip(), None);

    let second = scheduler.check_and_update(&cancel).await;
    assert_eq!(second, CheckOutcome::Updated(ip(10, 0, 0, 1)));
    assert_eq!(provider.update_call_count(), 2);
}

#[tokio::test]
async fn fetch_failure_is_absorbed() {
    let source = ScriptedIpSource::scripted(vec![
        Ok(ip(1, 1, 1, 1)),
        Err("connection refused".to_string()),
        Ok(ip(1, 1, 1, 1)),
    ]);
    let provider = MockDnsProvider::new();

    let (mut scheduler, mut events) = Scheduler::new(
        Box::new(source),
        Box::new(provider.clone()),
        test_config(Duration::from_secs(60)),
    )
    .unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(
        scheduler.check_and_update(&cancel).await,
        CheckOutcome::Updated(ip(1, 1, 1, 1))
    );
    assert_eq!(
        scheduler.check_and_update(&cancel).await,
        CheckOutcome::FetchFailed
    );
    assert_eq!(scheduler.last_ip(), Some(ip(1, 1, 1, 1)));
    assert_eq!(
        scheduler.check_and_update(&cancel).await,
        CheckOutcome::Unchanged(ip(1, 1, 1, 1))
    );
    assert_eq!(provider.update_call_count(), 1);

    let saw_fetch_failure = std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| matches!(e, SchedulerEvent::FetchFailed { .. }));
    assert!(saw_fetch_failure);
}

#[tokio::test]
async fn construction_rejects_missing_credentials() {
    let result = Scheduler::new(
        Box::new(ScriptedIpSource::fixed(ip(1, 2, 3, 4))),
        Box::new(MockDnsProvider::new()),
        duckdns_core::SchedulerConfig::new(Duration::from_secs(60), "my-domain", ""),
    );
    tokio_test::assert_err!(result.map(|_| ()));
}

#[tokio::test]
async fn construction_rejects_interval_that_cannot_be_scheduled() {
    let result = Scheduler::new(
        Box::new(ScriptedIpSource::fixed(ip(1, 2, 3, 4))),
        Box::new(MockDnsProvider::new()),
        test_config(Duration::from_secs(u64::MAX)),
    );
    assert!(matches!(result, Err(duckdns_core::Error::Config(_))));
}
