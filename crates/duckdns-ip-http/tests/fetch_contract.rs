//! HTTP behaviour of the single and failover IP sources, against a local
//! mock server.

use duckdns_core::traits::IpSource;
use duckdns_core::{Error, SourceFailureReason};
use duckdns_ip_http::{FailoverIpSource, HttpIpSource, USER_AGENT};
use std::net::Ipv4Addr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate, hits: impl Into<Times>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .expect(hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn trims_and_validates_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ip"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_string("  203.0.113.7\n"))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpIpSource::new(format!("{}/ip", server.uri()));
    let ip = source.current(&CancellationToken::new()).await.unwrap();
    assert_eq!(ip, Ipv4Addr::new(203, 0, 113, 7));
}

#[tokio::test]
async fn non_200_is_a_status_error() {
    let server = MockServer::start().await;
    serve(&server, "/ip", ResponseTemplate::new(503), 1u64).await;

    let source = HttpIpSource::new(format!("{}/ip", server.uri()));
    let err = source.current(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Status { status: 503, .. }), "got {err:?}");
}

#[tokio::test]
async fn blank_body_is_an_empty_response_error() {
    let server = MockServer::start().await;
    serve(&server, "/ip", ResponseTemplate::new(200).set_body_string(" \n\t"), 1u64).await;

    let source = HttpIpSource::new(format!("{}/ip", server.uri()));
    let err = source.current(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::EmptyResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn ipv6_body_is_rejected() {
    let server = MockServer::start().await;
    serve(&server, "/ip", ResponseTemplate::new(200).set_body_string("::1"), 1u64).await;

    let source = HttpIpSource::new(format!("{}/ip", server.uri()));
    let err = source.current(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "got {err:?}");
}

#[tokio::test]
async fn slow_endpoint_times_out_as_request_error() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/ip",
        ResponseTemplate::new(200)
            .set_body_string("1.2.3.4")
            .set_delay(Duration::from_secs(5)),
        0..=1u64,
    )
    .await;

    let source = HttpIpSource::with_timeout(format!("{}/ip", server.uri()), Duration::from_millis(100));
    let err = source.current(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, Error::Request { .. }), "got {err:?}");
}

#[tokio::test]
async fn failover_returns_first_success_in_order() {
    let server = MockServer::start().await;
    serve(&server, "/bad1", ResponseTemplate::new(500), 1u64).await;
    serve(&server, "/bad2", ResponseTemplate::new(500), 1u64).await;
    serve(&server, "/good", ResponseTemplate::new(200).set_body_string("10.0.0.1"), 1u64).await;
    serve(&server, "/never", ResponseTemplate::new(200).set_body_string("10.0.0.2"), 0u64).await;

    let urls = ["/bad1", "/bad2", "/good", "/never"]
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();
    let source = FailoverIpSource::new(urls);

    let ip = source.current(&CancellationToken::new()).await.unwrap();
    assert_eq!(ip, Ipv4Addr::new(10, 0, 0, 1));

    let requests = server.received_requests().await.unwrap();
    let order: Vec<_> = requests.iter().map(|r| r.url.path().to_string()).collect();
    assert_eq!(order, vec!["/bad1", "/bad2", "/good"]);
}

#[tokio::test]
async fn failover_with_no_sources_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.2.3.4"))
        .expect(0)
        .mount(&server)
        .await;

    let err = FailoverIpSource::new(Vec::new())
        .current(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoSourcesConfigured));
}

#[tokio::test]
async fn failover_aggregates_every_failure_and_skips_blanks() {
    let server = MockServer::start().await;
    serve(&server, "/a", ResponseTemplate::new(500), 1u64).await;
    serve(&server, "/b", ResponseTemplate::new(200).set_body_string("not-an-ip"), 1u64).await;

    let a = format!("{}/a", server.uri());
    let b = format!("{}/b", server.uri());
    let source = FailoverIpSource::new(vec![a.clone(), "   ".to_string(), b.clone()]);

    let err = source.current(&CancellationToken::new()).await.unwrap_err();
    let Error::AllSourcesFailed(failures) = &err else {
        panic!("expected AllSourcesFailed, got {err:?}");
    };

    assert_eq!(failures.len(), 3);
    assert_eq!((failures[0].index, failures[0].url.as_str()), (0, a.as_str()));
    assert!(matches!(failures[0].reason, SourceFailureReason::Failed(ref m) if m.contains("500")));
    assert_eq!(failures[1].index, 1);
    assert_eq!(failures[1].reason, SourceFailureReason::Skipped);
    assert_eq!((failures[2].index, failures[2].url.as_str()), (2, b.as_str()));

    let message = err.to_string();
    assert!(message.contains(&a) && message.contains(&b));
}

#[tokio::test]
async fn cancellation_short_circuits_failover() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/slow",
        ResponseTemplate::new(200)
            .set_body_string("1.2.3.4")
            .set_delay(Duration::from_secs(30)),
        0..=1u64,
    )
    .await;
    serve(&server, "/next", ResponseTemplate::new(200).set_body_string("5.6.7.8"), 0u64).await;

    let source = FailoverIpSource::new(vec![
        format!("{}/slow", server.uri()),
        format!("{}/next", server.uri()),
    ]);

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = source.current(&cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}
