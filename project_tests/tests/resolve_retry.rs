//! Retry behavior: fixed delay, attempt budget, retryable outcomes.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use lib_weekresolver::{ConnectorError, FailureCause, RetryPolicy, WeekResolverConnector};
use project_tests::{DPF_201943_BODY, StubReply, StubServer, refused_base_url};

const DELAY: Duration = Duration::from_millis(100);

fn policy() -> RetryPolicy {
    RetryPolicy::default().with_fixed_delay(DELAY)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 10, 10).unwrap()
}

#[tokio::test]
async fn two_server_errors_then_success() {
    let stub = StubServer::start(vec![
        StubReply::status(500),
        StubReply::status(500),
        StubReply::ok(DPF_201943_BODY),
    ])
    .await;
    let connector = WeekResolverConnector::with_policy(stub.base_url(), policy()).unwrap();

    let started = Instant::now();
    let result = connector.resolve("dpf", date()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(result.week_code(), "DPF201943");
    assert_eq!(stub.hits(), 3);
    assert!(elapsed >= DELAY * 2, "only waited {elapsed:?}");
}

#[tokio::test]
async fn each_retryable_status_is_retried() {
    for status in [404, 500, 502] {
        let stub = StubServer::start(vec![
            StubReply::status(status),
            StubReply::ok(DPF_201943_BODY),
        ])
        .await;
        let connector = WeekResolverConnector::with_policy(
            stub.base_url(),
            RetryPolicy::default().with_fixed_delay(Duration::from_millis(10)),
        )
        .unwrap();

        let result = connector.resolve("DPF", date()).await.unwrap();
        assert_eq!(result.week_code(), "DPF201943");
        assert_eq!(stub.hits(), 2, "status {status}");
    }
}

#[tokio::test]
async fn not_found_on_every_attempt_exhausts_budget() {
    let stub = StubServer::always(StubReply::status(404)).await;
    let connector = WeekResolverConnector::with_policy(stub.base_url(), policy()).unwrap();

    let started = Instant::now();
    let err = connector.resolve("DPF", date()).await.unwrap_err();

    assert!(
        matches!(
            err,
            ConnectorError::ServiceUnavailable {
                attempts: 4,
                cause: FailureCause::Status(404)
            }
        ),
        "{err:?}"
    );
    assert_eq!(stub.hits(), 4);
    assert!(started.elapsed() >= DELAY * 3);
}

#[tokio::test]
async fn custom_budget_limits_attempts() {
    let stub = StubServer::always(StubReply::status(502)).await;
    let connector = WeekResolverConnector::with_policy(
        stub.base_url(),
        RetryPolicy::default()
            .with_fixed_delay(Duration::from_millis(10))
            .with_max_retries(1),
    )
    .unwrap();

    let err = connector.resolve("DPF", date()).await.unwrap_err();

    assert!(matches!(err, ConnectorError::ServiceUnavailable { attempts: 2, .. }));
    assert_eq!(stub.hits(), 2);
}

#[tokio::test]
async fn zero_retries_means_single_attempt() {
    let stub = StubServer::always(StubReply::status(500)).await;
    let connector = WeekResolverConnector::with_policy(
        stub.base_url(),
        RetryPolicy::default().with_max_retries(0),
    )
    .unwrap();

    let err = connector.resolve("DPF", date()).await.unwrap_err();

    assert!(matches!(err, ConnectorError::ServiceUnavailable { attempts: 1, .. }));
    assert_eq!(stub.hits(), 1);
}

#[tokio::test]
async fn refused_connection_is_retried_then_unavailable() {
    let base = refused_base_url().await;
    let connector = WeekResolverConnector::with_policy(
        &base,
        RetryPolicy::default().with_fixed_delay(Duration::from_millis(20)),
    )
    .unwrap();

    let started = Instant::now();
    let err = connector.resolve("DPF", date()).await.unwrap_err();

    assert!(
        matches!(
            err,
            ConnectorError::ServiceUnavailable {
                attempts: 4,
                cause: FailureCause::Transport(_)
            }
        ),
        "{err:?}"
    );
    assert!(started.elapsed() >= Duration::from_millis(60));
}

#[tokio::test]
async fn refused_connection_without_transport_retry_fails_at_once() {
    let base = refused_base_url().await;
    let connector = WeekResolverConnector::with_policy(
        &base,
        RetryPolicy::default()
            .with_fixed_delay(Duration::from_secs(5))
            .with_retry_on_transport_failure(false),
    )
    .unwrap();

    let started = Instant::now();
    let err = connector.resolve("DPF", date()).await.unwrap_err();

    assert!(matches!(err, ConnectorError::Transport(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}
