//! Idle transaction expiry

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::json;
use std::time::Duration;
use testutils::test_fixture::{assert_errors, assert_no_errors, TestFixture};
use txn_endpoint::{ErrorKind, StatusCode};

#[test]
fn test_expired_transaction_is_invalid() {
    let fixture = TestFixture::short_lived();
    let location = fixture.begin_empty();
    assert_no_errors(&fixture.post_statements(&location, &["CREATE (n:Lost)"]));

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(fixture.endpoint().sweep_expired(), 1);

    let response = fixture.post_statements(&location, &["RETURN 1"]);
    assert_eq!(response.status, StatusCode::NotFound);
    assert_errors(&response, &[ErrorKind::InvalidTransactionId]);

    let commit = fixture.post(&format!("{}/commit", location), &json!({}));
    assert_eq!(commit.status, StatusCode::NotFound);
    assert_eq!(fixture.node_count(), 0);
    assert_eq!(fixture.endpoint().statistics().expired, 1);
    assert_eq!(fixture.engine().open_transaction_count(), 0);
}

#[test]
fn test_lookup_alone_does_not_reset_idle_timer() {
    let fixture = TestFixture::short_lived();
    let location = fixture.begin_empty();
    let id = location
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .expect("numeric id");

    std::thread::sleep(Duration::from_millis(150));
    assert!(fixture.endpoint().registry().acquire(id).is_ok());
    std::thread::sleep(Duration::from_millis(100));

    assert_eq!(fixture.endpoint().sweep_expired(), 1);
}

#[tokio::test]
async fn test_background_reaper_expires_idle_transactions() {
    let fixture = TestFixture::short_lived();
    assert!(fixture.endpoint().start_reaper());

    let location = fixture.begin_empty();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let response = fixture.post_statements(&location, &["RETURN 1"]);
    assert_eq!(response.status, StatusCode::NotFound);
    assert_errors(&response, &[ErrorKind::InvalidTransactionId]);

    fixture.endpoint().shutdown().await;
}

#[tokio::test]
async fn test_keep_alive_prevents_expiry() {
    let fixture = TestFixture::short_lived();
    assert!(fixture.endpoint().start_reaper());

    let location = fixture.begin_empty();
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let keep_alive = fixture.post(&location, &json!({"statements": []}));
        assert_eq!(keep_alive.status, StatusCode::Ok);
    }

    let commit = fixture.post(&format!("{}/commit", location), &json!({}));
    assert_eq!(commit.status, StatusCode::Ok);
    assert_no_errors(&commit);
    assert_eq!(fixture.endpoint().statistics().expired, 0);

    fixture.endpoint().shutdown().await;
}
