//! Concurrent requests against shared transactions

#[path = "testutils/mod.rs"]
mod testutils;

use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use testutils::recording_executor::RecordingExecutor;
use testutils::test_fixture::{assert_errors, assert_no_errors, TestFixture, BASE_URI};
use txn_endpoint::{
    EndpointConfig, ErrorKind, Method, StatusCode, TransactionEndpoint, TransactionResponse,
};

fn recording_endpoint(statement_time: Duration) -> (RecordingExecutor, Arc<TransactionEndpoint>) {
    let executor = RecordingExecutor::new(statement_time);
    let config = EndpointConfig::default()
        .with_base_uri(BASE_URI)
        .with_slot_wait(Duration::from_millis(20));
    let endpoint = TransactionEndpoint::new(Arc::new(executor.clone()), config)
        .expect("Failed to create endpoint");
    (executor, Arc::new(endpoint))
}

fn body(statements: &[&str]) -> Vec<u8> {
    serde_json::to_vec(&TestFixture::statements(statements)).unwrap()
}

#[test]
fn test_concurrent_requests_on_one_transaction() {
    let (executor, endpoint) = recording_endpoint(Duration::from_millis(150));
    let begun = endpoint.handle_request(Method::Post, "/db/data/transaction", b"");
    let location = begun.location.expect("location");

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = ["first", "second"]
        .into_iter()
        .map(|name| {
            let endpoint = endpoint.clone();
            let barrier = barrier.clone();
            let location = location.clone();
            thread::spawn(move || {
                let statements = [format!("RETURN '{}-1'", name), format!("RETURN '{}-2'", name)];
                let statements: Vec<&str> = statements.iter().map(String::as_str).collect();
                barrier.wait();
                endpoint.handle_request(Method::Post, &location, &body(&statements))
            })
        })
        .collect();

    let responses: Vec<TransactionResponse> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker panicked"))
        .collect();

    let succeeded: Vec<_> = responses.iter().filter(|r| r.status == StatusCode::Ok).collect();
    let rejected: Vec<_> = responses
        .iter()
        .filter(|r| r.status == StatusCode::Conflict)
        .collect();
    assert_eq!(succeeded.len(), 1, "exactly one request may run");
    assert_eq!(rejected.len(), 1, "the other request must be rejected");

    assert_no_errors(succeeded[0]);
    assert_eq!(succeeded[0].body.results.len(), 2);
    assert_errors(rejected[0], &[ErrorKind::ConcurrentRequest]);
    assert!(rejected[0].body.results.is_empty());

    assert_eq!(executor.events().len(), 4, "only the winning batch ran");
    assert!(executor.is_serialized(), "executions interleaved: {:?}", executor.events());

    // Contention must not roll the transaction back.
    let commit = endpoint.handle_request(Method::Post, &format!("{}/commit", location), b"");
    assert_eq!(commit.status, StatusCode::Ok);
    assert_no_errors(&commit);
}

#[test]
fn test_sequential_requests_wait_for_slot() {
    let (executor, endpoint) = recording_endpoint(Duration::from_millis(5));
    let location = endpoint
        .handle_request(Method::Post, "/db/data/transaction", b"")
        .location
        .expect("location");

    for i in 0..5 {
        let statement = format!("RETURN {}", i);
        let response = endpoint.handle_request(Method::Post, &location, &body(&[statement.as_str()]));
        assert_eq!(response.status, StatusCode::Ok);
    }
    assert_eq!(executor.events().len(), 10);
    assert!(executor.is_serialized());
}

#[test]
fn test_parallel_transactions_get_distinct_ids() {
    let fixture = Arc::new(TestFixture::new());

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let fixture = fixture.clone();
            thread::spawn(move || {
                let statement = format!("CREATE (n:Worker {{n: {}}})", i);
                let (_, location) = fixture.begin(&[statement.as_str()]);
                let commit = fixture.post(&format!("{}/commit", location), &json!({}));
                assert_no_errors(&commit);
                location
            })
        })
        .collect();

    let locations: HashSet<String> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker panicked"))
        .collect();

    assert_eq!(locations.len(), 8);
    assert_eq!(fixture.count_via_endpoint(Some("Worker")), 8);
    assert_eq!(fixture.endpoint().statistics().committed, 9);
}

#[test]
fn test_reaper_skips_transaction_in_use() {
    let executor = RecordingExecutor::new(Duration::from_millis(200));
    let config = EndpointConfig::default()
        .with_base_uri(BASE_URI)
        .with_idle_timeout(Duration::from_millis(50));
    let endpoint = Arc::new(TransactionEndpoint::new(Arc::new(executor), config).unwrap());

    let location = endpoint
        .handle_request(Method::Post, "/db/data/transaction", b"")
        .location
        .expect("location");
    thread::sleep(Duration::from_millis(80));

    // The long statement holds the slot while the transaction is already idle.
    let worker = {
        let endpoint = endpoint.clone();
        let location = location.clone();
        thread::spawn(move || endpoint.handle_request(Method::Post, &location, &body(&["RETURN 'slow'"])))
    };
    thread::sleep(Duration::from_millis(50));
    assert_eq!(endpoint.sweep_expired(), 0, "a handle in use must not be expired");

    let response = worker.join().expect("worker panicked");
    assert_eq!(response.status, StatusCode::Ok);
    assert_no_errors(&response);

    // The request touched the handle when it finished, so it is not idle yet.
    assert_eq!(endpoint.sweep_expired(), 0);
    thread::sleep(Duration::from_millis(80));
    assert_eq!(endpoint.sweep_expired(), 1);

    let gone = endpoint.handle_request(Method::Post, &location, b"");
    assert_eq!(gone.status, StatusCode::NotFound);
    assert_errors(&gone, &[ErrorKind::InvalidTransactionId]);
}
