//! Test fixture for transaction endpoint integration tests
//!
//! Every fixture owns its own in-memory engine and endpoint, so tests never
//! share transactions or data. Tests talk to the endpoint only through
//! `handle_request`, the way an HTTP server would.

use serde_json::{json, Value as Json};
use std::sync::Arc;
use txn_endpoint::{
    EndpointConfig, ErrorKind, MemoryEngine, Method, StatusCode, TransactionEndpoint,
    TransactionResponse,
};

pub const BASE_URI: &str = "http://localhost:7474/db/data";

/// Endpoint over an isolated in-memory engine
pub struct TestFixture {
    engine: MemoryEngine,
    endpoint: TransactionEndpoint,
}

impl TestFixture {
    /// Fixture with the default configuration
    pub fn new() -> Self {
        Self::with_config(EndpointConfig::default().with_base_uri(BASE_URI))
    }

    /// Fixture with short idle timeout and reaper interval
    pub fn short_lived() -> Self {
        Self::with_config(EndpointConfig::short_lived().with_base_uri(BASE_URI))
    }

    pub fn with_config(config: EndpointConfig) -> Self {
        Self::with_engine(MemoryEngine::new(), config)
    }

    pub fn with_engine(engine: MemoryEngine, config: EndpointConfig) -> Self {
        // Honour RUST_LOG while tests run; only the first fixture installs the logger.
        let _ = env_logger::builder().is_test(true).try_init();

        let endpoint = TransactionEndpoint::new(Arc::new(engine.clone()), config)
            .expect("Failed to create endpoint");
        Self { engine, endpoint }
    }

    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    pub fn endpoint(&self) -> &TransactionEndpoint {
        &self.endpoint
    }

    /// Committed node count
    pub fn node_count(&self) -> usize {
        self.engine.node_count()
    }

    /// `{"statements": [...]}` body for plain statements
    pub fn statements(statements: &[&str]) -> Json {
        json!({
            "statements": statements
                .iter()
                .map(|s| json!({"statement": s}))
                .collect::<Vec<_>>()
        })
    }

    pub fn post(&self, path: &str, body: &Json) -> TransactionResponse {
        let bytes = serde_json::to_vec(body).expect("Failed to encode body");
        self.endpoint.handle_request(Method::Post, path, &bytes)
    }

    pub fn post_raw(&self, path: &str, body: &[u8]) -> TransactionResponse {
        self.endpoint.handle_request(Method::Post, path, body)
    }

    pub fn post_statements(&self, path: &str, statements: &[&str]) -> TransactionResponse {
        self.post(path, &Self::statements(statements))
    }

    pub fn delete(&self, path: &str) -> TransactionResponse {
        self.endpoint.handle_request(Method::Delete, path, b"")
    }

    /// Begin a transaction running `statements`, returning the response and its location
    pub fn begin(&self, statements: &[&str]) -> (TransactionResponse, String) {
        let response = self.post_statements("/db/data/transaction", statements);
        assert_eq!(response.status, StatusCode::Created, "begin should answer 201");
        let location = response
            .location
            .clone()
            .expect("begin should return a Location");
        (response, location)
    }

    /// Begin an empty transaction and return its location
    pub fn begin_empty(&self) -> String {
        self.begin(&[]).1
    }

    /// Run statements in a single implicit transaction
    pub fn commit_new(&self, statements: &[&str]) -> TransactionResponse {
        self.post_statements("/db/data/transaction/commit", statements)
    }

    /// Count committed nodes through the endpoint itself
    pub fn count_via_endpoint(&self, label: Option<&str>) -> i64 {
        let pattern = match label {
            Some(label) => format!("(n:{})", label),
            None => "(n)".to_string(),
        };
        let statement = format!("MATCH {} RETURN count(n)", pattern);
        let response = self.commit_new(&[statement.as_str()]);
        assert!(response.body.errors.is_empty(), "{:?}", response.body.errors);
        let json = json_of(&response);
        json["results"][0]["data"][0][0]
            .as_i64()
            .expect("count should be an integer")
    }
}

/// Serialized response body
pub fn json_of(response: &TransactionResponse) -> Json {
    response.body.to_json()
}

/// Assert the response reports exactly these error codes
pub fn assert_errors(response: &TransactionResponse, expected: &[ErrorKind]) {
    assert_eq!(
        response.body.error_codes(),
        expected,
        "unexpected errors: {:?}",
        response.body.errors
    );
}

/// Assert the response reports no errors
pub fn assert_no_errors(response: &TransactionResponse) {
    assert_errors(response, &[]);
}
