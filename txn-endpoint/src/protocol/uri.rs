// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Resource URIs handed out to clients

use crate::txn::TransactionId;

/// Builds transaction and commit URIs from the configured base URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriScheme {
    base_uri: String,
}

impl UriScheme {
    pub fn new(base_uri: impl Into<String>) -> Self {
        let base_uri = base_uri.into();
        Self {
            base_uri: base_uri.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Path component of the base URI (`/db/data` for `http://host:7474/db/data`)
    pub fn base_path(&self) -> &str {
        let after_scheme = match self.base_uri.find("://") {
            Some(pos) => &self.base_uri[pos + 3..],
            None => return &self.base_uri,
        };
        match after_scheme.find('/') {
            Some(pos) => &after_scheme[pos..],
            None => "",
        }
    }

    /// `{base}/transaction/{id}`
    pub fn transaction_uri(&self, id: TransactionId) -> String {
        format!("{}/transaction/{}", self.base_uri, id)
    }

    /// `{base}/transaction/{id}/commit`
    pub fn commit_uri(&self, id: TransactionId) -> String {
        format!("{}/commit", self.transaction_uri(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uris() {
        let uris = UriScheme::new("http://localhost:7474/db/data/");
        let id = TransactionId::from_u64(12);
        assert_eq!(uris.base_uri(), "http://localhost:7474/db/data");
        assert_eq!(
            uris.transaction_uri(id),
            "http://localhost:7474/db/data/transaction/12"
        );
        assert_eq!(
            uris.commit_uri(id),
            "http://localhost:7474/db/data/transaction/12/commit"
        );
    }

    #[test]
    fn test_base_path() {
        assert_eq!(UriScheme::new("http://localhost:7474/db/data").base_path(), "/db/data");
        assert_eq!(UriScheme::new("https://example.com").base_path(), "");
        assert_eq!(UriScheme::new("/db/data").base_path(), "/db/data");
    }
}
