// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction Endpoint - wires registry, handler, router and reaper together
//!
//! This is the entry point for embedding the transaction protocol. It owns:
//! - the transaction registry shared by all requests
//! - the session protocol handler and the request router
//! - the optional background expiry reaper

use crate::config::{ConfigError, EndpointConfig};
use crate::engine::StatementExecutor;
use crate::http::{Method, TransactionRouter};
use crate::protocol::{SessionProtocolHandler, TransactionResponse, UriScheme};
use crate::txn::{ExpiryReaper, ReaperHandle, TransactionRegistry, TransactionStatistics};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct TransactionEndpoint {
    config: EndpointConfig,
    registry: Arc<TransactionRegistry>,
    handler: Arc<SessionProtocolHandler>,
    router: TransactionRouter,
    reaper: Mutex<Option<ReaperHandle>>,
}

impl TransactionEndpoint {
    /// Create an endpoint on top of a statement executor
    ///
    /// # Example
    /// ```no_run
    /// use std::sync::Arc;
    /// use txn_endpoint::{EndpointConfig, MemoryEngine, TransactionEndpoint};
    ///
    /// let endpoint = TransactionEndpoint::new(Arc::new(MemoryEngine::new()), EndpointConfig::default())
    ///     .expect("valid configuration");
    /// assert_eq!(endpoint.statistics().open, 0);
    /// ```
    pub fn new(
        executor: Arc<dyn StatementExecutor>,
        config: EndpointConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Arc::new(TransactionRegistry::new(executor));
        let handler = Arc::new(SessionProtocolHandler::new(
            registry.clone(),
            UriScheme::new(config.base_uri.clone()),
            config.idle_timeout,
            config.slot_wait,
        ));
        let router = TransactionRouter::new(handler.clone());

        info!("ENDPOINT: serving transactions under {}", config.base_uri);
        Ok(Self {
            config,
            registry,
            handler,
            router,
            reaper: Mutex::new(None),
        })
    }

    /// Handle one request
    pub fn handle_request(&self, method: Method, path: &str, body: &[u8]) -> TransactionResponse {
        self.router.route(method, path, body)
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    pub fn handler(&self) -> &Arc<SessionProtocolHandler> {
        &self.handler
    }

    pub fn registry(&self) -> &Arc<TransactionRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &TransactionRouter {
        &self.router
    }

    pub fn statistics(&self) -> TransactionStatistics {
        self.registry.statistics()
    }

    fn expiry_reaper(&self) -> ExpiryReaper {
        ExpiryReaper::new(
            self.registry.clone(),
            self.config.idle_timeout,
            self.config.reaper_interval,
        )
    }

    /// Expire idle transactions now, returning how many were expired
    pub fn sweep_expired(&self) -> usize {
        self.expiry_reaper().sweep()
    }

    /// Start the background reaper on the current tokio runtime
    ///
    /// Returns `false` if it is already running.
    pub fn start_reaper(&self) -> bool {
        let mut reaper = self.reaper.lock();
        if reaper.as_ref().is_some_and(ReaperHandle::is_running) {
            return false;
        }
        *reaper = Some(self.expiry_reaper().spawn());
        true
    }

    pub fn is_reaper_running(&self) -> bool {
        self.reaper
            .lock()
            .as_ref()
            .is_some_and(ReaperHandle::is_running)
    }

    /// Roll back every open transaction, returning how many were rolled back
    pub fn rollback_all(&self) -> usize {
        self.registry
            .open_ids()
            .into_iter()
            .filter(|id| self.handler.rollback(*id).status.is_success())
            .count()
    }

    /// Stop the reaper and roll back whatever is still open
    pub async fn shutdown(&self) {
        let reaper = self.reaper.lock().take();
        if let Some(reaper) = reaper {
            reaper.shutdown().await;
        }
        let rolled_back = self.rollback_all();
        info!(
            "ENDPOINT: shut down, rolled back {} open transaction(s)",
            rolled_back
        );
    }
}
