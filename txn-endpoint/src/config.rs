// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Endpoint configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for the transaction endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Absolute URI the transaction resources live under
    pub base_uri: String,

    /// Inactivity after which an open transaction is rolled back
    #[serde(with = "duration_ms")]
    pub idle_timeout: Duration,

    /// Pause between two reaper sweeps
    #[serde(with = "duration_ms")]
    pub reaper_interval: Duration,

    /// How long a request waits for a busy transaction before giving up
    #[serde(with = "duration_ms")]
    pub slot_wait: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_uri: "http://localhost:7474/db/data".to_string(),
            idle_timeout: Duration::from_secs(60),
            reaper_interval: Duration::from_secs(1),
            slot_wait: Duration::from_millis(50),
        }
    }
}

impl EndpointConfig {
    /// Short timeouts for tests and local experiments
    pub fn short_lived() -> Self {
        Self {
            idle_timeout: Duration::from_millis(200),
            reaper_interval: Duration::from_millis(20),
            slot_wait: Duration::from_millis(10),
            ..Self::default()
        }
    }

    /// Load a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_reaper_interval(mut self, reaper_interval: Duration) -> Self {
        self.reaper_interval = reaper_interval;
        self
    }

    pub fn with_slot_wait(mut self, slot_wait: Duration) -> Self {
        self.slot_wait = slot_wait;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme_end = ["http://", "https://"]
            .iter()
            .find(|scheme| self.base_uri.starts_with(*scheme))
            .map(|scheme| scheme.len())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "base_uri must be an absolute http(s) URI, got '{}'",
                    self.base_uri
                ))
            })?;

        if self.base_uri.len() == scheme_end || self.base_uri[scheme_end..].starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "base_uri '{}' has no host",
                self.base_uri
            )));
        }
        if self.base_uri.ends_with('/') {
            return Err(ConfigError::Invalid(
                "base_uri must not end with '/'".to_string(),
            ));
        }

        for (name, value) in [
            ("idle_timeout", self.idle_timeout),
            ("reaper_interval", self.reaper_interval),
            ("slot_wait", self.slot_wait),
        ] {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{} must be greater than zero", name)));
            }
        }

        Ok(())
    }
}

/// Durations as whole milliseconds
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
