// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration.

use crate::error::Error;

use serde::Deserialize;

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bound on every request/response call between actors.
    pub ask_timeout_ms: u64,
    /// Karma a user needs to create a subreddit.
    pub subreddit_karma_threshold: i64,
    /// Karma of a freshly registered user.
    pub initial_karma: i64,
    /// Feed size when the caller gives no limit.
    pub feed_limit: usize,
    pub session_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ask_timeout_ms: 5000,
            subreddit_karma_threshold: 100,
            initial_karma: 0,
            feed_limit: 25,
            session_ttl_secs: 86_400,
        }
    }
}

impl EngineConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml(source: &str) -> Result<Self, Error> {
        toml::from_str(source).map_err(|e| {
            Error::invalid_input(format!("Invalid engine configuration: {}", e))
                .with_cause(e)
        })
    }

    pub fn ask_timeout(&self) -> Duration {
        Duration::from_millis(self.ask_timeout_ms)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        // Capped at a century.
        let secs = self.session_ttl_secs.min(100 * 365 * 86_400);
        chrono::Duration::seconds(secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            ask_timeout_ms = 250
            subreddit_karma_threshold = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.ask_timeout(), Duration::from_millis(250));
        assert_eq!(config.subreddit_karma_threshold, 10);
        assert_eq!(config.feed_limit, 25);
        assert_eq!(config.initial_karma, 0);
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_bad_toml_is_invalid_input() {
        let error = EngineConfig::from_toml("feed_limit = \"many\"").unwrap_err();
        assert_eq!(error.kind(), crate::ErrorKind::InvalidInput);
    }
}
