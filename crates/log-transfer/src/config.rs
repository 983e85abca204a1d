// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CAPACITY, DEFAULT_FLUSH_INTERVAL, DEFAULT_LOG_LEVEL, DEFAULT_SEND_TIMEOUT,
};
use crate::error::TransferError;
use crate::sender::HttpSenderConfig;

#[derive(Debug, Clone)]
pub struct TransferConfig {
    pub url: String,
    pub api_key: Option<String>,
    /// intake channel and record pool capacity, in lines
    pub capacity: usize,
    pub flush_interval: Duration,
    /// timeout of each HTTP send
    pub timeout: Duration,
    pub compression_level: Option<i32>,
    pub identifier_field: Option<String>,
    pub identifier_value: Option<String>,
    pub operation_key: Option<String>,
    pub log_level: String,
    /// also print records to stdout
    pub console: bool,
    pub proxy_url: Option<String>,
}

impl TransferConfig {
    /// Reads `LOG_TRANSFER_*` variables. Malformed numbers fall back to their
    /// defaults; zero values are left for the transfer to reject.
    ///
    /// # Errors
    ///
    /// `LOG_TRANSFER_URL` unset or blank.
    pub fn from_env() -> Result<Self, TransferError> {
        let url = env::var("LOG_TRANSFER_URL").unwrap_or_default();
        if url.trim().is_empty() {
            return Err(TransferError::BlankAddress);
        }

        let capacity = parse_env("LOG_TRANSFER_CAPACITY").unwrap_or(DEFAULT_CAPACITY);
        let flush_interval = parse_env("LOG_TRANSFER_FLUSH_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_FLUSH_INTERVAL);
        let timeout = parse_env("LOG_TRANSFER_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SEND_TIMEOUT);
        let console = env::var("LOG_TRANSFER_CONSOLE")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(TransferConfig {
            url: url.trim().to_string(),
            api_key: non_blank_env("LOG_TRANSFER_API_KEY"),
            capacity,
            flush_interval,
            timeout,
            compression_level: parse_env("LOG_TRANSFER_COMPRESSION_LEVEL"),
            identifier_field: non_blank_env("LOG_TRANSFER_IDENTIFIER_FIELD"),
            identifier_value: non_blank_env("LOG_TRANSFER_IDENTIFIER_VALUE"),
            operation_key: non_blank_env("LOG_TRANSFER_OPERATION_KEY"),
            log_level: env::var("LOG_TRANSFER_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
            console,
            proxy_url: env::var("HTTPS_PROXY").ok(),
        })
    }

    #[must_use]
    pub fn sender_config(&self) -> HttpSenderConfig {
        HttpSenderConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            timeout: self.timeout,
            compression_level: self.compression_level,
            proxy_url: self.proxy_url.clone(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|val| val.trim().parse::<T>().ok())
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 11] = [
        "LOG_TRANSFER_URL",
        "LOG_TRANSFER_API_KEY",
        "LOG_TRANSFER_CAPACITY",
        "LOG_TRANSFER_FLUSH_INTERVAL_MS",
        "LOG_TRANSFER_TIMEOUT_SECS",
        "LOG_TRANSFER_COMPRESSION_LEVEL",
        "LOG_TRANSFER_IDENTIFIER_FIELD",
        "LOG_TRANSFER_IDENTIFIER_VALUE",
        "LOG_TRANSFER_OPERATION_KEY",
        "LOG_TRANSFER_LOG_LEVEL",
        "LOG_TRANSFER_CONSOLE",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_error_if_no_url() {
        clear_env();
        let config = TransferConfig::from_env();
        assert!(matches!(config, Err(TransferError::BlankAddress)));

        env::set_var("LOG_TRANSFER_URL", "   ");
        let config = TransferConfig::from_env();
        assert!(matches!(config, Err(TransferError::BlankAddress)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        env::set_var("LOG_TRANSFER_URL", "http://127.0.0.1:3333/logs");
        let config = TransferConfig::from_env().expect("config should load");

        assert_eq!(config.url, "http://127.0.0.1:3333/logs");
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
        assert_eq!(config.timeout, DEFAULT_SEND_TIMEOUT);
        assert_eq!(config.compression_level, None);
        assert_eq!(config.identifier_field, None);
        assert_eq!(config.operation_key, None);
        assert_eq!(config.log_level, "info");
        assert!(config.console);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        env::set_var("LOG_TRANSFER_URL", "http://127.0.0.1:3333/logs");
        env::set_var("LOG_TRANSFER_API_KEY", "secret");
        env::set_var("LOG_TRANSFER_CAPACITY", "42");
        env::set_var("LOG_TRANSFER_FLUSH_INTERVAL_MS", "250");
        env::set_var("LOG_TRANSFER_TIMEOUT_SECS", "3");
        env::set_var("LOG_TRANSFER_COMPRESSION_LEVEL", "6");
        env::set_var("LOG_TRANSFER_IDENTIFIER_FIELD", "service");
        env::set_var("LOG_TRANSFER_IDENTIFIER_VALUE", "checkout");
        env::set_var("LOG_TRANSFER_OPERATION_KEY", "request_id");
        env::set_var("LOG_TRANSFER_LOG_LEVEL", "DEBUG");
        env::set_var("LOG_TRANSFER_CONSOLE", "false");
        let config = TransferConfig::from_env().expect("config should load");

        assert_eq!(config.capacity, 42);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.log_level, "debug");
        assert!(!config.console);
        assert_eq!(config.identifier_field.as_deref(), Some("service"));
        assert_eq!(config.identifier_value.as_deref(), Some("checkout"));
        assert_eq!(config.operation_key.as_deref(), Some("request_id"));

        let sender = config.sender_config();
        assert_eq!(sender.api_key.as_deref(), Some("secret"));
        assert_eq!(sender.timeout, Duration::from_secs(3));
        assert_eq!(sender.compression_level, Some(6));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_malformed_numbers_fall_back() {
        clear_env();
        env::set_var("LOG_TRANSFER_URL", "http://127.0.0.1:3333/logs");
        env::set_var("LOG_TRANSFER_CAPACITY", "lots");
        env::set_var("LOG_TRANSFER_FLUSH_INTERVAL_MS", "-5");
        let config = TransferConfig::from_env().expect("config should load");

        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
        clear_env();
    }
}
