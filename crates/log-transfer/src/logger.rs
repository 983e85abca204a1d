// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Subscriber construction and the process-wide default.
//!
//! [`build_subscriber`] returns a subscriber that callers can scope explicitly
//! (`tracing::subscriber::with_default`) or pass around. [`init`] installs one
//! as the process default; that can happen once per process and a second
//! attempt is an error rather than a silent swap.

use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::TransferConfig;
use crate::constants::DEFAULT_LOG_LEVEL;
use crate::encoder::{EncoderConfig, JsonEncoder};
use crate::error::TransferError;
use crate::hook::TransferLayer;
use crate::sender::HttpSender;
use crate::transfer::Transfer;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// `EnvFilter` directives, e.g. `info` or `shop=debug,warn`.
    pub filter: String,
    pub console: bool,
    pub encoder: EncoderConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            filter: DEFAULT_LOG_LEVEL.to_string(),
            console: true,
            encoder: EncoderConfig::default(),
        }
    }
}

/// Registry → level filter → optional console output → optional transfer hook.
///
/// The hook only ever sees records the filter let through.
///
/// # Errors
///
/// `config.filter` does not parse.
pub fn build_subscriber(
    config: &LoggerConfig,
    transfer: Option<TransferLayer>,
) -> Result<impl Subscriber + Send + Sync, TransferError> {
    let env_filter = format!("h2=off,hyper=off,reqwest=off,rustls=off,{}", config.filter);
    let filter =
        EnvFilter::try_new(env_filter).map_err(|e| TransferError::InvalidFilter(e.to_string()))?;

    let encoder = JsonEncoder::new(config.encoder.clone());
    let console = config
        .console
        .then(|| fmt::layer().event_format(encoder.clone()));
    let transfer = transfer.map(|layer| layer.with_encoder(encoder));

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(transfer))
}

/// Installs the subscriber as the process default.
///
/// # Errors
///
/// Invalid filter, or a default subscriber is already installed.
pub fn init(config: &LoggerConfig, transfer: Option<TransferLayer>) -> Result<(), TransferError> {
    build_subscriber(config, transfer)?
        .try_init()
        .map_err(|_| TransferError::LoggerAlreadyInstalled)
}

/// Wires an HTTP transfer from `config`, starts it and installs the default
/// subscriber feeding it. Keep the returned transfer and
/// [`close`](Transfer::close) it on shutdown.
///
/// # Errors
///
/// Any configuration error, or no tokio runtime in scope.
pub fn install(config: &TransferConfig) -> Result<Transfer, TransferError> {
    let sender = HttpSender::new(config.sender_config())?;
    let mut transfer = Transfer::new(config.capacity, sender)?;

    let mut layer = TransferLayer::new(transfer.pool()).with_identifier(
        config.identifier_field.as_deref().unwrap_or_default(),
        config.identifier_value.as_deref().unwrap_or_default(),
    )?;
    if let Some(key) = config.operation_key.as_deref() {
        layer = layer.with_operation_key(key)?;
    }

    let logger_config = LoggerConfig {
        filter: config.log_level.clone(),
        console: config.console,
        ..Default::default()
    };
    // validated before the loop is spawned, so a bad filter leaves nothing running
    let subscriber = build_subscriber(&logger_config, Some(layer))?;

    transfer.start(config.flush_interval)?;
    subscriber
        .try_init()
        .map_err(|_| TransferError::LoggerAlreadyInstalled)?;

    Ok(transfer)
}
