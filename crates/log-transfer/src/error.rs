// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Configuration and lifecycle errors, surfaced synchronously to the caller.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Intake capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Flush interval must be greater than zero, got {0:?}")]
    ZeroInterval(Duration),

    #[error("Flush interval {0:?} is too long to schedule")]
    IntervalTooLong(Duration),

    #[error("Sender address is blank")]
    BlankAddress,

    #[error("Identifier field is blank but value {0:?} was supplied")]
    BlankIdentifierField(String),

    #[error("Operation key is blank")]
    BlankOperationKey,

    #[error("Transfer already started")]
    AlreadyStarted,

    #[error("No tokio runtime available to run the transfer loop")]
    NoRuntime,

    #[error("Logger is already installed")]
    LoggerAlreadyInstalled,

    #[error("Invalid log level filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Transfer loop terminated abnormally: {0}")]
    Join(String),
}

/// Failure reported by a [`crate::sender::Sender`] for one batch.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("Destination answered with status {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to prepare payload: {0}")]
    Payload(String),

    #[error("{0}")]
    Other(String),
}

/// Why a line was refused by the intake channel. The line is handed back.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Intake channel is full")]
    Full(String),

    #[error("Intake channel is closed")]
    Closed(String),
}

impl IntakeError {
    #[must_use]
    pub fn into_line(self) -> String {
        match self {
            IntakeError::Full(line) | IntakeError::Closed(line) => line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = TransferError::BlankIdentifierField("checkout".into());
        assert_eq!(
            error.to_string(),
            "Identifier field is blank but value \"checkout\" was supplied"
        );
        assert_eq!(
            SendError::Status(503).to_string(),
            "Destination answered with status 503"
        );
    }

    #[test]
    fn test_intake_error_returns_line() {
        let full = IntakeError::Full("a".to_string());
        let closed = IntakeError::Closed("b".to_string());
        assert_eq!(full.into_line(), "a");
        assert_eq!(closed.into_line(), "b");
    }
}
