// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Write side of the bounded channel feeding the transfer loop.
//!
//! Overflow policy is drop: [`Intake::send`] never waits. A full or closed
//! channel hands the line back and bumps a shared counter, so a burst of log
//! records can never stall the thread that emitted them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::IntakeError;

/// Cloneable, write-only handle to a transfer's intake channel.
#[derive(Clone, Debug)]
pub struct Intake {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
}

impl Intake {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let intake = Intake {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (intake, rx)
    }

    /// Enqueues one encoded line without blocking.
    ///
    /// # Errors
    ///
    /// `Full` when the channel is at capacity, `Closed` once the transfer has
    /// begun draining. Both count towards [`dropped`](Self::dropped).
    pub fn send(&self, line: String) -> Result<(), IntakeError> {
        self.tx.try_send(line).map_err(|e| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match e {
                TrySendError::Full(line) => IntakeError::Full(line),
                TrySendError::Closed(line) => IntakeError::Closed(line),
            }
        })
    }

    /// Lines refused so far, across every clone of this handle.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
