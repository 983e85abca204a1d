// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The transfer: a single background task owning the record pool.
//!
//! ```text
//!   producers ──► Intake (bounded mpsc) ──► transfer loop ──► RecordPool
//!                                              │   every `delay`
//!                                              └──────────────► Sender
//! ```
//!
//! # Lifecycle
//!
//! `Created` (after [`Transfer::new`]) → `Running` (after
//! [`Transfer::start`]) → `Draining` (once [`Transfer::close`] fires the stop
//! signal) → `Terminated` (when `close` returns). `close` consumes the
//! transfer, so it cannot be closed twice or restarted.
//!
//! # Loop
//!
//! The loop waits on three sources and handles one event to completion before
//! looking at the next. The stop signal is checked first, then the flush
//! timer, then the intake, so a busy intake cannot starve flushes.
//!
//! - **intake**: the line is added to the pool; refused if the pool is full.
//! - **tick**: the pool is emptied and, if it held anything, sent. A failed
//!   batch is added back once, subject to the same capacity guard. No
//!   backoff, no retry count.
//! - **stop**: the intake is closed, its backlog drained, the pool's contents
//!   appended after that backlog, and the result sent once. The outcome of
//!   that last send is ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::TransferError;
use crate::intake::Intake;
use crate::pool::RecordPool;
use crate::sender::Sender;

pub struct Transfer {
    intake: Intake,
    cancel: CancellationToken,
    /// Present until the loop is spawned.
    idle: Option<TransferLoop>,
    task: Option<JoinHandle<()>>,
}

impl Transfer {
    /// Creates a transfer whose intake channel and pool both hold `capacity`
    /// lines.
    ///
    /// # Errors
    ///
    /// `capacity` is zero.
    pub fn new(capacity: usize, sender: impl Sender) -> Result<Self, TransferError> {
        Self::with_sender(capacity, Arc::new(sender))
    }

    /// Like [`new`](Self::new), for a sender that is already shared.
    ///
    /// # Errors
    ///
    /// `capacity` is zero.
    pub fn with_sender(capacity: usize, sender: Arc<dyn Sender>) -> Result<Self, TransferError> {
        if capacity == 0 {
            return Err(TransferError::ZeroCapacity);
        }

        let (intake, rx) = Intake::channel(capacity);
        let cancel = CancellationToken::new();
        let transfer_loop = TransferLoop {
            rx,
            pool: RecordPool::new(capacity),
            sender,
            cancel: cancel.clone(),
        };

        Ok(Transfer {
            intake,
            cancel,
            idle: Some(transfer_loop),
            task: None,
        })
    }

    /// Write-only handle to the intake channel, for the ingress hook.
    #[must_use]
    pub fn pool(&self) -> Intake {
        self.intake.clone()
    }

    #[must_use]
    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }

    /// Spawns the loop on the current tokio runtime, flushing every `delay`.
    /// The first flush happens one `delay` after the start.
    ///
    /// # Errors
    ///
    /// Zero `delay` or one too long to schedule, no runtime in scope, or the
    /// loop already running.
    pub fn start(&mut self, delay: Duration) -> Result<(), TransferError> {
        if delay.is_zero() {
            return Err(TransferError::ZeroInterval(delay));
        }
        let first_tick = Instant::now()
            .checked_add(delay)
            .ok_or(TransferError::IntervalTooLong(delay))?;
        let runtime = Handle::try_current().map_err(|_| TransferError::NoRuntime)?;
        let Some(transfer_loop) = self.idle.take() else {
            return Err(TransferError::AlreadyStarted);
        };

        self.task = Some(runtime.spawn(transfer_loop.run(first_tick, delay)));
        Ok(())
    }

    /// Stops the loop after one last delivery attempt and waits for it.
    ///
    /// Once this returns the intake is closed: [`Intake::send`] fails with
    /// `Closed`. A transfer that was never started drains inline.
    ///
    /// # Errors
    ///
    /// The loop task panicked or was aborted.
    pub async fn close(self) -> Result<(), TransferError> {
        self.cancel.cancel();

        if let Some(task) = self.task {
            task.await
                .map_err(|e| TransferError::Join(e.to_string()))?;
        } else if let Some(transfer_loop) = self.idle {
            transfer_loop.drain().await;
        }
        Ok(())
    }
}

struct TransferLoop {
    rx: mpsc::Receiver<String>,
    pool: RecordPool,
    sender: Arc<dyn Sender>,
    cancel: CancellationToken,
}

impl TransferLoop {
    async fn run(mut self, first_tick: Instant, delay: Duration) {
        debug!("TRANSFER | Loop started, flushing every {} ms", delay.as_millis());

        let mut ticker = interval_at(first_tick, delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => {
                    debug!("TRANSFER | Received stop signal, draining");
                    break;
                }
                _ = ticker.tick() => {
                    self.flush().await;
                }
                line = self.rx.recv() => match line {
                    Some(line) => self.admit(vec![line]),
                    None => {
                        debug!("TRANSFER | Every intake handle dropped, draining");
                        break;
                    }
                },
            }
        }

        self.drain().await;
        debug!("TRANSFER | Loop stopped");
    }

    fn admit(&mut self, lines: Vec<String>) {
        let count = lines.len();
        if !self.pool.add(lines) {
            debug!(
                "TRANSFER | Pool full ({} of {}), dropped {count} lines",
                self.pool.len(),
                self.pool.size()
            );
        }
    }

    async fn flush(&mut self) {
        let lines = self.pool.get_and_reset();
        if lines.is_empty() {
            return;
        }

        debug!("TRANSFER | Flushing {} lines", lines.len());
        if let Err(e) = self.sender.send(&lines).await {
            let count = lines.len();
            if self.pool.add(lines) {
                warn!("TRANSFER | Failed to send {count} lines, kept for next flush: {e}");
            } else {
                error!("TRANSFER | Failed to send {count} lines, pool full, dropped: {e}");
            }
        }
    }

    async fn drain(mut self) {
        self.rx.close();

        let mut lines = Vec::new();
        while let Some(line) = self.rx.recv().await {
            lines.push(line);
        }
        lines.extend(self.pool.get_and_reset());

        debug!("TRANSFER | Final flush of {} lines", lines.len());
        if let Err(e) = self.sender.send(&lines).await {
            debug!("TRANSFER | Final flush failed, {} lines lost: {e}", lines.len());
        }
    }
}
