// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Asynchronous transfer of log lines to a remote destination.
//!
//! Records that clear the subscriber's level filter are encoded by the
//! [`hook::TransferLayer`] and pushed into a bounded intake channel. A single
//! background task ([`transfer::Transfer`]) moves them into a bounded pool and
//! hands the pool's contents to a [`sender::Sender`] on a fixed interval,
//! requeueing a failed batch once and making one last delivery attempt on
//! close.
//!
//! Delivery is best effort: a full intake, a full pool or a failed final send
//! all lose records, by design, to keep memory bounded and emitters unblocked.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod constants;
pub mod encoder;
pub mod error;
pub mod hook;
pub mod intake;
pub mod logger;
pub mod pool;
pub mod sender;
pub mod transfer;

pub use error::{IntakeError, SendError, TransferError};
pub use hook::TransferLayer;
pub use intake::Intake;
pub use sender::{HttpSender, HttpSenderConfig, Sender, SenderFn};
pub use transfer::Transfer;
