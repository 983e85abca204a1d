// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Defaults used when the environment does not say otherwise.

use std::time::Duration;

/// Capacity shared by the intake channel and the record pool.
pub const DEFAULT_CAPACITY: usize = 1000;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(5000);

/// Per-request timeout of the HTTP sender.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Header carrying the API key on HTTP sends.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Target prefix of this crate's own events. The ingress hook skips them so a
/// flush never produces records about itself.
pub(crate) const SELF_TARGET: &str = "log_transfer";
