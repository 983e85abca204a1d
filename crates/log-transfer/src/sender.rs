// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of one batch to its destination.
//!
//! A [`Sender`] gets the whole batch and answers success or failure. It does
//! not retry: the transfer loop decides what happens to a failed batch.

use std::io::Write;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use tracing::debug;
use zstd::stream::write::Encoder;

use crate::constants::{API_KEY_HEADER, DEFAULT_SEND_TIMEOUT};
use crate::error::{SendError, TransferError};

#[async_trait]
pub trait Sender: Send + Sync + 'static {
    /// Delivers `lines` in order. The loop awaits this call, so a slow
    /// destination holds up intake processing until it returns.
    async fn send(&self, lines: &[String]) -> Result<(), SendError>;
}

/// Adapts a plain function or closure into a [`Sender`].
pub struct SenderFn<F>(pub F);

#[async_trait]
impl<F> Sender for SenderFn<F>
where
    F: Fn(&[String]) -> Result<(), SendError> + Send + Sync + 'static,
{
    async fn send(&self, lines: &[String]) -> Result<(), SendError> {
        (self.0)(lines)
    }
}

#[derive(Debug, Clone)]
pub struct HttpSenderConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    /// zstd level; `None` sends the payload uncompressed.
    pub compression_level: Option<i32>,
    pub proxy_url: Option<String>,
}

impl HttpSenderConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        HttpSenderConfig {
            url: url.into(),
            api_key: None,
            timeout: DEFAULT_SEND_TIMEOUT,
            compression_level: None,
            proxy_url: None,
        }
    }
}

/// POSTs each batch as a JSON array of the already-encoded lines.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    compression_level: Option<i32>,
}

impl HttpSender {
    /// # Errors
    ///
    /// Blank URL, an API key that is not a valid header value, or a client
    /// that cannot be built (bad proxy).
    pub fn new(config: HttpSenderConfig) -> Result<Self, TransferError> {
        if config.url.trim().is_empty() {
            return Err(TransferError::BlankAddress);
        }

        let client = build_client(config.proxy_url.as_deref(), config.timeout)
            .map_err(|e| TransferError::HttpClient(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = config.api_key.as_deref() {
            let value = HeaderValue::from_str(api_key)
                .map_err(|e| TransferError::HttpClient(format!("invalid API key: {e}")))?;
            headers.insert(API_KEY_HEADER, value);
        }
        if config.compression_level.is_some() {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("zstd"));
        }

        Ok(HttpSender {
            client,
            url: config.url,
            headers,
            compression_level: config.compression_level,
        })
    }

    fn payload(&self, lines: &[String]) -> Result<Vec<u8>, SendError> {
        let body = join_lines(lines);
        match self.compression_level {
            Some(level) => encode(body.as_bytes(), level).map_err(SendError::Payload),
            None => Ok(body.into_bytes()),
        }
    }
}

#[async_trait]
impl Sender for HttpSender {
    async fn send(&self, lines: &[String]) -> Result<(), SendError> {
        if lines.is_empty() {
            return Ok(());
        }
        let body = self.payload(lines)?;
        let time = Instant::now();

        let resp = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| SendError::Request(e.to_string()))?;

        let status = resp.status();
        let elapsed = time.elapsed();
        if status.is_success() {
            debug!(
                "TRANSFER | Sent {} lines in {} ms",
                lines.len(),
                elapsed.as_millis()
            );
            Ok(())
        } else {
            Err(SendError::Status(status.as_u16()))
        }
    }
}

fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    builder.build()
}

/// Lines are JSON objects already; the payload is just their array.
fn join_lines(lines: &[String]) -> String {
    let capacity = lines.iter().map(String::len).sum::<usize>() + lines.len() + 2;
    let mut body = String::with_capacity(capacity);
    body.push('[');
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        body.push_str(line.trim_end());
    }
    body.push(']');
    body
}

fn encode(data: &[u8], level: i32) -> Result<Vec<u8>, String> {
    let mut encoder = Encoder::new(Vec::new(), level).map_err(|e| e.to_string())?;
    encoder.write_all(data).map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())
}
