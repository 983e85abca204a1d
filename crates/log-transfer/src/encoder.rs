// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Final string form of a log record.
//!
//! One JSON object per line:
//!
//! ```text
//! {"ts":1718000000.123,"level":"info","logger":"shop::cart","msg":"item added","sku":"A-1"}
//! ```
//!
//! The same [`JsonEncoder`] backs both the console layer (through its
//! [`FormatEvent`] impl) and the ingress hook, so what reaches the sender is
//! byte-for-byte what the process prints.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_log::NormalizeEvent;
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

/// Structured fields of a record, in the order they were recorded.
pub type Fields = Vec<(String, Value)>;

/// Key names written into every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub time_key: String,
    pub level_key: String,
    pub target_key: String,
    pub message_key: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            time_key: "ts".to_string(),
            level_key: "level".to_string(),
            target_key: "logger".to_string(),
            message_key: "msg".to_string(),
        }
    }
}

/// A record that already cleared its level filter, before encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Fields,
}

impl Record {
    /// Captures `event`. Records bridged from the `log` crate keep their
    /// original target and level, and the bridge's `log.*` fields are dropped.
    #[must_use]
    pub fn from_event(event: &Event<'_>) -> Self {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let normalized = event.normalized_metadata();
        let metadata = normalized.as_ref().unwrap_or_else(|| event.metadata());
        Record {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Fields,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: Value) {
        if field.name().starts_with("log.") {
            return;
        }
        self.fields.push((field.name().to_string(), value));
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        // `info!("text")` arrives here as a pre-formatted `Arguments`
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.push(field, Value::from(format!("{value:?}")));
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonEncoder {
    config: EncoderConfig,
}

impl JsonEncoder {
    #[must_use]
    pub fn new(config: EncoderConfig) -> Self {
        JsonEncoder { config }
    }

    #[must_use]
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encodes `record` stamped with the current wall-clock time.
    #[must_use]
    pub fn encode(&self, record: &Record) -> String {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.encode_at(record, ts)
    }

    /// Encodes `record` with an explicit epoch timestamp in seconds.
    #[must_use]
    pub fn encode_at(&self, record: &Record, ts: f64) -> String {
        let mut line = String::with_capacity(128);
        line.push('{');
        push_entry(&mut line, &self.config.time_key, &Value::from(ts));
        push_entry(
            &mut line,
            &self.config.level_key,
            &Value::from(level_name(&record.level)),
        );
        push_entry(
            &mut line,
            &self.config.target_key,
            &Value::from(record.target.as_str()),
        );
        push_entry(
            &mut line,
            &self.config.message_key,
            &Value::from(record.message.as_str()),
        );
        for (key, value) in &record.fields {
            push_entry(&mut line, key, value);
        }
        line.push('}');
        line
    }
}

fn push_entry(line: &mut String, key: &str, value: &Value) {
    if line.len() > 1 {
        line.push(',');
    }
    line.push_str(&Value::from(key).to_string());
    line.push(':');
    line.push_str(&value.to_string());
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

impl<S, N> FormatEvent<S, N> for JsonEncoder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let record = Record::from_event(event);
        writeln!(writer, "{}", self.encode(&record))
    }
}
