// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ingress hook: hands every record that cleared the subscriber's filters to a
//! transfer's intake.
//!
//! [`TransferLayer`] is a `tracing_subscriber` layer. For each event it builds
//! a [`Record`], lifts the operation key from the enclosing spans, runs the
//! field interceptors and then the line interceptors in registration order,
//! and enqueues the encoded line. Enqueueing never blocks; a refused line is
//! counted by the [`Intake`] and otherwise forgotten.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let layer = TransferLayer::new(transfer.pool())
//!     .with_identifier("service", "checkout")?
//!     .with_operation_key("request_id")?;
//! let subscriber = tracing_subscriber::registry().with(layer);
//! ```

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record as SpanValues};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::constants::SELF_TARGET;
use crate::encoder::{Fields, JsonEncoder, Record};
use crate::error::TransferError;
use crate::intake::Intake;

/// Rewrites the structured fields of a record before it is encoded.
pub trait FieldInterceptor: Send + Sync + 'static {
    fn intercept(&self, fields: &mut Fields);
}

impl<F> FieldInterceptor for F
where
    F: Fn(&mut Fields) + Send + Sync + 'static,
{
    fn intercept(&self, fields: &mut Fields) {
        self(fields);
    }
}

/// Rewrites the encoded line before it is enqueued.
pub trait LineInterceptor: Send + Sync + 'static {
    fn intercept(&self, line: String) -> String;
}

impl<F> LineInterceptor for F
where
    F: Fn(String) -> String + Send + Sync + 'static,
{
    fn intercept(&self, line: String) -> String {
        self(line)
    }
}

/// Stamps one fixed field, identifying the log stream, onto every record.
#[derive(Debug, Clone)]
pub struct IdentifierField {
    field: String,
    value: String,
}

impl FieldInterceptor for IdentifierField {
    fn intercept(&self, fields: &mut Fields) {
        fields.push((self.field.clone(), Value::from(self.value.as_str())));
    }
}

/// Value of the operation key carried by a span, kept in its extensions.
struct OperationValue(Value);

pub struct TransferLayer {
    intake: Intake,
    encoder: JsonEncoder,
    operation_key: Option<String>,
    field_interceptors: Vec<Box<dyn FieldInterceptor>>,
    line_interceptors: Vec<Box<dyn LineInterceptor>>,
}

impl TransferLayer {
    #[must_use]
    pub fn new(intake: Intake) -> Self {
        TransferLayer {
            intake,
            encoder: JsonEncoder::default(),
            operation_key: None,
            field_interceptors: Vec::new(),
            line_interceptors: Vec::new(),
        }
    }

    /// Uses `encoder` instead of the default key names.
    #[must_use]
    pub fn with_encoder(mut self, encoder: JsonEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    /// Registers the identifying field. Both parts blank, or a blank value,
    /// registers nothing.
    ///
    /// # Errors
    ///
    /// A blank field name paired with a non-blank value.
    pub fn with_identifier(self, field: &str, value: &str) -> Result<Self, TransferError> {
        let field = field.trim();
        if field.is_empty() {
            if value.trim().is_empty() {
                return Ok(self);
            }
            return Err(TransferError::BlankIdentifierField(value.to_string()));
        }
        if value.trim().is_empty() {
            return Ok(self);
        }
        Ok(self.with_field_interceptor(IdentifierField {
            field: field.to_string(),
            value: value.to_string(),
        }))
    }

    /// Names the span field whose value is copied into every record emitted
    /// inside that span, under the same key. The innermost span wins.
    ///
    /// # Errors
    ///
    /// A blank key.
    pub fn with_operation_key(mut self, key: &str) -> Result<Self, TransferError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(TransferError::BlankOperationKey);
        }
        self.operation_key = Some(key.to_string());
        Ok(self)
    }

    #[must_use]
    pub fn with_field_interceptor(mut self, interceptor: impl FieldInterceptor) -> Self {
        self.field_interceptors.push(Box::new(interceptor));
        self
    }

    #[must_use]
    pub fn with_line_interceptor(mut self, interceptor: impl LineInterceptor) -> Self {
        self.line_interceptors.push(Box::new(interceptor));
        self
    }

    /// Enriches, encodes and enqueues one record.
    pub fn dispatch(&self, mut record: Record) {
        for interceptor in &self.field_interceptors {
            interceptor.intercept(&mut record.fields);
        }

        let mut line = self.encoder.encode(&record);
        for interceptor in &self.line_interceptors {
            line = interceptor.intercept(line);
        }

        // refused lines are counted by the intake
        let _ = self.intake.send(line);
    }

    fn remember_operation<S>(
        &self,
        id: &Id,
        ctx: &Context<'_, S>,
        visit: impl FnOnce(&mut OperationVisitor<'_>),
    ) where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        let Some(key) = self.operation_key.as_deref() else {
            return;
        };
        let mut visitor = OperationVisitor { key, value: None };
        visit(&mut visitor);
        if let (Some(value), Some(span)) = (visitor.value, ctx.span(id)) {
            span.extensions_mut().replace(OperationValue(value));
        }
    }
}

impl<S> Layer<S> for TransferLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        self.remember_operation(id, &ctx, |visitor| attrs.record(visitor));
    }

    fn on_record(&self, id: &Id, values: &SpanValues<'_>, ctx: Context<'_, S>) {
        self.remember_operation(id, &ctx, |visitor| values.record(visitor));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut record = Record::from_event(event);
        if is_own_target(&record.target) {
            return;
        }

        if let Some(key) = self.operation_key.as_deref() {
            if let Some(value) = operation_value(event, &ctx) {
                record.fields.push((key.to_string(), value));
            }
        }
        self.dispatch(record);
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(SELF_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn operation_value<S>(event: &Event<'_>, ctx: &Context<'_, S>) -> Option<Value>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    // scope iterates from the innermost span outwards
    ctx.event_scope(event)?.find_map(|span| {
        let extensions = span.extensions();
        extensions
            .get::<OperationValue>()
            .map(|operation| operation.0.clone())
    })
}

struct OperationVisitor<'k> {
    key: &'k str,
    value: Option<Value>,
}

impl Visit for OperationVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == self.key {
            self.value = Some(Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == self.key {
            self.value = Some(Value::from(value));
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == self.key {
            self.value = Some(Value::from(value));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if field.name() == self.key {
            self.value = Some(Value::from(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == self.key {
            self.value = Some(Value::from(format!("{value:?}")));
        }
    }
}
