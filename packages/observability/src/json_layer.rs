//! JSONL layer.
//!
//! One object per event: timestamp, level, service, pid, target, message,
//! the event fields, and the chain of enclosing spans with their fields.
//! Every field value passes through [`sanitize_value`] and the message
//! through [`scrub_message`] before it is written.

use crate::redact::{sanitize_value, scrub_message};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// A single structured log line.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: &'static str,
    pub service: String,
    pub pid: u32,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SpanEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

/// One enclosing span, outermost first.
#[derive(Debug, Clone, Serialize)]
pub struct SpanEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
}

/// Redacted fields recorded on a span, kept in the span's extensions.
struct SpanFields(Map<String, Value>);

#[derive(Default)]
struct JsonVisitor {
    fields: Map<String, Value>,
    message: Option<String>,
}

impl JsonVisitor {
    fn put(&mut self, field: &Field, value: Value) {
        let name = field.name();
        if name == "message" {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.message = Some(text);
            return;
        }
        self.fields
            .insert(name.to_string(), sanitize_value(name, &value));
    }
}

impl Visit for JsonVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON number form.
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.put(field, value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, Value::String(value.to_string()));
    }
}

/// Layer that writes one JSON object per event.
pub struct JsonLayer<W> {
    service_name: String,
    pid: u32,
    make_writer: W,
}

impl<W> JsonLayer<W> {
    pub fn new(service_name: String, make_writer: W) -> Self {
        Self {
            service_name,
            pid: std::process::id(),
            make_writer,
        }
    }
}

impl<S, W> Layer<S> for JsonLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = JsonVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(SpanFields(visitor.fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = JsonVisitor::default();
        values.record(&mut visitor);
        let mut extensions = span.extensions_mut();
        match extensions.get_mut::<SpanFields>() {
            Some(SpanFields(fields)) => fields.extend(visitor.fields),
            None => extensions.insert(SpanFields(visitor.fields)),
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let spans = ctx
            .event_scope(event)
            .map(|scope| {
                scope
                    .from_root()
                    .map(|span| SpanEntry {
                        name: span.name().to_string(),
                        fields: span
                            .extensions()
                            .get::<SpanFields>()
                            .map(|SpanFields(fields)| fields.clone())
                            .unwrap_or_default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let metadata = event.metadata();
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            level: metadata.level().as_str(),
            service: self.service_name.clone(),
            pid: self.pid,
            target: metadata.target().to_string(),
            message: scrub_message(&visitor.message.unwrap_or_default()),
            fields: visitor.fields,
            spans,
            file: metadata.file().map(str::to_string),
            line: metadata.line(),
        };

        if let Ok(json) = serde_json::to_string(&entry) {
            let mut writer = self.make_writer.make_writer();
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `f` under a JsonLayer and return the lines it wrote.
    fn capture(f: impl FnOnce()) -> Vec<Value> {
        let sink = Captured::default();
        let subscriber =
            tracing_subscriber::registry().with(JsonLayer::new("test".to_string(), sink.clone()));
        tracing::subscriber::with_default(subscriber, f);

        let output = String::from_utf8(sink.0.lock().clone()).unwrap();
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_event_fields_are_redacted() {
        let lines = capture(|| {
            tracing::info!(token = "abc123", username = "admin", attempts = 2u64, "login attempt");
        });

        let line = &lines[0];
        assert_eq!(line["message"], "login attempt");
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["service"], "test");
        assert_eq!(line["fields"]["username"], "admin");
        assert_eq!(line["fields"]["attempts"], 2);
        assert_eq!(line["fields"]["token"], "[REDACTED]");
        assert!(line.get("spans").is_none());
    }

    #[test]
    fn test_bearer_values_redacted_under_any_name() {
        let lines = capture(|| {
            tracing::warn!(header = "Bearer eyJhbGciOi", "outbound request");
        });
        assert_eq!(lines[0]["fields"]["header"], "[REDACTED]");
    }

    #[test]
    fn test_bearer_in_message_text_is_scrubbed() {
        let lines = capture(|| {
            let header = "Bearer eyJhbGciOi";
            tracing::error!("request rejected with {header} attached");
        });
        assert_eq!(
            lines[0]["message"],
            "request rejected with Bearer [REDACTED] attached"
        );
    }

    #[test]
    fn test_span_chain_and_fields_are_recorded() {
        let lines = capture(|| {
            let outer = tracing::info_span!("command", name = "login");
            let _outer = outer.enter();
            let inner = tracing::info_span!("request", path = "/auth/login", satoken = "abc");
            let _inner = inner.enter();
            tracing::info!("sending");
        });

        let spans = lines[0]["spans"].as_array().unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0]["name"], "command");
        assert_eq!(spans[0]["fields"]["name"], "login");
        assert_eq!(spans[1]["name"], "request");
        assert_eq!(spans[1]["fields"]["path"], "/auth/login");
        assert_eq!(spans[1]["fields"]["satoken"], "[REDACTED]");
    }

    #[test]
    fn test_late_recorded_span_fields_are_included() {
        let lines = capture(|| {
            let span = tracing::info_span!("resolve", status = tracing::field::Empty);
            let _entered = span.enter();
            span.record("status", 401u64);
            tracing::info!("done");
        });
        assert_eq!(lines[0]["spans"][0]["fields"]["status"], 401);
    }

    #[test]
    fn test_errors_and_non_finite_floats() {
        let lines = capture(|| {
            let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
            tracing::error!(error = &error as &(dyn std::error::Error + 'static), ratio = f64::NAN, "write failed");
        });
        assert_eq!(lines[0]["fields"]["error"], "disk full");
        assert_eq!(lines[0]["fields"]["ratio"], "NaN");
    }
}
