//! Logging bridge for symmat
//!
//! The library crates only emit `log` records. This crate routes them into a
//! `tracing` subscriber and hands each one to an optional process-wide hook
//! as a structured [`LogRecord`]; spans and events can also be forwarded as
//! Chrome-style [`TraceEvent`]s.

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_log::{LogTracer, NormalizeEvent};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Environment variable consulted after `RUST_LOG`
pub const SYMMAT_LOG_ENV: &str = "SYMMAT_LOG";

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub ts: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonValue>,
}

impl LogRecord {
    /// One JSON object per line
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub name: String,
    pub cat: String,
    pub ph: String,
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<JsonValue>,
}

type LogHook = Arc<dyn Fn(&LogRecord) + Send + Sync>;
type TraceHook = Arc<dyn Fn(&[TraceEvent]) + Send + Sync>;

static LOG_HOOK: OnceCell<LogHook> = OnceCell::new();
static TRACE_HOOK: OnceCell<TraceHook> = OnceCell::new();
static FALLBACK_TRACE_ID: OnceCell<String> = OnceCell::new();

/// Keeps a thread-local subscriber alive when a global one was already set
pub struct LoggingGuard {
    _guard: Option<DefaultGuard>,
}

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Filter directive; overrides `RUST_LOG` and `SYMMAT_LOG` when set
    pub filter: Option<String>,
    pub enable_traces: bool,
    pub pid: i64,
}

/// Install the hook that receives every log record. Only the first call wins.
pub fn set_log_hook<F>(hook: F)
where
    F: Fn(&LogRecord) + Send + Sync + 'static,
{
    let _ = LOG_HOOK.set(Arc::new(hook));
}

pub fn set_trace_hook<F>(hook: F)
where
    F: Fn(&[TraceEvent]) + Send + Sync + 'static,
{
    let _ = TRACE_HOOK.set(Arc::new(hook));
}

/// Pick the filter directive: explicit option, `RUST_LOG`, `SYMMAT_LOG`, then `info`
pub fn filter_directive(
    explicit: Option<&str>,
    rust_log: Option<String>,
    symmat_log: Option<String>,
) -> String {
    explicit
        .map(str::to_string)
        .or(rust_log)
        .or(symmat_log)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

fn build_filter(opts: &LoggingOptions) -> EnvFilter {
    let directive = filter_directive(
        opts.filter.as_deref(),
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        std::env::var(SYMMAT_LOG_ENV).ok(),
    );
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_logging(opts: LoggingOptions) -> LoggingGuard {
    // Install LogTracer so log:: macros flow into tracing
    let _ = LogTracer::init();

    let build_subscriber = || {
        let trace_layer = opts
            .enable_traces
            .then_some(TraceBridgeLayer { pid: opts.pid });
        tracing_subscriber::registry()
            .with(build_filter(&opts))
            .with(LogBridgeLayer)
            .with(trace_layer)
    };

    let guard = match tracing::subscriber::set_global_default(build_subscriber()) {
        Ok(()) => None,
        Err(_) => Some(tracing::subscriber::set_default(build_subscriber())),
    };

    LoggingGuard { _guard: guard }
}

struct LogBridgeLayer;

#[derive(Clone)]
struct TraceBridgeLayer {
    pid: i64,
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_timestamp_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

impl<S> Layer<S> for LogBridgeLayer
where
    S: Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(hook) = LOG_HOOK.get() else {
            return;
        };

        // Records bridged from `log` carry their real target in normalized metadata
        let normalized = event.normalized_metadata();
        let meta = normalized.as_ref().unwrap_or_else(|| event.metadata());

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let (trace_id, span_id) = current_trace_span_ids();
        let record = LogRecord {
            ts: now_rfc3339(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            message: visitor.message.unwrap_or_else(|| meta.name().to_string()),
            trace_id,
            span_id,
            fields: visitor.fields,
        };

        hook(&record);
    }
}

impl<S> Layer<S> for TraceBridgeLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(hook) = TRACE_HOOK.get() else {
            return;
        };

        let normalized = event.normalized_metadata();
        let meta = normalized.as_ref().unwrap_or_else(|| event.metadata());
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let (trace_id, span_id) = current_trace_span_ids();

        let ev = TraceEvent {
            name: visitor.message.unwrap_or_else(|| meta.name().to_string()),
            cat: meta.target().to_string(),
            ph: "i".to_string(), // instant event
            ts: now_timestamp_micros(),
            pid: Some(self.pid),
            trace_id,
            span_id,
            args: visitor.fields,
        };

        hook(&[ev]);
    }

    fn on_enter(&self, id: &tracing::span::Id, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            emit_span_event(span.metadata(), "B", self.pid);
        }
    }

    fn on_exit(&self, id: &tracing::span::Id, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            emit_span_event(span.metadata(), "E", self.pid);
        }
    }
}

fn emit_span_event(meta: &tracing::Metadata<'_>, phase: &str, pid: i64) {
    let Some(hook) = TRACE_HOOK.get() else {
        return;
    };
    let (trace_id, span_id) = current_trace_span_ids();

    let ev = TraceEvent {
        name: meta.name().to_string(),
        cat: meta.target().to_string(),
        ph: phase.to_string(),
        ts: now_timestamp_micros(),
        pid: Some(pid),
        trace_id,
        span_id,
        args: None,
    };
    hook(&[ev]);
}

fn current_trace_span_ids() -> (Option<String>, Option<String>) {
    let span_id = tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string());
    (Some(fallback_trace_id()), span_id)
}

fn fallback_trace_id() -> String {
    FALLBACK_TRACE_ID
        .get_or_init(|| {
            let nanos = SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default();
            format!("{:x}-{}", nanos, std::process::id())
        })
        .clone()
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    fields: Option<JsonValue>,
}

impl JsonVisitor {
    fn insert(&mut self, name: &str, entry: JsonValue) {
        if name.starts_with("log.") {
            return;
        }
        let obj = self
            .fields
            .get_or_insert_with(|| JsonValue::Object(Default::default()));
        if let JsonValue::Object(map) = obj {
            map.insert(name.to_string(), entry);
        }
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let text = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(text);
        } else {
            self.insert(field.name(), JsonValue::String(text));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field.name(), JsonValue::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field.name(), JsonValue::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field.name(), JsonValue::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field.name(), JsonValue::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins() {
        let d = filter_directive(
            Some("debug"),
            Some("warn".to_string()),
            Some("error".to_string()),
        );
        assert_eq!(d, "debug");
    }

    #[test]
    fn rust_log_before_symmat_log() {
        let d = filter_directive(None, Some("warn".to_string()), Some("error".to_string()));
        assert_eq!(d, "warn");
        let d = filter_directive(None, None, Some("error".to_string()));
        assert_eq!(d, "error");
    }

    #[test]
    fn default_is_info() {
        assert_eq!(filter_directive(None, None, None), "info");
        assert_eq!(filter_directive(Some("  "), None, None), "info");
    }

    #[test]
    fn record_serializes_without_empty_ids() {
        let record = LogRecord {
            ts: "2024-01-01T00:00:00.000Z".to_string(),
            level: "DEBUG".to_string(),
            target: "symmat_matrix::hilbert".to_string(),
            message: "built".to_string(),
            trace_id: None,
            span_id: None,
            fields: None,
        };
        let line = record.to_json_line();
        assert!(line.contains("\"target\":\"symmat_matrix::hilbert\""));
        assert!(!line.contains("trace_id"));
    }
}
