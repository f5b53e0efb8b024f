//! In-process fallback backend used when no OTLP endpoint is configured.
//! Spans and logs are simply forwarded onto `tracing`'s own dispatcher,
//! which `install_console_subscriber` wires to stdout.

use std::time::Instant;

use zenith_core::{LogRecord, LogSeverity, Logger, SpanGuard, TraceContext, Tracer};

pub struct ConsoleTracer;

impl Tracer for ConsoleTracer {
    fn start_span(&self, name: &str, parent: Option<&TraceContext>) -> Box<dyn SpanGuard> {
        let context = match parent {
            Some(tc) => tc.child(derive_span_id(name, tc.span_id)),
            None => TraceContext::new(derive_trace_id(name), derive_span_id(name, 0)),
        };
        tracing::debug!(
            trace_id = %format!("{:032x}", context.trace_id),
            span_id = %format!("{:016x}", context.span_id),
            span = name,
            "span started"
        );
        Box::new(ConsoleSpanGuard {
            name: name.to_string(),
            context,
            started_at: Instant::now(),
        })
    }
}

struct ConsoleSpanGuard {
    name: String,
    context: TraceContext,
    started_at: Instant,
}

impl SpanGuard for ConsoleSpanGuard {
    fn context(&self) -> &TraceContext {
        &self.context
    }

    fn end(self: Box<Self>) {
        let elapsed_ms = self.started_at.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            trace_id = %format!("{:032x}", self.context.trace_id),
            span_id = %format!("{:016x}", self.context.span_id),
            span = %self.name,
            elapsed_ms,
            "span ended"
        );
    }
}

/// Deterministic-enough span id derivation for the console backend: real
/// random ids aren't needed here since spans never leave the process.
fn derive_span_id(name: &str, seed: u64) -> u64 {
    let mut hash = seed ^ 0x9E3779B97F4A7C15;
    for byte in name.bytes() {
        hash = hash.wrapping_mul(1099511628211).wrapping_add(byte as u64);
    }
    hash | 1
}

fn derive_trace_id(name: &str) -> u128 {
    (derive_span_id(name, 0xABCD) as u128) << 64 | derive_span_id(name, 0x1234) as u128
}

pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, record: LogRecord) {
        let LogRecord { severity, message, attributes } = record;
        match severity {
            LogSeverity::Trace => tracing::trace!(?attributes, "{message}"),
            LogSeverity::Debug => tracing::debug!(?attributes, "{message}"),
            LogSeverity::Info => tracing::info!(?attributes, "{message}"),
            LogSeverity::Warn => tracing::warn!(?attributes, "{message}"),
            LogSeverity::Error => tracing::error!(?attributes, "{message}"),
        }
    }
}
