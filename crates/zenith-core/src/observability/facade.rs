use std::sync::Arc;

use super::logging::Logger;
use super::metrics::MetricsProvider;
use super::trace::TraceContext;

/// A span guard: dropping it (or calling `end` explicitly) closes the span.
/// Exactly one of `end`/`Drop` takes effect per guard instance, matching the
/// "scoped resource" shape used elsewhere in the core.
pub trait SpanGuard: Send {
    fn context(&self) -> &TraceContext;
    fn end(self: Box<Self>);
}

pub trait Tracer: Send + Sync {
    /// Starts a span. If `parent` is `Some`, the new span is a child (same
    /// `trace_id`, fresh `span_id`); otherwise a new trace is started.
    fn start_span(&self, name: &str, parent: Option<&TraceContext>) -> Box<dyn SpanGuard>;
}

/// The single process-wide handle bundling tracer, meter, and logger.
/// Components take `Arc<Provider>` rather than three separate `Arc`s so
/// observability wiring stays a single constructor argument.
#[derive(Clone)]
pub struct Provider {
    pub tracer: Arc<dyn Tracer>,
    pub metrics: Arc<dyn MetricsProvider>,
    pub logger: Arc<dyn Logger>,
}

impl Provider {
    pub fn new(tracer: Arc<dyn Tracer>, metrics: Arc<dyn MetricsProvider>, logger: Arc<dyn Logger>) -> Self {
        Self { tracer, metrics, logger }
    }
}
