//! OTLP/gRPC export wiring, installed once per process. Grounded in the
//! same "global tracing subscriber + OnceLock install guard" shape used
//! for the console fallback, but layered with `tracing-opentelemetry` and
//! backed by a real `opentelemetry-otlp` pipeline.

use std::sync::OnceLock;

use opentelemetry::trace::{
    SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState, Tracer as OtelTracerTrait,
};
use opentelemetry::{global, Context as OtelContext};
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use zenith_core::{SpanGuard, TraceContext as ZenithTraceContext, Tracer};

static INSTALL_STATE: OnceLock<TracerProvider> = OnceLock::new();

#[derive(Debug, Error)]
pub enum OtelError {
    #[error("zenith-otel has already been installed in this process")]
    AlreadyInstalled,
    #[error("failed to build the OTLP exporter pipeline: {0}")]
    ExporterBuildFailed(String),
    #[error("failed to install the global tracing subscriber: {0}")]
    SubscriberAlreadySet(String),
}

/// Builds an OTLP/gRPC pipeline pointed at `endpoint`, installs it as the
/// global `tracing` subscriber (env-filterable via `RUST_LOG`), and
/// returns an `OtlpTracer` implementing `zenith_core::Tracer`. Idempotent
/// per process: a second call returns `AlreadyInstalled`.
pub fn install(endpoint: &str, service_name: &str) -> Result<OtlpTracer, OtelError> {
    if INSTALL_STATE.get().is_some() {
        return Err(OtelError::AlreadyInstalled);
    }

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            opentelemetry_sdk::trace::config().with_resource(Resource::new(vec![
                opentelemetry::KeyValue::new("service.name", service_name.to_string()),
            ])),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .map_err(|e| OtelError::ExporterBuildFailed(e.to_string()))?;

    let otel_layer = tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()));
    let subscriber = Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| OtelError::SubscriberAlreadySet(e.to_string()))?;

    let tracer = OtlpTracer { inner: global::tracer(service_name.to_string()) };
    INSTALL_STATE
        .set(provider)
        .map_err(|_| OtelError::AlreadyInstalled)?;
    Ok(tracer)
}

pub struct OtlpTracer {
    inner: global::BoxedTracer,
}

impl Tracer for OtlpTracer {
    fn start_span(&self, name: &str, parent: Option<&ZenithTraceContext>) -> Box<dyn SpanGuard> {
        let cx = match parent {
            Some(tc) => {
                let span_context = SpanContext::new(
                    TraceId::from_bytes(tc.trace_id.to_be_bytes()),
                    SpanId::from_bytes(tc.span_id.to_be_bytes()),
                    TraceFlags::new(tc.trace_flags),
                    true,
                    TraceState::default(),
                );
                OtelContext::new().with_remote_span_context(span_context)
            }
            None => OtelContext::new(),
        };
        let span = self.inner.start_with_context(name.to_string(), &cx);
        let span_context = span.span_context().clone();
        let context = ZenithTraceContext::new(
            u128::from_be_bytes(span_context.trace_id().to_bytes()),
            u64::from_be_bytes(span_context.span_id().to_bytes()),
        )
        .with_sampled(span_context.trace_flags().is_sampled());
        Box::new(OtlpSpanGuard { context, span })
    }
}

struct OtlpSpanGuard {
    context: ZenithTraceContext,
    span: global::BoxedSpan,
}

impl SpanGuard for OtlpSpanGuard {
    fn context(&self) -> &ZenithTraceContext {
        &self.context
    }

    fn end(self: Box<Self>) {
        use opentelemetry::trace::Span;
        let mut span = self.span;
        span.end();
    }
}
