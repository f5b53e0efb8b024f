//! Observability contracts: spans, counters/gauges/histograms, structured
//! logs with scoped attributes, health checks, and the `Provider` facade
//! that bundles them. Concrete OTLP/console-backed implementations live in
//! `zenith-otel`; this crate only defines the traits so every other
//! `zenith-*` crate can depend on observability without depending on an
//! exporter.

pub mod facade;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod trace;

pub use facade::{Provider, SpanGuard, Tracer};
pub use health::{ComponentHealth, HealthCheckProvider, HealthState};
pub use logging::{LogRecord, LogSeverity, Logger, LoggerExt, ScopedAttributes};
pub use metrics::{Counter, Gauge, Histogram, InProcessMetrics, InstrumentDescriptor, InstrumentId, MetricsProvider};
pub use trace::{TraceContext, TraceContextError};
