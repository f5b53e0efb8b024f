//! Shared contracts for the zenith message-passing core: the `Message`
//! envelope, its W3C-style `TraceContext`, the bounded `MessageQueue`, and
//! the observability facade (spans, metrics, logs) every other `zenith-*`
//! crate builds on.

pub mod error;
pub mod message;
pub mod observability;
pub mod queue;
pub mod scoped;

pub use error::CoreError;
pub use message::Message;
pub use observability::{
    InProcessMetrics, InstrumentDescriptor, InstrumentId, LogRecord, LogSeverity, Logger, MetricsProvider, Provider,
    SpanGuard, TraceContext, Tracer,
};
pub use queue::MessageQueue;
pub use scoped::ScopedResource;
