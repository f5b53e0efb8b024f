//! Concrete observability backends for the traits defined in
//! `zenith_core::observability`: an OTLP/gRPC exporter when a collector
//! endpoint is configured, an in-process console fallback otherwise, and
//! the `Observed<T>` decorator shared by both.

pub mod decorator;
pub mod fallback;
pub mod otlp;

pub use decorator::Observed;
pub use fallback::{ConsoleLogger, ConsoleTracer};
pub use otlp::{install as install_otlp, OtelError, OtlpTracer};

use std::sync::{Arc, OnceLock};

use tracing_subscriber::EnvFilter;
use zenith_core::{InProcessMetrics, Provider};

static CONSOLE_SUBSCRIBER: OnceLock<()> = OnceLock::new();

/// Installs a plain `tracing_subscriber::fmt` subscriber, filterable via
/// `RUST_LOG`. Idempotent: a second call is a no-op rather than an error,
/// since the console backend has no exporter state to protect.
pub fn install_console_subscriber() {
    CONSOLE_SUBSCRIBER.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
            .try_init();
    });
}

/// Builds a `Provider` over the in-process console backend: spans and logs
/// go through `tracing`, metrics accumulate in memory.
pub fn console_provider() -> Provider {
    install_console_subscriber();
    Provider::new(
        Arc::new(ConsoleTracer),
        Arc::new(InProcessMetrics::new()),
        Arc::new(ConsoleLogger),
    )
}

/// Builds a `Provider` backed by a real OTLP/gRPC pipeline pointed at
/// `endpoint`. Metrics still accumulate in-process; `spec.md` scopes a
/// full OTLP metrics pipeline out, so only traces and logs leave the
/// process.
pub fn otlp_provider(endpoint: &str, service_name: &str) -> Result<Provider, OtelError> {
    let tracer = install_otlp(endpoint, service_name)?;
    Ok(Provider::new(
        Arc::new(tracer),
        Arc::new(InProcessMetrics::new()),
        Arc::new(ConsoleLogger),
    ))
}
