//! The "Observed decorator" composition pattern: wrap any component in
//! `Observed<T>` to get a span, a latency histogram, and a success/failure
//! counter pair around every operation — as a generic wrapper type, not a
//! per-call `Box<dyn Fn>` indirection.

use std::sync::Arc;
use std::time::Instant;

use zenith_core::{InstrumentDescriptor, InstrumentId, MetricsProvider, TraceContext, Tracer};

#[derive(Clone)]
pub struct Observed<T> {
    inner: T,
    tracer: Arc<dyn Tracer>,
    metrics: Arc<dyn MetricsProvider>,
    latency: InstrumentId,
    success: InstrumentId,
    failure: InstrumentId,
    component: String,
}

impl<T> Observed<T> {
    pub fn new(
        inner: T,
        component: impl Into<String>,
        tracer: Arc<dyn Tracer>,
        metrics: Arc<dyn MetricsProvider>,
    ) -> Self {
        let component = component.into();
        // Instrument names are built once at construction time and leaked
        // to `'static`, matching `InstrumentDescriptor`'s borrowed-name
        // shape; this only happens per long-lived `Observed<T>`, not per
        // request.
        let latency_name: &'static str = Box::leak(format!("{component}.latency_ms").into_boxed_str());
        let success_name: &'static str = Box::leak(format!("{component}.success_total").into_boxed_str());
        let failure_name: &'static str = Box::leak(format!("{component}.failure_total").into_boxed_str());

        let latency = metrics.register_histogram(InstrumentDescriptor { name: latency_name, unit: "ms" });
        let success = metrics.register_counter(InstrumentDescriptor { name: success_name, unit: "1" });
        let failure = metrics.register_counter(InstrumentDescriptor { name: failure_name, unit: "1" });

        Self { inner, tracer, metrics, latency, success, failure, component }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Runs `f` inside a child span of `trace`, named `component.operation`,
    /// and records latency plus a success/failure counter regardless of
    /// outcome.
    pub fn observe<R, E>(
        &self,
        operation: &str,
        trace: &TraceContext,
        f: impl FnOnce(&T) -> Result<R, E>,
    ) -> Result<R, E> {
        let span_name = format!("{}.{operation}", self.component);
        let span = self.tracer.start_span(&span_name, Some(trace));
        let started = Instant::now();

        let result = f(&self.inner);

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.histogram_record(self.latency, elapsed_ms);
        match &result {
            Ok(_) => self.metrics.counter_add(self.success, 1),
            Err(_) => self.metrics.counter_add(self.failure, 1),
        }
        span.end();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zenith_core::InProcessMetrics;

    struct Adder(u32);

    #[test]
    fn observe_records_latency_and_success() {
        let metrics = Arc::new(InProcessMetrics::new());
        let tracer: Arc<dyn Tracer> = Arc::new(crate::fallback::ConsoleTracer);
        let observed = Observed::new(Adder(10), "adder", tracer, metrics.clone());

        let trace = TraceContext::new(1, 1);
        let result: Result<u32, ()> = observed.observe("add", &trace, |adder| Ok(adder.0 + 5));
        assert_eq!(result, Ok(15));

        let (count, sum) = metrics.snapshot_histogram(observed.latency);
        assert_eq!(count, 1);
        assert!(sum >= 0.0);
        assert_eq!(metrics.snapshot_counter(observed.success), 1);
        assert_eq!(metrics.snapshot_counter(observed.failure), 0);
    }

    #[test]
    fn observe_records_failure() {
        let metrics = Arc::new(InProcessMetrics::new());
        let tracer: Arc<dyn Tracer> = Arc::new(crate::fallback::ConsoleTracer);
        let observed = Observed::new(Adder(10), "adder", tracer, metrics.clone());

        let trace = TraceContext::new(1, 1);
        let result: Result<u32, &str> = observed.observe("add", &trace, |_| Err("boom"));
        assert_eq!(result, Err("boom"));
        assert_eq!(metrics.snapshot_counter(observed.failure), 1);
    }
}
