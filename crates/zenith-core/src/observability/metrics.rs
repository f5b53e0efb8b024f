use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Dense handle into a `MetricsProvider`'s fixed-size instrument arrays.
/// Lookup by `InstrumentId` is an array index, not a map probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstrumentId(pub usize);

pub struct InstrumentDescriptor {
    pub name: &'static str,
    pub unit: &'static str,
}

pub trait Counter: Send + Sync {
    fn add(&self, value: u64);
}

pub trait Gauge: Send + Sync {
    fn set(&self, value: i64);
}

pub trait Histogram: Send + Sync {
    fn record(&self, value_ms: f64);
}

/// Registers instruments at startup and returns the dense ids callers cache
/// once and reuse on every hot-path observation.
pub trait MetricsProvider: Send + Sync {
    fn register_counter(&self, descriptor: InstrumentDescriptor) -> InstrumentId;
    fn register_gauge(&self, descriptor: InstrumentDescriptor) -> InstrumentId;
    fn register_histogram(&self, descriptor: InstrumentDescriptor) -> InstrumentId;

    fn counter_add(&self, id: InstrumentId, value: u64);
    fn gauge_set(&self, id: InstrumentId, value: i64);
    fn histogram_record(&self, id: InstrumentId, value_ms: f64);
}

#[derive(Default)]
struct AtomicCounter(AtomicU64);
#[derive(Default)]
struct AtomicGauge(std::sync::atomic::AtomicI64);
#[derive(Default)]
struct HistogramBucket {
    count: AtomicU64,
    sum_micros: AtomicU64,
}

enum Instrument {
    Counter(AtomicCounter),
    Gauge(AtomicGauge),
    Histogram(HistogramBucket),
}

/// Lock-free-on-the-hot-path in-process metrics backend: registration
/// (cold path) takes a write lock to grow the instrument vector; every
/// subsequent `*_add`/`*_set`/`record` call indexes straight into it.
pub struct InProcessMetrics {
    instruments: RwLock<Vec<(InstrumentDescriptor, Instrument)>>,
}

impl Default for InProcessMetrics {
    fn default() -> Self {
        Self {
            instruments: RwLock::new(Vec::new()),
        }
    }
}

impl InProcessMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_counter(&self, id: InstrumentId) -> u64 {
        let instruments = self.instruments.read().unwrap();
        match &instruments[id.0].1 {
            Instrument::Counter(c) => c.0.load(Ordering::Relaxed),
            _ => panic!("instrument {} is not a counter", id.0),
        }
    }

    pub fn snapshot_gauge(&self, id: InstrumentId) -> i64 {
        let instruments = self.instruments.read().unwrap();
        match &instruments[id.0].1 {
            Instrument::Gauge(g) => g.0.load(Ordering::Relaxed),
            _ => panic!("instrument {} is not a gauge", id.0),
        }
    }

    pub fn snapshot_histogram(&self, id: InstrumentId) -> (u64, f64) {
        let instruments = self.instruments.read().unwrap();
        match &instruments[id.0].1 {
            Instrument::Histogram(h) => {
                let count = h.count.load(Ordering::Relaxed);
                let sum_ms = h.sum_micros.load(Ordering::Relaxed) as f64 / 1000.0;
                (count, sum_ms)
            }
            _ => panic!("instrument {} is not a histogram", id.0),
        }
    }
}

impl MetricsProvider for InProcessMetrics {
    fn register_counter(&self, descriptor: InstrumentDescriptor) -> InstrumentId {
        let mut instruments = self.instruments.write().unwrap();
        instruments.push((descriptor, Instrument::Counter(AtomicCounter::default())));
        InstrumentId(instruments.len() - 1)
    }

    fn register_gauge(&self, descriptor: InstrumentDescriptor) -> InstrumentId {
        let mut instruments = self.instruments.write().unwrap();
        instruments.push((descriptor, Instrument::Gauge(AtomicGauge::default())));
        InstrumentId(instruments.len() - 1)
    }

    fn register_histogram(&self, descriptor: InstrumentDescriptor) -> InstrumentId {
        let mut instruments = self.instruments.write().unwrap();
        instruments.push((descriptor, Instrument::Histogram(HistogramBucket::default())));
        InstrumentId(instruments.len() - 1)
    }

    fn counter_add(&self, id: InstrumentId, value: u64) {
        let instruments = self.instruments.read().unwrap();
        if let Instrument::Counter(c) = &instruments[id.0].1 {
            c.0.fetch_add(value, Ordering::Relaxed);
        }
    }

    fn gauge_set(&self, id: InstrumentId, value: i64) {
        let instruments = self.instruments.read().unwrap();
        if let Instrument::Gauge(g) = &instruments[id.0].1 {
            g.0.store(value, Ordering::Relaxed);
        }
    }

    fn histogram_record(&self, id: InstrumentId, value_ms: f64) {
        let instruments = self.instruments.read().unwrap();
        if let Instrument::Histogram(h) = &instruments[id.0].1 {
            h.count.fetch_add(1, Ordering::Relaxed);
            h.sum_micros.fetch_add((value_ms * 1000.0) as u64, Ordering::Relaxed);
        }
    }
}
