//! Atomic concurrency-cap load shedder. `try_acquire` never blocks: it
//! either hands back an admission token or returns `None` on cap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use zenith_core::ScopedResource;

struct State {
    in_flight: AtomicUsize,
    max_concurrent: AtomicUsize,
    name: String,
}

#[derive(Clone)]
pub struct LoadShedder {
    state: Arc<State>,
}

impl LoadShedder {
    pub fn new(name: impl Into<String>, max_concurrent: usize) -> Self {
        Self {
            state: Arc::new(State {
                in_flight: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(max_concurrent),
                name: name.into(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Attempts to admit one more request. Uses a compare-and-swap loop so
    /// the bound holds even under concurrent acquirers: every winner of the
    /// CAS observed `in_flight < max_concurrent` at the instant it won.
    pub fn try_acquire(&self) -> Option<ScopedResource> {
        loop {
            let cur = self.state.in_flight.load(Ordering::Relaxed);
            let max = self.state.max_concurrent.load(Ordering::Relaxed);
            if cur >= max {
                return None;
            }
            if self
                .state
                .in_flight
                .compare_exchange(cur, cur + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                let state = self.state.clone();
                return Some(ScopedResource::new(move || {
                    state.in_flight.fetch_sub(1, Ordering::Release);
                }));
            }
        }
    }

    /// Takes effect on the next `try_acquire`; `current_count` may appear
    /// transiently above the new cap right after a tightening until
    /// existing tokens drain — that's expected, not a bug.
    pub fn update_policy(&self, new_max: usize) {
        self.state.max_concurrent.store(new_max, Ordering::Relaxed);
    }

    pub fn current_count(&self) -> usize {
        self.state.in_flight.load(Ordering::Relaxed)
    }

    pub fn max_concurrent(&self) -> usize {
        self.state.max_concurrent.load(Ordering::Relaxed)
    }
}
