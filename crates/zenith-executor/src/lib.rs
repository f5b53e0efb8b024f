//! The affinity executor: N worker lanes, each a dedicated OS thread with
//! its own bounded queue, dispatching every `Message` for a given affinity
//! key to exactly one lane (`key % lane_count`) in strict submission order.
//! No work stealing — affinity is a contract, not a hint.

mod lane;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;
use tracing::{error, warn};
use zenith_core::{CoreError, Message};

use lane::Lane;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("lane queue is full")]
    QueueFull,
    #[error("executor is stopped")]
    Stopped,
}

impl From<CoreError> for ExecutorError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::QueueFull => ExecutorError::QueueFull,
            CoreError::Closed => ExecutorError::Stopped,
        }
    }
}

/// Runs on exactly one worker lane for every message routed to it. Shared
/// read-only across all lanes — implementations must be internally
/// synchronized if they hold mutable state.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, message: Message);
}

struct Worker {
    lane: Arc<Lane>,
    join: Option<JoinHandle<()>>,
}

pub struct AffinityExecutor<H: Handler> {
    lanes: Vec<Arc<Lane>>,
    handler: Arc<H>,
    workers: std::sync::Mutex<Vec<Worker>>,
    started: AtomicBool,
    stopped: AtomicBool,
    lane_queue_capacity: usize,
}

impl<H: Handler> AffinityExecutor<H> {
    pub fn new(lane_count: usize, handler: H) -> Self {
        Self::with_queue_capacity(lane_count, 1024, handler)
    }

    pub fn with_queue_capacity(lane_count: usize, lane_queue_capacity: usize, handler: H) -> Self {
        assert!(lane_count > 0, "affinity executor requires at least one lane");
        let lanes = (0..lane_count)
            .map(|id| Arc::new(Lane::new(id, lane_queue_capacity)))
            .collect();
        Self {
            lanes,
            handler: Arc::new(handler),
            workers: std::sync::Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            lane_queue_capacity,
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Exposes the handler so a handler that needs to resubmit messages
    /// (e.g. a reply arriving asynchronously on another thread) can be
    /// wired up with a `Weak<AffinityExecutor<H>>` back-reference after
    /// construction, without the executor and handler owning each other.
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Idempotent: spawns one worker thread per lane on the first call,
    /// and is a no-op afterward.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut workers = self.workers.lock().unwrap();
        for lane in &self.lanes {
            let lane = lane.clone();
            let handler = self.handler.clone();
            let lane_id = lane.id();
            let join = std::thread::Builder::new()
                .name(format!("zenith-lane-{lane_id}"))
                .spawn(move || run_lane(lane, handler))
                .expect("failed to spawn lane worker thread");
            workers.push(Worker {
                lane: self.lanes[lane_id].clone(),
                join: Some(join),
            });
        }
    }

    /// Non-blocking. Routes by `affinity_key % lane_count`.
    pub fn submit(&self, message: Message) -> Result<(), ExecutorError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(ExecutorError::Stopped);
        }
        let idx = (message.affinity_key % self.lanes.len() as u64) as usize;
        self.lanes[idx].queue().push(message).map_err(Into::into)
    }

    /// Idempotent: closes every lane queue (waking blocked workers), joins
    /// each worker thread (which drains any buffered messages first), then
    /// returns.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        for lane in &self.lanes {
            lane.queue().close();
        }
        let mut workers = self.workers.lock().unwrap();
        for worker in workers.iter_mut() {
            if let Some(join) = worker.join.take() {
                if join.join().is_err() {
                    error!(lane = worker.lane.id(), "lane worker thread panicked during shutdown");
                }
            }
        }
    }
}

impl<H: Handler> Drop for AffinityExecutor<H> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_lane<H: Handler>(lane: Arc<Lane>, handler: Arc<H>) {
    while let Some(message) = lane.queue().pop() {
        let handler = handler.clone();
        // A handler panic must not kill the lane: it's caught, logged, and
        // the worker keeps processing the next message.
        let result = catch_unwind(AssertUnwindSafe(|| handler.handle(message)));
        if let Err(panic) = result {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            warn!(lane = lane.id(), %detail, "handler panicked; lane continues");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;
    use zenith_core::TraceContext;

    struct RecordingHandler {
        seen: Mutex<HashMap<u64, (std::thread::ThreadId, Vec<u32>)>>,
    }

    impl RecordingHandler {
        fn new() -> Self {
            Self { seen: Mutex::new(HashMap::new()) }
        }
    }

    impl Handler for RecordingHandler {
        fn handle(&self, message: Message) {
            let key = message.affinity_key;
            let index: u32 = message.downcast().unwrap();
            let mut seen = self.seen.lock().unwrap();
            let entry = seen.entry(key).or_insert_with(|| (thread::current().id(), Vec::new()));
            assert_eq!(entry.0, thread::current().id(), "affinity key observed on two threads");
            entry.1.push(index);
        }
    }

    #[test]
    fn affinity_key_is_observed_on_one_lane_in_order() {
        let handler = RecordingHandler::new();
        let executor = AffinityExecutor::new(4, handler);
        executor.start();
        for i in 0..100u32 {
            executor
                .submit(Message::new(7, TraceContext::new(1, 1), i))
                .unwrap();
        }
        executor.stop();

        let seen = executor.handler.seen.lock().unwrap();
        let (_, indices) = seen.get(&7).unwrap();
        assert_eq!(indices.len(), 100);
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(indices, &sorted, "messages must be observed in submission order");
    }

    #[test]
    fn submit_after_stop_is_rejected() {
        let executor = AffinityExecutor::new(2, RecordingHandler::new());
        executor.start();
        executor.stop();
        let err = executor
            .submit(Message::new(0, TraceContext::new(1, 1), 1u32))
            .unwrap_err();
        assert_eq!(err, ExecutorError::Stopped);
    }

    struct PanickingHandler(Mutex<u32>);
    impl Handler for PanickingHandler {
        fn handle(&self, message: Message) {
            let n: u32 = message.downcast().unwrap();
            if n == 0 {
                panic!("boom");
            }
            *self.0.lock().unwrap() += 1;
        }
    }

    #[test]
    fn handler_panic_does_not_kill_the_lane() {
        let executor = AffinityExecutor::new(1, PanickingHandler(Mutex::new(0)));
        executor.start();
        executor.submit(Message::new(0, TraceContext::new(1, 1), 0u32)).unwrap();
        executor.submit(Message::new(0, TraceContext::new(1, 1), 1u32)).unwrap();
        thread::sleep(Duration::from_millis(100));
        executor.stop();
        assert_eq!(*executor.handler.0.lock().unwrap(), 1);
    }
}
