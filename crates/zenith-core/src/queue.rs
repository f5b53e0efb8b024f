use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError, TrySendError};

use crate::error::CoreError;
use crate::message::Message;

/// Bounded MPMC channel used by a single lane. `push` is non-blocking;
/// `pop` blocks until a message arrives or the queue closes; `close` is
/// idempotent and wakes every blocked consumer.
///
/// Waking a blocked `pop()` on close needs more than an atomic flag — a
/// parked `recv()` won't notice a flag flip. A second zero-capacity
/// "close signal" channel is selected alongside the data channel; dropping
/// its sender in `close()` makes that branch immediately ready.
pub struct MessageQueue {
    sender: Sender<Message>,
    receiver: Receiver<Message>,
    close_tx: Mutex<Option<Sender<()>>>,
    close_rx: Receiver<()>,
    closed: AtomicBool,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        let (close_tx, close_rx) = bounded(0);
        Self {
            sender,
            receiver,
            close_tx: Mutex::new(Some(close_tx)),
            close_rx,
            closed: AtomicBool::new(false),
        }
    }

    pub fn push(&self, message: Message) -> Result<(), CoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CoreError::Closed);
        }
        match self.sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(CoreError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(CoreError::Closed),
        }
    }

    /// Blocks until a message is available or the queue is closed and
    /// drained, in which case it returns `None`. A close observed while a
    /// message is still buffered still yields that message first
    /// (drain-on-stop).
    pub fn pop(&self) -> Option<Message> {
        // Check the data channel first: `select!` picks pseudo-randomly
        // among simultaneously-ready branches, and a disconnected
        // close_rx is "ready" the instant `close()` runs, which could
        // otherwise race ahead of a message buffered before the close.
        if let Some(msg) = self.try_pop() {
            return Some(msg);
        }
        select! {
            recv(self.receiver) -> msg => msg.ok(),
            recv(self.close_rx) -> _ => self.try_pop(),
        }
    }

    /// Non-blocking drain used by `stop()` to flush remaining messages
    /// before a worker exits.
    pub fn try_pop(&self) -> Option<Message> {
        match self.receiver.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Idempotent: further `push`es fail, and every thread blocked in
    /// `pop()` wakes via the close-signal channel.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.close_tx.lock().unwrap().take();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
