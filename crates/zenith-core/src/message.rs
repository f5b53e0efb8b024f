use std::any::Any;
use std::fmt;

use crate::observability::trace::TraceContext;

/// A unit of work routed by the affinity executor. Ownership is exclusive:
/// it moves from producer to queue to worker to handler, never shared.
pub struct Message {
    pub affinity_key: u64,
    pub trace_context: TraceContext,
    payload: Box<dyn Any + Send>,
}

impl Message {
    pub fn new(affinity_key: u64, trace_context: TraceContext, payload: impl Any + Send) -> Self {
        Self {
            affinity_key,
            trace_context,
            payload: Box::new(payload),
        }
    }

    /// Consumes the message, downcasting the payload. Returns the message
    /// back (with the payload intact) on mismatch so the caller can try a
    /// different variant — mirrors the worker's "pattern-match payload"
    /// dispatch in the request pipeline.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let Message {
            affinity_key,
            trace_context,
            payload,
        } = self;
        match payload.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(payload) => Err(Message {
                affinity_key,
                trace_context,
                payload,
            }),
        }
    }

    pub fn payload_is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("affinity_key", &self.affinity_key)
            .field("trace_id", &format_args!("{:032x}", self.trace_context.trace_id))
            .finish()
    }
}
