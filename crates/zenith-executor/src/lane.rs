use zenith_core::MessageQueue;

/// One worker lane: an id (used for `affinity_key % lane_count` routing and
/// for diagnostics) plus its private bounded queue.
pub struct Lane {
    id: usize,
    queue: MessageQueue,
}

impl Lane {
    pub fn new(id: usize, queue_capacity: usize) -> Self {
        Self {
            id,
            queue: MessageQueue::new(queue_capacity),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }
}
