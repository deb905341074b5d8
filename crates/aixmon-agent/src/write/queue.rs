use aixmon_common::types::Batch;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// FIFO of scraped batches awaiting delivery.
///
/// Every operation takes the lock for its own duration only; callers get an
/// `Arc` handle to the head so the lock is never held across network I/O.
///
/// There is no capacity bound: if the remote endpoint stays unreachable the
/// queue grows for as long as scrapes keep arriving.
#[derive(Default)]
pub struct PendingQueue {
    items: Mutex<VecDeque<Arc<Batch>>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, VecDeque<Arc<Batch>>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a batch to the tail.
    pub fn enqueue(&self, batch: Batch) {
        self.items().push_back(Arc::new(batch));
    }

    /// The oldest batch, left in place.
    pub fn peek(&self) -> Option<Arc<Batch>> {
        self.items().front().cloned()
    }

    /// Remove and return the oldest batch.
    ///
    /// # Panics
    ///
    /// Panics if the queue is empty. Callers must have seen a batch from
    /// [`PendingQueue::peek`] first.
    pub fn dequeue(&self) -> Arc<Batch> {
        self.items()
            .pop_front()
            .expect("dequeue called on an empty pending queue")
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}
