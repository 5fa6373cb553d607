use crossbeam_queue::SegQueue;
use parking_lot::RwLock;
use std::sync::Arc;

/// Pending-send buffer: encoded frames queued while no transport is ready.
///
/// Appends from any thread take the read lock and push onto a lock-free
/// queue, so they never contend with each other; only a bulk-flush swap
/// takes the write lock.
pub(crate) struct SendBuffer {
    queue: RwLock<Arc<SegQueue<String>>>,
}

impl SendBuffer {
    pub fn new() -> Self {
        Self {
            queue: RwLock::new(Arc::new(SegQueue::new())),
        }
    }

    pub fn push(&self, frame: String) {
        self.queue.read().push(frame);
    }

    /// Swap the buffer for an empty one and return the queued frames in
    /// submission order, for a bulk send.
    pub fn take_snapshot(&self) -> Vec<String> {
        let old = {
            let mut queue = self.queue.write();
            std::mem::replace(&mut *queue, Arc::new(SegQueue::new()))
        };
        let mut frames = Vec::with_capacity(old.len());
        while let Some(frame) = old.pop() {
            frames.push(frame);
        }
        frames
    }

    /// Put a failed bulk snapshot back. Frames appended since the swap end
    /// up at the tail of the restored buffer, not interleaved.
    pub fn restore(&self, frames: Vec<String>) {
        let restored = Arc::new(SegQueue::new());
        for frame in frames {
            restored.push(frame);
        }
        let concurrent = {
            let mut queue = self.queue.write();
            std::mem::replace(&mut *queue, restored)
        };
        let queue = self.queue.read();
        while let Some(frame) = concurrent.pop() {
            queue.push(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_preserves_submission_order_and_empties() {
        let buffer = SendBuffer::new();
        for frame in ["a", "b", "c"] {
            buffer.push(frame.to_string());
        }
        assert_eq!(buffer.take_snapshot(), vec!["a", "b", "c"]);
        assert!(buffer.take_snapshot().is_empty());
    }

    #[test]
    fn restore_keeps_snapshot_before_concurrent_appends() {
        let buffer = SendBuffer::new();
        buffer.push("a".to_string());
        buffer.push("b".to_string());
        let snapshot = buffer.take_snapshot();
        // Appended while the bulk send was in flight.
        buffer.push("c".to_string());
        buffer.restore(snapshot);
        assert_eq!(buffer.take_snapshot(), vec!["a", "b", "c"]);
    }
}
