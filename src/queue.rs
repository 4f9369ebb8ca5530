use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::types::Block;

/// Bounded FIFO feeding the block processor. Producers block while the queue
/// is at capacity; the single consumer polls with a timeout so it can notice
/// a stop request. Closing the queue wakes every waiter.
pub struct BlockQueue {
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct State {
    items: VecDeque<Block>,
    closed: bool,
}

impl BlockQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a block, waiting while the queue is full. Returns `false` if
    /// the queue was closed before the block could be enqueued.
    pub fn enqueue(&self, block: Block) -> bool {
        let mut state = self.state.lock();
        while state.items.len() >= self.capacity && !state.closed {
            self.not_full.wait(&mut state);
        }
        if state.closed {
            return false;
        }
        state.items.push_back(block);
        self.not_empty.notify_one();
        true
    }

    /// Removes the oldest block, waiting up to `timeout` for one to arrive.
    /// Returns `None` on timeout or when the queue is closed and drained.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Block> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(block) = state.items.pop_front() {
                self.not_full.notify_one();
                return Some(block);
            }
            if state.closed {
                return None;
            }
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                let block = state.items.pop_front();
                if block.is_some() {
                    self.not_full.notify_one();
                }
                return block;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.state.lock().items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Marks the queue closed and wakes all blocked producers and consumers.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::BlockQueue;
    use crate::types::{Block, Payload};

    fn sample_block(number: u64) -> Block {
        Block::new(number, Payload::DataTxs(Vec::new()))
    }

    #[test]
    fn dequeues_in_fifo_order() {
        let queue = BlockQueue::new(4);
        assert!(queue.enqueue(sample_block(1)));
        assert!(queue.enqueue(sample_block(2)));

        let first = queue.dequeue_timeout(Duration::from_millis(10)).unwrap();
        let second = queue.dequeue_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(first.number(), 1);
        assert_eq!(second.number(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn dequeue_times_out_when_empty() {
        let queue = BlockQueue::new(1);
        assert!(queue.dequeue_timeout(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn enqueue_blocks_until_capacity_frees() {
        let queue = Arc::new(BlockQueue::new(1));
        assert!(queue.enqueue(sample_block(1)));
        assert!(queue.is_full());

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || queue.enqueue(sample_block(2)))
        };
        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.len(), 1);

        let first = queue.dequeue_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(first.number(), 1);
        assert!(producer.join().unwrap());

        let second = queue.dequeue_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(second.number(), 2);
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let queue = Arc::new(BlockQueue::new(1));
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert!(consumer.join().unwrap().is_none());
    }

    #[test]
    fn rejects_enqueue_after_close() {
        let queue = BlockQueue::new(1);
        queue.close();
        assert!(!queue.enqueue(sample_block(1)));
    }
}
