//! Bounded FIFO ring buffer absorbing jitter from one source.
//!
//! One producer, one consumer, per spec §4.2. `try_push` never blocks and
//! drops the oldest element on overflow; `try_pop` never blocks and returns
//! `None` on empty. Driven entirely from async tasks rather than a real-time
//! audio callback, so a plain mutex around a `VecDeque` is the right tool
//! for "drop oldest on overflow" jitter absorption.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

pub struct RingBuffer<T> {
    capacity: usize,
    buf: Mutex<VecDeque<T>>,
    dropped: AtomicU64,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be non-zero");
        Self {
            capacity,
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push `item`. If the buffer is already at capacity, the oldest entry
    /// is dropped first — overflow bounds latency, it never blocks the
    /// producer.
    pub fn try_push(&self, item: T) {
        let mut buf = self.buf.lock();
        if buf.len() == self.capacity {
            buf.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        buf.push_back(item);
    }

    /// Pop the oldest element, or `None` if empty. Never blocks.
    pub fn try_pop(&self) -> Option<T> {
        self.buf.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.buf.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Non-destructive borrow (by clone) of the most recently pushed item.
    /// Used only by the last-valid-frame cache update path.
    pub fn peek_last_pushed(&self) -> Option<T> {
        self.buf.lock().back().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_with_no_overflow() {
        let rb = RingBuffer::new(5);
        for i in 0..5 {
            rb.try_push(i);
        }
        let popped: Vec<_> = std::iter::from_fn(|| rb.try_pop()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn overflow_keeps_last_k_pushed_in_order() {
        let rb = RingBuffer::new(5);
        for i in 0..6 {
            // K+1 pushes into a capacity-K buffer
            rb.try_push(i);
        }
        let popped: Vec<_> = std::iter::from_fn(|| rb.try_pop()).collect();
        assert_eq!(popped, vec![1, 2, 3, 4, 5]);
        assert_eq!(rb.dropped_count(), 1);
    }

    #[test]
    fn pop_on_empty_returns_none() {
        let rb: RingBuffer<u32> = RingBuffer::new(3);
        assert_eq!(rb.try_pop(), None);
    }

    #[test]
    fn peek_last_pushed_does_not_remove() {
        let rb = RingBuffer::new(3);
        rb.try_push(1);
        rb.try_push(2);
        assert_eq!(rb.peek_last_pushed(), Some(2));
        assert_eq!(rb.len(), 2);
        assert_eq!(rb.try_pop(), Some(1));
    }

    #[test]
    fn sustained_overflow_never_yields_stale_tail() {
        let rb = RingBuffer::new(5);
        for i in 0..100 {
            rb.try_push(i);
        }
        // the oldest surviving value must be no older than the 5th-most-recent pushed
        assert_eq!(rb.try_pop(), Some(95));
    }
}
