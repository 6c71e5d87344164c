//! Bounded outbound packet queue. Per spec §4.3, `try_dequeue` must never
//! block — this is the fix for the historical bug where a blocking dequeue
//! on the audio queue deadlocked video-only clients (§4.5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::codec::Packet;

/// What to do when `enqueue` is called on a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Video path: a stale frame is worthless, so make room by evicting the
    /// oldest queued packet.
    DropOldest,
    /// Audio path: prefer to drop the newest chunk and preserve ordering of
    /// what's already queued, signalling backpressure to the caller.
    DropNewest,
}

pub struct PacketQueue {
    capacity: usize,
    policy: OverflowPolicy,
    buf: Mutex<VecDeque<Packet>>,
    dropped: AtomicU64,
}

impl PacketQueue {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        assert!(capacity > 0);
        Self {
            capacity,
            policy,
            buf: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn video(capacity: usize) -> Self {
        Self::new(capacity, OverflowPolicy::DropOldest)
    }

    pub fn audio(capacity: usize) -> Self {
        Self::new(capacity, OverflowPolicy::DropNewest)
    }

    /// Enqueue a packet. Returns `true` if it was queued, `false` if it was
    /// dropped outright (only possible under `DropNewest`). Never blocks.
    pub fn enqueue(&self, packet: Packet) -> bool {
        let mut buf = self.buf.lock();
        if buf.len() == self.capacity {
            match self.policy {
                OverflowPolicy::DropOldest => {
                    buf.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                OverflowPolicy::DropNewest => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
            }
        }
        buf.push_back(packet);
        true
    }

    /// Pop the next packet to send, or `None` if empty. Must never block —
    /// callers poll this and sleep briefly rather than waiting on it.
    pub fn try_dequeue(&self) -> Option<Packet> {
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
