//! Fixed-capacity block ring shared by exactly one producer (the planner)
//! and one consumer (the pulse generator).
//!
//! Occupied slots are `[tail, head)` modulo the capacity; `head == tail`
//! means empty and one slot always stays free so a full ring is
//! distinguishable from an empty one. Only the producer moves `head`, only
//! the consumer moves `tail`. Every index move notifies waiters so a
//! blocked producer (buffer full) or consumer (buffer empty) wakes up.
//!
//! Each slot sits behind its own mutex so the planner can rewrite queued
//! blocks while the consumer copies out the block at `tail`.

use crate::block::Block;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[inline]
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct BlockRing {
    slots: Box<[Mutex<Block>]>,
    head: AtomicUsize,
    tail: AtomicUsize,
    acceleration_management: AtomicBool,
    gate: Mutex<()>,
    changed: Condvar,
}

impl BlockRing {
    pub(crate) fn new(capacity: usize, acceleration_management: bool) -> Self {
        let slots = (0..capacity)
            .map(|_| Mutex::new(Block::default()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            acceleration_management: AtomicBool::new(acceleration_management),
            gate: Mutex::new(()),
            changed: Condvar::new(),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.capacity()
    }

    #[inline]
    pub(crate) fn head(&self) -> usize {
        self.head.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn tail(&self) -> usize {
        self.tail.load(Ordering::Acquire)
    }

    pub(crate) fn len(&self) -> usize {
        let cap = self.capacity();
        (self.head() + cap - self.tail()) % cap
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head() == self.tail()
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.next_index(self.head()) == self.tail()
    }

    pub(crate) fn read(&self, index: usize) -> Block {
        *lock(&self.slots[index])
    }

    pub(crate) fn write(&self, index: usize, block: Block) {
        *lock(&self.slots[index]) = block;
    }

    pub(crate) fn acceleration_management(&self) -> bool {
        self.acceleration_management.load(Ordering::Acquire)
    }

    pub(crate) fn set_acceleration_management(&self, on: bool) {
        self.acceleration_management.store(on, Ordering::Release);
    }

    /// Producer only: make the slot at the current head visible.
    pub(crate) fn publish_head(&self, next: usize) {
        self.head.store(next, Ordering::Release);
        self.notify();
    }

    /// Consumer only: release the slot at tail. Returns false when empty.
    pub(crate) fn advance_tail(&self) -> bool {
        let tail = self.tail();
        if tail == self.head() {
            return false;
        }
        self.tail.store(self.next_index(tail), Ordering::Release);
        self.notify();
        true
    }

    /// Drop every queued block. Only valid while no consumer is mid-block.
    pub(crate) fn reset(&self) {
        self.tail.store(0, Ordering::Release);
        self.head.store(0, Ordering::Release);
        self.notify();
    }

    fn notify(&self) {
        // Taking the gate orders the index store before a waiter's re-check.
        let _gate = lock(&self.gate);
        self.changed.notify_all();
    }

    /// Block until `ready` holds.
    pub(crate) fn wait_until(&self, mut ready: impl FnMut(&Self) -> bool) {
        let mut gate = lock(&self.gate);
        while !ready(self) {
            gate = self
                .changed
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until `ready` holds or `timeout` elapses. Returns the final
    /// value of `ready`.
    pub(crate) fn wait_until_timeout(
        &self,
        mut ready: impl FnMut(&Self) -> bool,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        let mut gate = lock(&self.gate);
        loop {
            if ready(self) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            gate = self
                .changed
                .wait_timeout(gate, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Consumer half of the planner queue.
///
/// Reads the oldest planned block and releases it once executed. Blocks are
/// handed out by value; the planner may still refine a queued block until
/// the consumer has copied it. Replanning treats the block at tail as the
/// oldest one and gives it entry 0 even if it is already running, so the
/// following block is planned against the running block's frozen profile.
pub struct BlockConsumer {
    ring: Arc<BlockRing>,
}

impl BlockConsumer {
    pub(crate) fn new(ring: Arc<BlockRing>) -> Self {
        Self { ring }
    }

    /// The block at tail, or `None` when the buffer is empty.
    pub fn current(&self) -> Option<Block> {
        let tail = self.ring.tail();
        if tail == self.ring.head() {
            return None;
        }
        Some(self.ring.read(tail))
    }

    /// Like [`current`](Self::current) but waits up to `timeout` for a block.
    pub fn wait_current(&self, timeout: Duration) -> Option<Block> {
        if self
            .ring
            .wait_until_timeout(|ring| !ring.is_empty(), timeout)
        {
            self.current()
        } else {
            None
        }
    }

    /// Release the block at tail. No-op (returns false) when empty.
    pub fn discard_current(&self) -> bool {
        let released = self.ring.advance_tail();
        if released {
            tracing::trace!(queued = self.ring.len(), "block released");
        }
        released
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Whether queued blocks carry acceleration ramps.
    pub fn acceleration_management(&self) -> bool {
        self.ring.acceleration_management()
    }
}

impl std::fmt::Debug for BlockConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockConsumer")
            .field("queued", &self.ring.len())
            .field("capacity", &self.ring.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(n: u32) -> Block {
        Block {
            step_event_count: n,
            ..Block::default()
        }
    }

    fn push(ring: &BlockRing, block: Block) {
        let head = ring.head();
        ring.write(head, block);
        ring.publish_head(ring.next_index(head));
    }

    #[test]
    fn one_slot_stays_free() {
        let ring = BlockRing::new(4, true);
        assert!(ring.is_empty());
        for n in 1..=3 {
            assert!(!ring.is_full());
            push(&ring, marked(n));
        }
        assert!(ring.is_full());
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn consumer_sees_fifo_order_across_wrap() {
        let ring = Arc::new(BlockRing::new(3, true));
        let consumer = BlockConsumer::new(ring.clone());
        for n in 1..=7 {
            push(&ring, marked(n));
            assert_eq!(consumer.current().map(|b| b.step_event_count), Some(n));
            assert!(consumer.discard_current());
        }
        assert!(consumer.current().is_none());
        assert!(!consumer.discard_current());
    }

    #[test]
    fn wait_current_times_out_when_empty() {
        let ring = Arc::new(BlockRing::new(4, true));
        let consumer = BlockConsumer::new(ring);
        assert!(consumer.wait_current(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn wait_current_wakes_on_publish() {
        let ring = Arc::new(BlockRing::new(4, true));
        let consumer = BlockConsumer::new(ring.clone());
        let producer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            push(&ring, marked(42));
        });
        let got = consumer.wait_current(Duration::from_secs(5));
        producer.join().unwrap();
        assert_eq!(got.map(|b| b.step_event_count), Some(42));
    }

    #[test]
    fn reset_empties_ring() {
        let ring = BlockRing::new(4, true);
        push(&ring, marked(1));
        push(&ring, marked(2));
        ring.reset();
        assert!(ring.is_empty());
        assert_eq!((ring.head(), ring.tail()), (0, 0));
    }
}
