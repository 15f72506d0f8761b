use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::tick::Tick;

/// Fixed-capacity, order-preserving deque of ticks shared by the producer
/// and the flusher.
///
/// Every operation takes the one lock, so append/evict/drain/restore are
/// atomic with respect to each other. `len()` is advisory: it may be stale
/// the moment it returns.
pub struct TickBuffer {
    inner: Mutex<VecDeque<Tick>>,
    capacity: usize,
}

impl TickBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Appends at the back. Returns `false` iff the buffer is full.
    pub fn try_append(&self, tick: Tick) -> bool {
        let mut q = self.inner.lock();
        if q.len() >= self.capacity {
            return false;
        }
        q.push_back(tick);
        true
    }

    /// Drops the oldest tick, if any.
    pub fn evict_oldest(&self) -> Option<Tick> {
        self.inner.lock().pop_front()
    }

    /// Appends at the back, evicting the oldest tick first when full.
    /// Returns the evicted tick.
    pub fn append_evicting(&self, tick: Tick) -> Option<Tick> {
        let mut q = self.inner.lock();
        let evicted = if q.len() >= self.capacity {
            q.pop_front()
        } else {
            None
        };
        // capacity 0 admits nothing
        if q.len() < self.capacity {
            q.push_back(tick);
        }
        evicted
    }

    /// Removes and returns up to `max` oldest ticks, oldest first.
    pub fn drain_up_to(&self, max: usize) -> Vec<Tick> {
        let mut q = self.inner.lock();
        let n = max.min(q.len());
        q.drain(..n).collect()
    }

    /// Puts a previously drained batch back at the front in its original
    /// order.
    ///
    /// Occupancy never exceeds capacity: when producers refilled the space
    /// the drain freed, the oldest ticks of `batch` are discarded. Returns
    /// how many were discarded.
    pub fn restore_front(&self, batch: Vec<Tick>) -> usize {
        let mut q = self.inner.lock();
        let room = self.capacity.saturating_sub(q.len());
        let discarded = batch.len().saturating_sub(room);
        for tick in batch.into_iter().skip(discarded).rev() {
            q.push_front(tick);
        }
        discarded
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Tick> {
        self.inner.lock().iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn t(secs: i64) -> Tick {
        Tick::from_epoch_secs(1_757_894_400 + secs).unwrap()
    }

    #[test]
    fn try_append_refuses_when_full() {
        let buf = TickBuffer::new(2);
        assert!(buf.try_append(t(1)));
        assert!(buf.try_append(t(2)));
        assert!(!buf.try_append(t(3)));
        assert_eq!(buf.snapshot(), vec![t(1), t(2)]);
    }

    #[test]
    fn append_evicting_keeps_most_recent() {
        let buf = TickBuffer::new(3);
        let mut evicted = Vec::new();
        for i in 0..10 {
            evicted.extend(buf.append_evicting(t(i)));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.snapshot(), vec![t(7), t(8), t(9)]);
        assert_eq!(evicted, (0..7).map(t).collect::<Vec<_>>());
    }

    #[test]
    fn evict_oldest_on_empty_is_noop() {
        let buf = TickBuffer::new(1);
        assert!(buf.evict_oldest().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_returns_oldest_first_and_caps_at_len() {
        let buf = TickBuffer::new(10);
        for i in 0..4 {
            buf.try_append(t(i));
        }
        assert_eq!(buf.drain_up_to(3), vec![t(0), t(1), t(2)]);
        assert_eq!(buf.drain_up_to(3), vec![t(3)]);
        assert!(buf.drain_up_to(3).is_empty());
    }

    #[test]
    fn drain_then_restore_is_identity() {
        let buf = TickBuffer::new(8);
        for i in 0..6 {
            buf.try_append(t(i));
        }
        let before = buf.snapshot();
        let batch = buf.drain_up_to(4);
        assert_eq!(buf.restore_front(batch), 0);
        assert_eq!(buf.snapshot(), before);
    }

    #[test]
    fn restore_after_refill_discards_oldest_restored() {
        let buf = TickBuffer::new(3);
        for i in 0..3 {
            buf.try_append(t(i));
        }
        let batch = buf.drain_up_to(2);
        buf.try_append(t(3));
        buf.try_append(t(4));

        assert_eq!(buf.restore_front(batch), 2);
        assert_eq!(buf.snapshot(), vec![t(2), t(3), t(4)]);

        let batch = buf.drain_up_to(2);
        buf.try_append(t(5));
        assert_eq!(buf.restore_front(batch), 1);
        assert_eq!(buf.snapshot(), vec![t(3), t(4), t(5)]);
    }

    #[test]
    fn concurrent_producers_never_exceed_capacity() {
        let buf = Arc::new(TickBuffer::new(50));
        let handles: Vec<_> = (0..4)
            .map(|w| {
                let buf = buf.clone();
                std::thread::spawn(move || {
                    for i in 0..500 {
                        buf.append_evicting(t(w * 1000 + i));
                        if i % 7 == 0 {
                            let batch = buf.drain_up_to(5);
                            buf.restore_front(batch);
                        }
                        assert!(buf.len() <= 50);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(buf.len(), 50);
    }
}
