//! Time/count flush policy for ingested records

use std::time::Duration;
use tokio::time::Instant;

/// Buffers items until `max_items` are held or `interval` has elapsed since
/// the last flush, whichever comes first.
#[derive(Debug)]
pub struct Batcher<T> {
    pending: Vec<T>,
    interval: Duration,
    max_items: usize,
    last_flush: Instant,
    total: usize,
}

impl<T> Batcher<T> {
    pub fn new(interval: Duration, max_items: usize) -> Self {
        Self {
            pending: Vec::with_capacity(max_items),
            interval,
            max_items: max_items.max(1),
            last_flush: Instant::now(),
            total: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        self.total += 1;
        self.pending.push(item);
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.max_items
    }

    /// Interval elapsed with something buffered
    pub fn is_due(&self, now: Instant) -> bool {
        !self.pending.is_empty() && now.duration_since(self.last_flush) >= self.interval
    }

    /// When the buffered items become due
    pub fn deadline(&self) -> Instant {
        self.last_flush + self.interval
    }

    /// Take the buffer and restart the interval
    pub fn flush(&mut self, now: Instant) -> Vec<T> {
        self.last_flush = now;
        std::mem::replace(&mut self.pending, Vec::with_capacity(self.max_items))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Items pushed since creation
    pub fn total(&self) -> usize {
        self.total
    }
}
