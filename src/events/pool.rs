//! Pooled read buffers and reference-counted stored events
//!
//! Events read from the logs hold the buffer their bytes were read into.
//! The buffer goes back to the pool when the last holder releases the
//! event.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::event::Event;

/// Bounded pool of reusable byte buffers.
#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
}

impl BufferPool {
    /// Creates a pool keeping at most `capacity` idle buffers.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// Takes an empty buffer, reusing an idle one if available.
    pub fn get(&self) -> Vec<u8> {
        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        buffers.pop().unwrap_or_default()
    }

    /// Returns a buffer. Buffers beyond capacity are dropped.
    pub fn put(&self, mut buf: Vec<u8>) {
        buf.clear();
        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        if buffers.len() < self.capacity {
            buffers.push(buf);
        }
    }

    /// Number of idle buffers.
    pub fn idle(&self) -> usize {
        self.buffers.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug)]
struct Inner {
    event: Event,
    buffer: Mutex<Option<Vec<u8>>>,
    refs: AtomicUsize,
    pool: Arc<BufferPool>,
}

/// An event read from a log.
///
/// Holders call `retain` to share it and `release` when done. The read
/// buffer returns to the pool on the last release.
#[derive(Debug)]
pub struct DbEvent {
    inner: Arc<Inner>,
}

impl DbEvent {
    pub(crate) fn new(event: Event, buffer: Vec<u8>, pool: Arc<BufferPool>) -> Self {
        Self {
            inner: Arc::new(Inner {
                event,
                buffer: Mutex::new(Some(buffer)),
                refs: AtomicUsize::new(1),
                pool,
            }),
        }
    }

    /// Takes another reference.
    pub fn retain(&self) -> DbEvent {
        self.inner.refs.fetch_add(1, Ordering::AcqRel);
        DbEvent {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Drops this reference.
    pub fn release(self) {
        if self.inner.refs.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let buffer = self
            .inner
            .buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(buffer) = buffer {
            self.inner.pool.put(buffer);
        }
    }

    /// Outstanding references.
    pub fn ref_count(&self) -> usize {
        self.inner.refs.load(Ordering::Acquire)
    }

    pub fn event(&self) -> &Event {
        &self.inner.event
    }
}

impl Deref for DbEvent {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.inner.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appdef::AppDefBuilder;
    use crate::events::EventParams;

    fn event() -> Event {
        let app = Arc::new(AppDefBuilder::new().build().unwrap());
        Event::corrupted(&app, EventParams::default(), Vec::new(), "test")
    }

    #[test]
    fn test_pool_reuses_buffers() {
        let pool = BufferPool::new(2);
        let mut buf = pool.get();
        buf.extend_from_slice(b"abc");
        let cap = buf.capacity();
        pool.put(buf);
        assert_eq!(pool.idle(), 1);

        let buf = pool.get();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), cap);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = BufferPool::new(1);
        pool.put(Vec::new());
        pool.put(Vec::new());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_buffer_returns_on_last_release() {
        let pool = Arc::new(BufferPool::new(4));
        let event = DbEvent::new(event(), vec![1, 2, 3], Arc::clone(&pool));
        let shared = event.retain();
        assert_eq!(event.ref_count(), 2);

        event.release();
        assert_eq!(pool.idle(), 0);
        assert_eq!(shared.ref_count(), 1);
        assert!(!shared.is_valid());

        shared.release();
        assert_eq!(pool.idle(), 1);
    }
}
