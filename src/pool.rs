//! Bounded, thread-safe free-list of scratch byte buffers (§4.5).
//!
//! Matching is by capacity only — the pool never clears buffer
//! contents on release, so callers must treat an acquired buffer's
//! existing bytes as garbage and overwrite everything they read.

use std::sync::Mutex;

/// Maximum number of buffers the free list retains; beyond this a
/// released buffer is simply dropped.
pub const MAX_POOLED_BUFFERS: usize = 32;

pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(MAX_POOLED_BUFFERS)),
        }
    }

    /// Acquire a buffer with capacity >= `n`. Picks the smallest free
    /// buffer whose capacity is already sufficient; allocates a fresh
    /// one sized exactly `n` bytes if none qualifies.
    pub fn acquire(&self, n: usize) -> Vec<u8> {
        let mut free = self.free.lock().unwrap();
        if let Some(idx) = free
            .iter()
            .enumerate()
            .filter(|(_, b)| b.capacity() >= n)
            .min_by_key(|(_, b)| b.capacity())
            .map(|(idx, _)| idx)
        {
            let mut buf = free.swap_remove(idx);
            buf.clear();
            buf.resize(n, 0);
            buf
        } else {
            Vec::with_capacity(n)
        }
    }

    /// Return a buffer to the free list, provided it is not already
    /// full (§4.5); otherwise the buffer is dropped.
    pub fn release(&self, buffer: Vec<u8>) {
        let mut free = self.free.lock().unwrap();
        if free.len() < MAX_POOLED_BUFFERS {
            free.push(buffer);
        }
    }

    /// Number of buffers currently retained; used by the "pool bound"
    /// property test.
    pub fn len(&self) -> usize {
        self.free.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_with_empty_pool_allocates_fresh() {
        let pool = BufferPool::new();
        let buf = pool.acquire(128);
        assert!(buf.capacity() >= 128);
        assert_eq!(buf.len(), 128);
    }

    #[test]
    fn release_then_acquire_reuses_buffer() {
        let pool = BufferPool::new();
        let buf = pool.acquire(256);
        let ptr_before = buf.as_ptr();
        pool.release(buf);
        assert_eq!(pool.len(), 1);
        let reused = pool.acquire(100);
        assert_eq!(reused.as_ptr(), ptr_before);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn acquire_picks_smallest_compatible_buffer() {
        let pool = BufferPool::new();
        pool.release(Vec::with_capacity(1000));
        pool.release(Vec::with_capacity(200));
        pool.release(Vec::with_capacity(5000));
        let got = pool.acquire(150);
        assert!(got.capacity() >= 150 && got.capacity() < 1000);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn pool_never_exceeds_max_retained_buffers() {
        let pool = BufferPool::new();
        for _ in 0..(MAX_POOLED_BUFFERS + 10) {
            pool.release(Vec::with_capacity(16));
        }
        assert_eq!(pool.len(), MAX_POOLED_BUFFERS);
    }

    #[test]
    fn concurrent_acquire_release_is_safe() {
        let pool = Arc::new(BufferPool::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    let buf = pool.acquire(64);
                    pool.release(buf);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(pool.len() <= MAX_POOLED_BUFFERS);
    }
}
