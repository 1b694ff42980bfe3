//! Reusable render buffers.
//!
//! Every render pass writes into a buffer taken from a [`BufferPool`]. The
//! buffer comes back as a [`PooledBuffer`], which returns itself to the pool
//! when dropped, so each acquired buffer is released exactly once on every
//! path, success or failure.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

/// A fixed-capacity pool of byte buffers, safe for concurrent use.
///
/// `get` reuses an idle buffer when one is available and allocates otherwise.
/// Returned buffers are cleared and kept only while fewer than `capacity`
/// are idle; the rest are freed.
pub struct BufferPool {
    idle: ArrayQueue<Vec<u8>>,
    outstanding: AtomicUsize,
}

impl BufferPool {
    /// Creates a pool keeping at most `capacity` idle buffers.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            idle: ArrayQueue::new(capacity.max(1)),
            outstanding: AtomicUsize::new(0),
        })
    }

    /// Takes a buffer from the pool.
    pub fn get(self: &Arc<Self>) -> PooledBuffer {
        let buf = self.idle.pop().unwrap_or_default();
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        PooledBuffer {
            buf,
            pool: Arc::clone(self),
        }
    }

    fn put(&self, mut buf: Vec<u8>) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        buf.clear();
        // A full queue hands the buffer back; dropping it frees the memory.
        let _ = self.idle.push(buf);
    }

    /// Maximum number of idle buffers kept.
    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Number of buffers acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("capacity", &self.capacity())
            .field("idle", &self.idle())
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Dereferences to `Vec<u8>`. Dropping it (or calling [`release`](Self::release))
/// returns it to the pool.
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl PooledBuffer {
    /// Returns the buffer to its pool.
    pub fn release(self) {
        drop(self)
    }

    /// The accumulated bytes as text, replacing invalid UTF-8.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buf)
    }
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.put(std::mem::take(&mut self.buf));
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.buf.len())
            .finish()
    }
}
