//! Reusable body buffers.
//!
//! Request and response bodies are buffered whole, so every request needs one
//! or two growable buffers. [`BufferPool`] hands out [`PooledBuffer`] guards;
//! dropping a guard clears the buffer (keeping its capacity) and puts it back.
//! Nothing is ever evicted: a buffer lives for one request at a time and the
//! pool only grows to the peak number of concurrent requests.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

/// Shared pool of byte buffers.
///
/// Cloning is cheap and clones share the same free list.
#[derive(Clone, Default)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check out a buffer, reusing a released one when available.
    pub fn acquire(&self) -> PooledBuffer {
        let buf = self.free.lock().pop().unwrap_or_default();
        PooledBuffer {
            buf,
            pool: self.clone(),
        }
    }

    /// Number of released buffers waiting to be reused.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, mut buf: Vec<u8>) {
        buf.clear();
        self.free.lock().push(buf);
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .finish()
    }
}

/// A buffer checked out of a [`BufferPool`].
///
/// Owned by exactly one request. Returned to the pool on drop, on every exit
/// path.
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: BufferPool,
}

impl PooledBuffer {
    /// Copy the current contents into an owned [`Bytes`].
    ///
    /// The buffer itself stays checked out until the guard is dropped.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
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
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.buf.len())
            .field("capacity", &self.buf.capacity())
            .finish()
    }
}
