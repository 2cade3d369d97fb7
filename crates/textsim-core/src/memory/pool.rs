//! Bump-pointer block allocator

use std::alloc::{self, Layout};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::PoolError;

/// Default block size for a shared pool (1 MiB)
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 20;

const BLOCK_ALIGN: usize = 16;

struct Block {
    ptr: NonNull<u8>,
    size: usize,
    offset: usize,
}

// SAFETY: a block is a plain heap region owned by exactly one pool and only
// touched under that pool's mutex.
unsafe impl Send for Block {}

impl Block {
    fn new(size: usize) -> Result<Self, PoolError> {
        let layout =
            Layout::from_size_align(size, BLOCK_ALIGN).map_err(|_| PoolError::OutOfMemory(size))?;
        // SAFETY: size is non-zero, checked by every caller.
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(PoolError::OutOfMemory(size))?;
        Ok(Self {
            ptr,
            size,
            offset: 0,
        })
    }

    /// Carve `size` bytes aligned to `align` out of the remaining space.
    fn bump(&mut self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let base = self.ptr.as_ptr() as usize;
        let current = base.checked_add(self.offset)?;
        let aligned = current.checked_add(align - 1)? & !(align - 1);
        let start = aligned - base;
        let end = start.checked_add(size)?;
        if end > self.size {
            return None;
        }
        self.offset = end;
        // SAFETY: start <= size, so the result stays inside the allocation.
        NonNull::new(unsafe { self.ptr.as_ptr().add(start) })
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        if let Ok(layout) = Layout::from_size_align(self.size, BLOCK_ALIGN) {
            // SAFETY: allocated in `Block::new` with this exact layout.
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) };
        }
    }
}

/// Arena allocator for transient scratch buffers.
///
/// Allocation bumps an offset inside the first block with room, appending a
/// new block when none fits. Blocks never move, so earlier pointers stay
/// valid until `reset()`. Individual frees are not supported.
pub struct MemoryPool {
    default_block_size: usize,
    blocks: Mutex<Vec<Block>>,
    leases: AtomicUsize,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPool {
    pub fn new() -> Self {
        Self {
            default_block_size: DEFAULT_BLOCK_SIZE,
            blocks: Mutex::new(Vec::new()),
            leases: AtomicUsize::new(0),
        }
    }

    pub fn with_block_size(block_size: usize) -> Result<Self, PoolError> {
        if block_size == 0 {
            return Err(PoolError::ZeroBlockSize);
        }
        Ok(Self {
            default_block_size: block_size,
            ..Self::new()
        })
    }

    pub fn default_block_size(&self) -> usize {
        self.default_block_size
    }

    /// Reserve `size` bytes aligned to `align`.
    ///
    /// The returned pointer is valid until the next successful `reset()` or
    /// until the pool is dropped. Prefer [`MemoryPool::lease`], which ties
    /// the buffer's lifetime to the pool and blocks resets while alive.
    pub fn allocate(&self, size: usize, align: usize) -> Result<NonNull<u8>, PoolError> {
        if !align.is_power_of_two() {
            return Err(PoolError::InvalidAlignment(align));
        }
        let mut blocks = self.blocks.lock();
        self.allocate_locked(&mut blocks, size, align)
    }

    fn allocate_locked(
        &self,
        blocks: &mut Vec<Block>,
        size: usize,
        align: usize,
    ) -> Result<NonNull<u8>, PoolError> {
        for block in blocks.iter_mut() {
            if let Some(ptr) = block.bump(size, align) {
                return Ok(ptr);
            }
        }

        let needed = size
            .checked_add(align)
            .ok_or(PoolError::OutOfMemory(size))?;
        let mut block = Block::new(self.default_block_size.max(needed))?;
        let ptr = block.bump(size, align).ok_or(PoolError::OutOfMemory(size))?;
        tracing::trace!(block_size = block.size, blocks = blocks.len() + 1, "pool grew");
        blocks.push(block);
        Ok(ptr)
    }

    /// No-op: memory is only reclaimed by `reset()`.
    pub fn deallocate(&self, _ptr: NonNull<u8>, _size: usize) {}

    /// Lease a buffer of `len` elements, each initialised to `fill`.
    pub fn lease<T: Copy>(&self, len: usize, fill: T) -> Result<PoolBuf<'_, T>, PoolError> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(PoolError::OutOfMemory(usize::MAX))?;

        let ptr = {
            let mut blocks = self.blocks.lock();
            let ptr = self.allocate_locked(&mut blocks, bytes, std::mem::align_of::<T>())?;
            // Counted under the lock so a concurrent reset observes it.
            self.leases.fetch_add(1, Ordering::AcqRel);
            ptr.cast::<T>()
        };

        for i in 0..len {
            // SAFETY: the region holds `len` properly aligned slots of T.
            unsafe { ptr.as_ptr().add(i).write(fill) };
        }

        Ok(PoolBuf {
            ptr,
            len,
            pool: self,
            _marker: PhantomData,
        })
    }

    /// Rewind every block to empty.
    ///
    /// Fails with [`PoolError::Busy`] while leases are outstanding; the pool
    /// is left untouched in that case.
    pub fn reset(&self) -> Result<(), PoolError> {
        let mut blocks = self.blocks.lock();
        let outstanding = self.leases.load(Ordering::Acquire);
        if outstanding > 0 {
            return Err(PoolError::Busy(outstanding));
        }
        for block in blocks.iter_mut() {
            block.offset = 0;
        }
        Ok(())
    }

    /// Bytes handed out since the last reset, alignment padding included.
    pub fn allocated_bytes(&self) -> usize {
        self.blocks.lock().iter().map(|b| b.offset).sum()
    }

    pub fn capacity_bytes(&self) -> usize {
        self.blocks.lock().iter().map(|b| b.size).sum()
    }

    /// Allocated fraction of capacity, 0.0 for an empty pool.
    pub fn utilization(&self) -> f64 {
        let blocks = self.blocks.lock();
        let capacity: usize = blocks.iter().map(|b| b.size).sum();
        if capacity == 0 {
            return 0.0;
        }
        let allocated: usize = blocks.iter().map(|b| b.offset).sum();
        allocated as f64 / capacity as f64
    }

    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }

    pub fn outstanding_leases(&self) -> usize {
        self.leases.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPool")
            .field("default_block_size", &self.default_block_size)
            .field("blocks", &self.block_count())
            .field("leases", &self.outstanding_leases())
            .finish()
    }
}

/// Typed scratch buffer borrowed from a [`MemoryPool`].
///
/// Dropping the lease releases its hold on the pool; the bytes themselves
/// are reclaimed by the next `reset()`.
pub struct PoolBuf<'p, T: Copy> {
    ptr: NonNull<T>,
    len: usize,
    pool: &'p MemoryPool,
    _marker: PhantomData<&'p mut [T]>,
}

impl<T: Copy> Deref for PoolBuf<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: initialised in `lease`; the region cannot be handed out
        // again while this lease keeps the pool from resetting.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> DerefMut for PoolBuf<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, and the lease is the region's only owner.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: Copy> Drop for PoolBuf<'_, T> {
    fn drop(&mut self) {
        self.pool.leases.fetch_sub(1, Ordering::AcqRel);
    }
}
