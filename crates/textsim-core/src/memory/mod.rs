//! Arena scratch memory for algorithm working sets
//!
//! Algorithms borrow short-lived rows and tables from a [`MemoryPool`]
//! instead of hitting the heap on every call. Memory is reclaimed only as a
//! whole, through `reset()`, once no lease is outstanding.
//!
//! - [`MemoryPool`]: bump allocator over a growable list of blocks
//! - [`ThreadAffinePool`]: one pool per thread, swept by `reset_all()`
//! - [`Scratch`]: pooled buffer with a heap fallback when no pool is given

mod pool;
mod scratch;
mod thread_pool;

use std::ops::Deref;
use std::sync::Arc;

use thiserror::Error;

use crate::error::SimilarityError;

pub use pool::{MemoryPool, PoolBuf, DEFAULT_BLOCK_SIZE};
pub use scratch::Scratch;
pub use thread_pool::{ThreadAffinePool, THREAD_BLOCK_SIZE};

/// Errors raised by the arena allocator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// Requested alignment is not a power of two
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    /// Pool configured with a zero block size
    #[error("block size must be greater than 0")]
    ZeroBlockSize,

    /// The system allocator refused a new block
    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    /// Reset attempted while scratch buffers are still leased
    #[error("pool reset with {0} outstanding leases")]
    Busy(usize),
}

impl From<PoolError> for SimilarityError {
    fn from(err: PoolError) -> Self {
        SimilarityError::MemoryAllocation(err.to_string())
    }
}

/// The pool serving the calling thread, either borrowed or shared.
pub enum LocalPool<'a> {
    Borrowed(&'a MemoryPool),
    Shared(Arc<MemoryPool>),
}

impl Deref for LocalPool<'_> {
    type Target = MemoryPool;

    fn deref(&self) -> &MemoryPool {
        match self {
            LocalPool::Borrowed(pool) => *pool,
            LocalPool::Shared(pool) => pool.as_ref(),
        }
    }
}

/// Source of scratch memory handed to algorithms by the factory.
pub trait ScratchPool: Send + Sync {
    /// Pool to allocate from on the current thread.
    fn local(&self) -> LocalPool<'_>;

    /// Rewind the current thread's pool.
    fn reset_local(&self) -> Result<(), PoolError> {
        self.local().reset()
    }

    /// Bytes reserved across every underlying block.
    fn capacity_bytes(&self) -> usize;
}

impl ScratchPool for MemoryPool {
    fn local(&self) -> LocalPool<'_> {
        LocalPool::Borrowed(self)
    }

    fn capacity_bytes(&self) -> usize {
        MemoryPool::capacity_bytes(self)
    }
}

impl ScratchPool for ThreadAffinePool {
    fn local(&self) -> LocalPool<'_> {
        LocalPool::Shared(self.current())
    }

    fn capacity_bytes(&self) -> usize {
        self.total_capacity_bytes()
    }
}
