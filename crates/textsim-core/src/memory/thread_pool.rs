//! Thread-affine pools: one arena per thread, coordinated through a registry
//!
//! Each registry entry is tied to a token stored in the owning thread's
//! thread-local storage. When the thread exits the token is dropped, and the
//! next registry access drops that thread's pool.

use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use ahash::AHashMap;
use parking_lot::Mutex;

use super::{MemoryPool, PoolError};

/// Default block size for per-thread pools (64 KiB)
pub const THREAD_BLOCK_SIZE: usize = 64 << 10;

thread_local! {
    static LIVENESS: Arc<()> = Arc::new(());
}

struct Slot {
    owner: Weak<()>,
    pool: Arc<MemoryPool>,
}

impl Slot {
    fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

/// Hands each thread its own [`MemoryPool`], created on first use.
///
/// The registry lock is only held while looking up or sweeping pools, never
/// while an algorithm allocates from one. Pools of exited threads are
/// dropped on the next lookup, sweep or total.
pub struct ThreadAffinePool {
    block_size: usize,
    pools: Mutex<AHashMap<ThreadId, Slot>>,
}

impl Default for ThreadAffinePool {
    fn default() -> Self {
        Self {
            block_size: THREAD_BLOCK_SIZE,
            pools: Mutex::new(AHashMap::new()),
        }
    }
}

impl ThreadAffinePool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block_size(block_size: usize) -> Result<Self, PoolError> {
        if block_size == 0 {
            return Err(PoolError::ZeroBlockSize);
        }
        Ok(Self {
            block_size,
            pools: Mutex::new(AHashMap::new()),
        })
    }

    /// Pool owned by the calling thread.
    ///
    /// A thread already tearing down its thread-locals gets an unregistered
    /// pool that is freed with the returned handle.
    pub fn current(&self) -> Arc<MemoryPool> {
        let Ok(owner) = LIVENESS.try_with(Arc::downgrade) else {
            return Arc::new(self.fresh_pool());
        };
        let id = thread::current().id();
        let mut pools = self.pools.lock();
        prune(&mut pools);
        let slot = pools.entry(id).or_insert_with(|| {
            tracing::trace!(thread = ?id, "creating thread-local pool");
            Slot {
                owner,
                pool: Arc::new(self.fresh_pool()),
            }
        });
        Arc::clone(&slot.pool)
    }

    /// Reset every pool owned by a live thread.
    ///
    /// Pools with outstanding leases are skipped; the first such failure is
    /// returned after the sweep completes.
    pub fn reset_all(&self) -> Result<(), PoolError> {
        let mut first_err = None;
        for pool in self.snapshot() {
            if let Err(e) = pool.reset() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of pools held for live threads.
    pub fn pool_count(&self) -> usize {
        let mut pools = self.pools.lock();
        prune(&mut pools);
        pools.len()
    }

    pub fn total_capacity_bytes(&self) -> usize {
        self.snapshot().iter().map(|p| p.capacity_bytes()).sum()
    }

    pub fn total_allocated_bytes(&self) -> usize {
        self.snapshot().iter().map(|p| p.allocated_bytes()).sum()
    }

    fn fresh_pool(&self) -> MemoryPool {
        MemoryPool::with_block_size(self.block_size).unwrap_or_default()
    }

    fn snapshot(&self) -> Vec<Arc<MemoryPool>> {
        let mut pools = self.pools.lock();
        prune(&mut pools);
        pools.values().map(|slot| Arc::clone(&slot.pool)).collect()
    }
}

fn prune(pools: &mut AHashMap<ThreadId, Slot>) {
    let before = pools.len();
    pools.retain(|_, slot| slot.is_live());
    let dropped = before - pools.len();
    if dropped > 0 {
        tracing::trace!(dropped, "dropped pools of exited threads");
    }
}

impl std::fmt::Debug for ThreadAffinePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadAffinePool")
            .field("block_size", &self.block_size)
            .field("pools", &self.pool_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_thread_same_pool() {
        let pools = ThreadAffinePool::new();
        let a = pools.current();
        let b = pools.current();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.default_block_size(), THREAD_BLOCK_SIZE);
        assert_eq!(pools.pool_count(), 1);
    }

    #[test]
    fn test_threads_get_distinct_pools() {
        let pools = Arc::new(ThreadAffinePool::with_block_size(128).unwrap());
        let main = pools.current();

        let other = {
            let pools = Arc::clone(&pools);
            thread::spawn(move || pools.current()).join().unwrap()
        };

        assert!(!Arc::ptr_eq(&main, &other));
        // The spawned thread has exited, so only the main pool stays registered.
        assert_eq!(pools.pool_count(), 1);
    }

    #[test]
    fn test_reset_all_sweeps_every_pool() {
        let pools = Arc::new(ThreadAffinePool::with_block_size(128).unwrap());
        pools.current().allocate(64, 8).unwrap();

        let (ready_tx, ready_rx) = crossbeam_channel::bounded(0);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let worker = {
            let pools = Arc::clone(&pools);
            thread::spawn(move || {
                pools.current().allocate(32, 8).unwrap();
                ready_tx.send(()).unwrap();
                let _ = done_rx.recv();
            })
        };
        ready_rx.recv().unwrap();
        assert_eq!(pools.total_allocated_bytes(), 96);

        pools.reset_all().unwrap();
        assert_eq!(pools.total_allocated_bytes(), 0);
        assert_eq!(pools.total_capacity_bytes(), 256);

        drop(done_tx);
        worker.join().unwrap();
        assert_eq!(pools.total_capacity_bytes(), 128);
    }

    #[test]
    fn test_exited_threads_release_their_pools() {
        let pools = Arc::new(ThreadAffinePool::with_block_size(1024).unwrap());
        for _ in 0..32 {
            let pools = Arc::clone(&pools);
            thread::spawn(move || {
                pools.current().allocate(512, 8).unwrap();
            })
            .join()
            .unwrap();
        }
        assert_eq!(pools.pool_count(), 0);
        assert_eq!(pools.total_capacity_bytes(), 0);

        pools.current();
        assert_eq!(pools.pool_count(), 1);
    }

    #[test]
    fn test_reset_all_reports_busy_pool() {
        let pools = ThreadAffinePool::with_block_size(128).unwrap();
        let pool = pools.current();
        let _lease = pool.lease(4, 0u8).unwrap();
        assert_eq!(pools.reset_all(), Err(PoolError::Busy(1)));
    }
}
