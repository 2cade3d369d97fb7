//! Scratch buffers that come from a pool when one is available

use std::ops::{Deref, DerefMut};

use super::{MemoryPool, PoolBuf, PoolError};

/// A working buffer for one algorithm call.
///
/// Leased from the pool when the algorithm was given one, otherwise a plain
/// heap `Vec`.
pub enum Scratch<'p, T: Copy> {
    Pooled(PoolBuf<'p, T>),
    Heap(Vec<T>),
}

impl<'p, T: Copy> Scratch<'p, T> {
    pub fn filled(pool: Option<&'p MemoryPool>, len: usize, fill: T) -> Result<Self, PoolError> {
        match pool {
            Some(pool) => Ok(Scratch::Pooled(pool.lease(len, fill)?)),
            None => Ok(Scratch::Heap(vec![fill; len])),
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self, Scratch::Pooled(_))
    }
}

impl<T: Copy> Deref for Scratch<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match self {
            Scratch::Pooled(buf) => &buf[..],
            Scratch::Heap(vec) => &vec[..],
        }
    }
}

impl<T: Copy> DerefMut for Scratch<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        match self {
            Scratch::Pooled(buf) => &mut buf[..],
            Scratch::Heap(vec) => &mut vec[..],
        }
    }
}
