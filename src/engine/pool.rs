//! Chunked, index-stable pool storage.
//!
//! [`Pool`] is the arithmetic foundation every handle in the runtime rests
//! on. Payloads live in fixed-size chunks; a chunk is never moved or
//! reallocated once created, so a slot index dereferences as
//! `chunks[index / POOL_CHUNK_CAP][index % POOL_CHUNK_CAP]` for the whole
//! lifetime of the pool. External code stores indices and never observes
//! invalidation on growth.
//!
//! Each slot carries a generation counter and an alive flag in a parallel
//! metadata array. Freeing a slot bumps its generation, so a handle minted
//! for the previous occupant resolves to `None` afterwards. Freed slots are
//! recycled through a free list before the pool grows.
//!
//! Invariants:
//! - `meta.len()` is the high-water slot count; every index below it is
//!   either alive or on the free list.
//! - A slot's payload is initialized if and only if its metadata says alive.
//! - Generations are monotonically nondecreasing and bumped on every free.
//! - The reserved sentinel index is never handed out.

use std::mem::MaybeUninit;

use crate::engine::error::PoolExhaustedError;
use crate::engine::types::{Generation, PoolIndex, INVALID_POOL_INDEX, POOL_CHUNK_CAP};

#[derive(Clone, Copy, Default)]
struct SlotMeta {
    generation: Generation,
    alive: bool,
}

/// Chunked slot storage with a free list and per-slot generations.
pub struct Pool<T> {
    chunks: Vec<Box<[MaybeUninit<T>; POOL_CHUNK_CAP]>>,
    meta: Vec<SlotMeta>,
    free: Vec<PoolIndex>,
    live: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            meta: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Pool<T> {
    /// Creates an empty pool. No chunks are allocated until first use.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn position(index: PoolIndex) -> (usize, usize) {
        let index = index as usize;
        (index / POOL_CHUNK_CAP, index % POOL_CHUNK_CAP)
    }

    /// Number of live slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if no slot is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// High-water slot count (live + free), i.e. the exclusive upper bound
    /// of indices ever handed out.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.meta.len()
    }

    /// Stores `value` in a slot and returns its index.
    ///
    /// ## Behavior
    /// - Reuses the free-list head if one exists; the slot keeps the
    ///   generation it was given when freed.
    /// - Otherwise appends at the next unused slot, growing by one chunk at
    ///   a chunk boundary. Existing chunk addresses are unaffected.
    ///
    /// ## Errors
    /// Returns [`PoolExhaustedError`] once the index space is exhausted.
    pub fn insert(&mut self, value: T) -> Result<PoolIndex, PoolExhaustedError> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                let next = self.meta.len();
                if next >= INVALID_POOL_INDEX as usize {
                    return Err(PoolExhaustedError {
                        slots_needed: next as u64 + 1,
                        capacity: INVALID_POOL_INDEX as u64,
                    });
                }
                if next == self.chunks.len() * POOL_CHUNK_CAP {
                    self.chunks
                        .push(Box::new(std::array::from_fn(|_| MaybeUninit::uninit())));
                }
                self.meta.push(SlotMeta::default());
                next as PoolIndex
            }
        };

        let (chunk, row) = Self::position(index);
        self.chunks[chunk][row].write(value);
        self.meta[index as usize].alive = true;
        self.live += 1;
        Ok(index)
    }

    /// Stores the value produced by `make` and returns its slot index.
    pub fn insert_with(
        &mut self,
        make: impl FnOnce() -> T,
    ) -> Result<PoolIndex, PoolExhaustedError> {
        self.insert(make())
    }

    /// Frees a live slot, returning its payload.
    ///
    /// ## Behavior
    /// Marks the slot dead, increments its generation, and pushes it onto
    /// the free list for reuse.
    ///
    /// ## Preconditions
    /// The slot must be alive; freeing a dead or out-of-range slot trips a
    /// debug assertion and returns `None` in release builds.
    pub fn free(&mut self, index: PoolIndex) -> Option<T> {
        let meta = match self.meta.get_mut(index as usize) {
            Some(meta) => meta,
            None => {
                debug_assert!(false, "free of out-of-range pool slot {index}");
                return None;
            }
        };
        if !meta.alive {
            debug_assert!(false, "free of already-free pool slot {index}");
            return None;
        }

        meta.alive = false;
        meta.generation = meta.generation.wrapping_add(1);
        self.live -= 1;

        let (chunk, row) = Self::position(index);
        let value = unsafe { self.chunks[chunk][row].assume_init_read() };
        self.free.push(index);
        Some(value)
    }

    /// Returns the payload at `index` iff the slot is alive and its
    /// generation matches.
    pub fn get(&self, index: PoolIndex, generation: Generation) -> Option<&T> {
        let meta = self.meta.get(index as usize)?;
        if !meta.alive || meta.generation != generation {
            return None;
        }
        let (chunk, row) = Self::position(index);
        Some(unsafe { self.chunks[chunk][row].assume_init_ref() })
    }

    /// Mutable counterpart of [`Pool::get`].
    pub fn get_mut(&mut self, index: PoolIndex, generation: Generation) -> Option<&mut T> {
        let meta = self.meta.get(index as usize)?;
        if !meta.alive || meta.generation != generation {
            return None;
        }
        let (chunk, row) = Self::position(index);
        Some(unsafe { self.chunks[chunk][row].assume_init_mut() })
    }

    /// Liveness-only lookup, bypassing the generation check. The caller
    /// bears responsibility for slot identity.
    pub fn slot(&self, index: PoolIndex) -> Option<&T> {
        let meta = self.meta.get(index as usize)?;
        if !meta.alive {
            return None;
        }
        let (chunk, row) = Self::position(index);
        Some(unsafe { self.chunks[chunk][row].assume_init_ref() })
    }

    /// Mutable counterpart of [`Pool::slot`].
    pub fn slot_mut(&mut self, index: PoolIndex) -> Option<&mut T> {
        let meta = self.meta.get(index as usize)?;
        if !meta.alive {
            return None;
        }
        let (chunk, row) = Self::position(index);
        Some(unsafe { self.chunks[chunk][row].assume_init_mut() })
    }

    /// Current generation of a slot, if the index was ever handed out.
    pub fn generation(&self, index: PoolIndex) -> Option<Generation> {
        self.meta.get(index as usize).map(|meta| meta.generation)
    }

    /// Returns `true` if the slot at `index` is alive.
    pub fn is_alive(&self, index: PoolIndex) -> bool {
        self.meta
            .get(index as usize)
            .map(|meta| meta.alive)
            .unwrap_or(false)
    }

    /// Iterates live slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolIndex, &T)> {
        self.meta
            .iter()
            .enumerate()
            .filter(|(_, meta)| meta.alive)
            .map(move |(index, _)| {
                let (chunk, row) = Self::position(index as PoolIndex);
                let value = unsafe { self.chunks[chunk][row].assume_init_ref() };
                (index as PoolIndex, value)
            })
    }

    fn drop_live_payloads(&mut self) {
        for (index, meta) in self.meta.iter_mut().enumerate() {
            if meta.alive {
                meta.alive = false;
                let (chunk, row) = Self::position(index as PoolIndex);
                unsafe { self.chunks[chunk][row].assume_init_drop() };
            }
        }
    }

    /// Destroys all live payloads, releases the chunks, and resets the pool
    /// to its initial state. Generations restart at zero.
    pub fn clear(&mut self) {
        self.drop_live_payloads();
        self.chunks.clear();
        self.meta.clear();
        self.free.clear();
        self.live = 0;
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        self.drop_live_payloads();
    }
}
