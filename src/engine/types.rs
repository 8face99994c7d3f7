//! Core ECS Types, Identifiers, and Layout Constants
//!
//! This module defines the **fundamental types, identifiers, and sentinel
//! values** used throughout the ECS runtime. These definitions form the
//! *semantic backbone* of the system and are shared across all subsystems,
//! including pools, component collections, the registry, entity management,
//! tuple caches, and scheduling.
//!
//! ## Design Philosophy
//!
//! The runtime is designed around:
//!
//! - **Chunked, slot-stable storage**
//! - **Generation-tagged handles**
//! - **Stable numeric identifiers**
//! - **Reserved sentinels instead of optional wrappers in hot data**
//!
//! To support these goals efficiently, this module:
//!
//! - Uses small, copyable numeric IDs for all ECS concepts,
//! - Reserves the maximum value of each ID type as its "invalid" sentinel,
//! - Centralizes the pool chunk geometry in compile-time constants,
//! - Validates the layout using static assertions.
//!
//! ## Identifier Model
//!
//! - [`EntityId`] values are issued monotonically and never recycled within
//!   a run; external code may store them freely.
//! - [`ComponentTypeId`] values are dense, assigned in registration order
//!   starting at zero, and contiguous in `[0, N)` for `N` registered types.
//! - [`PoolIndex`] values address slots inside a pool; the sentinel
//!   [`INVALID_POOL_INDEX`] doubles as the list terminator for the
//!   intrusive node pools.
//! - [`Generation`] counters detect stale handles: a slot's generation is
//!   bumped every time the slot is freed, so a handle minted for a previous
//!   occupant no longer resolves.

/// Stable 32-bit identifier for an entity. Never reused within a run.
pub type EntityId = u32;

/// Dense identifier for a registered component type, assigned in
/// registration order beginning at 0.
pub type ComponentTypeId = u16;

/// Index of a slot within a pool.
pub type PoolIndex = u32;

/// Per-slot counter used to detect stale handles.
pub type Generation = u32;

/// Ordering key for systems; lower values update first.
pub type SystemPriority = i32;

/// Reserved sentinel denoting "no entity".
pub const INVALID_ENTITY_ID: EntityId = EntityId::MAX;

/// Reserved sentinel denoting an unregistered component type.
pub const INVALID_COMPONENT_TYPE: ComponentTypeId = ComponentTypeId::MAX;

/// Reserved sentinel denoting "no slot"; also terminates intrusive lists.
pub const INVALID_POOL_INDEX: PoolIndex = PoolIndex::MAX;

/// Number of slots per pool chunk. Chunk addresses never move, so a slot
/// index stays dereferenceable across pool growth.
pub const POOL_CHUNK_CAP: usize = 1024;

/// Maximum number of registrable component types.
pub const COMPONENT_TYPE_CAP: usize = 4096;

const _: [(); 1] = [(); POOL_CHUNK_CAP.is_power_of_two() as usize];
const _: [(); 1] = [(); (POOL_CHUNK_CAP < INVALID_POOL_INDEX as usize) as usize];
const _: [(); 1] = [(); (COMPONENT_TYPE_CAP < INVALID_COMPONENT_TYPE as usize) as usize];

/// Combines a sorted list of component type ids into a single hash value.
///
/// ## Purpose
/// Keys the tuple-cache table: a query over a set of component types is
/// identified by the hash of its sorted id list.
///
/// ## Invariants
/// Callers must pass the ids sorted and deduplicated; two queries over the
/// same set always produce the same key.
pub fn component_set_hash(type_ids: &[ComponentTypeId]) -> u64 {
    // FNV-1a over the id bytes.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &type_id in type_ids {
        for byte in type_id.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    }
    hash
}
