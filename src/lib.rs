//! # ECS Runtime
//!
//! Pool-backed Entity-Component-System runtime core for interactive
//! simulators that create and destroy tens of thousands of small records
//! per frame.
//!
//! ## Design Goals
//! - Chunked, index-stable pool storage: handles survive growth
//! - Generation-tagged handles for stale-reference detection
//! - Entity hierarchies with edge-triggered activation propagation
//! - Priority-ordered systems with deferred mutation during a tick
//! - Incrementally maintained component-set query caches
//!
//! The core is single-threaded and cooperative: every public call runs to
//! completion synchronously, and delegate callbacks fire inline on the
//! calling thread.

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core ECS types

pub use engine::manager::{
    init_ecs_manager,
    shutdown_ecs_manager,
    with_ecs_manager,
    Manager,
};

pub use engine::entity::{
    ChildrenIter,
    ComponentsIter,
    Entity,
    EntityCollection,
};

pub use engine::component::{
    Component,
    ComponentCollection,
    ComponentHandle,
    ComponentPool,
};

pub use engine::registry::{ComponentRegistry, UNDEFINED_COMPONENT_NAME};

pub use engine::pool::Pool;

pub use engine::events::{ComponentAttachment, Delegate, EventHub, SubscriptionId};

pub use engine::tuple::{TupleCache, TupleCacheTable, TupleRow, TupleView};

pub use engine::systems::{FnSystem, System};
pub use engine::scheduler::{Scheduler, SystemToken};

pub use engine::error::{
    EcsError,
    EcsResult,
    PoolExhaustedError,
    RegistryError,
};

pub use engine::types::{
    ComponentTypeId,
    EntityId,
    Generation,
    PoolIndex,
    SystemPriority,
    INVALID_COMPONENT_TYPE,
    INVALID_ENTITY_ID,
    INVALID_POOL_INDEX,
    POOL_CHUNK_CAP,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used ECS types.
///
/// Import with:
/// ```rust
/// use ecs_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Component,
        ComponentHandle,
        ComponentTypeId,
        Entity,
        EntityId,
        FnSystem,
        Manager,
        System,
        INVALID_COMPONENT_TYPE,
        INVALID_ENTITY_ID,
    };
}
