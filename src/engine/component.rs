//! Component handles and per-type collections.
//!
//! A component payload is a plain user-defined record; the runtime stores,
//! copies, and destroys payloads without interpreting their fields. Each
//! registered type owns one [`ComponentPool`], a typed wrapper over
//! [`Pool`] that mints [`ComponentHandle`]s. Collections are reached
//! type-erased through [`ComponentCollection`], with `as_any` downcasts
//! for the typed access paths.
//!
//! Collections know nothing about entities; attachment is handled one
//! layer up, in the entity collection.

use std::any::{type_name, Any, TypeId};

use crate::engine::error::PoolExhaustedError;
use crate::engine::pool::Pool;
use crate::engine::types::{
    ComponentTypeId, Generation, PoolIndex, INVALID_COMPONENT_TYPE, INVALID_POOL_INDEX,
};

/// Bound every component payload must satisfy.
///
/// `Default` backs creation, `Clone` backs cloning and data extraction.
pub trait Component: Default + Clone + 'static {}

impl<T: Default + Clone + 'static> Component for T {}

/// Opaque address of one payload slot in one component collection.
///
/// A handle is a `{type id, slot index, generation}` triple. It resolves
/// iff the slot is still alive and the generation matches; a handle held
/// across a destroy goes stale and reads as "not found".
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComponentHandle {
    type_id: ComponentTypeId,
    index: PoolIndex,
    generation: Generation,
}

impl ComponentHandle {
    pub(crate) fn new(type_id: ComponentTypeId, index: PoolIndex, generation: Generation) -> Self {
        Self {
            type_id,
            index,
            generation,
        }
    }

    /// The reserved "points at nothing" handle.
    pub const fn invalid() -> Self {
        Self {
            type_id: INVALID_COMPONENT_TYPE,
            index: INVALID_POOL_INDEX,
            generation: 0,
        }
    }

    /// Returns `true` if the handle carries non-sentinel fields. Liveness
    /// of the addressed slot is answered by the owning collection.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.type_id != INVALID_COMPONENT_TYPE && self.index != INVALID_POOL_INDEX
    }

    /// Component type this handle addresses.
    #[inline]
    pub fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// Slot index within the owning collection's pool.
    #[inline]
    pub fn index(&self) -> PoolIndex {
        self.index
    }

    /// Generation the slot had when this handle was minted.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }
}

impl Default for ComponentHandle {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Type-erased interface of a per-type component collection.
///
/// One implementation exists ([`ComponentPool`]); the registry owns
/// collections behind this trait and dispatches by type id. Typed access
/// goes through `as_any` downcasts.
pub trait ComponentCollection: Any {
    /// Dense type id this collection was registered under.
    fn component_type(&self) -> ComponentTypeId;

    /// Name the type was registered under.
    fn name(&self) -> &str;

    /// Language-level type tag of the payload type.
    fn type_tag(&self) -> TypeId;

    /// Payload type name, for diagnostics.
    fn payload_type_name(&self) -> &'static str;

    /// Number of live payloads.
    fn len(&self) -> usize;

    /// Returns `true` if no payload is live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocates a slot, default-constructs the payload, returns a handle.
    fn create(&mut self) -> Result<ComponentHandle, PoolExhaustedError>;

    /// Destroys the payload at `index`, bumping the slot generation.
    /// Returns `false` if the slot was not alive.
    fn destroy(&mut self, index: PoolIndex) -> bool;

    /// Copy-constructs a new payload from the one at `index`. Returns an
    /// invalid handle if the source slot is not alive.
    fn clone_slot(&mut self, index: PoolIndex) -> Result<ComponentHandle, PoolExhaustedError>;

    /// Copies the payload at `index` into the caller-provided value, which
    /// must downcast to the payload type. Used by external serializers.
    /// Returns `false` on a dead slot or a type mismatch.
    fn move_data(&self, index: PoolIndex, out: &mut dyn Any) -> bool;

    /// Liveness-only payload access by raw index.
    fn get_dyn(&self, index: PoolIndex) -> Option<&dyn Any>;

    /// Mutable counterpart of [`ComponentCollection::get_dyn`].
    fn get_dyn_mut(&mut self, index: PoolIndex) -> Option<&mut dyn Any>;

    /// Returns `true` iff `handle` addresses a live slot of this collection
    /// with a matching generation.
    fn is_live(&self, handle: ComponentHandle) -> bool;

    /// Destroys every live payload and resets the underlying pool.
    fn clear(&mut self);

    /// Downcast hook.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast hook.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Typed component collection: a [`Pool`] of payloads plus registration
/// metadata.
pub struct ComponentPool<T: Component> {
    pool: Pool<T>,
    type_id: ComponentTypeId,
    name: String,
}

impl<T: Component> ComponentPool<T> {
    pub(crate) fn new(type_id: ComponentTypeId, name: impl Into<String>) -> Self {
        Self {
            pool: Pool::new(),
            type_id,
            name: name.into(),
        }
    }

    /// Resolves a handle to a payload reference.
    pub fn get(&self, handle: ComponentHandle) -> Option<&T> {
        if handle.type_id() != self.type_id {
            return None;
        }
        self.pool.get(handle.index(), handle.generation())
    }

    /// Resolves a handle to a mutable payload reference.
    pub fn get_mut(&mut self, handle: ComponentHandle) -> Option<&mut T> {
        if handle.type_id() != self.type_id {
            return None;
        }
        self.pool.get_mut(handle.index(), handle.generation())
    }

    fn handle_for(&self, index: PoolIndex) -> ComponentHandle {
        let generation = self.pool.generation(index).unwrap_or(0);
        ComponentHandle::new(self.type_id, index, generation)
    }
}

impl<T: Component> ComponentCollection for ComponentPool<T> {
    fn component_type(&self) -> ComponentTypeId {
        self.type_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn type_tag(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn payload_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn len(&self) -> usize {
        self.pool.len()
    }

    fn create(&mut self) -> Result<ComponentHandle, PoolExhaustedError> {
        let index = self.pool.insert_with(T::default)?;
        Ok(self.handle_for(index))
    }

    fn destroy(&mut self, index: PoolIndex) -> bool {
        self.pool.free(index).is_some()
    }

    fn clone_slot(&mut self, index: PoolIndex) -> Result<ComponentHandle, PoolExhaustedError> {
        let source = match self.pool.slot(index) {
            Some(value) => value.clone(),
            None => return Ok(ComponentHandle::invalid()),
        };
        let new_index = self.pool.insert(source)?;
        Ok(self.handle_for(new_index))
    }

    fn move_data(&self, index: PoolIndex, out: &mut dyn Any) -> bool {
        let Some(out) = out.downcast_mut::<T>() else {
            return false;
        };
        match self.pool.slot(index) {
            Some(value) => {
                *out = value.clone();
                true
            }
            None => false,
        }
    }

    fn get_dyn(&self, index: PoolIndex) -> Option<&dyn Any> {
        self.pool.slot(index).map(|value| value as &dyn Any)
    }

    fn get_dyn_mut(&mut self, index: PoolIndex) -> Option<&mut dyn Any> {
        self.pool.slot_mut(index).map(|value| value as &mut dyn Any)
    }

    fn is_live(&self, handle: ComponentHandle) -> bool {
        self.get(handle).is_some()
    }

    fn clear(&mut self) {
        self.pool.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
