//! # Component Registry
//!
//! The registry assigns stable [`ComponentTypeId`] values to Rust component
//! types and owns the per-type collections holding every payload.
//!
//! ## Purpose
//! The registry decouples component type identity (`TypeId`, registered
//! name, dense numeric id) from payload storage, so the rest of the runtime
//! can route operations by a small integer and external callers can reach a
//! type by name.
//!
//! ## Design
//! - Types are registered once and assigned a dense id in registration
//!   order, contiguous in `[0, N)`.
//! - Three aligned tables: id → collection, `TypeId` → id, name → id.
//! - Unknown lookups return sentinels ([`INVALID_COMPONENT_TYPE`], an
//!   invalid handle, [`UNDEFINED_COMPONENT_NAME`]), never errors.
//!
//! ## Invariants
//! - Every entry in `by_type` and `by_name` points at an existing
//!   collection whose recorded id matches its position.
//! - Ids handed out are always below [`COMPONENT_TYPE_CAP`].

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::engine::component::{
    Component, ComponentCollection, ComponentHandle, ComponentPool,
};
use crate::engine::error::{EcsResult, RegistryError};
use crate::engine::events::EventHub;
use crate::engine::types::{
    ComponentTypeId, PoolIndex, COMPONENT_TYPE_CAP, INVALID_COMPONENT_TYPE,
};

/// Name reported for unregistered component type ids.
pub const UNDEFINED_COMPONENT_NAME: &str = "[UNDEFINED]";

/// Owner of all component collections and the type identity tables.
#[derive(Default)]
pub struct ComponentRegistry {
    collections: Vec<Box<dyn ComponentCollection>>,
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered component types.
    pub fn type_count(&self) -> usize {
        self.collections.len()
    }

    /// Registers component type `T` under `name` and returns its id.
    ///
    /// ## Behavior
    /// - If `T` is already registered, returns the existing id.
    /// - Otherwise appends a new collection, assigning the next dense id.
    ///
    /// ## Errors
    /// - [`RegistryError::DuplicateName`] if the name is taken by another type.
    /// - [`RegistryError::CapacityExceeded`] once the id space is full.
    pub fn register<T: Component>(&mut self, name: &str) -> Result<ComponentTypeId, RegistryError> {
        let tag = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&tag) {
            return Ok(existing);
        }

        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
            });
        }
        if self.collections.len() >= COMPONENT_TYPE_CAP {
            return Err(RegistryError::CapacityExceeded {
                cap: COMPONENT_TYPE_CAP,
            });
        }

        let type_id = self.collections.len() as ComponentTypeId;
        self.collections
            .push(Box::new(ComponentPool::<T>::new(type_id, name)));
        self.by_type.insert(tag, type_id);
        self.by_name.insert(name.to_string(), type_id);

        log::debug!("registered component type '{}' as id {}", name, type_id);
        Ok(type_id)
    }

    /// Collection for `type_id`, if registered.
    pub fn collection(&self, type_id: ComponentTypeId) -> Option<&dyn ComponentCollection> {
        self.collections
            .get(type_id as usize)
            .map(|collection| collection.as_ref())
    }

    /// Mutable counterpart of [`ComponentRegistry::collection`].
    pub fn collection_mut(
        &mut self,
        type_id: ComponentTypeId,
    ) -> Option<&mut dyn ComponentCollection> {
        self.collections
            .get_mut(type_id as usize)
            .map(|collection| collection.as_mut())
    }

    /// Typed view of the collection owning payloads of `T`.
    pub fn typed<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let type_id = *self.by_type.get(&TypeId::of::<T>())?;
        self.collections[type_id as usize]
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
    }

    /// Mutable counterpart of [`ComponentRegistry::typed`].
    pub fn typed_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        let type_id = *self.by_type.get(&TypeId::of::<T>())?;
        self.collections[type_id as usize]
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }

    /// Dense id of `T`, or the invalid sentinel if unregistered.
    pub fn type_id_of<T: Component>(&self) -> ComponentTypeId {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .unwrap_or(INVALID_COMPONENT_TYPE)
    }

    /// Dense id registered for a runtime type tag, or the invalid sentinel.
    pub fn type_id_by_tag(&self, tag: TypeId) -> ComponentTypeId {
        self.by_type.get(&tag).copied().unwrap_or(INVALID_COMPONENT_TYPE)
    }

    /// Dense id registered under `name`, or the invalid sentinel.
    pub fn type_id_by_name(&self, name: &str) -> ComponentTypeId {
        self.by_name.get(name).copied().unwrap_or(INVALID_COMPONENT_TYPE)
    }

    /// Registered name of `type_id`, or [`UNDEFINED_COMPONENT_NAME`].
    pub fn name_of(&self, type_id: ComponentTypeId) -> &str {
        self.collection(type_id)
            .map(|collection| collection.name())
            .unwrap_or(UNDEFINED_COMPONENT_NAME)
    }

    /// Language-level type tag of `type_id`, if registered.
    pub fn type_tag_of(&self, type_id: ComponentTypeId) -> Option<TypeId> {
        self.collection(type_id).map(|collection| collection.type_tag())
    }

    /// Creates a default-constructed component of `type_id`.
    ///
    /// Unknown ids produce an invalid handle, not an error; only pool
    /// exhaustion surfaces as `Err`. Emits *ComponentCreated* on success.
    pub fn create_by_type_id(
        &mut self,
        type_id: ComponentTypeId,
        events: &mut EventHub,
    ) -> EcsResult<ComponentHandle> {
        let Some(collection) = self.collections.get_mut(type_id as usize) else {
            return Ok(ComponentHandle::invalid());
        };
        let handle = collection.create()?;
        events.component_created.emit(&handle);
        Ok(handle)
    }

    /// Creates a component by registered name; unknown names produce an
    /// invalid handle.
    pub fn create_by_name(
        &mut self,
        name: &str,
        events: &mut EventHub,
    ) -> EcsResult<ComponentHandle> {
        match self.by_name.get(name) {
            Some(&type_id) => self.create_by_type_id(type_id, events),
            None => Ok(ComponentHandle::invalid()),
        }
    }

    /// Resolves a handle to a payload reference.
    pub fn get<T: Component>(&self, handle: ComponentHandle) -> Option<&T> {
        self.collections
            .get(handle.type_id() as usize)?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()?
            .get(handle)
    }

    /// Resolves a handle to a mutable payload reference.
    pub fn get_mut<T: Component>(&mut self, handle: ComponentHandle) -> Option<&mut T> {
        self.collections
            .get_mut(handle.type_id() as usize)?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()?
            .get_mut(handle)
    }

    /// Returns `true` iff `handle` addresses a live payload.
    pub fn is_live(&self, handle: ComponentHandle) -> bool {
        self.collection(handle.type_id())
            .map(|collection| collection.is_live(handle))
            .unwrap_or(false)
    }

    /// Destroys the payload `handle` addresses, bumping the slot
    /// generation. Stale or unknown handles are a no-op returning `false`.
    /// Emits *ComponentDestroyed* on success.
    pub fn destroy(&mut self, handle: ComponentHandle, events: &mut EventHub) -> bool {
        let Some(collection) = self.collections.get_mut(handle.type_id() as usize) else {
            return false;
        };
        if !collection.is_live(handle) {
            return false;
        }
        let destroyed = collection.destroy(handle.index());
        if destroyed {
            events.component_destroyed.emit(&handle);
        }
        destroyed
    }

    /// Copy-constructs a new payload from the one `handle` addresses.
    /// Stale handles produce an invalid handle. Emits *ComponentCreated*
    /// for the copy.
    pub fn clone_component(
        &mut self,
        handle: ComponentHandle,
        events: &mut EventHub,
    ) -> EcsResult<ComponentHandle> {
        let Some(collection) = self.collections.get_mut(handle.type_id() as usize) else {
            return Ok(ComponentHandle::invalid());
        };
        if !collection.is_live(handle) {
            return Ok(ComponentHandle::invalid());
        }
        let copy = collection.clone_slot(handle.index())?;
        if copy.is_valid() {
            events.component_created.emit(&copy);
        }
        Ok(copy)
    }

    /// Copies the payload `handle` addresses into `out` (which must
    /// downcast to the payload type). Serializer extraction path.
    pub fn move_component_data(&self, handle: ComponentHandle, out: &mut dyn Any) -> bool {
        let Some(collection) = self.collection(handle.type_id()) else {
            return false;
        };
        if !collection.is_live(handle) {
            return false;
        }
        collection.move_data(handle.index(), out)
    }

    /// Liveness-only raw payload access.
    pub fn component_dyn(&self, type_id: ComponentTypeId, index: PoolIndex) -> Option<&dyn Any> {
        self.collection(type_id)?.get_dyn(index)
    }

    /// Destroys every payload in every collection and drops all
    /// registrations.
    pub fn reset(&mut self) {
        for collection in self.collections.iter_mut() {
            collection.clear();
        }
        self.collections.clear();
        self.by_type.clear();
        self.by_name.clear();
    }
}
