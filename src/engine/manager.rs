//! The top-level ECS manager.
//!
//! [`Manager`] exclusively owns the component registry, the entity
//! collection, the scheduler, the event hub, and the tuple-cache table,
//! and exposes the typed consumer API over all of them.
//!
//! ## Tick orchestration
//!
//! Systems receive `&mut Manager` during `update`, while the scheduler
//! itself is owned by the manager. For the duration of a tick the
//! scheduler is detached and a stub left in its place; registrations and
//! removals issued by systems land on the stub. The re-entrancy flag is
//! scoped to the update pass alone: a registration from a system's `init`
//! is folded in before the pass and runs within the same tick, while one
//! from `update` waits for the tick boundary. Entity and component
//! mutations apply immediately — the per-entity structures are linked
//! lists with safe unlink, so in-progress iteration is never invalidated
//! by the pool.
//!
//! ## Process-wide instance
//!
//! The original design exposes one globally retrievable manager between
//! explicit init and shutdown calls. The core is single-threaded, so the
//! Rust rendition is a thread-local slot: [`init_ecs_manager`],
//! [`shutdown_ecs_manager`], and [`with_ecs_manager`]. Threading
//! `&mut Manager` through as a context argument remains the primary style;
//! the slot is a convenience for leaf code that cannot accept the context.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::mem;

use crate::engine::component::{Component, ComponentHandle};
use crate::engine::entity::{ChildrenIter, ComponentsIter, Entity, EntityCollection};
use crate::engine::error::EcsResult;
use crate::engine::events::EventHub;
use crate::engine::registry::ComponentRegistry;
use crate::engine::scheduler::{Scheduler, SystemToken};
use crate::engine::systems::System;
use crate::engine::tuple::{TupleCacheTable, TupleView};
use crate::engine::types::{ComponentTypeId, EntityId, PoolIndex};

/// Owner of all ECS state and the consumer-facing API surface.
#[derive(Default)]
pub struct Manager {
    registry: ComponentRegistry,
    entities: EntityCollection,
    scheduler: Scheduler,
    events: EventHub,
    tuples: TupleCacheTable,
    /// Re-entrancy flag: set only while the scheduler runs the update
    /// pass, so that system registrations issued from `update` get
    /// buffered. Registrations from `init` take effect immediately.
    ticking: bool,
    /// Set while the scheduler is detached for a tick or teardown; system
    /// removals must be deferred because the ordered list is not
    /// reachable in place.
    scheduler_detached: bool,
    next_system_token: SystemToken,
}

impl Manager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares the manager for use.
    pub fn init(&mut self) {
        log::debug!("ECS manager initialized");
    }

    /// Tears everything down: systems in reverse priority order, then all
    /// entities, payloads, registrations, caches, and subscriptions.
    pub fn teardown(&mut self) {
        let mut scheduler = mem::take(&mut self.scheduler);
        self.scheduler_detached = true;
        scheduler.teardown_all(self);
        self.scheduler_detached = false;
        // Anything registered or removed from inside a teardown callback
        // dies with the stub.
        self.scheduler = Scheduler::new();

        self.entities.reset();
        self.registry.reset();
        self.tuples.clear();
        self.events.clear();
        log::debug!("ECS manager destroyed");
    }

    /// Subscription surface for the structural event delegates.
    pub fn events(&mut self) -> &mut EventHub {
        &mut self.events
    }

    // ── Component types ────────────────────────────────────────────────

    /// Registers component type `T` under `name`, assigning the next dense
    /// type id.
    pub fn register_component_type<T: Component>(
        &mut self,
        name: &str,
    ) -> EcsResult<ComponentTypeId> {
        Ok(self.registry.register::<T>(name)?)
    }

    /// Number of registered component types.
    pub fn component_type_count(&self) -> usize {
        self.registry.type_count()
    }

    /// Dense id of `T`, or the invalid sentinel.
    pub fn component_type_id_of<T: Component>(&self) -> ComponentTypeId {
        self.registry.type_id_of::<T>()
    }

    /// Dense id registered under `name`, or the invalid sentinel.
    pub fn component_type_id_by_name(&self, name: &str) -> ComponentTypeId {
        self.registry.type_id_by_name(name)
    }

    /// Dense id registered for a runtime type tag, or the invalid sentinel.
    pub fn component_type_id_by_tag(&self, tag: TypeId) -> ComponentTypeId {
        self.registry.type_id_by_tag(tag)
    }

    /// Registered name of `type_id`, or the `"[UNDEFINED]"` sentinel.
    pub fn component_name(&self, type_id: ComponentTypeId) -> &str {
        self.registry.name_of(type_id)
    }

    /// Language-level type tag of `type_id`, if registered.
    pub fn component_type_tag(&self, type_id: ComponentTypeId) -> Option<TypeId> {
        self.registry.type_tag_of(type_id)
    }

    // ── Components ─────────────────────────────────────────────────────

    /// Creates a default-constructed component of type `T`. Returns an
    /// invalid handle if `T` was never registered.
    pub fn create_component<T: Component>(&mut self) -> EcsResult<ComponentHandle> {
        let type_id = self.registry.type_id_of::<T>();
        self.registry.create_by_type_id(type_id, &mut self.events)
    }

    /// Creates a component by dense type id; unknown ids produce an
    /// invalid handle.
    pub fn create_component_by_type_id(
        &mut self,
        type_id: ComponentTypeId,
    ) -> EcsResult<ComponentHandle> {
        self.registry.create_by_type_id(type_id, &mut self.events)
    }

    /// Creates a component by registered name; unknown names produce an
    /// invalid handle.
    pub fn create_component_by_name(&mut self, name: &str) -> EcsResult<ComponentHandle> {
        self.registry.create_by_name(name, &mut self.events)
    }

    /// Resolves a handle to a payload reference.
    pub fn get_component<T: Component>(&self, handle: ComponentHandle) -> Option<&T> {
        self.registry.get::<T>(handle)
    }

    /// Resolves a handle to a mutable payload reference.
    pub fn get_component_mut<T: Component>(&mut self, handle: ComponentHandle) -> Option<&mut T> {
        self.registry.get_mut::<T>(handle)
    }

    /// Destroys the payload `handle` addresses. Stale handles are a no-op.
    pub fn destroy_component(&mut self, handle: ComponentHandle) -> bool {
        self.registry.destroy(handle, &mut self.events)
    }

    /// Copy-constructs a new payload from `handle`.
    pub fn clone_component(&mut self, handle: ComponentHandle) -> EcsResult<ComponentHandle> {
        self.registry.clone_component(handle, &mut self.events)
    }

    /// Copies the payload into `out` for external serialization.
    pub fn move_component_data(&self, handle: ComponentHandle, out: &mut dyn Any) -> bool {
        self.registry.move_component_data(handle, out)
    }

    /// Liveness-only raw payload access by type id and slot index.
    pub fn component_raw(&self, type_id: ComponentTypeId, index: PoolIndex) -> Option<&dyn Any> {
        self.registry.component_dyn(type_id, index)
    }

    /// Returns `true` iff `handle` addresses a live payload.
    pub fn is_component_live(&self, handle: ComponentHandle) -> bool {
        self.registry.is_live(handle)
    }

    // ── Entities ───────────────────────────────────────────────────────

    /// Creates a new entity and returns the first external handle.
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        self.entities.create_entity(&mut self.events)
    }

    /// Handle for `id`; invalid if unknown or destroyed.
    pub fn entity_by_id(&self, id: EntityId) -> Entity {
        self.entities.entity_by_id(id)
    }

    /// Returns `true` iff the handle references a live entity.
    pub fn is_entity_alive(&self, entity: &Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Destroys an entity, its attached payloads, and its children.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        self.entities
            .destroy_entity(id, &mut self.registry, &mut self.events, &mut self.tuples)
    }

    /// Deep-clones an entity with all components and children.
    pub fn clone_entity(&mut self, entity: &Entity) -> EcsResult<Entity> {
        self.entities
            .clone_entity(entity, &mut self.registry, &mut self.events, &mut self.tuples)
    }

    /// Attaches a component to an entity. Duplicate types are rejected.
    pub fn add_component(&mut self, entity: &Entity, handle: ComponentHandle) -> EcsResult<()> {
        self.entities
            .add_component(entity, handle, &mut self.events, &mut self.tuples)
    }

    /// Detaches a component without destroying its payload.
    pub fn remove_component(&mut self, entity: &Entity, handle: ComponentHandle) {
        self.entities
            .remove_component(entity, handle, &mut self.events, &mut self.tuples)
    }

    /// Returns `true` if the entity has a component of `type_id`.
    pub fn has_component(&self, entity: &Entity, type_id: ComponentTypeId) -> bool {
        self.entities.has_component(entity.id(), type_id)
    }

    /// Handle of the entity's component of `type_id`, or invalid.
    pub fn component_handle(&self, entity: &Entity, type_id: ComponentTypeId) -> ComponentHandle {
        self.entities.component_handle(entity.id(), type_id)
    }

    /// Typed access to the entity's component of type `T`.
    pub fn entity_component<T: Component>(&self, entity: &Entity) -> Option<&T> {
        let type_id = self.registry.type_id_of::<T>();
        let handle = self.entities.component_handle(entity.id(), type_id);
        self.registry.get::<T>(handle)
    }

    /// Mutable counterpart of [`Manager::entity_component`].
    pub fn entity_component_mut<T: Component>(&mut self, entity: &Entity) -> Option<&mut T> {
        let type_id = self.registry.type_id_of::<T>();
        let handle = self.entities.component_handle(entity.id(), type_id);
        self.registry.get_mut::<T>(handle)
    }

    /// Iterates the component handles attached to an entity.
    pub fn components(&self, entity: &Entity) -> ComponentsIter<'_> {
        self.entities.components(entity)
    }

    // ── Hierarchy ──────────────────────────────────────────────────────

    /// Links `child` under `entity`.
    pub fn add_child(&mut self, entity: &Entity, child: &Entity) -> EcsResult<()> {
        self.entities.add_child(entity, child, &mut self.events)
    }

    /// Unlinks `child` from `entity`; the child becomes a root.
    pub fn remove_child(&mut self, entity: &Entity, child: &Entity) {
        self.entities.remove_child(entity, child, &mut self.events)
    }

    /// Detaches or destroys every child of `entity`.
    pub fn clear_children(&mut self, entity: &Entity, destroy_children: bool) {
        self.entities.clear_children(
            entity,
            destroy_children,
            &mut self.registry,
            &mut self.events,
            &mut self.tuples,
        )
    }

    /// Iterates the children of an entity, most recently added first.
    pub fn children(&self, entity: &Entity) -> ChildrenIter<'_> {
        self.entities.children(entity)
    }

    /// Child at `position` in list order, or the invalid sentinel.
    pub fn child_by_index(&self, entity: &Entity, position: usize) -> EntityId {
        self.entities.child_by_index(entity, position)
    }

    /// Number of children of `entity`.
    pub fn children_count(&self, entity: &Entity) -> usize {
        self.entities.children_count(entity.id())
    }

    /// Parent of `entity`, or the invalid sentinel.
    pub fn parent_of(&self, entity: &Entity) -> EntityId {
        self.entities.parent_of(entity.id())
    }

    /// Position counter assigned when the entity was added to its parent.
    pub fn order_in_parent(&self, entity: &Entity) -> u32 {
        self.entities.order_in_parent(entity.id())
    }

    /// Hierarchy depth of `entity`; roots are at depth 0.
    pub fn entity_depth(&self, entity: &Entity) -> u32 {
        self.entities.depth_of(entity.id())
    }

    /// Stable pre-order comparison of two entities in the forest.
    pub fn compare_entities_in_hierarchy(&self, a: &Entity, b: &Entity) -> Ordering {
        self.entities.compare_in_hierarchy(a.id(), b.id())
    }

    /// Number of entities in the branch rooted at `root` (inclusive).
    pub fn entities_in_branch(&self, root: EntityId) -> usize {
        self.entities.entities_in_branch(root)
    }

    /// Number of effectively active entities in the branch rooted at
    /// `root` (inclusive).
    pub fn active_entities_in_branch(&self, root: EntityId) -> usize {
        self.entities.active_entities_in_branch(root)
    }

    // ── Activation ─────────────────────────────────────────────────────

    /// Sets the user-intent active flag and propagates the derived state.
    pub fn activate_entity(&mut self, entity: &Entity, active: bool) {
        self.entities
            .activate_entity(entity, active, &mut self.events)
    }

    /// User-intent active flag of an entity, ignoring ancestors.
    pub fn is_entity_active(&self, entity: &Entity) -> bool {
        self.entities.is_active(entity.id())
    }

    /// Derived activation of an entity.
    pub fn is_entity_activated(&self, entity: &Entity) -> bool {
        self.entities.is_activated(entity)
    }

    /// Number of effectively active entities.
    pub fn active_entity_count(&self) -> usize {
        self.entities.active_count()
    }

    // ── Tuple queries ──────────────────────────────────────────────────

    /// Registers a component-set query ahead of use and seeds it from the
    /// entities that already cover the set. Returns `false` if the set is
    /// empty or already registered.
    pub fn register_tuple_query(&mut self, type_ids: &[ComponentTypeId]) -> bool {
        if !self.tuples.register(type_ids) {
            return false;
        }
        let ids: Vec<EntityId> = self.entities.ids().collect();
        for id in ids {
            let attached = self.entities.attached_handles(id);
            self.tuples.seed(id, &attached);
        }
        true
    }

    /// View over the query registered for `type_ids`; empty for queries
    /// that were never registered.
    pub fn components_tuple(&self, type_ids: &[ComponentTypeId]) -> TupleView<'_> {
        self.tuples.view(type_ids)
    }

    // ── Systems ────────────────────────────────────────────────────────

    /// Registers a system. Outside a tick it enters the ordered list
    /// immediately; during a tick the registration is buffered. `init` is
    /// called at the next tick boundary either way.
    pub fn register_system<S: System + 'static>(&mut self, system: S) -> SystemToken {
        let token = self.next_system_token;
        self.next_system_token += 1;
        if self.ticking {
            self.scheduler.buffer(token, Box::new(system));
        } else {
            self.scheduler.insert(token, Box::new(system));
        }
        token
    }

    /// Removes a system. Outside a tick the system is torn down on the
    /// spot; during a tick the removal is buffered and drained at the tick
    /// boundary.
    pub fn remove_system(&mut self, token: SystemToken) {
        if self.ticking || self.scheduler_detached {
            self.scheduler.defer_removal(token);
            return;
        }
        let mut scheduler = mem::take(&mut self.scheduler);
        scheduler.remove_now(token, self);
        let stub = mem::replace(&mut self.scheduler, scheduler);
        self.scheduler.absorb(stub);
    }

    /// Marks the ordered system list as needing a re-sort before the next
    /// update pass.
    pub fn notify_system_priority_changed(&mut self) {
        self.scheduler.notify_priority_changed();
    }

    /// Runs one tick: integrates and initializes new systems, re-sorts if
    /// priorities changed, updates every system in priority order, then
    /// applies the system registrations and removals buffered during the
    /// pass.
    ///
    /// The re-entrancy flag covers only the update pass: a system that
    /// registers another system from its `init` sees the newcomer enter
    /// the ordered list immediately and run within the same tick, while a
    /// registration from `update` is buffered until the tick boundary.
    pub fn update(&mut self) {
        let mut scheduler = mem::take(&mut self.scheduler);
        self.scheduler_detached = true;

        // Integrate phase. Registrations issued from init callbacks land
        // on the stub; fold them in and init them until none appear.
        loop {
            scheduler.begin_tick(self);
            let stub = mem::take(&mut self.scheduler);
            let no_new_systems = stub.is_empty();
            scheduler.absorb(stub);
            if no_new_systems {
                break;
            }
        }

        self.ticking = true;
        scheduler.run_update_pass(self);
        self.ticking = false;

        let stub = mem::replace(&mut self.scheduler, scheduler);
        self.scheduler.absorb(stub);

        let mut scheduler = mem::take(&mut self.scheduler);
        scheduler.drain_removals(self);
        let stub = mem::replace(&mut self.scheduler, scheduler);
        self.scheduler.absorb(stub);
        self.scheduler_detached = false;
    }
}

thread_local! {
    static MANAGER: RefCell<Option<Manager>> = const { RefCell::new(None) };
}

/// Creates the process-wide manager instance. A second call while an
/// instance exists is a logged no-op.
pub fn init_ecs_manager() {
    MANAGER.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.is_some() {
            log::warn!("ECS manager already initialized");
            return;
        }
        let mut manager = Manager::new();
        manager.init();
        *slot = Some(manager);
    });
}

/// Tears down and drops the process-wide manager instance, if any.
pub fn shutdown_ecs_manager() {
    MANAGER.with(|slot| {
        if let Some(mut manager) = slot.borrow_mut().take() {
            manager.teardown();
        }
    });
}

/// Runs `f` against the process-wide manager. Returns `None` when no
/// instance exists (before init or after shutdown).
///
/// Re-entrant use from inside the closure is not supported; thread the
/// `&mut Manager` argument instead.
pub fn with_ecs_manager<R>(f: impl FnOnce(&mut Manager) -> R) -> Option<R> {
    MANAGER.with(|slot| slot.borrow_mut().as_mut().map(f))
}
