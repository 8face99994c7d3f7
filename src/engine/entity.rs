//! # Entity Management
//!
//! This module defines entity identity, lifecycle, and the collection that
//! aggregates components and children into entity records.
//!
//! ## Entity Model
//! An entity is a stable 32-bit id plus an [`EntityData`] record in a
//! [`Pool`]. The record carries the parent link, hierarchy depth, the heads
//! of two intrusive singly-linked lists (attached components and children),
//! and the activation flags. Ids are monotonic and never recycled within a
//! run, so external code may store them freely.
//!
//! ## Handles
//! [`Entity`] is the external handle: the id plus a clone of the record's
//! reference token. Cloning a handle bumps the token count; the collection
//! uses the count only to decide when a destroyed record's slot may be
//! reused. The count never triggers destruction — that is always explicit.
//!
//! ## Intrusive lists
//! Component attachments and children are nodes in two dedicated pools,
//! linked by slot index with [`INVALID_POOL_INDEX`] as the terminator. The
//! pools are arenas: nodes never move, freed nodes are reused. Lists are
//! prepended, so iteration yields most-recently-linked first.
//!
//! ## Activation
//! Each entity tracks a user-intent `active` flag and a derived
//! `effective_active = active ∧ (no parent ∨ parent effective)`. Changes
//! propagate depth-first and are edge-triggered: activation events fire
//! only when the derived value actually flips, once per attached component
//! of each transitioning entity.
//!
//! ## Invariants
//! - A component type appears at most once in one entity's component list.
//! - A child appears exactly once in its parent's children list, and the
//!   child's parent field names that parent.
//! - Destroying an entity destroys its attached component payloads and,
//!   recursively, its children.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::component::ComponentHandle;
use crate::engine::error::EcsResult;
use crate::engine::events::{ComponentAttachment, EventHub};
use crate::engine::pool::Pool;
use crate::engine::registry::ComponentRegistry;
use crate::engine::tuple::TupleCacheTable;
use crate::engine::types::{
    ComponentTypeId, EntityId, PoolIndex, INVALID_ENTITY_ID, INVALID_POOL_INDEX,
};

/// Fixed-size record describing one entity.
pub struct EntityData {
    id: EntityId,
    parent: EntityId,
    depth: u32,
    components_head: PoolIndex,
    children_head: PoolIndex,
    children_count: u32,
    next_child_order: u32,
    order_in_parent: u32,
    active: bool,
    effective_active: bool,
    token: Rc<()>,
}

impl EntityData {
    fn new(id: EntityId) -> Self {
        Self {
            id,
            parent: INVALID_ENTITY_ID,
            depth: 0,
            components_head: INVALID_POOL_INDEX,
            children_head: INVALID_POOL_INDEX,
            children_count: 0,
            next_child_order: 0,
            order_in_parent: 0,
            active: true,
            effective_active: true,
            token: Rc::new(()),
        }
    }
}

/// External, reference-counted entity handle.
///
/// Copies share the underlying record's token; the count of outstanding
/// handles keeps a destroyed record's id slot from being reused, nothing
/// more. A handle may be invalid (see [`Entity::invalid`]); such handles
/// compare equal to each other and resolve to nothing.
#[derive(Clone, Debug)]
pub struct Entity {
    id: EntityId,
    token: Option<Rc<()>>,
}

impl Entity {
    /// The "points at nothing" handle.
    pub fn invalid() -> Self {
        Self {
            id: INVALID_ENTITY_ID,
            token: None,
        }
    }

    /// Id of the referenced entity, or [`INVALID_ENTITY_ID`].
    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns `true` if this handle was minted for a real entity. The
    /// entity may still have been destroyed since; the collection answers
    /// liveness.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.token.is_some()
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::invalid()
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.is_valid() == other.is_valid() && self.id == other.id
    }
}

impl Eq for Entity {}

/// Node of the per-entity component list.
#[derive(Clone, Copy)]
struct ComponentMapNode {
    next: PoolIndex,
    handle: ComponentHandle,
}

/// Node of the per-entity children list.
#[derive(Clone, Copy)]
struct HierarchyNode {
    next: PoolIndex,
    child: EntityId,
}

/// Iterator over the component handles attached to one entity.
pub struct ComponentsIter<'a> {
    nodes: &'a Pool<ComponentMapNode>,
    cursor: PoolIndex,
}

impl<'a> Iterator for ComponentsIter<'a> {
    type Item = ComponentHandle;

    fn next(&mut self) -> Option<ComponentHandle> {
        let node = self.nodes.slot(self.cursor)?;
        self.cursor = node.next;
        Some(node.handle)
    }
}

/// Iterator over the child ids of one entity, most recently added first.
pub struct ChildrenIter<'a> {
    nodes: &'a Pool<HierarchyNode>,
    cursor: PoolIndex,
}

impl<'a> Iterator for ChildrenIter<'a> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let node = self.nodes.slot(self.cursor)?;
        self.cursor = node.next;
        Some(node.child)
    }
}

/// Owner of all entity records, their component mappings, and the
/// hierarchy.
#[derive(Default)]
pub struct EntityCollection {
    entities: Pool<EntityData>,
    id_map: HashMap<EntityId, PoolIndex>,
    component_nodes: Pool<ComponentMapNode>,
    hierarchy_nodes: Pool<HierarchyNode>,
    /// Destroyed records still pinned by external handles.
    zombies: Vec<PoolIndex>,
    next_entity_id: EntityId,
    active_count: usize,
}

impl EntityCollection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn index_of(&self, id: EntityId) -> Option<PoolIndex> {
        self.id_map.get(&id).copied()
    }

    fn data(&self, id: EntityId) -> Option<&EntityData> {
        self.entities.slot(self.index_of(id)?)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.id_map.len()
    }

    /// Returns `true` if no entity is alive.
    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty()
    }

    /// Number of effectively active entities.
    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Ids of all live entities, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.id_map.keys().copied()
    }

    /// Frees destroyed records whose last external handle has been dropped.
    /// Runs opportunistically on entity creation.
    fn sweep_zombies(&mut self) {
        let mut position = 0;
        while position < self.zombies.len() {
            let slot_index = self.zombies[position];
            let collectable = self
                .entities
                .slot(slot_index)
                .map(|data| Rc::strong_count(&data.token) == 1)
                .unwrap_or(false);
            if collectable {
                self.entities.free(slot_index);
                self.zombies.swap_remove(position);
            } else {
                position += 1;
            }
        }
    }

    /// Creates a new entity, assigns it the next id, and emits
    /// *EntityCreated*. The returned handle is the first external
    /// reference.
    pub fn create_entity(&mut self, events: &mut EventHub) -> EcsResult<Entity> {
        self.sweep_zombies();

        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let index = self.entities.insert(EntityData::new(id))?;
        self.id_map.insert(id, index);
        self.active_count += 1;

        events.entity_created.emit(&id);

        let token = self.entities.slot(index).map(|data| data.token.clone());
        Ok(Entity { id, token })
    }

    /// Returns a handle for `id`; invalid if the id is unknown or the
    /// entity has been destroyed.
    pub fn entity_by_id(&self, id: EntityId) -> Entity {
        match self.data(id) {
            Some(data) => Entity {
                id,
                token: Some(data.token.clone()),
            },
            None => Entity::invalid(),
        }
    }

    /// Returns `true` iff the handle references a live entity.
    pub fn is_alive(&self, entity: &Entity) -> bool {
        entity.is_valid() && self.id_map.contains_key(&entity.id)
    }

    // ── Components ─────────────────────────────────────────────────────

    /// Handles attached to `id`, in list order.
    pub(crate) fn attached_handles(&self, id: EntityId) -> Vec<ComponentHandle> {
        match self.data(id) {
            Some(data) => ComponentsIter {
                nodes: &self.component_nodes,
                cursor: data.components_head,
            }
            .collect(),
            None => Vec::new(),
        }
    }

    /// Iterates the component handles attached to an entity.
    pub fn components(&self, entity: &Entity) -> ComponentsIter<'_> {
        let cursor = self
            .data(entity.id)
            .map(|data| data.components_head)
            .unwrap_or(INVALID_POOL_INDEX);
        ComponentsIter {
            nodes: &self.component_nodes,
            cursor,
        }
    }

    /// Returns `true` if the entity has a component of `type_id` attached.
    pub fn has_component(&self, id: EntityId, type_id: ComponentTypeId) -> bool {
        self.component_handle(id, type_id).is_valid()
    }

    /// Handle of the entity's component of `type_id`, or an invalid handle.
    pub fn component_handle(&self, id: EntityId, type_id: ComponentTypeId) -> ComponentHandle {
        self.attached_handles_iter(id)
            .find(|handle| handle.type_id() == type_id)
            .unwrap_or_else(ComponentHandle::invalid)
    }

    fn attached_handles_iter(&self, id: EntityId) -> ComponentsIter<'_> {
        let cursor = self
            .data(id)
            .map(|data| data.components_head)
            .unwrap_or(INVALID_POOL_INDEX);
        ComponentsIter {
            nodes: &self.component_nodes,
            cursor,
        }
    }

    /// Attaches an already-created component to the entity.
    ///
    /// ## Behavior
    /// Rejects duplicates of the same component type (logged no-op).
    /// Prepends a mapping node, emits *ComponentAttached*, and refreshes
    /// tuple-cache membership. Attachment does not transfer payload
    /// ownership: detaching later will not destroy the payload.
    pub fn add_component(
        &mut self,
        entity: &Entity,
        handle: ComponentHandle,
        events: &mut EventHub,
        tuples: &mut TupleCacheTable,
    ) -> EcsResult<()> {
        if !handle.is_valid() {
            log::warn!("attach of invalid component handle to entity {}", entity.id);
            return Ok(());
        }
        let Some(index) = self.index_of(entity.id) else {
            log::warn!("attach to unknown entity {}", entity.id);
            return Ok(());
        };
        if self.has_component(entity.id, handle.type_id()) {
            log::warn!(
                "entity {} already has a component of type {}",
                entity.id,
                handle.type_id()
            );
            return Ok(());
        }

        let head = self
            .entities
            .slot(index)
            .map(|data| data.components_head)
            .unwrap_or(INVALID_POOL_INDEX);
        let node = self
            .component_nodes
            .insert(ComponentMapNode { next: head, handle })?;
        if let Some(data) = self.entities.slot_mut(index) {
            data.components_head = node;
        }

        events
            .component_attached
            .emit(&ComponentAttachment {
                entity: entity.id,
                handle,
            });

        let attached = self.attached_handles(entity.id);
        tuples.entity_changed(entity.id, &attached);
        Ok(())
    }

    /// Detaches a component from the entity.
    ///
    /// Unlinks the mapping node and emits *ComponentDetached*. The payload
    /// is NOT destroyed — component ownership is independent of attachment.
    pub fn remove_component(
        &mut self,
        entity: &Entity,
        handle: ComponentHandle,
        events: &mut EventHub,
        tuples: &mut TupleCacheTable,
    ) {
        let Some(index) = self.index_of(entity.id) else {
            return;
        };

        let head = self
            .entities
            .slot(index)
            .map(|data| data.components_head)
            .unwrap_or(INVALID_POOL_INDEX);

        let mut previous = INVALID_POOL_INDEX;
        let mut cursor = head;
        while let Some(node) = self.component_nodes.slot(cursor).copied() {
            if node.handle == handle {
                if previous == INVALID_POOL_INDEX {
                    if let Some(data) = self.entities.slot_mut(index) {
                        data.components_head = node.next;
                    }
                } else if let Some(prev_node) = self.component_nodes.slot_mut(previous) {
                    prev_node.next = node.next;
                }
                self.component_nodes.free(cursor);

                events
                    .component_detached
                    .emit(&ComponentAttachment {
                        entity: entity.id,
                        handle,
                    });

                let attached = self.attached_handles(entity.id);
                tuples.entity_changed(entity.id, &attached);
                return;
            }
            previous = cursor;
            cursor = node.next;
        }

        log::warn!(
            "detach of component not attached to entity {} (type {})",
            entity.id,
            handle.type_id()
        );
    }

    // ── Hierarchy ──────────────────────────────────────────────────────

    /// Parent of `id`, or [`INVALID_ENTITY_ID`].
    pub fn parent_of(&self, id: EntityId) -> EntityId {
        self.data(id).map(|data| data.parent).unwrap_or(INVALID_ENTITY_ID)
    }

    /// Hierarchy depth of `id`; roots are at depth 0.
    pub fn depth_of(&self, id: EntityId) -> u32 {
        self.data(id).map(|data| data.depth).unwrap_or(0)
    }

    /// Number of children of `id`.
    pub fn children_count(&self, id: EntityId) -> usize {
        self.data(id).map(|data| data.children_count as usize).unwrap_or(0)
    }

    /// Position counter assigned when `id` was added to its parent.
    pub fn order_in_parent(&self, id: EntityId) -> u32 {
        self.data(id).map(|data| data.order_in_parent).unwrap_or(0)
    }

    /// Iterates the children of an entity, most recently added first.
    pub fn children(&self, entity: &Entity) -> ChildrenIter<'_> {
        let cursor = self
            .data(entity.id)
            .map(|data| data.children_head)
            .unwrap_or(INVALID_POOL_INDEX);
        ChildrenIter {
            nodes: &self.hierarchy_nodes,
            cursor,
        }
    }

    fn child_ids(&self, id: EntityId) -> Vec<EntityId> {
        match self.data(id) {
            Some(data) => ChildrenIter {
                nodes: &self.hierarchy_nodes,
                cursor: data.children_head,
            }
            .collect(),
            None => Vec::new(),
        }
    }

    /// Child at `position` in list order, or [`INVALID_ENTITY_ID`].
    pub fn child_by_index(&self, entity: &Entity, position: usize) -> EntityId {
        let mut iter = self.children(entity);
        iter.nth(position).unwrap_or(INVALID_ENTITY_ID)
    }

    fn is_ancestor_of(&self, candidate: EntityId, descendant: EntityId) -> bool {
        let mut cursor = descendant;
        while cursor != INVALID_ENTITY_ID {
            if cursor == candidate {
                return true;
            }
            cursor = self.parent_of(cursor);
        }
        false
    }

    /// Links `child` under `entity`.
    ///
    /// ## Behavior
    /// Rejects (logged no-op) if the child already has a parent or if the
    /// link would create a cycle. Prepends to the children list, records
    /// the child's order-in-parent, recomputes depths for the child's
    /// subtree, and refreshes activation (the child inherits the parent's
    /// effective state).
    pub fn add_child(
        &mut self,
        entity: &Entity,
        child: &Entity,
        events: &mut EventHub,
    ) -> EcsResult<()> {
        let Some(parent_index) = self.index_of(entity.id) else {
            log::warn!("add_child on unknown entity {}", entity.id);
            return Ok(());
        };
        let Some(child_index) = self.index_of(child.id) else {
            log::warn!("add_child with unknown child {}", child.id);
            return Ok(());
        };
        if self.parent_of(child.id) != INVALID_ENTITY_ID {
            log::warn!(
                "child {} already has a parent; detach it first",
                child.id
            );
            return Ok(());
        }
        if self.is_ancestor_of(child.id, entity.id) {
            log::warn!(
                "linking {} under {} would create a cycle",
                child.id,
                entity.id
            );
            return Ok(());
        }

        let (head, parent_depth) = {
            let data = self.entities.slot(parent_index).expect("parent record");
            (data.children_head, data.depth)
        };

        // Allocate the node before touching any record, so a failed
        // allocation leaves no visible state change.
        let node = self.hierarchy_nodes.insert(HierarchyNode {
            next: head,
            child: child.id,
        })?;

        let order = {
            let data = self.entities.slot_mut(parent_index).expect("parent record");
            let order = data.next_child_order;
            data.next_child_order += 1;
            data.children_count += 1;
            data.children_head = node;
            order
        };

        if let Some(data) = self.entities.slot_mut(child_index) {
            data.parent = entity.id;
            data.order_in_parent = order;
        }

        self.refresh_depth(child_index, parent_depth + 1);
        self.refresh_activation(child_index, events);
        Ok(())
    }

    /// Unlinks `child` from `entity`. The child becomes a root again and
    /// its activation is refreshed against its own flag alone.
    pub fn remove_child(&mut self, entity: &Entity, child: &Entity, events: &mut EventHub) {
        if self.parent_of(child.id) != entity.id {
            log::warn!("{} is not a child of {}", child.id, entity.id);
            return;
        }
        self.unlink_child(entity.id, child.id);

        if let Some(child_index) = self.index_of(child.id) {
            if let Some(data) = self.entities.slot_mut(child_index) {
                data.parent = INVALID_ENTITY_ID;
                data.order_in_parent = 0;
            }
            self.refresh_depth(child_index, 0);
            self.refresh_activation(child_index, events);
        }
    }

    /// Removes `child_id` from `parent_id`'s children list, freeing the
    /// node. The child's own record is not touched.
    fn unlink_child(&mut self, parent_id: EntityId, child_id: EntityId) {
        let Some(parent_index) = self.index_of(parent_id) else {
            return;
        };
        let head = self
            .entities
            .slot(parent_index)
            .map(|data| data.children_head)
            .unwrap_or(INVALID_POOL_INDEX);

        let mut previous = INVALID_POOL_INDEX;
        let mut cursor = head;
        while let Some(node) = self.hierarchy_nodes.slot(cursor).copied() {
            if node.child == child_id {
                if previous == INVALID_POOL_INDEX {
                    if let Some(data) = self.entities.slot_mut(parent_index) {
                        data.children_head = node.next;
                    }
                } else if let Some(prev_node) = self.hierarchy_nodes.slot_mut(previous) {
                    prev_node.next = node.next;
                }
                self.hierarchy_nodes.free(cursor);
                if let Some(data) = self.entities.slot_mut(parent_index) {
                    data.children_count -= 1;
                }
                return;
            }
            previous = cursor;
            cursor = node.next;
        }
    }

    /// Detaches or destroys every child of `entity`.
    pub fn clear_children(
        &mut self,
        entity: &Entity,
        destroy_children: bool,
        registry: &mut ComponentRegistry,
        events: &mut EventHub,
        tuples: &mut TupleCacheTable,
    ) {
        for child_id in self.child_ids(entity.id) {
            if destroy_children {
                self.destroy_entity(child_id, registry, events, tuples);
            } else {
                let child = self.entity_by_id(child_id);
                self.remove_child(entity, &child, events);
            }
        }
    }

    /// Recomputes hierarchy depth for a subtree.
    fn refresh_depth(&mut self, root_index: PoolIndex, root_depth: u32) {
        let mut stack = vec![(root_index, root_depth)];
        while let Some((index, depth)) = stack.pop() {
            let children = match self.entities.slot_mut(index) {
                Some(data) => {
                    data.depth = depth;
                    ChildrenIter {
                        nodes: &self.hierarchy_nodes,
                        cursor: data.children_head,
                    }
                    .collect::<Vec<_>>()
                }
                None => continue,
            };
            for child_id in children {
                if let Some(child_index) = self.index_of(child_id) {
                    stack.push((child_index, depth + 1));
                }
            }
        }
    }

    // ── Activation ─────────────────────────────────────────────────────

    /// User-intent active flag of `id`.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.data(id).map(|data| data.active).unwrap_or(false)
    }

    /// Derived activation: active and every ancestor effectively active.
    pub fn is_activated(&self, entity: &Entity) -> bool {
        self.data(entity.id)
            .map(|data| data.effective_active)
            .unwrap_or(false)
    }

    /// Sets the user-intent flag and propagates the derived state through
    /// the subtree. Events fire only for entities whose effective state
    /// actually flips, once per attached component.
    pub fn activate_entity(&mut self, entity: &Entity, active: bool, events: &mut EventHub) {
        let Some(index) = self.index_of(entity.id) else {
            return;
        };
        if let Some(data) = self.entities.slot_mut(index) {
            data.active = active;
        }
        self.refresh_activation(index, events);
    }

    /// Re-derives `effective_active` for the record at `index`; on change,
    /// fires component activation events and recurses into children.
    fn refresh_activation(&mut self, index: PoolIndex, events: &mut EventHub) {
        let (id, active, parent) = match self.entities.slot(index) {
            Some(data) => (data.id, data.active, data.parent),
            None => return,
        };

        let parent_effective = if parent == INVALID_ENTITY_ID {
            true
        } else {
            self.data(parent)
                .map(|data| data.effective_active)
                .unwrap_or(true)
        };
        let effective = active && parent_effective;

        let changed = match self.entities.slot_mut(index) {
            Some(data) if data.effective_active != effective => {
                data.effective_active = effective;
                true
            }
            _ => false,
        };
        if !changed {
            return;
        }

        if effective {
            self.active_count += 1;
        } else {
            self.active_count -= 1;
        }

        for handle in self.attached_handles(id) {
            if effective {
                events.component_activated.emit(&handle);
            } else {
                events.component_deactivated.emit(&handle);
            }
        }

        for child_id in self.child_ids(id) {
            if let Some(child_index) = self.index_of(child_id) {
                self.refresh_activation(child_index, events);
            }
        }
    }

    // ── Destruction and cloning ────────────────────────────────────────

    /// Destroys the entity: children recursively, then attached component
    /// payloads, then the record itself. Emits *EntityDestroyed*; the id
    /// never resolves again. The record's slot is reused once the last
    /// external handle is gone.
    pub fn destroy_entity(
        &mut self,
        id: EntityId,
        registry: &mut ComponentRegistry,
        events: &mut EventHub,
        tuples: &mut TupleCacheTable,
    ) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        // Destroy attached payloads and free the mapping nodes.
        let mut cursor = self
            .entities
            .slot(index)
            .map(|data| data.components_head)
            .unwrap_or(INVALID_POOL_INDEX);
        while let Some(node) = self.component_nodes.slot(cursor).copied() {
            registry.destroy(node.handle, events);
            self.component_nodes.free(cursor);
            cursor = node.next;
        }
        if let Some(data) = self.entities.slot_mut(index) {
            data.components_head = INVALID_POOL_INDEX;
        }

        for child_id in self.child_ids(id) {
            self.destroy_entity(child_id, registry, events, tuples);
        }

        let (parent, was_effective) = self
            .entities
            .slot(index)
            .map(|data| (data.parent, data.effective_active))
            .unwrap_or((INVALID_ENTITY_ID, false));
        if parent != INVALID_ENTITY_ID {
            self.unlink_child(parent, id);
        }
        if was_effective {
            self.active_count -= 1;
        }

        self.id_map.remove(&id);
        tuples.entity_destroyed(id);
        events.entity_destroyed.emit(&id);
        log::trace!("destroyed entity {}", id);

        let externally_referenced = self
            .entities
            .slot(index)
            .map(|data| Rc::strong_count(&data.token) > 1)
            .unwrap_or(false);
        if externally_referenced {
            self.zombies.push(index);
        } else {
            self.entities.free(index);
        }
        true
    }

    /// Deep-clones an entity: a fresh id, every attached component cloned
    /// through its collection, children cloned recursively. Returns an
    /// invalid handle if the source is not alive.
    pub fn clone_entity(
        &mut self,
        source: &Entity,
        registry: &mut ComponentRegistry,
        events: &mut EventHub,
        tuples: &mut TupleCacheTable,
    ) -> EcsResult<Entity> {
        if !self.is_alive(source) {
            return Ok(Entity::invalid());
        }

        let clone = self.create_entity(events)?;

        // Reversed so that prepending reproduces the source list order.
        let mut handles = self.attached_handles(source.id);
        handles.reverse();
        for handle in handles {
            let copy = registry.clone_component(handle, events)?;
            if copy.is_valid() {
                self.add_component(&clone, copy, events, tuples)?;
            }
        }

        let source_active = self.is_active(source.id);
        if !source_active {
            self.activate_entity(&clone, false, events);
        }

        let mut children = self.child_ids(source.id);
        children.reverse();
        for child_id in children {
            let child = self.entity_by_id(child_id);
            let child_clone = self.clone_entity(&child, registry, events, tuples)?;
            if child_clone.is_valid() {
                self.add_child(&clone, &child_clone, events)?;
            }
        }

        Ok(clone)
    }

    // ── Hierarchy queries ──────────────────────────────────────────────

    /// Lexicographic key of an entity's position in the forest: the root's
    /// id followed by the order-in-parent chain down to the entity.
    fn hierarchy_key(&self, id: EntityId) -> Vec<u64> {
        let mut key = Vec::new();
        let mut cursor = id;
        while cursor != INVALID_ENTITY_ID {
            match self.data(cursor) {
                Some(data) if data.parent != INVALID_ENTITY_ID => {
                    key.push(data.order_in_parent as u64);
                    cursor = data.parent;
                }
                Some(data) => {
                    key.push(data.id as u64);
                    break;
                }
                None => break,
            }
        }
        key.reverse();
        key
    }

    /// Stable tri-valued order consistent with a depth-first pre-order
    /// traversal of the forest: ancestors precede descendants, siblings
    /// order by when they were added. Unknown ids compare equal.
    pub fn compare_in_hierarchy(&self, a: EntityId, b: EntityId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        if self.index_of(a).is_none() || self.index_of(b).is_none() {
            return Ordering::Equal;
        }
        self.hierarchy_key(a).cmp(&self.hierarchy_key(b))
    }

    /// Number of entities in the branch rooted at `root` (inclusive).
    pub fn entities_in_branch(&self, root: EntityId) -> usize {
        if self.index_of(root).is_none() {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            count += 1;
            stack.extend(self.child_ids(id));
        }
        count
    }

    /// Number of effectively active entities in the branch rooted at
    /// `root` (inclusive).
    pub fn active_entities_in_branch(&self, root: EntityId) -> usize {
        if self.index_of(root).is_none() {
            return 0;
        }
        let mut count = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.data(id).map(|data| data.effective_active).unwrap_or(false) {
                count += 1;
            }
            stack.extend(self.child_ids(id));
        }
        count
    }

    /// Drops every record, mapping node, and hierarchy node. Ids restart.
    pub fn reset(&mut self) {
        self.entities.clear();
        self.id_map.clear();
        self.component_nodes.clear();
        self.hierarchy_nodes.clear();
        self.zombies.clear();
        self.next_entity_id = 0;
        self.active_count = 0;
    }
}
