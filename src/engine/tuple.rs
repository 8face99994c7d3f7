//! Tuple caches: incrementally maintained component-set queries.
//!
//! A tuple cache tracks, for one sorted set `S` of component type ids, the
//! entities whose attached components cover `S`, together with the handle
//! of each required type. Systems register the queries they will issue
//! ahead of time; from then on the cache is kept consistent on every
//! attach, detach, and entity destruction — it is never rebuilt from
//! scratch.
//!
//! Membership is stored in id order, so iteration over a view is
//! deterministic across runs with the same mutation sequence.

use std::collections::{BTreeMap, HashMap};

use crate::engine::component::ComponentHandle;
use crate::engine::types::{component_set_hash, ComponentTypeId, EntityId};

/// Cached membership for one component-set query.
pub struct TupleCache {
    type_ids: Vec<ComponentTypeId>,
    members: BTreeMap<EntityId, Vec<ComponentHandle>>,
}

impl TupleCache {
    fn new(mut type_ids: Vec<ComponentTypeId>) -> Self {
        type_ids.sort_unstable();
        type_ids.dedup();
        Self {
            type_ids,
            members: BTreeMap::new(),
        }
    }

    /// The sorted component-type set this cache answers for.
    pub fn type_ids(&self) -> &[ComponentTypeId] {
        &self.type_ids
    }

    /// Number of member entities.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if no entity currently covers the set.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `true` if `entity` is currently a member.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.members.contains_key(&entity)
    }

    /// Handles cached for a member entity, in `type_ids` order.
    pub fn handles(&self, entity: EntityId) -> Option<&[ComponentHandle]> {
        self.members.get(&entity).map(|row| row.as_slice())
    }

    fn cover(&self, attached: &[ComponentHandle]) -> Option<Vec<ComponentHandle>> {
        let mut row = Vec::with_capacity(self.type_ids.len());
        for &type_id in &self.type_ids {
            let handle = attached.iter().find(|h| h.type_id() == type_id)?;
            row.push(*handle);
        }
        Some(row)
    }

    fn refresh(&mut self, entity: EntityId, attached: &[ComponentHandle]) {
        match self.cover(attached) {
            Some(row) => {
                self.members.insert(entity, row);
            }
            None => {
                self.members.remove(&entity);
            }
        }
    }

    fn remove(&mut self, entity: EntityId) {
        self.members.remove(&entity);
    }

    /// Iterates members in entity-id order.
    pub fn iter(&self) -> impl Iterator<Item = TupleRow<'_>> {
        self.members.iter().map(move |(&entity, row)| TupleRow {
            entity,
            type_ids: &self.type_ids,
            handles: row,
        })
    }
}

/// One member of a tuple cache: the entity plus the handle for each
/// required type.
#[derive(Clone, Copy)]
pub struct TupleRow<'a> {
    entity: EntityId,
    type_ids: &'a [ComponentTypeId],
    handles: &'a [ComponentHandle],
}

impl<'a> TupleRow<'a> {
    /// The member entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Cached handles, one per required type, in sorted type-id order.
    pub fn handles(&self) -> &'a [ComponentHandle] {
        self.handles
    }

    /// Handle of the member's component of `type_id`; invalid if the type
    /// is not part of this query.
    pub fn handle_of(&self, type_id: ComponentTypeId) -> ComponentHandle {
        match self.type_ids.binary_search(&type_id) {
            Ok(position) => self.handles[position],
            Err(_) => ComponentHandle::invalid(),
        }
    }
}

/// Forward-iterable view over one registered query.
///
/// Views over unregistered queries are empty rather than an error.
#[derive(Clone, Copy)]
pub struct TupleView<'a> {
    cache: Option<&'a TupleCache>,
}

impl<'a> TupleView<'a> {
    /// Number of member entities.
    pub fn len(&self) -> usize {
        self.cache.map(|cache| cache.len()).unwrap_or(0)
    }

    /// Returns `true` if the view has no members (or the query was never
    /// registered).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `entity` is a member.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.cache
            .map(|cache| cache.contains(entity))
            .unwrap_or(false)
    }

    /// Iterates members in entity-id order.
    pub fn iter(&self) -> impl Iterator<Item = TupleRow<'a>> {
        self.cache.into_iter().flat_map(|cache| cache.iter())
    }
}

/// Table of tuple caches keyed by the hash of their sorted type-id list.
#[derive(Default)]
pub struct TupleCacheTable {
    caches: HashMap<u64, TupleCache>,
}

impl TupleCacheTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn canonical(type_ids: &[ComponentTypeId]) -> Vec<ComponentTypeId> {
        let mut sorted = type_ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        sorted
    }

    /// Registers a query over `type_ids`. Returns `false` if the set is
    /// empty or already registered. The caller seeds membership for
    /// entities that already cover the set.
    pub fn register(&mut self, type_ids: &[ComponentTypeId]) -> bool {
        let sorted = Self::canonical(type_ids);
        if sorted.is_empty() {
            return false;
        }
        let key = component_set_hash(&sorted);
        if self.caches.contains_key(&key) {
            return false;
        }
        self.caches.insert(key, TupleCache::new(sorted));
        true
    }

    /// Cache registered for `type_ids`, if any.
    pub fn get(&self, type_ids: &[ComponentTypeId]) -> Option<&TupleCache> {
        let sorted = Self::canonical(type_ids);
        self.caches.get(&component_set_hash(&sorted))
    }

    /// View over the query registered for `type_ids`; empty for unknown
    /// queries.
    pub fn view(&self, type_ids: &[ComponentTypeId]) -> TupleView<'_> {
        TupleView {
            cache: self.get(type_ids),
        }
    }

    /// Re-evaluates every cache against an entity's current attachments.
    pub(crate) fn entity_changed(&mut self, entity: EntityId, attached: &[ComponentHandle]) {
        for cache in self.caches.values_mut() {
            cache.refresh(entity, attached);
        }
    }

    /// Drops an entity from every cache.
    pub(crate) fn entity_destroyed(&mut self, entity: EntityId) {
        for cache in self.caches.values_mut() {
            cache.remove(entity);
        }
    }

    /// Seeds a member directly. Used when a query is registered after
    /// entities already exist.
    pub(crate) fn seed(&mut self, entity: EntityId, attached: &[ComponentHandle]) {
        self.entity_changed(entity, attached);
    }

    /// Drops all caches.
    pub fn clear(&mut self) {
        self.caches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(type_id: ComponentTypeId, index: u32) -> ComponentHandle {
        ComponentHandle::new(type_id, index, 0)
    }

    #[test]
    fn membership_follows_coverage() {
        let mut table = TupleCacheTable::new();
        assert!(table.register(&[2, 0]));

        // Only type 0 attached: not a member.
        table.entity_changed(9, &[handle(0, 1)]);
        assert!(!table.view(&[0, 2]).contains(9));

        // Both attached: member, regardless of query id order.
        table.entity_changed(9, &[handle(0, 1), handle(2, 4)]);
        assert!(table.view(&[2, 0]).contains(9));

        // Detach one: dropped.
        table.entity_changed(9, &[handle(2, 4)]);
        assert!(!table.view(&[0, 2]).contains(9));
    }

    #[test]
    fn rows_expose_handles_by_type() {
        let mut table = TupleCacheTable::new();
        table.register(&[3, 1]);
        table.entity_changed(5, &[handle(3, 7), handle(1, 2)]);

        let view = table.view(&[1, 3]);
        let row = view.iter().next().unwrap();
        assert_eq!(row.entity(), 5);
        assert_eq!(row.handle_of(1), handle(1, 2));
        assert_eq!(row.handle_of(3), handle(3, 7));
        assert!(!row.handle_of(2).is_valid());
    }

    #[test]
    fn unknown_query_is_an_empty_view() {
        let table = TupleCacheTable::new();
        assert!(table.view(&[1, 2]).is_empty());
    }

    #[test]
    fn destroyed_entity_leaves_every_cache() {
        let mut table = TupleCacheTable::new();
        table.register(&[0]);
        table.register(&[0, 1]);
        table.entity_changed(3, &[handle(0, 0), handle(1, 0)]);
        assert!(table.view(&[0]).contains(3));

        table.entity_destroyed(3);
        assert!(table.view(&[0]).is_empty());
        assert!(table.view(&[0, 1]).is_empty());
    }
}
