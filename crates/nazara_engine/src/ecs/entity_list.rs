//! Ordered set of entities
//!
//! Used by systems to hold the entities they track and by the render system
//! for its camera, drawable and light buckets. Membership is tested through a
//! bitset of entity ids, iteration follows insertion order (or the order of
//! the last sort).

use std::cmp::Ordering;

use super::entity::{Entity, EntityHandle, EntityId};
use crate::foundation::bitset::Bitset;

/// Ordered set of entity handles keyed by entity id
#[derive(Debug, Clone, Default)]
pub struct EntityList {
    entries: Vec<(EntityId, EntityHandle)>,
    ids: Bitset,
}

impl EntityList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entity, returns `false` if it was already present
    pub fn insert(&mut self, entity: &Entity) -> bool {
        if self.contains_id(entity.id()) {
            return false;
        }

        self.ids.unbounded_set(entity.id() as usize, true);
        self.entries.push((entity.id(), entity.handle()));
        true
    }

    /// Remove an entity, returns `false` if it was not present
    ///
    /// The relative order of the remaining entities is preserved.
    pub fn remove(&mut self, entity: &Entity) -> bool {
        self.remove_id(entity.id())
    }

    /// Remove the entity with id `id`, returns `false` if it was not present
    pub fn remove_id(&mut self, id: EntityId) -> bool {
        if !self.contains_id(id) {
            return false;
        }

        self.ids.reset(id as usize);
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        true
    }

    /// Is the entity part of the list?
    pub fn contains(&self, entity: &Entity) -> bool {
        self.contains_id(entity.id())
    }

    /// Is the entity with id `id` part of the list?
    pub fn contains_id(&self, id: EntityId) -> bool {
        self.ids.unbounded_test(id as usize)
    }

    /// Stable sort using a key derived from the entity id
    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(EntityId) -> K) {
        self.entries.sort_by_key(|(id, _)| key(*id));
    }

    /// Stable sort with a comparator over entity ids
    pub fn sort_by(&mut self, mut compare: impl FnMut(EntityId, EntityId) -> Ordering) {
        self.entries.sort_by(|(a, _), (b, _)| compare(*a, *b));
    }

    /// Iterate over the handles in list order
    pub fn iter(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.entries.iter().map(|(_, handle)| *handle)
    }

    /// Iterate over the ids in list order
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the list empty?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entity
    pub fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
    }
}
