//! Ordered id → entity map shared by top-level and embedded collections.

use crate::{error::Result, Entity, EntityId, EntityKind, Error};
use indexmap::IndexMap;

/// Entities of one kind, keyed by id, iterated in insertion order.
///
/// Every key equals the id of its entity. Replacing an entity keeps its
/// position; removing one shifts later entries down.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMap {
    kind: EntityKind,
    entries: IndexMap<EntityId, Entity>,
}

impl EntityMap {
    /// Create an empty map for `kind`.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    /// Kind of entity this map holds.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Get an entity by ID.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entries.get(id)
    }

    /// Get an entity by ID, failing with [`Error::NotFound`] on a miss.
    pub fn get_strict(&self, id: &str) -> Result<&Entity> {
        self.get(id)
            .ok_or_else(|| Error::entity_not_found(self.kind, id))
    }

    /// First entity in iteration order with this name.
    pub fn get_by_name(&self, name: &str) -> Option<&Entity> {
        self.entries.values().find(|e| e.name() == Some(name))
    }

    /// Like [`EntityMap::get_by_name`], failing with [`Error::NotFound`].
    pub fn get_by_name_strict(&self, name: &str) -> Result<&Entity> {
        self.get_by_name(name).ok_or_else(|| Error::NotFound {
            what: format!("{} named", self.kind),
            key: name.to_string(),
        })
    }

    /// Position of an entity in iteration order.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.get_index_of(id)
    }

    /// Check if an entity exists.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entities in order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entries.values()
    }

    /// Iterate ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Insert an entity, returning its position and the entity it replaced.
    ///
    /// Fails with [`Error::TypeConflict`] if the entity is of another kind.
    pub fn insert_full(&mut self, entity: Entity) -> Result<(usize, Option<Entity>)> {
        if entity.kind() != self.kind {
            return Err(Error::TypeConflict {
                expected: self.kind,
                found: entity.kind(),
            });
        }
        Ok(self.entries.insert_full(entity.id().to_string(), entity))
    }

    /// Insert an entity, returning the entity it replaced.
    pub fn insert(&mut self, entity: Entity) -> Result<Option<Entity>> {
        self.insert_full(entity).map(|(_, previous)| previous)
    }

    /// Remove an entity by ID, returning its former position and the entity.
    pub fn remove_full(&mut self, id: &str) -> Option<(usize, Entity)> {
        self.entries
            .shift_remove_full(id)
            .map(|(index, _, entity)| (index, entity))
    }

    /// Remove an entity by ID. Absent IDs are a no-op.
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.remove_full(id).map(|(_, entity)| entity)
    }

    /// Entities matching `predicate`, in order.
    pub fn filter<F>(&self, mut predicate: F) -> Vec<&Entity>
    where
        F: FnMut(&Entity) -> bool,
    {
        self.entries.values().filter(|e| predicate(*e)).collect()
    }

    /// One transformed value per entity, in order.
    pub fn map<T, F>(&self, transform: F) -> Vec<T>
    where
        F: FnMut(&Entity) -> T,
    {
        self.entries.values().map(transform).collect()
    }

    /// Left fold over entities in order.
    pub fn reduce<T, F>(&self, initial: T, combine: F) -> T
    where
        F: FnMut(T, &Entity) -> T,
    {
        self.entries.values().fold(initial, combine)
    }
}
