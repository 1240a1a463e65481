//! Identified collections: the ordered, keyed container of one entity kind.
//!
//! A [`Collection`] owns its entities, the raw `source` array it was
//! hydrated from, and the observers to notify when anything changes. Local
//! mutation goes through [`Collection::insert`] and [`Collection::remove`];
//! changes reported by the backing store go through the `on_*` handlers.
//!
//! # Batches
//!
//! Every `_many` handler is all-or-nothing: all payloads are constructed and
//! validated before the first mutation, so a bad entry leaves the collection,
//! its source, and its observers untouched. A successful batch notifies
//! observers exactly once.

use crate::{
    error::Result,
    event::RequestOptions,
    import::{self, Backend, SourceStore},
    observer::{ChangeAction, ChangeEvent, Observer, Observers, SubscriptionId},
    Entity, EntityId, EntityKind, EntityMap, Error, Schema,
};
use futures::future::join_all;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

/// An ordered, uniquely keyed collection of entities of one kind.
#[derive(Debug)]
pub struct Collection {
    /// Field rules used when constructing entities
    schema: Arc<Schema>,
    /// Entities by ID, in insertion order
    entities: EntityMap,
    /// Raw data, index-aligned with `entities` between mutations
    source: Vec<Value>,
    /// Subscribers notified on change
    observers: Observers,
}

impl Collection {
    /// Create a collection of `kind` from raw data, with no extra field rules.
    pub fn new(kind: EntityKind, data: Vec<Value>) -> Result<Self> {
        Self::with_schema(kind, Arc::new(Schema::new()), data)
    }

    /// Create a collection of `kind` from raw data validated by `schema`.
    pub fn with_schema(kind: EntityKind, schema: Arc<Schema>, data: Vec<Value>) -> Result<Self> {
        let mut collection = Self {
            schema,
            entities: EntityMap::new(kind),
            source: data,
            observers: Observers::new(),
        };
        collection.hydrate()?;
        Ok(collection)
    }

    /// Builder-style method to register an observer.
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observers.subscribe(observer);
        self
    }

    /// Register an observer.
    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Kind of entity this collection holds.
    pub fn kind(&self) -> EntityKind {
        self.entities.kind()
    }

    /// Schema used to validate entities.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Raw data the collection is hydrated from.
    pub fn source(&self) -> &[Value] {
        &self.source
    }

    /// Raw data, for bulk external changes. Call [`Collection::initialize`]
    /// afterwards to rebuild the entities.
    pub fn source_mut(&mut self) -> &mut Vec<Value> {
        &mut self.source
    }

    /// Rebuild every entity from `source`.
    ///
    /// Idempotent: calling it twice in a row yields the same contents. On a
    /// validation failure the collection keeps its previous entities and
    /// `source` is rebuilt from them, discarding the rejected edits.
    pub fn initialize(&mut self) -> Result<&mut Self> {
        self.hydrate()?;
        let ids = self.entities.ids().map(str::to_string).collect();
        self.notify(ChangeAction::Refreshed, None, ids, None);
        Ok(self)
    }

    fn hydrate(&mut self) -> Result<()> {
        let kind = self.kind();
        let entities = match self.build_entities() {
            Ok(entities) => entities,
            Err(e) => {
                // Put the source back in line with the entities we keep.
                self.source = self.entities.iter().map(Entity::to_source).collect();
                return Err(e);
            }
        };

        // Duplicate IDs collapse onto the first position, so re-derive the
        // source to keep it aligned with the map.
        self.source = entities.iter().map(Entity::to_source).collect();
        self.entities = entities;

        tracing::debug!(kind = %kind, count = self.entities.len(), "collection hydrated");
        Ok(())
    }

    fn build_entities(&self) -> Result<EntityMap> {
        let kind = self.kind();
        let mut entities = EntityMap::new(kind);
        for raw in &self.source {
            entities.insert(Entity::from_source(kind, raw.clone(), &self.schema)?)?;
        }
        Ok(entities)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Get an entity by ID.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Get an entity by ID, failing with [`Error::NotFound`] on a miss.
    pub fn get_strict(&self, id: &str) -> Result<&Entity> {
        self.entities.get_strict(id)
    }

    /// First entity in iteration order with this name.
    ///
    /// Duplicate names resolve to whichever entity currently comes first.
    pub fn get_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.get_by_name(name)
    }

    /// Like [`Collection::get_by_name`], failing with [`Error::NotFound`].
    pub fn get_by_name_strict(&self, name: &str) -> Result<&Entity> {
        self.entities.get_by_name_strict(name)
    }

    /// Position of an entity in iteration order, `None` if absent.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entities.index_of(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate entities in order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Iterate IDs in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities.ids()
    }

    /// The underlying ordered map.
    pub fn entities(&self) -> &EntityMap {
        &self.entities
    }

    // ------------------------------------------------------------------
    // Bulk transforms
    // ------------------------------------------------------------------

    /// Entities matching `predicate`, in collection order.
    pub fn filter<F>(&self, predicate: F) -> Vec<&Entity>
    where
        F: FnMut(&Entity) -> bool,
    {
        self.entities.filter(predicate)
    }

    /// Entities matching an asynchronous `predicate`, in collection order.
    ///
    /// All predicates run concurrently; results are ordered by position in
    /// the collection, not by completion.
    pub async fn filter_async<'a, F, Fut>(&'a self, predicate: F) -> Vec<&'a Entity>
    where
        F: Fn(&'a Entity) -> Fut,
        Fut: Future<Output = bool>,
    {
        let verdicts = join_all(self.entities.iter().map(&predicate)).await;
        self.entities
            .iter()
            .zip(verdicts)
            .filter_map(|(entity, keep)| keep.then_some(entity))
            .collect()
    }

    /// One transformed value per entity, in order.
    pub fn map<T, F>(&self, transform: F) -> Vec<T>
    where
        F: FnMut(&Entity) -> T,
    {
        self.entities.map(transform)
    }

    /// Left fold over entities in order.
    pub fn reduce<T, F>(&self, initial: T, combine: F) -> T
    where
        F: FnMut(T, &Entity) -> T,
    {
        self.entities.reduce(initial, combine)
    }

    // ------------------------------------------------------------------
    // Local mutation
    // ------------------------------------------------------------------

    /// Insert an entity, replacing any entity with the same ID in place.
    ///
    /// Fails with [`Error::TypeConflict`] for an entity of another kind.
    pub fn insert(&mut self, entity: Entity) -> Result<Option<Entity>> {
        if entity.kind() != self.kind() {
            return Err(Error::TypeConflict {
                expected: self.kind(),
                found: entity.kind(),
            });
        }
        entity.validate(&self.schema)?;

        let id = entity.id().to_string();
        let previous = self.put(entity)?;
        let action = if previous.is_some() {
            ChangeAction::Updated
        } else {
            ChangeAction::Created
        };
        self.notify(action, None, vec![id], None);
        Ok(previous)
    }

    /// Remove an entity by ID. Absent IDs are a no-op and notify nobody.
    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let removed = self.take(id)?;
        self.notify(ChangeAction::Deleted, None, vec![removed.id().to_string()], None);
        Some(removed)
    }

    /// Ask every observer to refresh.
    pub fn render(&mut self) {
        let ids = self.entities.ids().map(str::to_string).collect();
        self.notify(ChangeAction::Refreshed, None, ids, None);
    }

    fn put(&mut self, entity: Entity) -> Result<Option<Entity>> {
        let raw = entity.to_source();
        let (index, previous) = self.entities.insert_full(entity)?;
        if previous.is_some() && index < self.source.len() {
            self.source[index] = raw;
        } else {
            self.source.push(raw);
        }
        Ok(previous)
    }

    fn take(&mut self, id: &str) -> Option<Entity> {
        let (index, entity) = self.entities.remove_full(id)?;
        if index < self.source.len() {
            self.source.remove(index);
        }
        Some(entity)
    }

    fn notify(
        &mut self,
        action: ChangeAction,
        parent_id: Option<&str>,
        ids: Vec<EntityId>,
        user_id: Option<&str>,
    ) {
        let event = ChangeEvent {
            action,
            kind: self.kind(),
            parent_id: parent_id.map(str::to_string),
            ids,
            user_id: user_id.map(str::to_string),
        };
        self.observers.notify_all(&event);
    }

    // ------------------------------------------------------------------
    // Remote synchronization
    // ------------------------------------------------------------------

    /// Apply a remotely created entity.
    pub fn on_create(
        &mut self,
        payload: Value,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Entity> {
        single(self.on_create_many(vec![payload], options, user_id)?)
    }

    /// Apply a batch of remotely created entities.
    pub fn on_create_many(
        &mut self,
        payloads: Vec<Value>,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Vec<Entity>> {
        let kind = self.kind();
        let created = payloads
            .into_iter()
            .map(|raw| Entity::from_source(kind, raw, &self.schema))
            .collect::<Result<Vec<_>>>()?;
        reject_repeated_ids(&created)?;

        if options.temporary {
            tracing::debug!(kind = %kind, count = created.len(), "temporary create, not stored");
            return Ok(created);
        }

        let ids = created.iter().map(|e| e.id().to_string()).collect();
        for entity in &created {
            self.put(entity.clone())?;
        }

        tracing::debug!(kind = %kind, count = created.len(), user_id, "applied remote create");
        self.notify_remote(ChangeAction::Created, None, ids, options, user_id);
        Ok(created)
    }

    /// Apply a remote update diff. The diff must carry the entity's `_id`.
    pub fn on_update(
        &mut self,
        payload: Value,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Entity> {
        single(self.on_update_many(vec![payload], options, user_id)?)
    }

    /// Apply a batch of remote update diffs.
    ///
    /// Several diffs for the same ID apply in order; the result holds each
    /// updated entity once, in first-mention order.
    pub fn on_update_many(
        &mut self,
        payloads: Vec<Value>,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Vec<Entity>> {
        let kind = self.kind();
        let mut staged: IndexMap<EntityId, Entity> = IndexMap::new();

        for raw in payloads {
            let (id, changes) = split_update(kind, raw)?;
            let current = match staged.get(&id) {
                Some(entity) => entity,
                None => self.entities.get_strict(&id)?,
            };
            let updated = current.updated(changes, &self.schema)?;
            staged.insert(id, updated);
        }

        if options.temporary {
            return Ok(staged.into_values().collect());
        }

        let ids = staged.keys().cloned().collect();
        let updated: Vec<Entity> = staged.into_values().collect();
        for entity in &updated {
            self.put(entity.clone())?;
        }

        tracing::debug!(kind = %kind, count = updated.len(), user_id, "applied remote update");
        self.notify_remote(ChangeAction::Updated, None, ids, options, user_id);
        Ok(updated)
    }

    /// Apply a remote deletion. Returns `None` if the entity was not held.
    pub fn on_delete(
        &mut self,
        id: &str,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Option<Entity>> {
        Ok(self
            .on_delete_many(vec![id.to_string()], options, user_id)?
            .into_iter()
            .next())
    }

    /// Apply a batch of remote deletions.
    ///
    /// IDs the collection does not hold are skipped; the result holds only
    /// the entities actually removed.
    pub fn on_delete_many(
        &mut self,
        ids: Vec<EntityId>,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Vec<Entity>> {
        let kind = self.kind();
        if options.temporary {
            return Ok(ids
                .iter()
                .filter_map(|id| self.entities.get(id).cloned())
                .collect());
        }

        let mut removed = Vec::with_capacity(ids.len());
        for id in &ids {
            match self.take(id) {
                Some(entity) => removed.push(entity),
                None => tracing::debug!(kind = %kind, id = %id, "delete for unknown entity skipped"),
            }
        }

        if !removed.is_empty() {
            let ids = removed.iter().map(|e| e.id().to_string()).collect();
            tracing::debug!(kind = %kind, count = removed.len(), user_id, "applied remote delete");
            self.notify_remote(ChangeAction::Deleted, None, ids, options, user_id);
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Embedded synchronization
    // ------------------------------------------------------------------

    /// Apply a remotely created embedded entity.
    pub fn on_create_embedded(
        &mut self,
        parent_id: &str,
        embedded_kind: EntityKind,
        payload: Value,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Entity> {
        single(self.on_create_embedded_many(
            parent_id,
            embedded_kind,
            vec![payload],
            options,
            user_id,
        )?)
    }

    /// Apply a batch of embedded entities created under `parent_id`.
    pub fn on_create_embedded_many(
        &mut self,
        parent_id: &str,
        embedded_kind: EntityKind,
        payloads: Vec<Value>,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Vec<Entity>> {
        let mut parent = self.embedded_parent(parent_id, embedded_kind)?;
        let created = payloads
            .into_iter()
            .map(|raw| Entity::from_source(embedded_kind, raw, &self.schema))
            .collect::<Result<Vec<_>>>()?;
        reject_repeated_ids(&created)?;

        if options.temporary {
            return Ok(created);
        }

        let children = embedded_map(&mut parent, embedded_kind)?;
        for entity in &created {
            children.insert(entity.clone())?;
        }
        self.put(parent)?;

        let ids = created.iter().map(|e| e.id().to_string()).collect();
        tracing::debug!(
            kind = %embedded_kind,
            parent_id,
            count = created.len(),
            user_id,
            "applied remote embedded create"
        );
        self.notify_remote_embedded(
            ChangeAction::Created,
            embedded_kind,
            parent_id,
            ids,
            options,
            user_id,
        );
        Ok(created)
    }

    /// Apply a remote update diff to an embedded entity.
    pub fn on_update_embedded(
        &mut self,
        parent_id: &str,
        embedded_kind: EntityKind,
        payload: Value,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Entity> {
        single(self.on_update_embedded_many(
            parent_id,
            embedded_kind,
            vec![payload],
            options,
            user_id,
        )?)
    }

    /// Apply a batch of update diffs to entities embedded under `parent_id`.
    pub fn on_update_embedded_many(
        &mut self,
        parent_id: &str,
        embedded_kind: EntityKind,
        payloads: Vec<Value>,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Vec<Entity>> {
        let mut parent = self.embedded_parent(parent_id, embedded_kind)?;
        let children = embedded_map(&mut parent, embedded_kind)?;

        let mut ids: Vec<EntityId> = Vec::new();
        for raw in payloads {
            let (id, changes) = split_update(embedded_kind, raw)?;
            let updated = children.get_strict(&id)?.updated(changes, &self.schema)?;
            children.insert(updated)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let updated = ids
            .iter()
            .filter_map(|id| children.get(id).cloned())
            .collect::<Vec<_>>();

        if options.temporary {
            return Ok(updated);
        }

        self.put(parent)?;
        tracing::debug!(
            kind = %embedded_kind,
            parent_id,
            count = updated.len(),
            user_id,
            "applied remote embedded update"
        );
        self.notify_remote_embedded(
            ChangeAction::Updated,
            embedded_kind,
            parent_id,
            ids,
            options,
            user_id,
        );
        Ok(updated)
    }

    /// Apply a remote deletion of an embedded entity.
    pub fn on_delete_embedded(
        &mut self,
        parent_id: &str,
        embedded_kind: EntityKind,
        id: &str,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Option<Entity>> {
        Ok(self
            .on_delete_embedded_many(
                parent_id,
                embedded_kind,
                vec![id.to_string()],
                options,
                user_id,
            )?
            .into_iter()
            .next())
    }

    /// Apply a batch of deletions of entities embedded under `parent_id`.
    ///
    /// The parent must exist; child IDs it does not hold are skipped.
    pub fn on_delete_embedded_many(
        &mut self,
        parent_id: &str,
        embedded_kind: EntityKind,
        ids: Vec<EntityId>,
        options: &RequestOptions,
        user_id: &str,
    ) -> Result<Vec<Entity>> {
        let mut parent = self.embedded_parent(parent_id, embedded_kind)?;
        let children = embedded_map(&mut parent, embedded_kind)?;

        let removed: Vec<Entity> = ids.iter().filter_map(|id| children.remove(id)).collect();
        if options.temporary || removed.is_empty() {
            return Ok(removed);
        }

        self.put(parent)?;
        let ids = removed.iter().map(|e| e.id().to_string()).collect();
        tracing::debug!(
            kind = %embedded_kind,
            parent_id,
            count = removed.len(),
            user_id,
            "applied remote embedded delete"
        );
        self.notify_remote_embedded(
            ChangeAction::Deleted,
            embedded_kind,
            parent_id,
            ids,
            options,
            user_id,
        );
        Ok(removed)
    }

    /// A working copy of the parent, committed with `put` once the whole
    /// batch has succeeded.
    fn embedded_parent(&self, parent_id: &str, embedded_kind: EntityKind) -> Result<Entity> {
        let kind = self.kind();
        if !kind.owns(embedded_kind) {
            return Err(Error::EmbeddedNotAllowed {
                parent: kind,
                embedded: embedded_kind,
            });
        }
        self.entities
            .get(parent_id)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                what: format!("parent {kind}"),
                key: parent_id.to_string(),
            })
    }

    fn notify_remote(
        &mut self,
        action: ChangeAction,
        parent_id: Option<&str>,
        ids: Vec<EntityId>,
        options: &RequestOptions,
        user_id: &str,
    ) {
        if options.render {
            self.notify(action, parent_id, ids, Some(user_id));
        }
    }

    fn notify_remote_embedded(
        &mut self,
        action: ChangeAction,
        embedded_kind: EntityKind,
        parent_id: &str,
        ids: Vec<EntityId>,
        options: &RequestOptions,
        user_id: &str,
    ) {
        if !options.render {
            return;
        }
        let event = ChangeEvent {
            action,
            kind: embedded_kind,
            parent_id: Some(parent_id.to_string()),
            ids,
            user_id: Some(user_id.to_string()),
        };
        self.observers.notify_all(&event);
    }

    // ------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------

    /// Import an entry from a named read-only source into this collection.
    ///
    /// See [`import::import_entry`]. The returned future does not borrow the
    /// collection, so other changes may apply while the import is in flight.
    pub fn import_from_source<'a, S, B>(
        &self,
        sources: &'a S,
        backend: &'a B,
        source_name: &'a str,
        entry_id: &'a str,
        override_data: Value,
        options: RequestOptions,
    ) -> impl Future<Output = Result<Entity>> + 'a
    where
        S: SourceStore,
        B: Backend,
    {
        import::import_entry(
            sources,
            backend,
            self.kind(),
            source_name,
            entry_id,
            override_data,
            options,
        )
    }
}

/// Split an update payload into its target ID and the changed fields.
fn split_update(
    kind: EntityKind,
    raw: Value,
) -> Result<(EntityId, serde_json::Map<String, Value>)> {
    let Value::Object(changes) = raw else {
        return Err(Error::InvalidPayload(format!(
            "{kind} update must be an object"
        )));
    };
    match changes.get(crate::entity::ID_KEY) {
        Some(Value::String(id)) => Ok((id.clone(), changes)),
        _ => Err(Error::MissingRequiredField(crate::entity::ID_KEY.into())),
    }
}

/// A create batch may name each ID only once.
fn reject_repeated_ids(entities: &[Entity]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entities.len());
    for entity in entities {
        if !seen.insert(entity.id()) {
            return Err(Error::InvalidPayload(format!(
                "{} id {} appears more than once in one batch",
                entity.kind(),
                entity.id()
            )));
        }
    }
    Ok(())
}

fn embedded_map(parent: &mut Entity, embedded_kind: EntityKind) -> Result<&mut EntityMap> {
    let parent_kind = parent.kind();
    parent
        .embedded_mut(embedded_kind)
        .ok_or(Error::EmbeddedNotAllowed {
            parent: parent_kind,
            embedded: embedded_kind,
        })
}

fn single(entities: Vec<Entity>) -> Result<Entity> {
    entities
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidPayload("change produced no entity".into()))
}
