//! World - the owning context for every collection.
//!
//! The World holds one [`Collection`] per entity kind and routes remote
//! events to the collection they target. Code that needs a collection is
//! handed the World (or the collection) rather than reaching for a global.

use crate::{
    error::Result, event::RemoteEvent, Collection, Entity, EntityKind, Error, RequestId, Schema,
};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Result of applying one remote event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    /// Request ID carried by the event, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    /// Entities created, updated or removed by the event
    pub entities: Vec<Entity>,
}

/// All collections of a game world.
#[derive(Debug)]
pub struct World {
    /// Schema shared by every collection
    schema: Arc<Schema>,
    /// Collections by kind
    collections: IndexMap<EntityKind, Collection>,
}

impl World {
    /// Create a world with no collections.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            collections: IndexMap::new(),
        }
    }

    /// Get the schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Add (or replace) the collection for `kind`, hydrated from `data`.
    ///
    /// Embedded kinds have no collection of their own and are rejected.
    pub fn add_collection(&mut self, kind: EntityKind, data: Vec<Value>) -> Result<&mut Collection> {
        if kind.is_embedded() {
            return Err(Error::InvalidPayload(format!(
                "{kind} is embedded and cannot have a world collection"
            )));
        }
        let collection = Collection::with_schema(kind, Arc::clone(&self.schema), data)?;
        self.collections.insert(kind, collection);
        self.collection_mut(kind)
    }

    /// Builder-style method to add a collection.
    pub fn with_collection(mut self, kind: EntityKind, data: Vec<Value>) -> Result<Self> {
        self.add_collection(kind, data)?;
        Ok(self)
    }

    /// Get a collection by kind.
    pub fn collection(&self, kind: EntityKind) -> Result<&Collection> {
        self.collections
            .get(&kind)
            .ok_or(Error::CollectionNotFound(kind))
    }

    /// Get a mutable collection by kind.
    pub fn collection_mut(&mut self, kind: EntityKind) -> Result<&mut Collection> {
        self.collections
            .get_mut(&kind)
            .ok_or(Error::CollectionNotFound(kind))
    }

    /// Kinds that have a collection, in the order they were added.
    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.collections.keys().copied()
    }

    /// Get an entity by kind and ID.
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<&Entity> {
        self.collections.get(&kind).and_then(|c| c.get(id))
    }

    /// Apply a remote event to the collection it targets.
    ///
    /// Events are applied in the order this is called; nothing is queued,
    /// reordered or coalesced.
    pub fn dispatch(&mut self, event: RemoteEvent) -> Result<DispatchOutcome> {
        let name = event.name();
        let request_id = event.request_id().map(str::to_string);
        let collection = self.collection_mut(event.kind())?;

        let entities = match event {
            RemoteEvent::Create(c) => vec![collection.on_create(c.payload, &c.options, &c.user_id)?],
            RemoteEvent::CreateMany(c) => {
                collection.on_create_many(c.payload, &c.options, &c.user_id)?
            }
            RemoteEvent::Update(c) => vec![collection.on_update(c.payload, &c.options, &c.user_id)?],
            RemoteEvent::UpdateMany(c) => {
                collection.on_update_many(c.payload, &c.options, &c.user_id)?
            }
            RemoteEvent::Delete(c) => collection
                .on_delete(&c.payload, &c.options, &c.user_id)?
                .into_iter()
                .collect(),
            RemoteEvent::DeleteMany(c) => {
                collection.on_delete_many(c.payload, &c.options, &c.user_id)?
            }
            RemoteEvent::CreateEmbedded(c) => vec![collection.on_create_embedded(
                &c.parent_id,
                c.embedded_kind,
                c.payload,
                &c.options,
                &c.user_id,
            )?],
            RemoteEvent::CreateEmbeddedMany(c) => collection.on_create_embedded_many(
                &c.parent_id,
                c.embedded_kind,
                c.payload,
                &c.options,
                &c.user_id,
            )?,
            RemoteEvent::UpdateEmbedded(c) => vec![collection.on_update_embedded(
                &c.parent_id,
                c.embedded_kind,
                c.payload,
                &c.options,
                &c.user_id,
            )?],
            RemoteEvent::UpdateEmbeddedMany(c) => collection.on_update_embedded_many(
                &c.parent_id,
                c.embedded_kind,
                c.payload,
                &c.options,
                &c.user_id,
            )?,
            RemoteEvent::DeleteEmbedded(c) => collection
                .on_delete_embedded(
                    &c.parent_id,
                    c.embedded_kind,
                    &c.payload,
                    &c.options,
                    &c.user_id,
                )?
                .into_iter()
                .collect(),
            RemoteEvent::DeleteEmbeddedMany(c) => collection.on_delete_embedded_many(
                &c.parent_id,
                c.embedded_kind,
                c.payload,
                &c.options,
                &c.user_id,
            )?,
        };

        tracing::debug!(event = name, count = entities.len(), "dispatched remote event");

        Ok(DispatchOutcome {
            request_id,
            entities,
        })
    }
}
