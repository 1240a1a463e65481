//! Loopback backend: the host acts as its own backing store.
//!
//! A create request is confirmed immediately by assigning fresh IDs and
//! feeding the data back through the world task as a `createMany` event,
//! the same path a store echo would take.

use serde_json::Value;
use tabletop_engine::{
    error::Result, Backend, Change, Entity, EntityKind, RemoteEvent, RequestOptions,
};

use crate::actor::WorldHandle;

/// [`Backend`] that echoes creates into a local world.
#[derive(Debug, Clone)]
pub struct LoopbackBackend {
    world: WorldHandle,
    user_id: String,
}

impl LoopbackBackend {
    pub fn new(world: WorldHandle, user_id: impl Into<String>) -> Self {
        Self {
            world,
            user_id: user_id.into(),
        }
    }
}

impl Backend for LoopbackBackend {
    async fn request_create(
        &self,
        kind: EntityKind,
        data: Vec<Value>,
        options: RequestOptions,
    ) -> Result<Vec<Entity>> {
        let payload = data
            .into_iter()
            .map(|mut raw| {
                if let Value::Object(fields) = &mut raw {
                    fields.insert("_id".to_string(), Value::String(new_id()));
                }
                raw
            })
            .collect();

        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(kind = %kind, request_id = %request_id, "create requested");

        let event = RemoteEvent::CreateMany(
            Change::new(kind, payload, self.user_id.clone())
                .with_options(options)
                .with_request_id(request_id),
        );
        self.world
            .dispatch(event)
            .await
            .map(|outcome| outcome.entities)
            .map_err(|e| e.into_engine())
    }
}

/// A 16 character entity ID.
fn new_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabletop_engine::{Error, Schema, World};

    fn spawn_items() -> WorldHandle {
        let world = World::new(Schema::new())
            .with_collection(EntityKind::Item, vec![])
            .unwrap();
        WorldHandle::spawn(world).0
    }

    #[tokio::test]
    async fn create_assigns_fresh_ids() {
        let world = spawn_items();
        let backend = LoopbackBackend::new(world.clone(), "host");

        let created = backend
            .request_create(
                EntityKind::Item,
                vec![
                    json!({"_id": "ignored", "name": "Rope"}),
                    json!({"name": "Torch"}),
                ],
                RequestOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_ne!(created[0].id(), "ignored");
        assert_eq!(created[0].id().len(), 16);
        assert_ne!(created[0].id(), created[1].id());

        let stored = world.list(EntityKind::Item).await.unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn temporary_create_is_not_stored() {
        let world = spawn_items();
        let backend = LoopbackBackend::new(world.clone(), "host");

        let created = backend
            .request_create(
                EntityKind::Item,
                vec![json!({"name": "Phantom"})],
                RequestOptions::temporary(),
            )
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert!(world.list(EntityKind::Item).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_collection_is_an_engine_error() {
        let backend = LoopbackBackend::new(spawn_items(), "host");
        let err = backend
            .request_create(EntityKind::Scene, vec![json!({"name": "Cave"})], RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, Error::CollectionNotFound(EntityKind::Scene));
    }
}
