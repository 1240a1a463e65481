//! Importing entries from named read-only sources.
//!
//! An import reads one entry from a source (a compendium pack, say),
//! patches it, and asks the backing store to create it. The created entity
//! reaches the collection the same way every other create does: through the
//! remote create handler, once the store echoes the change back.

use crate::{
    error::Result, event::RequestOptions, merge::merge_object, schema::json_type_name, Entity,
    EntityKind, Error,
};
use serde_json::Value;
use std::future::Future;

/// Read-only keyed store of entries grouped by source name.
pub trait SourceStore {
    /// Fetch raw entry data, `None` if the source has no such entry.
    fn fetch_entry(
        &self,
        source_name: &str,
        entry_id: &str,
    ) -> impl Future<Output = Result<Option<Value>>> + Send;
}

/// The backing store create requests are issued against.
pub trait Backend {
    /// Request creation of `data` and resolve to the created entities once
    /// the store confirms them.
    fn request_create(
        &self,
        kind: EntityKind,
        data: Vec<Value>,
        options: RequestOptions,
    ) -> impl Future<Output = Result<Vec<Entity>>> + Send;
}

/// Import `entry_id` from `source_name` as a new entity of `kind`.
///
/// The entry's own `_id` is dropped so the store assigns a fresh one, and
/// `override_data` (an object, or null for none) is merged on top.
pub async fn import_entry<S, B>(
    sources: &S,
    backend: &B,
    kind: EntityKind,
    source_name: &str,
    entry_id: &str,
    override_data: Value,
    options: RequestOptions,
) -> Result<Entity>
where
    S: SourceStore,
    B: Backend,
{
    let entry = sources
        .fetch_entry(source_name, entry_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            what: format!("{source_name} entry"),
            key: entry_id.to_string(),
        })?;

    let Value::Object(mut data) = entry else {
        return Err(Error::InvalidPayload(format!(
            "{source_name} entry {entry_id} is not an object"
        )));
    };
    data.remove(crate::entity::ID_KEY);

    match override_data {
        Value::Object(patch) => merge_object(&mut data, patch),
        Value::Null => {}
        other => {
            return Err(Error::InvalidPayload(format!(
                "import override must be an object, got {}",
                json_type_name(&other)
            )))
        }
    }

    tracing::debug!(kind = %kind, source_name, entry_id, "importing entry");

    backend
        .request_create(kind, vec![Value::Object(data)], options)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Request(format!("create for {source_name} entry {entry_id} returned nothing")))
}
