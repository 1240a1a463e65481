//! Hydrating a world from a JSON file.
//!
//! The file is an object keyed by entity kind, each value the raw array of
//! that kind's entities:
//!
//! ```json
//! {"Actor": [{"_id": "a", "name": "Alpha"}], "Scene": []}
//! ```
//!
//! Every top-level kind gets a collection; kinds missing from the file start
//! empty.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tabletop_engine::{EntityKind, Schema, World};

use crate::error::{HostError, Result};

/// Read and parse a world file.
pub async fn load_world_file(path: &Path) -> Result<World> {
    let text = tokio::fs::read_to_string(path).await?;
    let world = parse_world(&text)?;
    tracing::info!(
        path = %path.display(),
        collections = world.kinds().count(),
        "world loaded"
    );
    Ok(world)
}

/// Build a world from world-file text.
pub fn parse_world(text: &str) -> Result<World> {
    let mut data: BTreeMap<EntityKind, Vec<Value>> = serde_json::from_str(text)?;
    if let Some(kind) = data.keys().find(|kind| kind.is_embedded()) {
        return Err(HostError::InvalidWorld(format!(
            "{kind} is embedded and must be nested under its parent"
        )));
    }
    build_world(|kind| data.remove(&kind).unwrap_or_default())
}

/// A world with an empty collection for every top-level kind.
pub fn empty_world() -> Result<World> {
    build_world(|_| Vec::new())
}

fn build_world(mut data: impl FnMut(EntityKind) -> Vec<Value>) -> Result<World> {
    let mut world = World::new(Schema::new());
    for kind in EntityKind::ALL.into_iter().filter(|k| !k.is_embedded()) {
        world.add_collection(kind, data(kind))?;
    }
    Ok(world)
}
