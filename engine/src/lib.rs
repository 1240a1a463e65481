//! # Tabletop Engine
//!
//! Identified entity collections for a virtual tabletop, kept in step with a
//! backing store through batched create/update/delete events.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches files, sockets or timers
//! - **Single owner**: every mutation takes `&mut self`; hosts that share a
//!   world across tasks serialize access themselves
//! - **All-or-nothing batches**: a batch either applies entirely or not at all
//!
//! ## Core Concepts
//!
//! ### Entities
//!
//! An [`Entity`] has a stable `_id`, a [`EntityKind`], an optional `name`,
//! arbitrary JSON fields, and for parent kinds (scenes, actors, ...) one
//! embedded [`EntityMap`] per owned kind (tokens, walls, owned items, ...).
//!
//! ### Collections
//!
//! A [`Collection`] is an ordered map from ID to entity with lookup
//! ([`Collection::get`], [`Collection::get_by_name`], [`Collection::index_of`]),
//! array-style transforms, local mutation, and observer notification.
//!
//! ### Remote events
//!
//! The backing store reports every change as a [`RemoteEvent`]. A
//! [`World`] routes each event to the matching collection handler, which
//! builds entities from the raw payload, applies them, notifies observers
//! once, and returns the affected entities.
//!
//! ## Quick Start
//!
//! ```rust
//! use tabletop_engine::{Change, EntityKind, RemoteEvent, Schema, World};
//! use serde_json::json;
//!
//! let mut world = World::new(Schema::new())
//!     .with_collection(EntityKind::Actor, vec![json!({"_id": "a", "name": "Alpha"})])
//!     .unwrap();
//!
//! let outcome = world
//!     .dispatch(RemoteEvent::Create(Change::new(
//!         EntityKind::Actor,
//!         json!({"_id": "b", "name": "Beta"}),
//!         "gm",
//!     )))
//!     .unwrap();
//! assert_eq!(outcome.entities[0].id(), "b");
//!
//! let actors = world.collection(EntityKind::Actor).unwrap();
//! assert_eq!(actors.index_of("b"), Some(1));
//! assert_eq!(actors.get_by_name("Alpha").unwrap().id(), "a");
//! ```

pub mod collection;
pub mod entity;
pub mod error;
pub mod event;
pub mod import;
pub mod kind;
pub mod map;
pub mod merge;
pub mod observer;
pub mod schema;
pub mod world;

// Re-export main types at crate root
pub use collection::Collection;
pub use entity::Entity;
pub use error::Error;
pub use event::{Change, EmbeddedChange, RemoteEvent, RequestOptions};
pub use import::{import_entry, Backend, SourceStore};
pub use kind::EntityKind;
pub use map::EntityMap;
pub use observer::{ChangeAction, ChangeEvent, Observer, SubscriptionId};
pub use schema::{EntitySchema, FieldDef, FieldType, Schema};
pub use world::{DispatchOutcome, World};

/// Type aliases for clarity
pub type EntityId = String;
pub type UserId = String;
pub type RequestId = String;
