//! Host message protocol definitions.
//!
//! One JSON object per line in each direction; field names are snake_case
//! and embedded engine events keep their own camelCase wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabletop_engine::{Entity, EntityKind, RemoteEvent, RequestOptions};

/// Requests read from stdin.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostRequest {
    /// Apply a remote event reported by the backing store.
    Event {
        /// The event to apply
        event: RemoteEvent,
    },

    /// Import a compendium entry as a new entity.
    Import {
        /// Kind of the entity to create
        kind: EntityKind,
        /// Pack to read the entry from
        pack: String,
        /// Entry ID within the pack
        entry_id: String,
        /// Fields merged over the entry before creation
        #[serde(default)]
        data: Value,
        /// Options forwarded with the create request
        #[serde(default)]
        options: RequestOptions,
        /// Request ID for correlating responses
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Fetch one entity.
    Get {
        kind: EntityKind,
        id: String,
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Fetch every entity of a kind, in collection order.
    List {
        kind: EntityKind,
        #[serde(default)]
        request_id: Option<String>,
    },

    /// Keep-alive ping.
    Ping,
}

impl HostRequest {
    /// Request ID carried by the request, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            HostRequest::Event { event } => event.request_id(),
            HostRequest::Import { request_id, .. }
            | HostRequest::Get { request_id, .. }
            | HostRequest::List { request_id, .. } => request_id.as_deref(),
            HostRequest::Ping => None,
        }
    }
}

/// Responses written to stdout.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostResponse {
    /// An event or import was applied.
    Applied {
        /// Entities affected, in payload order
        entities: Vec<Entity>,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to a get request.
    Entity {
        entity: Entity,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to a list request.
    Entities {
        kind: EntityKind,
        entities: Vec<Entity>,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },

    /// Response to ping.
    Pong,

    /// Error message.
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
}

impl HostResponse {
    /// Create an error message.
    pub fn error(message: impl Into<String>, request_id: Option<String>) -> Self {
        HostResponse::Error {
            message: message.into(),
            request_id,
        }
    }
}
