//! Remote change events.
//!
//! The backing store reports every persisted change, including the echo of
//! this client's own requests, as one of the named events below. Payloads
//! arrive already deserialized; the transport is someone else's problem.

use crate::{EntityId, EntityKind, RequestId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_render() -> bool {
    true
}

/// Options describing the nature of a change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    /// Construct entities without adding them to the collection
    #[serde(default)]
    pub temporary: bool,
    /// Notify observers once the change is applied
    #[serde(default = "default_render")]
    pub render: bool,
    /// Any other options, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            temporary: false,
            render: true,
            extra: Map::new(),
        }
    }
}

impl RequestOptions {
    /// Options for a temporary (never persisted) change.
    pub fn temporary() -> Self {
        Self {
            temporary: true,
            ..Self::default()
        }
    }

    /// Builder-style setter for `render`.
    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }
}

/// A change to top-level entities of one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change<P> {
    /// Collection the change targets
    pub kind: EntityKind,
    /// Raw data, update diffs, or IDs depending on the event
    pub payload: P,
    #[serde(default)]
    pub options: RequestOptions,
    /// User who triggered the change
    pub user_id: UserId,
    /// Correlates the echo with the request that caused it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

impl<P> Change<P> {
    pub fn new(kind: EntityKind, payload: P, user_id: impl Into<UserId>) -> Self {
        Self {
            kind,
            payload,
            options: RequestOptions::default(),
            user_id: user_id.into(),
            request_id: None,
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<RequestId>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// A change to entities embedded in one parent entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedChange<P> {
    /// Collection holding the parent
    pub kind: EntityKind,
    /// Parent entity ID
    pub parent_id: EntityId,
    /// Kind of the embedded entities
    pub embedded_kind: EntityKind,
    pub payload: P,
    #[serde(default)]
    pub options: RequestOptions,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
}

impl<P> EmbeddedChange<P> {
    pub fn new(
        kind: EntityKind,
        parent_id: impl Into<EntityId>,
        embedded_kind: EntityKind,
        payload: P,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            kind,
            parent_id: parent_id.into(),
            embedded_kind,
            payload,
            options: RequestOptions::default(),
            user_id: user_id.into(),
            request_id: None,
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<RequestId>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Every named remote event a collection handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RemoteEvent {
    Create(Change<Value>),
    CreateMany(Change<Vec<Value>>),
    Update(Change<Value>),
    UpdateMany(Change<Vec<Value>>),
    Delete(Change<EntityId>),
    DeleteMany(Change<Vec<EntityId>>),
    CreateEmbedded(EmbeddedChange<Value>),
    CreateEmbeddedMany(EmbeddedChange<Vec<Value>>),
    UpdateEmbedded(EmbeddedChange<Value>),
    UpdateEmbeddedMany(EmbeddedChange<Vec<Value>>),
    DeleteEmbedded(EmbeddedChange<EntityId>),
    DeleteEmbeddedMany(EmbeddedChange<Vec<EntityId>>),
}

impl RemoteEvent {
    /// The event's wire name.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteEvent::Create(_) => "create",
            RemoteEvent::CreateMany(_) => "createMany",
            RemoteEvent::Update(_) => "update",
            RemoteEvent::UpdateMany(_) => "updateMany",
            RemoteEvent::Delete(_) => "delete",
            RemoteEvent::DeleteMany(_) => "deleteMany",
            RemoteEvent::CreateEmbedded(_) => "createEmbedded",
            RemoteEvent::CreateEmbeddedMany(_) => "createEmbeddedMany",
            RemoteEvent::UpdateEmbedded(_) => "updateEmbedded",
            RemoteEvent::UpdateEmbeddedMany(_) => "updateEmbeddedMany",
            RemoteEvent::DeleteEmbedded(_) => "deleteEmbedded",
            RemoteEvent::DeleteEmbeddedMany(_) => "deleteEmbeddedMany",
        }
    }

    /// The collection the event targets.
    pub fn kind(&self) -> EntityKind {
        match self {
            RemoteEvent::Create(c) | RemoteEvent::Update(c) => c.kind,
            RemoteEvent::CreateMany(c) | RemoteEvent::UpdateMany(c) => c.kind,
            RemoteEvent::Delete(c) => c.kind,
            RemoteEvent::DeleteMany(c) => c.kind,
            RemoteEvent::CreateEmbedded(c) | RemoteEvent::UpdateEmbedded(c) => c.kind,
            RemoteEvent::CreateEmbeddedMany(c) | RemoteEvent::UpdateEmbeddedMany(c) => c.kind,
            RemoteEvent::DeleteEmbedded(c) => c.kind,
            RemoteEvent::DeleteEmbeddedMany(c) => c.kind,
        }
    }

    /// The user who triggered the change.
    pub fn user_id(&self) -> &str {
        match self {
            RemoteEvent::Create(c) | RemoteEvent::Update(c) => &c.user_id,
            RemoteEvent::CreateMany(c) | RemoteEvent::UpdateMany(c) => &c.user_id,
            RemoteEvent::Delete(c) => &c.user_id,
            RemoteEvent::DeleteMany(c) => &c.user_id,
            RemoteEvent::CreateEmbedded(c) | RemoteEvent::UpdateEmbedded(c) => &c.user_id,
            RemoteEvent::CreateEmbeddedMany(c) | RemoteEvent::UpdateEmbeddedMany(c) => &c.user_id,
            RemoteEvent::DeleteEmbedded(c) => &c.user_id,
            RemoteEvent::DeleteEmbeddedMany(c) => &c.user_id,
        }
    }

    /// The request ID, if the event echoes a tracked request.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            RemoteEvent::Create(c) | RemoteEvent::Update(c) => c.request_id.as_deref(),
            RemoteEvent::CreateMany(c) | RemoteEvent::UpdateMany(c) => c.request_id.as_deref(),
            RemoteEvent::Delete(c) => c.request_id.as_deref(),
            RemoteEvent::DeleteMany(c) => c.request_id.as_deref(),
            RemoteEvent::CreateEmbedded(c) | RemoteEvent::UpdateEmbedded(c) => {
                c.request_id.as_deref()
            }
            RemoteEvent::CreateEmbeddedMany(c) | RemoteEvent::UpdateEmbeddedMany(c) => {
                c.request_id.as_deref()
            }
            RemoteEvent::DeleteEmbedded(c) => c.request_id.as_deref(),
            RemoteEvent::DeleteEmbeddedMany(c) => c.request_id.as_deref(),
        }
    }
}
