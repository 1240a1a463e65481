//! Change notification for collection subscribers.
//!
//! A collection holds a set of [`Observer`]s and calls each of them once per
//! change it applies. A batch of N entities is one [`ChangeEvent`], not N.

use crate::{EntityId, EntityKind, UserId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to the entities named in a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    /// Observers were asked to redraw without a specific change
    Refreshed,
}

/// A change applied to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// What happened
    pub action: ChangeAction,
    /// Kind of the changed entities (the embedded kind for embedded changes)
    pub kind: EntityKind,
    /// Parent entity for embedded changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    /// Affected entity IDs, in application order
    pub ids: Vec<EntityId>,
    /// User who triggered a remote change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// A subscriber notified on every collection change.
pub trait Observer: Send {
    fn notify(&mut self, event: &ChangeEvent);
}

impl<F> Observer for F
where
    F: FnMut(&ChangeEvent) + Send,
{
    fn notify(&mut self, event: &ChangeEvent) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Registered observers, notified in subscription order.
#[derive(Default)]
pub struct Observers {
    next_id: u64,
    entries: IndexMap<SubscriptionId, Box<dyn Observer>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, observer: impl Observer + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Box::new(observer));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.entries.shift_remove(&id).is_some()
    }

    pub fn notify_all(&mut self, event: &ChangeEvent) {
        for observer in self.entries.values_mut() {
            observer.notify(event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.entries.len())
            .finish()
    }
}
