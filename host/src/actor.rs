//! The world task.
//!
//! A single tokio task owns the [`World`] and applies commands in the order
//! they arrive on its channel. Every other task talks to it through a
//! cloneable [`WorldHandle`], which sends a command and awaits the reply.

use tabletop_engine::{ChangeEvent, DispatchOutcome, Entity, EntityKind, RemoteEvent, World};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::{HostError, Result};

type Reply<T> = oneshot::Sender<tabletop_engine::error::Result<T>>;

/// Commands understood by the world task.
#[derive(Debug)]
enum Command {
    Dispatch {
        event: RemoteEvent,
        reply: Reply<DispatchOutcome>,
    },
    Get {
        kind: EntityKind,
        id: String,
        reply: Reply<Entity>,
    },
    List {
        kind: EntityKind,
        reply: Reply<Vec<Entity>>,
    },
}

/// Handle to a running world task.
#[derive(Debug, Clone)]
pub struct WorldHandle {
    sender: mpsc::UnboundedSender<Command>,
}

impl WorldHandle {
    /// Move `world` into a new task and return a handle to it.
    ///
    /// The task ends, yielding the world back, once every handle is dropped.
    pub fn spawn(mut world: World) -> (Self, JoinHandle<World>) {
        log_changes(&mut world);
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(world, receiver));
        (Self { sender }, task)
    }

    /// Apply a remote event.
    pub async fn dispatch(&self, event: RemoteEvent) -> Result<DispatchOutcome> {
        self.request(|reply| Command::Dispatch { event, reply }).await
    }

    /// Fetch a copy of one entity.
    pub async fn get(&self, kind: EntityKind, id: impl Into<String>) -> Result<Entity> {
        let id = id.into();
        self.request(|reply| Command::Get { kind, id, reply }).await
    }

    /// Fetch a copy of every entity of `kind`, in collection order.
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        self.request(|reply| Command::List { kind, reply }).await
    }

    async fn request<T>(&self, command: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(command(reply))
            .map_err(|_| HostError::WorldClosed)?;
        Ok(response.await.map_err(|_| HostError::WorldClosed)??)
    }
}

async fn run(mut world: World, mut receiver: mpsc::UnboundedReceiver<Command>) -> World {
    tracing::debug!("world task started");

    while let Some(command) = receiver.recv().await {
        match command {
            Command::Dispatch { event, reply } => {
                let name = event.name();
                let result = world.dispatch(event);
                if let Err(e) = &result {
                    tracing::warn!(event = name, error = %e, "remote event rejected");
                }
                let _ = reply.send(result);
            }
            Command::Get { kind, id, reply } => {
                let result = world
                    .collection(kind)
                    .and_then(|c| c.get_strict(&id).cloned());
                let _ = reply.send(result);
            }
            Command::List { kind, reply } => {
                let result = world
                    .collection(kind)
                    .map(|c| c.iter().cloned().collect());
                let _ = reply.send(result);
            }
        }
    }

    tracing::debug!("world task stopped");
    world
}

/// Subscribe a tracing observer to every collection.
fn log_changes(world: &mut World) {
    let kinds: Vec<EntityKind> = world.kinds().collect();
    for kind in kinds {
        if let Ok(collection) = world.collection_mut(kind) {
            collection.subscribe(|event: &ChangeEvent| {
                tracing::debug!(
                    action = ?event.action,
                    kind = %event.kind,
                    parent = ?event.parent_id,
                    count = event.ids.len(),
                    user = ?event.user_id,
                    "collection changed"
                );
            });
        }
    }
}
