//! Request handling for one stdin/stdout session.

use std::sync::Arc;

use tabletop_engine::import_entry;
use tokio::sync::mpsc;

use crate::actor::WorldHandle;
use crate::backend::LoopbackBackend;
use crate::error::Result;
use crate::packs::PackStore;
use crate::protocol::{HostRequest, HostResponse};

/// Sender for outgoing responses.
pub type ResponseSender = mpsc::UnboundedSender<HostResponse>;

/// Routes requests to the world task and writes their responses.
#[derive(Debug, Clone)]
pub struct Session {
    world: WorldHandle,
    packs: Arc<PackStore>,
    backend: LoopbackBackend,
    responses: ResponseSender,
}

impl Session {
    pub fn new(
        world: WorldHandle,
        packs: Arc<PackStore>,
        user_id: &str,
        responses: ResponseSender,
    ) -> Self {
        let backend = LoopbackBackend::new(world.clone(), user_id);
        Self {
            world,
            packs,
            backend,
            responses,
        }
    }

    /// Parse and handle one input line. Blank lines are ignored.
    pub async fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<HostRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "malformed request");
                self.send(HostResponse::error(format!("malformed request: {e}"), None));
            }
        }
    }

    /// Handle one request.
    ///
    /// Imports run on their own task so later requests are not held up
    /// while a pack is read; everything else completes before this returns.
    pub async fn handle(&self, request: HostRequest) {
        if matches!(request, HostRequest::Import { .. }) {
            let session = self.clone();
            tokio::spawn(async move { session.reply(request).await });
        } else {
            self.reply(request).await;
        }
    }

    async fn reply(&self, request: HostRequest) {
        let request_id = request.request_id().map(str::to_string);
        let response = match self.respond(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(request_id = ?request_id, error = %e, "request failed");
                HostResponse::error(e.to_string(), request_id)
            }
        };
        self.send(response);
    }

    async fn respond(&self, request: HostRequest) -> Result<HostResponse> {
        Ok(match request {
            HostRequest::Event { event } => {
                let outcome = self.world.dispatch(event).await?;
                HostResponse::Applied {
                    entities: outcome.entities,
                    request_id: outcome.request_id,
                }
            }
            HostRequest::Import {
                kind,
                pack,
                entry_id,
                data,
                options,
                request_id,
            } => {
                let entity = import_entry(
                    self.packs.as_ref(),
                    &self.backend,
                    kind,
                    &pack,
                    &entry_id,
                    data,
                    options,
                )
                .await?;
                HostResponse::Applied {
                    entities: vec![entity],
                    request_id,
                }
            }
            HostRequest::Get {
                kind,
                id,
                request_id,
            } => HostResponse::Entity {
                entity: self.world.get(kind, id).await?,
                request_id,
            },
            HostRequest::List { kind, request_id } => HostResponse::Entities {
                kind,
                entities: self.world.list(kind).await?,
                request_id,
            },
            HostRequest::Ping => HostResponse::Pong,
        })
    }

    fn send(&self, response: HostResponse) {
        if self.responses.send(response).is_err() {
            tracing::warn!("response writer has stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use tabletop_engine::{EntityKind, Schema, World};

    fn session_with_packs(dir: Option<PathBuf>) -> (Session, mpsc::UnboundedReceiver<HostResponse>) {
        let world = World::new(Schema::new())
            .with_collection(
                EntityKind::Actor,
                vec![json!({"_id": "a", "name": "Alpha"})],
            )
            .unwrap()
            .with_collection(EntityKind::Item, vec![])
            .unwrap();
        let (handle, _task) = WorldHandle::spawn(world);
        let (sender, receiver) = mpsc::unbounded_channel();
        let session = Session::new(handle, Arc::new(PackStore::new(dir)), "host", sender);
        (session, receiver)
    }

    fn session() -> (Session, mpsc::UnboundedReceiver<HostResponse>) {
        session_with_packs(None)
    }

    fn to_json(response: HostResponse) -> Value {
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn ping_pong() {
        let (session, mut responses) = session();
        session.handle_line(r#"{"type": "ping"}"#).await;
        assert!(matches!(responses.recv().await, Some(HostResponse::Pong)));
    }

    #[tokio::test]
    async fn blank_lines_are_ignored() {
        let (session, mut responses) = session();
        session.handle_line("   ").await;
        session.handle_line(r#"{"type": "ping"}"#).await;
        assert!(matches!(responses.recv().await, Some(HostResponse::Pong)));
    }

    #[tokio::test]
    async fn malformed_line_reports_error() {
        let (session, mut responses) = session();
        session.handle_line("{not json").await;
        let response = to_json(responses.recv().await.unwrap());
        assert_eq!(response["type"], "error");
        assert!(response["message"]
            .as_str()
            .unwrap()
            .starts_with("malformed request"));
    }

    #[tokio::test]
    async fn event_then_get() {
        let (session, mut responses) = session();

        session
            .handle_line(
                r#"{"type": "event", "event": {"event": "create", "kind": "Actor",
                    "payload": {"_id": "b", "name": "Beta"}, "userId": "gm", "requestId": "r1"}}"#,
            )
            .await;
        let applied = to_json(responses.recv().await.unwrap());
        assert_eq!(applied["type"], "applied");
        assert_eq!(applied["request_id"], "r1");
        assert_eq!(applied["entities"][0]["_id"], "b");

        session
            .handle_line(r#"{"type": "get", "kind": "Actor", "id": "b", "request_id": "r2"}"#)
            .await;
        let entity = to_json(responses.recv().await.unwrap());
        assert_eq!(entity["type"], "entity");
        assert_eq!(entity["entity"]["name"], "Beta");
        assert_eq!(entity["request_id"], "r2");
    }

    #[tokio::test]
    async fn list_preserves_order() {
        let (session, mut responses) = session();
        session
            .handle_line(
                r#"{"type": "event", "event": {"event": "createMany", "kind": "Actor",
                    "payload": [{"_id": "c", "name": "C"}, {"_id": "b", "name": "B"}], "userId": "gm"}}"#,
            )
            .await;
        responses.recv().await.unwrap();

        session.handle_line(r#"{"type": "list", "kind": "Actor"}"#).await;
        let list = to_json(responses.recv().await.unwrap());
        let ids: Vec<&str> = list["entities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn rejected_event_reports_error_with_request_id() {
        let (session, mut responses) = session();
        session
            .handle_line(
                r#"{"type": "event", "event": {"event": "update", "kind": "Actor",
                    "payload": {"_id": "ghost", "name": "Boo"}, "userId": "gm", "requestId": "r3"}}"#,
            )
            .await;
        let response = to_json(responses.recv().await.unwrap());
        assert_eq!(response["type"], "error");
        assert_eq!(response["request_id"], "r3");
    }

    #[tokio::test]
    async fn import_creates_through_the_world() {
        let dir = std::env::temp_dir().join(format!("tabletop-session-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("srd.items.json"),
            json!([{"_id": "rope", "name": "Rope", "weight": 10}]).to_string(),
        )
        .unwrap();
        let (session, mut responses) = session_with_packs(Some(dir));

        session
            .handle_line(
                r#"{"type": "import", "kind": "Item", "pack": "srd.items", "entry_id": "rope",
                    "data": {"name": "Silk Rope"}, "request_id": "imp"}"#,
            )
            .await;
        let applied = to_json(responses.recv().await.unwrap());
        assert_eq!(applied["type"], "applied");
        assert_eq!(applied["request_id"], "imp");
        assert_eq!(applied["entities"][0]["name"], "Silk Rope");
        assert_eq!(applied["entities"][0]["weight"], 10);
        assert_ne!(applied["entities"][0]["_id"], "rope");

        session.handle_line(r#"{"type": "list", "kind": "Item"}"#).await;
        let list = to_json(responses.recv().await.unwrap());
        assert_eq!(list["entities"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn import_of_missing_entry_reports_error() {
        let (session, mut responses) = session();
        session
            .handle_line(
                r#"{"type": "import", "kind": "Item", "pack": "srd.items", "entry_id": "rope"}"#,
            )
            .await;
        let response = to_json(responses.recv().await.unwrap());
        assert_eq!(response["type"], "error");
        assert_eq!(response["message"], "pack not found: srd.items");
    }
}
