//! Entity kinds and the parent/embedded relations between them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of entity kinds a collection can hold.
///
/// Top-level kinds live in a world collection; embedded kinds only ever
/// exist inside the embedded map of a parent entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    // Top-level
    Actor,
    Item,
    Scene,
    JournalEntry,
    Macro,
    Playlist,
    RollTable,
    User,
    Combat,
    ChatMessage,
    Folder,

    // Embedded
    OwnedItem,
    ActiveEffect,
    Token,
    Tile,
    Drawing,
    Wall,
    AmbientLight,
    AmbientSound,
    Note,
    MeasuredTemplate,
    Combatant,
    TableResult,
    PlaylistSound,
}

impl EntityKind {
    /// Every kind, top-level first.
    pub const ALL: [EntityKind; 24] = [
        EntityKind::Actor,
        EntityKind::Item,
        EntityKind::Scene,
        EntityKind::JournalEntry,
        EntityKind::Macro,
        EntityKind::Playlist,
        EntityKind::RollTable,
        EntityKind::User,
        EntityKind::Combat,
        EntityKind::ChatMessage,
        EntityKind::Folder,
        EntityKind::OwnedItem,
        EntityKind::ActiveEffect,
        EntityKind::Token,
        EntityKind::Tile,
        EntityKind::Drawing,
        EntityKind::Wall,
        EntityKind::AmbientLight,
        EntityKind::AmbientSound,
        EntityKind::Note,
        EntityKind::MeasuredTemplate,
        EntityKind::Combatant,
        EntityKind::TableResult,
        EntityKind::PlaylistSound,
    ];

    /// Embedded kinds an entity of this kind owns, in raw-data order.
    pub fn embedded_kinds(self) -> &'static [EntityKind] {
        use EntityKind::*;
        match self {
            Actor => &[OwnedItem, ActiveEffect],
            Item => &[ActiveEffect],
            Scene => &[
                Token,
                Tile,
                Drawing,
                Wall,
                AmbientLight,
                AmbientSound,
                Note,
                MeasuredTemplate,
            ],
            Combat => &[Combatant],
            RollTable => &[TableResult],
            Playlist => &[PlaylistSound],
            _ => &[],
        }
    }

    /// Whether `embedded` may live inside an entity of this kind.
    pub fn owns(self, embedded: EntityKind) -> bool {
        self.embedded_kinds().contains(&embedded)
    }

    /// Whether this kind only exists nested inside a parent.
    pub fn is_embedded(self) -> bool {
        self.field_name().is_some()
    }

    /// The key under which a parent's raw data stores entities of this kind.
    pub fn field_name(self) -> Option<&'static str> {
        use EntityKind::*;
        let name = match self {
            OwnedItem => "items",
            ActiveEffect => "effects",
            Token => "tokens",
            Tile => "tiles",
            Drawing => "drawings",
            Wall => "walls",
            AmbientLight => "lights",
            AmbientSound | PlaylistSound => "sounds",
            Note => "notes",
            MeasuredTemplate => "templates",
            Combatant => "combatants",
            TableResult => "results",
            _ => return None,
        };
        Some(name)
    }

    /// Whether raw data for this kind must carry a `name`.
    pub fn requires_name(self) -> bool {
        use EntityKind::*;
        matches!(
            self,
            Actor
                | Item
                | Scene
                | JournalEntry
                | Macro
                | Playlist
                | RollTable
                | User
                | Folder
                | OwnedItem
                | PlaylistSound
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
