//! Error types for the tabletop engine.

use crate::EntityKind;
use thiserror::Error;

/// All possible errors from the tabletop engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    /// A strict lookup missed, an embedded operation named a missing parent,
    /// or an import named a missing source entry.
    #[error("{what} not found: {key}")]
    NotFound { what: String, key: String },

    #[error("collection not found: {0}")]
    CollectionNotFound(EntityKind),

    // Construction errors
    #[error("type conflict: expected {expected} entity, got {found}")]
    TypeConflict {
        expected: EntityKind,
        found: EntityKind,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing required field: {0}")]
    MissingRequiredField(String),

    #[error("type mismatch for field '{field}': expected {expected}, got {got}")]
    TypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    #[error("{parent} entities cannot embed {embedded}")]
    EmbeddedNotAllowed {
        parent: EntityKind,
        embedded: EntityKind,
    },

    // Remote errors
    #[error("request failed: {0}")]
    Request(String),
}

impl Error {
    /// Missing entity of `kind` identified by `key`.
    pub(crate) fn entity_not_found(kind: EntityKind, key: impl Into<String>) -> Self {
        Error::NotFound {
            what: kind.to_string(),
            key: key.into(),
        }
    }

    /// Whether this is any flavour of [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::entity_not_found(EntityKind::Actor, "abc");
        assert_eq!(err.to_string(), "Actor not found: abc");
        assert!(err.is_not_found());

        let err = Error::TypeConflict {
            expected: EntityKind::Actor,
            found: EntityKind::Item,
        };
        assert_eq!(
            err.to_string(),
            "type conflict: expected Actor entity, got Item"
        );
        assert!(!err.is_not_found());

        let err = Error::EmbeddedNotAllowed {
            parent: EntityKind::Item,
            embedded: EntityKind::Token,
        };
        assert_eq!(err.to_string(), "Item entities cannot embed Token");
    }
}
