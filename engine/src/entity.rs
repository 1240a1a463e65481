//! Entities: identified records held by collections.

use crate::{
    error::Result, map::EntityMap, merge::merge_object, schema::json_type_name, EntityId,
    EntityKind, Error, Schema,
};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Raw key holding an entity's identifier.
pub const ID_KEY: &str = "_id";

/// Raw key holding an entity's display name.
pub const NAME_KEY: &str = "name";

/// A uniquely identified domain record.
///
/// Identity (`id`, `kind`) is fixed at construction. Everything else is
/// replaced through [`Entity::updated`], which re-validates the result.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    kind: EntityKind,
    name: Option<String>,
    fields: Map<String, Value>,
    embedded: IndexMap<EntityKind, EntityMap>,
}

impl Entity {
    /// Create an entity with no fields and empty embedded collections.
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            fields: Map::new(),
            embedded: kind
                .embedded_kinds()
                .iter()
                .map(|&embedded| (embedded, EntityMap::new(embedded)))
                .collect(),
        }
    }

    /// Builder-style name setter.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Construct an entity from raw data, validating it against `schema`.
    ///
    /// Raw data is an object carrying `_id`, `name` (where the kind requires
    /// one), arbitrary domain fields, and one array per embedded kind the
    /// entity owns.
    pub fn from_source(kind: EntityKind, raw: Value, schema: &Schema) -> Result<Self> {
        let mut data = match raw {
            Value::Object(data) => data,
            other => {
                return Err(Error::InvalidPayload(format!(
                    "{kind} data must be an object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        schema.validate(kind, &data)?;

        let id = match data.remove(ID_KEY) {
            Some(Value::String(id)) if !id.is_empty() => id,
            None | Some(Value::Null) => return Err(Error::MissingRequiredField(ID_KEY.into())),
            Some(Value::String(_)) => {
                return Err(Error::InvalidPayload(format!("{kind} has an empty {ID_KEY}")))
            }
            Some(other) => return Err(type_mismatch(ID_KEY, &other)),
        };

        let name = match data.remove(NAME_KEY) {
            Some(Value::String(name)) => Some(name),
            None | Some(Value::Null) if kind.requires_name() => {
                return Err(Error::MissingRequiredField(NAME_KEY.into()))
            }
            None | Some(Value::Null) => None,
            Some(other) => return Err(type_mismatch(NAME_KEY, &other)),
        };

        let mut entity = Entity::new(kind, id);
        entity.name = name;

        for &embedded_kind in kind.embedded_kinds() {
            let Some(field) = embedded_kind.field_name() else {
                continue;
            };
            let items = match data.remove(field) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(other) => return Err(type_mismatch(field, &other)),
            };

            let map = entity
                .embedded
                .entry(embedded_kind)
                .or_insert_with(|| EntityMap::new(embedded_kind));
            for item in items {
                let child = Entity::from_source(embedded_kind, item, schema)?;
                if map.contains(child.id()) {
                    return Err(Error::InvalidPayload(format!(
                        "duplicate {embedded_kind} id {} in {kind} {}",
                        child.id(),
                        entity.id
                    )));
                }
                map.insert(child)?;
            }
        }

        entity.fields = data;
        Ok(entity)
    }

    /// Reproduce the raw data this entity would be constructed from.
    pub fn to_source(&self) -> Value {
        let mut data = self.fields.clone();
        data.insert(ID_KEY.into(), Value::String(self.id.clone()));
        if let Some(name) = &self.name {
            data.insert(NAME_KEY.into(), Value::String(name.clone()));
        }
        for (kind, map) in &self.embedded {
            if let Some(field) = kind.field_name() {
                let items = map.iter().map(Entity::to_source).collect();
                data.insert(field.into(), Value::Array(items));
            }
        }
        Value::Object(data)
    }

    /// Check this entity against the base rules and `schema`.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        Entity::from_source(self.kind, self.to_source(), schema).map(|_| ())
    }

    /// Return a copy of this entity with `changes` merged into its fields.
    ///
    /// `changes` may repeat the entity's `_id` but never change it.
    pub fn updated(&self, mut changes: Map<String, Value>, schema: &Schema) -> Result<Self> {
        match changes.remove(ID_KEY) {
            None => {}
            Some(Value::String(id)) if id == self.id => {}
            Some(other) => {
                return Err(Error::InvalidPayload(format!(
                    "update for {} {} cannot change {ID_KEY} to {other}",
                    self.kind, self.id
                )))
            }
        }

        let Value::Object(mut data) = self.to_source() else {
            return Err(Error::InvalidPayload(format!("{} source is not an object", self.kind)));
        };
        merge_object(&mut data, changes);
        Entity::from_source(self.kind, Value::Object(data), schema)
    }

    /// The entity's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The entity's kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The entity's display name, if it has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Domain fields other than id, name and embedded collections.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a domain field by key or dotted path.
    pub fn field(&self, path: &str) -> Option<&Value> {
        crate::merge::get_path(&self.fields, path)
    }

    /// The embedded collection of `kind`, if this entity owns that kind.
    pub fn embedded(&self, kind: EntityKind) -> Option<&EntityMap> {
        self.embedded.get(&kind)
    }

    pub(crate) fn embedded_mut(&mut self, kind: EntityKind) -> Option<&mut EntityMap> {
        self.embedded.get_mut(&kind)
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_source().serialize(serializer)
    }
}

fn type_mismatch(field: &str, value: &Value) -> Error {
    let expected = match field {
        ID_KEY | NAME_KEY => "String",
        _ => "Array",
    };
    Error::TypeMismatch {
        field: field.into(),
        expected: expected.into(),
        got: json_type_name(value).into(),
    }
}
