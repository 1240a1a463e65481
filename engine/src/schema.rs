//! Schema definition and validation.
//!
//! Schemas describe the fields each entity kind must carry and are checked
//! whenever raw data is turned into an [`Entity`](crate::Entity), so a
//! malformed payload fails before it reaches a collection.

use crate::{error::Result, merge::get_path, EntityKind, Error};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Field types supported in schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Array,
    Object,
    /// Arbitrary nested JSON
    Json,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Bool => write!(f, "Bool"),
            FieldType::Array => write!(f, "Array"),
            FieldType::Object => write!(f, "Object"),
            FieldType::Json => write!(f, "Json"),
        }
    }
}

/// Definition of a field in an entity's raw data.
///
/// `name` may be a dotted path (`"data.attributes.hp"`) into nested objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDef {
    /// Field name or dotted path
    pub name: String,
    /// Field type
    pub field_type: FieldType,
    /// Whether this field is required
    pub required: bool,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
        }
    }

    /// Validate a JSON value against this field definition.
    pub fn validate(&self, value: Option<&Value>) -> Result<()> {
        match value {
            None | Some(Value::Null) if self.required => {
                Err(Error::MissingRequiredField(self.name.clone()))
            }
            None | Some(Value::Null) => Ok(()),
            Some(v) => self.validate_type(v),
        }
    }

    fn validate_type(&self, value: &Value) -> Result<()> {
        let valid = match self.field_type {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Float => value.is_number(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Json => true,
        };

        if valid {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type.to_string(),
                got: json_type_name(value).to_string(),
            })
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Int",
        Value::Number(_) => "Float",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

/// Field rules for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySchema {
    /// Kind this schema applies to
    pub kind: EntityKind,
    /// Field definitions
    pub fields: Vec<FieldDef>,
}

impl EntitySchema {
    /// Create a new entity schema.
    pub fn new(kind: EntityKind, fields: Vec<FieldDef>) -> Self {
        Self { kind, fields }
    }

    /// Validate raw entity data against this schema.
    pub fn validate(&self, data: &Map<String, Value>) -> Result<()> {
        for field in &self.fields {
            field.validate(get_path(data, &field.name))?;
        }
        Ok(())
    }
}

/// Schemas for every kind that has extra field rules.
///
/// Kinds without an entry are only held to the base rules every entity
/// follows (a string `_id`, plus `name` where the kind requires one).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Entity schemas by kind
    pub entities: HashMap<EntityKind, EntitySchema>,
}

impl Schema {
    /// Create an empty, permissive schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity schema.
    pub fn add_entity(&mut self, schema: EntitySchema) -> &mut Self {
        self.entities.insert(schema.kind, schema);
        self
    }

    /// Builder-style method to add an entity schema.
    pub fn with_entity(mut self, schema: EntitySchema) -> Self {
        self.add_entity(schema);
        self
    }

    /// Get the schema for a kind.
    pub fn get(&self, kind: EntityKind) -> Option<&EntitySchema> {
        self.entities.get(&kind)
    }

    /// Validate raw data for an entity of `kind`.
    pub fn validate(&self, kind: EntityKind, data: &Map<String, Value>) -> Result<()> {
        match self.entities.get(&kind) {
            Some(schema) => schema.validate(data),
            None => Ok(()),
        }
    }
}
