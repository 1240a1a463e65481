//! Field merge for update payloads.
//!
//! Update payloads are partial: they name only the fields that changed.
//! Keys may be dotted paths (`"data.hp.value": 3`) and a key prefixed with
//! `-=` deletes the named field (`"-=flags": null`).

use serde_json::{Map, Value};

/// Prefix marking a key for deletion.
pub const DELETION_PREFIX: &str = "-=";

/// Look up `path` in `object`, either as a literal key or as a dotted path.
pub fn get_path<'a>(object: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(value) = object.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = object.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Expand dotted keys into nested objects, recursively.
///
/// `{"a.b": 1, "a": {"c": 2}}` becomes `{"a": {"b": 1, "c": 2}}`.
pub fn expand_object(object: Map<String, Value>) -> Map<String, Value> {
    let mut expanded = Map::new();
    for (key, value) in object {
        let value = match value {
            Value::Object(inner) => Value::Object(expand_object(inner)),
            other => other,
        };
        insert_path(&mut expanded, &key, value);
    }
    expanded
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    // Deletion keys stay literal so the merge step can see them.
    let split = if path.starts_with(DELETION_PREFIX) {
        None
    } else {
        path.split_once('.')
    };

    match split {
        Some((head, rest)) => {
            let slot = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
        None => combine_value(target, path, value),
    }
}

fn combine_value(target: &mut Map<String, Value>, key: &str, value: Value) {
    if let Value::Object(incoming) = value {
        if let Some(Value::Object(existing)) = target.get_mut(key) {
            for (k, v) in incoming {
                combine_value(existing, &k, v);
            }
            return;
        }
        target.insert(key.to_string(), Value::Object(incoming));
    } else {
        target.insert(key.to_string(), value);
    }
}

/// Merge `changes` into `target`.
///
/// Nested objects merge key by key, every other value overwrites, and
/// `-=key` entries delete `key` from the target. Deletion keys never land
/// in the target, even inside an object that replaces a missing field.
pub fn merge_object(target: &mut Map<String, Value>, changes: Map<String, Value>) {
    for (key, value) in expand_object(changes) {
        if let Some(deleted) = key.strip_prefix(DELETION_PREFIX) {
            target.remove(deleted);
            continue;
        }

        match value {
            Value::Object(incoming) => {
                let slot = target
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                if let Value::Object(existing) = slot {
                    merge_object(existing, incoming);
                }
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}
