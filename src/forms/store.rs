//! Passive key/value holder for wizard input.
//!
//! Values live in one nested JSON object grouped by section
//! (`organisationDetails`, `accreditation`, ...). The store never validates;
//! callers decide when a step is checked.

use serde_json::{Map, Value};

use super::path::FieldPath;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldStore {
    root: Map<String, Value>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a store from host supplied data (edit flows). Non-object
    /// input is ignored.
    pub fn from_value(initial: Value) -> Self {
        let mut store = Self::new();
        store.merge(initial);
        store
    }

    /// Writes one leaf value, creating intermediate objects as needed. An
    /// intermediate that is not an object is replaced.
    pub fn set(&mut self, path: &FieldPath, value: Value) {
        let segments = path.segments();
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut cursor = &mut self.root;
        for segment in parents {
            let entry = cursor
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            cursor = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        cursor.insert(leaf.clone(), value);
    }

    pub fn get(&self, path: &FieldPath) -> Option<&Value> {
        let mut segments = path.segments().iter();
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn text(&self, path: &FieldPath) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn remove(&mut self, path: &FieldPath) -> Option<Value> {
        let segments = path.segments();
        let (leaf, parents) = segments.split_last()?;
        let mut cursor = &mut self.root;
        for segment in parents {
            cursor = cursor.get_mut(segment)?.as_object_mut()?;
        }
        cursor.remove(leaf)
    }

    /// The slice of state owned by one step.
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    /// Missing, `null`, empty and whitespace-only strings all count as blank.
    pub fn is_blank(&self, path: &FieldPath) -> bool {
        self.get(path).map(is_blank_value).unwrap_or(true)
    }

    /// Deep-merges an object into the store; objects merge recursively,
    /// everything else overwrites.
    pub fn merge(&mut self, incoming: Value) {
        if let Value::Object(map) = incoming {
            merge_maps(&mut self.root, map);
        }
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

pub fn is_blank_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn merge_maps(target: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_maps(existing, nested);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
