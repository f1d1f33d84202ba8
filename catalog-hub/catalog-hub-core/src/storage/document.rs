//! JSON documents with store-managed system attributes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const KEY_FIELD: &str = "_key";
pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";

const MAX_KEY_LEN: usize = 254;
const KEY_PUNCTUATION: &str = "_-:.@()+,=;$!*'%";

/// A stored JSON object.
///
/// `_key`, `_id` and `_rev` are owned by the store; patches never set them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn key(&self) -> Option<&str> {
        self.0.get(KEY_FIELD).and_then(Value::as_str)
    }

    pub fn rev(&self) -> Option<&str> {
        self.0.get(REV_FIELD).and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Look up a dotted path such as `status.index`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Merge `patch` into this document.
    ///
    /// Nested objects merge recursively, every other value replaces what was
    /// there (an explicit `null` is stored as `null`). System attributes in
    /// the patch are ignored.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (field, value) in patch {
            if is_system_field(&field) {
                continue;
            }
            merge_value(&mut self.0, field, value);
        }
    }

    /// Return a copy with `patch` merged in, leaving `self` untouched.
    pub fn merged(&self, patch: Map<String, Value>) -> Self {
        let mut preview = self.clone();
        preview.merge(patch);
        preview
    }

    pub(crate) fn stamp(&mut self, collection: &str, key: &str, rev: String) {
        self.0.insert(KEY_FIELD.into(), Value::String(key.to_string()));
        self.0
            .insert(ID_FIELD.into(), Value::String(format!("{}/{}", collection, key)));
        self.0.insert(REV_FIELD.into(), Value::String(rev));
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

fn is_system_field(field: &str) -> bool {
    field == KEY_FIELD || field == ID_FIELD || field == REV_FIELD
}

fn merge_value(target: &mut Map<String, Value>, field: String, value: Value) {
    match value {
        Value::Object(nested) => match target.get_mut(&field) {
            Some(Value::Object(existing)) => {
                for (inner_field, inner_value) in nested {
                    merge_value(existing, inner_field, inner_value);
                }
            }
            _ => {
                target.insert(field, Value::Object(nested));
            }
        },
        value => {
            target.insert(field, value);
        }
    }
}

/// Build a patch that sets the value at a dotted path.
///
/// `patch_at("status.index", "ready")` yields `{"status": {"index": "ready"}}`,
/// which merges without disturbing sibling fields under `status`.
pub fn patch_at(path: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut value = value.into();
    for segment in path.rsplit('.') {
        let mut wrapper = Map::new();
        wrapper.insert(segment.to_string(), value);
        value = Value::Object(wrapper);
    }
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Check a caller-supplied key against the legal key alphabet.
pub fn validate_key(key: &str) -> Result<()> {
    let legal = !key.is_empty()
        && key.len() <= MAX_KEY_LEN
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || KEY_PUNCTUATION.contains(c));
    if legal {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}
