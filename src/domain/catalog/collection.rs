//! Keyed, ordered domain collections.
//!
//! A collection keeps server order and allows a server-returned record to
//! be spliced in by id without a refetch. Load and error status live next to
//! the items so a failed fetch can be reported without blanking them.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::domain_kind::DomainKind;
use crate::domain::foundation::{RecordId, ValidationError};

/// A JSON record as returned by the API, keyed by its `id` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    id: RecordId,
    body: Value,
}

impl Record {
    /// Wraps an API object; the object must carry a string or integer `id`.
    pub fn from_value(body: Value) -> Result<Self, ValidationError> {
        let id = body
            .get("id")
            .and_then(RecordId::from_json)
            .ok_or_else(|| ValidationError::empty_field("id"))?;
        Ok(Self { id, body })
    }

    /// Wraps a derived view under the domain's slug.
    pub fn snapshot(domain: DomainKind, body: Value) -> Self {
        Self {
            id: RecordId::from_slug(domain.slug()),
            body,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }

    /// Overwrites one top-level field. No-op for non-object bodies.
    pub fn set(&mut self, field: &str, value: Value) {
        if let Value::Object(map) = &mut self.body {
            map.insert(field.to_string(), value);
        }
    }

    /// Decodes the body into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.body.clone())
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

/// `{items, isLoading, lastError}` for one domain.
#[derive(Debug, Clone)]
pub struct DomainCollection {
    items: IndexMap<RecordId, Record>,
    is_loading: bool,
    last_error: Option<String>,
}

impl Default for DomainCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainCollection {
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
            is_loading: false,
            last_error: None,
        }
    }

    /// Replaces every item, as after a successful fetch.
    ///
    /// Clears the loading flag and any previous error.
    pub fn replace(&mut self, items: impl IntoIterator<Item = Record>) {
        self.items = items
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        self.is_loading = false;
        self.last_error = None;
    }

    /// Splices a record in by id: replaced in place if present, appended otherwise.
    pub fn upsert(&mut self, item: Record) {
        let key = item.id.clone();
        self.items.insert(key, item);
    }

    /// Inserts a record at the front, replacing any record with the same id.
    pub fn prepend(&mut self, item: Record) {
        let key = item.id.clone();
        self.items.shift_remove(&key);
        self.items.shift_insert(0, key, item);
    }

    /// Removes a record by id, keeping the order of the rest.
    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        self.items.shift_remove(id)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &RecordId) -> Option<&mut Record> {
        self.items.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.items.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.items.values_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn mark_loading(&mut self) {
        self.is_loading = true;
    }

    /// Drops the loading flag without touching items or error.
    pub fn finish_loading(&mut self) {
        self.is_loading = false;
    }

    /// Records a failure without touching the items.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.is_loading = false;
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Back to the freshly initialised empty state.
    pub fn reset(&mut self) {
        self.items.clear();
        self.is_loading = false;
        self.last_error = None;
    }

    /// Clones the items in order.
    pub fn to_vec(&self) -> Vec<Record> {
        self.items.values().cloned().collect()
    }
}
