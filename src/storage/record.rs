// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Record definition.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of a collection: an id plus free-form JSON fields.
///
/// An empty `id` means the record has not been saved yet; the store assigns
/// the id on first save.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    collection: String,
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(collection: &str) -> Self {
        Self {
            id: String::new(),
            collection: collection.to_string(),
            fields: Map::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String value of `field`, empty when missing or not a string.
    pub fn get_str(&self, field: &str) -> &str {
        self.fields
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get_bool(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Relation list stored under `field`. A single string counts as a one-element list.
    pub fn get_string_list(&self, field: &str) -> Vec<String> {
        match self.fields.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// JSON object stored under `field`. Strings holding JSON objects are decoded;
    /// anything else yields an empty object.
    pub fn get_object(&self, field: &str) -> Map<String, Value> {
        match self.fields.get(field) {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
            _ => Map::new(),
        }
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Append `value` to the relation list under `field`.
    pub fn append_to_list(&mut self, field: &str, value: &str) {
        let mut list = self.get_string_list(field);
        list.push(value.to_string());
        self.set(
            field,
            Value::Array(list.into_iter().map(Value::String).collect()),
        );
    }
}
