//! Core data models used by the library.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content node owned by the host build.
///
/// Only `id` and whatever the payload transform reads are used; the library
/// never mutates nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style field setter, handy for hosts and tests.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The `excerpt` field, when it is a string.
    pub fn excerpt(&self) -> Option<&str> {
        self.fields.get("excerpt").and_then(Value::as_str)
    }
}

/// Default payload: `{"body": <excerpt or "">}` as compact JSON.
pub fn excerpt_payload(node: &Node) -> String {
    serde_json::json!({ "body": node.excerpt().unwrap_or_default() }).to_string()
}

/// Injected `Node -> String` strategy deciding what gets embedded.
///
/// Must be deterministic: the same node always yields the same payload.
#[derive(Clone)]
pub struct PayloadTransform(Arc<dyn Fn(&Node) -> String + Send + Sync>);

impl PayloadTransform {
    pub fn new(f: impl Fn(&Node) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, node: &Node) -> String {
        (self.0)(node)
    }
}

impl Default for PayloadTransform {
    fn default() -> Self {
        Self::new(excerpt_payload)
    }
}

impl fmt::Debug for PayloadTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PayloadTransform(<fn>)")
    }
}

/// `(node id, vector)` pair written to the collection.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
}

impl Point {
    /// Placeholder for a node whose embedding failed.
    ///
    /// An all-zero vector has the collection's length, so Qdrant accepts it,
    /// and its cosine similarity to every other point is 0.
    pub fn zeroed(id: impl Into<String>, dimension: usize) -> Self {
        Self {
            id: id.into(),
            vector: vec![0.0; dimension],
        }
    }
}

/// Outcome of one indexing run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Nodes embedded successfully.
    pub embedded: usize,
    /// Ids of nodes whose embedding failed.
    pub failed: Vec<String>,
    /// Points acknowledged by the upsert.
    pub upserted: usize,
}
