//! Evaluation context (caller attributes).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Attribute map supplied by the caller for one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    attributes: HashMap<String, Value>,
}

impl EvaluationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `user_id` attribute
    pub fn with_user_id(self, user_id: impl Into<String>) -> Self {
        let user_id: String = user_id.into();
        self.with_attribute("user_id", user_id)
    }

    /// Add attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Get attribute value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Check whether an attribute is present
    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Get the `user_id` attribute
    pub fn user_id(&self) -> Option<&Value> {
        self.get("user_id")
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the context has no attributes
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl From<HashMap<String, Value>> for EvaluationContext {
    fn from(attributes: HashMap<String, Value>) -> Self {
        Self { attributes }
    }
}

impl From<Map<String, Value>> for EvaluationContext {
    fn from(map: Map<String, Value>) -> Self {
        Self {
            attributes: map.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for EvaluationContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            attributes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
