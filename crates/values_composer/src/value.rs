//! Release values tree.
//!
//! Values documents have no fixed schema, so they are modelled as an explicit
//! tagged variant rather than a typed struct. Conversion to and from YAML and
//! JSON happens only at the edges (decoding referenced documents, accepting
//! inline values and rendering the composed result).
//!
//! # Merge rule
//!
//! Merging `overlay` into `base` walks the keys of `overlay`. When both sides
//! hold a mapping at a key the two are merged recursively; in every other case
//! the overlay value replaces the base value wholesale. Sequences are never
//! concatenated or merged element by element.

use crate::errors::DocumentError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;

/// A numeric leaf value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    /// Unsigned values that do not fit in an `i64`.
    UInt(u64),
    Float(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::UInt(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::UInt(n) => serializer.serialize_u64(*n),
            Self::Float(n) => serializer.serialize_f64(*n),
        }
    }
}

/// A single node of a values tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Value>),
    Mapping(Values),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Sequence(_) => "sequence",
            Self::Mapping(_) => "mapping",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Values> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(Number::Int(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(Number::Float(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Values> for Value {
    fn from(value: Values) -> Self {
        Self::Mapping(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::Sequence(value)
    }
}

impl TryFrom<serde_yaml::Value> for Value {
    type Error = DocumentError;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            serde_yaml::Value::Null => Self::Null,
            serde_yaml::Value::Bool(b) => Self::Bool(b),
            serde_yaml::Value::Number(n) => yaml_number(&n),
            serde_yaml::Value::String(s) => Self::String(s),
            serde_yaml::Value::Sequence(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(Value::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            serde_yaml::Value::Mapping(mapping) => {
                let mut values = Values::new();
                for (key, item) in mapping {
                    values.insert(mapping_key(key)?, Value::try_from(item)?);
                }
                Self::Mapping(values)
            }
            serde_yaml::Value::Tagged(tagged) => Value::try_from(tagged.value)?,
        })
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Number(Number::Int(i))
    } else if let Some(u) = n.as_u64() {
        Value::Number(Number::UInt(u))
    } else if let Some(f) = n.as_f64() {
        Value::Number(Number::Float(f))
    } else {
        Value::Null
    }
}

// Scalar keys are stringified the way a YAML-to-JSON conversion would.
fn mapping_key(key: serde_yaml::Value) -> Result<String, DocumentError> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Null => Ok("null".to_string()),
        serde_yaml::Value::Tagged(tagged) => mapping_key(tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => Err(DocumentError::new(
            "mapping keys must be scalars, found a collection",
        )),
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Number(Number::UInt(u))
                } else if let Some(f) = n.as_f64() {
                    Self::Number(Number::Float(f))
                } else {
                    Self::Null
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Self::Mapping(Values(
                object
                    .into_iter()
                    .map(|(key, item)| (key, Value::from(item)))
                    .collect(),
            )),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(Number::Int(n)) => serde_json::Value::from(*n),
            Value::Number(Number::UInt(n)) => serde_json::Value::from(*n),
            // Non-finite floats have no JSON representation and become null.
            Value::Number(Number::Float(n)) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Mapping(values) => values.to_json(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Sequence(items) => items.serialize(serializer),
            Self::Mapping(values) => values.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_yaml::Value::deserialize(deserializer)?;
        Value::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// A values tree: string keys mapped to values.
///
/// Keys are kept sorted; their order carries no meaning.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Values(BTreeMap<String, Value>);

impl Values {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Decodes a YAML (or JSON) document into a values tree.
    ///
    /// Empty documents and documents consisting of a single `null` decode to
    /// an empty tree. Any other top-level value than a mapping is rejected.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` when the bytes are not UTF-8, are not valid
    /// YAML, or do not hold a mapping at the top level.
    ///
    /// # Examples
    ///
    /// ```
    /// use values_composer::Values;
    ///
    /// let values = Values::from_yaml_slice(b"replicaCount: 2\nimage:\n  tag: v1\n")?;
    /// assert_eq!(values.len(), 2);
    /// assert!(Values::from_yaml_slice(b"\ninvalid").is_err());
    /// # Ok::<(), values_composer::DocumentError>(())
    /// ```
    pub fn from_yaml_slice(raw: &[u8]) -> Result<Self, DocumentError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| DocumentError::new(format!("document is not valid UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            return Ok(Self::new());
        }

        let document: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| DocumentError::new(e.to_string()))?;
        match Value::try_from(document)? {
            Value::Null => Ok(Self::new()),
            Value::Mapping(values) => Ok(values),
            other => Err(DocumentError::new(format!(
                "expected a mapping at the top level, found a {}",
                other.type_name()
            ))),
        }
    }

    /// Converts an already parsed JSON document into a values tree.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError` if the document is neither an object nor null.
    pub fn from_json(document: serde_json::Value) -> Result<Self, DocumentError> {
        match Value::from(document) {
            Value::Null => Ok(Self::new()),
            Value::Mapping(values) => Ok(values),
            other => Err(DocumentError::new(format!(
                "expected a mapping at the top level, found a {}",
                other.type_name()
            ))),
        }
    }

    /// Renders the tree as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), serde_json::Value::from(value)))
                .collect(),
        )
    }

    /// Renders the tree as a YAML document.
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        serde_yaml::to_string(self).map_err(|e| DocumentError::new(e.to_string()))
    }

    /// Deep-merges `overlay` into this tree; overlay values win.
    pub fn merge(&mut self, overlay: Values) {
        for (key, incoming) in overlay.0 {
            if let Value::Mapping(incoming) = incoming {
                if let Some(Value::Mapping(existing)) = self.0.get_mut(&key) {
                    existing.merge(incoming);
                    continue;
                }
                self.0.insert(key, Value::Mapping(incoming));
                continue;
            }
            self.0.insert(key, incoming);
        }
    }

    /// Consuming form of [`Values::merge`].
    pub fn merged(mut self, overlay: Values) -> Self {
        self.merge(overlay);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Looks up a value by a list of nested mapping keys.
    pub fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.0.get(*first)?;
        for key in rest {
            current = current.as_mapping()?.get(key)?;
        }
        Some(current)
    }

    /// Returns the slot for `key`, inserting a null placeholder if absent.
    pub(crate) fn slot(&mut self, key: &str) -> &mut Value {
        self.0.entry(key.to_string()).or_insert(Value::Null)
    }
}

impl FromIterator<(String, Value)> for Values {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Values {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Values {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Serialize for Values {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Values {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::new()),
            Value::Mapping(values) => Ok(values),
            other => Err(serde::de::Error::custom(format!(
                "expected a mapping, found a {}",
                other.type_name()
            ))),
        }
    }
}
