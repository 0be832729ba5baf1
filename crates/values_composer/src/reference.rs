//! Values references declared by a release.
//!
//! A `ValuesReference` points at a ConfigMap or Secret in the release's
//! namespace and names the key holding either a whole values document or,
//! when a target path is set, a single scalar to place at that path.

use crate::errors::{ValuesError, ValuesResult};
use crate::target_path::{TargetPath, MAX_TARGET_PATH_LENGTH};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[cfg(test)]
#[path = "reference_tests.rs"]
mod tests;

/// Key looked up in a source object when a reference does not name one.
pub const DEFAULT_VALUES_KEY: &str = "values.yaml";

/// Maximum length of a values key.
pub const MAX_VALUES_KEY_LENGTH: usize = 253;

/// Maximum length of a source object name.
pub const MAX_NAME_LENGTH: usize = 253;

const VALUES_KEY_PATTERN: &str = r"^[A-Za-z0-9_.\-]*$";

static VALUES_KEY_REGEX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(VALUES_KEY_PATTERN));

/// Kinds of object a values reference may point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    ConfigMap,
    Secret,
}

impl SourceKind {
    /// Parses the `kind` field of a reference. Matching is case-sensitive.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "ConfigMap" => Some(Self::ConfigMap),
            "Secret" => Some(Self::Secret),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference to values held in a ConfigMap or Secret.
///
/// The `kind` is kept as written in the release so that an unsupported kind
/// is reported when values are composed rather than when the release is read.
///
/// # Examples
///
/// ```
/// use values_composer::ValuesReference;
///
/// let reference = ValuesReference::secret("values")
///     .with_values_key("single")
///     .with_target_path("merge.at.specific.path")
///     .with_optional(true);
///
/// assert_eq!(reference.values_key(), "single");
/// assert!(reference.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesReference {
    /// Kind of the source object, `ConfigMap` or `Secret`.
    pub kind: String,

    /// Name of the source object in the release's namespace.
    pub name: String,

    /// Key of the values in the source object. Empty means `values.yaml`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub values_key: String,

    /// Path at which the value is placed. Empty merges the whole document.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_path: String,

    /// Skip the reference when the source object does not exist.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

impl ValuesReference {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn config_map(name: impl Into<String>) -> Self {
        Self::new(SourceKind::ConfigMap.as_str(), name)
    }

    pub fn secret(name: impl Into<String>) -> Self {
        Self::new(SourceKind::Secret.as_str(), name)
    }

    pub fn with_values_key(mut self, key: impl Into<String>) -> Self {
        self.values_key = key.into();
        self
    }

    pub fn with_target_path(mut self, path: impl Into<String>) -> Self {
        self.target_path = path.into();
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// The parsed source kind, or `None` when the kind is unsupported.
    pub fn source_kind(&self) -> Option<SourceKind> {
        SourceKind::from_kind(&self.kind)
    }

    /// The key to look up, falling back to [`DEFAULT_VALUES_KEY`].
    pub fn values_key(&self) -> &str {
        if self.values_key.is_empty() {
            DEFAULT_VALUES_KEY
        } else {
            &self.values_key
        }
    }

    /// Checks the reference against the rules the release schema enforces.
    ///
    /// Composition does not require a validated reference; this is offered to
    /// callers that accept references from an unvalidated source.
    ///
    /// # Errors
    ///
    /// Returns `ValuesError::InvalidReference` naming the offending field if:
    /// - the kind is not `ConfigMap` or `Secret`
    /// - the name is empty or longer than 253 characters
    /// - the values key is longer than 253 characters or contains characters
    ///   other than letters, digits, `_`, `.` and `-`
    /// - the target path is longer than 250 characters or does not parse
    pub fn validate(&self) -> ValuesResult<()> {
        let invalid = |field: &str, reason: String| ValuesError::InvalidReference {
            name: self.name.clone(),
            field: field.to_string(),
            reason,
        };

        if self.source_kind().is_none() {
            return Err(invalid(
                "kind",
                format!("'{}' is not one of ConfigMap, Secret", self.kind),
            ));
        }

        if self.name.is_empty() {
            return Err(invalid("name", "name cannot be empty".to_string()));
        }
        if self.name.len() > MAX_NAME_LENGTH {
            return Err(invalid(
                "name",
                format!(
                    "name too long ({} characters, maximum {})",
                    self.name.len(),
                    MAX_NAME_LENGTH
                ),
            ));
        }

        if self.values_key.len() > MAX_VALUES_KEY_LENGTH {
            return Err(invalid(
                "valuesKey",
                format!(
                    "values key too long ({} characters, maximum {})",
                    self.values_key.len(),
                    MAX_VALUES_KEY_LENGTH
                ),
            ));
        }
        let pattern = VALUES_KEY_REGEX
            .as_ref()
            .map_err(|e| invalid("valuesKey", format!("invalid key pattern: {}", e)))?;
        if !pattern.is_match(&self.values_key) {
            return Err(invalid(
                "valuesKey",
                format!(
                    "'{}' does not match {}",
                    self.values_key, VALUES_KEY_PATTERN
                ),
            ));
        }

        if self.target_path.len() > MAX_TARGET_PATH_LENGTH {
            return Err(invalid(
                "targetPath",
                format!(
                    "target path too long ({} characters, maximum {})",
                    self.target_path.len(),
                    MAX_TARGET_PATH_LENGTH
                ),
            ));
        }
        if !self.target_path.is_empty() {
            TargetPath::parse(&self.target_path)
                .map_err(|e| invalid("targetPath", e.to_string()))?;
        }

        Ok(())
    }
}

impl fmt::Display for ValuesReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (key '{}')", self.kind, self.name, self.values_key())
    }
}

/// The values section of a release spec.
///
/// # Examples
///
/// ```
/// use values_composer::ValuesSpec;
///
/// let spec: ValuesSpec = serde_json::from_str(r#"{
///     "valuesFrom": [{"kind": "ConfigMap", "name": "values", "optional": true}],
///     "values": {"other": "values"}
/// }"#)?;
///
/// assert_eq!(spec.values_from.len(), 1);
/// assert!(spec.values_from[0].optional);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesSpec {
    /// References merged in order; later references take precedence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values_from: Vec<ValuesReference>,

    /// Inline values merged last, with the highest precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<serde_json::Value>,
}

impl ValuesSpec {
    /// Validates every reference, stopping at the first invalid one.
    pub fn validate(&self) -> ValuesResult<()> {
        self.values_from.iter().try_for_each(ValuesReference::validate)
    }
}
