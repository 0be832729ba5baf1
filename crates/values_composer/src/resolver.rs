//! Reference resolution interface and an in-memory implementation.
//!
//! The composer never talks to a cluster directly. It asks a
//! `ReferenceResolver` for the key/value content of a ConfigMap or Secret and
//! gets back either the content, `None` when the object does not exist, or a
//! `ResolverError` for any other failure.

use crate::errors::{ResolverError, ResolverResult};
use crate::reference::SourceKind;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;

/// The key/value content of a resolved source object.
///
/// ConfigMap string data, ConfigMap binary data and Secret data are all
/// exposed as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceData {
    entries: BTreeMap<String, Vec<u8>>,
}

impl SourceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SourceData
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Looks up the content of ConfigMaps and Secrets.
///
/// # Error Handling
///
/// Absence is not an error: implementations return `Ok(None)` so the
/// composer can honour optional references. Every other failure (permission
/// denied, timeouts, a broken cache) is a `ResolverError`.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one resolver is shared by all
/// composition calls.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    /// Fetches the named object of the given kind.
    async fn get(
        &self,
        kind: SourceKind,
        namespace: &str,
        name: &str,
    ) -> ResolverResult<Option<SourceData>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ObjectKey {
    namespace: String,
    name: String,
}

impl ObjectKey {
    fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// A resolver backed by objects held in memory.
///
/// ConfigMaps and Secrets live in separate stores, so a ConfigMap and a
/// Secret may share a name just as they can in a cluster.
///
/// # Examples
///
/// ```
/// use values_composer::{InMemoryResolver, ReferenceResolver, SourceKind};
///
/// # futures::executor::block_on(async {
/// let resolver = InMemoryResolver::new()
///     .with_config_map("default", "values", [("values.yaml", "replicas: 2\n")]);
///
/// let data = resolver.get(SourceKind::ConfigMap, "default", "values").await?;
/// assert!(data.is_some());
/// assert!(resolver.get(SourceKind::Secret, "default", "values").await?.is_none());
/// # Ok::<(), values_composer::ResolverError>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    config_maps: HashMap<ObjectKey, SourceData>,
    secrets: HashMap<ObjectKey, SourceData>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ConfigMap with string data.
    pub fn with_config_map<I, K, V>(mut self, namespace: &str, name: &str, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(
            SourceKind::ConfigMap,
            namespace,
            name,
            data.into_iter()
                .map(|(key, value)| (key.into(), value.into().into_bytes()))
                .collect(),
        );
        self
    }

    /// Adds a Secret with decoded byte data.
    pub fn with_secret<I, K, V>(mut self, namespace: &str, name: &str, data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        self.insert(SourceKind::Secret, namespace, name, data.into_iter().collect());
        self
    }

    /// Stores an object, replacing any object of the same kind and name.
    pub fn insert(&mut self, kind: SourceKind, namespace: &str, name: &str, data: SourceData) {
        let key = ObjectKey::new(namespace, name);
        match kind {
            SourceKind::ConfigMap => self.config_maps.insert(key, data),
            SourceKind::Secret => self.secrets.insert(key, data),
        };
    }

    /// Removes an object, returning its data if it existed.
    pub fn remove(&mut self, kind: SourceKind, namespace: &str, name: &str) -> Option<SourceData> {
        let key = ObjectKey::new(namespace, name);
        match kind {
            SourceKind::ConfigMap => self.config_maps.remove(&key),
            SourceKind::Secret => self.secrets.remove(&key),
        }
    }

    /// Number of stored objects of both kinds.
    pub fn len(&self) -> usize {
        self.config_maps.len() + self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads ConfigMaps and Secrets from a multi-document YAML stream of
    /// Kubernetes manifests.
    ///
    /// Objects without a namespace are placed in `default_namespace`. Secret
    /// `data` and ConfigMap `binaryData` are base64-decoded; Secret
    /// `stringData` is taken verbatim and wins over `data` for the same key.
    /// Documents of other kinds are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ResolverError` if a document is not valid YAML, a ConfigMap or
    /// Secret lacks a name, or an encoded value is not valid base64.
    pub fn from_manifests(default_namespace: &str, manifests: &str) -> ResolverResult<Self> {
        let mut resolver = Self::new();

        for (position, document) in serde_yaml::Deserializer::from_str(manifests).enumerate() {
            let raw = serde_yaml::Value::deserialize(document).map_err(|e| {
                ResolverError::new(format!("manifest document {}: {}", position, e))
            })?;
            if raw.is_null() {
                continue;
            }

            let kind_name = raw
                .get("kind")
                .and_then(serde_yaml::Value::as_str)
                .unwrap_or_default();
            let Some(kind) = SourceKind::from_kind(kind_name) else {
                debug!(
                    document = position,
                    kind = %kind_name,
                    "Skipping manifest that is neither a ConfigMap nor a Secret"
                );
                continue;
            };

            let manifest: Manifest = serde_yaml::from_value(raw).map_err(|e| {
                ResolverError::new(format!("manifest document {}: {}", position, e))
            })?;

            let namespace = manifest
                .metadata
                .namespace
                .as_deref()
                .unwrap_or(default_namespace)
                .to_string();
            let name = manifest.metadata.name.clone();
            let data = manifest.into_source_data(kind)?;
            resolver.insert(kind, &namespace, &name, data);
        }

        Ok(resolver)
    }
}

#[async_trait]
impl ReferenceResolver for InMemoryResolver {
    async fn get(
        &self,
        kind: SourceKind,
        namespace: &str,
        name: &str,
    ) -> ResolverResult<Option<SourceData>> {
        let key = ObjectKey::new(namespace, name);
        let store = match kind {
            SourceKind::ConfigMap => &self.config_maps,
            SourceKind::Secret => &self.secrets,
        };
        Ok(store.get(&key).cloned())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    metadata: ManifestMetadata,
    #[serde(default)]
    data: BTreeMap<String, String>,
    #[serde(default)]
    binary_data: BTreeMap<String, String>,
    #[serde(default)]
    string_data: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ManifestMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

impl Manifest {
    fn into_source_data(self, kind: SourceKind) -> ResolverResult<SourceData> {
        let name = self.metadata.name;
        let decode = |field: &str, key: &str, encoded: &str| {
            STANDARD.decode(encoded.trim()).map_err(|e| {
                ResolverError::new(format!(
                    "{} '{}' {} key '{}' is not valid base64: {}",
                    kind, name, field, key, e
                ))
            })
        };

        let mut data = SourceData::new();
        match kind {
            SourceKind::ConfigMap => {
                for (key, value) in self.data {
                    data.insert(key, value);
                }
                for (key, encoded) in &self.binary_data {
                    data.insert(key.clone(), decode("binaryData", key.as_str(), encoded.as_str())?);
                }
            }
            SourceKind::Secret => {
                for (key, encoded) in &self.data {
                    data.insert(key.clone(), decode("data", key.as_str(), encoded.as_str())?);
                }
                for (key, value) in self.string_data {
                    data.insert(key, value);
                }
            }
        }
        Ok(data)
    }
}
