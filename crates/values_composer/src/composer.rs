//! Values composition engine.
//!
//! Composes the final values of a release from its values references and
//! inline values.
//!
//! # Precedence
//!
//! References are applied in the order they are listed, each one deep-merged
//! over the result of the previous ones. Inline values are merged last and
//! therefore win over every reference.
//!
//! # Failure handling
//!
//! Composition is fail-fast: the first error stops the call and no partial
//! result is returned. The only failure that is tolerated is a missing source
//! object for a reference marked `optional`. A missing *key* inside an
//! existing object is always an error.

use crate::coercion::coerce_scalar;
use crate::errors::{ValuesError, ValuesOrigin, ValuesResult};
use crate::reference::{ValuesReference, ValuesSpec};
use crate::resolver::ReferenceResolver;
use crate::target_path::TargetPath;
use crate::value::Values;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
#[path = "composer_tests.rs"]
mod tests;

/// Composes release values from referenced ConfigMaps and Secrets.
///
/// Holds no state besides the resolver, so a single instance can be shared
/// by concurrent reconciliations. Cancelling a composition is done by
/// dropping its future; no retries happen here.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use values_composer::{InMemoryResolver, Value, ValuesComposer, ValuesReference};
///
/// # futures::executor::block_on(async {
/// let resolver = InMemoryResolver::new()
///     .with_config_map("default", "values", [("values.yaml", "flat: value\n")])
///     .with_secret("default", "values", [("single", b"true".to_vec())]);
/// let composer = ValuesComposer::new(Arc::new(resolver));
///
/// let references = vec![
///     ValuesReference::config_map("values"),
///     ValuesReference::secret("values")
///         .with_values_key("single")
///         .with_target_path("feature.enabled"),
/// ];
/// let values = composer
///     .compose("default", &references, Some(b"other: values".as_slice()))
///     .await?;
///
/// assert_eq!(values.get("flat"), Some(&Value::from("value")));
/// assert_eq!(values.lookup(&["feature", "enabled"]), Some(&Value::Bool(true)));
/// assert_eq!(values.get("other"), Some(&Value::from("values")));
/// # Ok::<(), values_composer::ValuesError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct ValuesComposer {
    resolver: Arc<dyn ReferenceResolver>,
}

impl fmt::Debug for ValuesComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuesComposer").finish_non_exhaustive()
    }
}

impl ValuesComposer {
    /// Creates a composer that fetches sources through `resolver`.
    pub fn new(resolver: Arc<dyn ReferenceResolver>) -> Self {
        Self { resolver }
    }

    /// Composes values from `references` followed by the raw `inline`
    /// document.
    ///
    /// All references are looked up in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns the first `ValuesError` encountered:
    /// - `UnsupportedReferenceKind` for a kind other than ConfigMap or Secret
    /// - `SourceNotFound` for a missing object of a non-optional reference
    /// - `SourceFetchFailed` when the resolver fails for another reason
    /// - `SourceKeyNotFound` when the object lacks the values key
    /// - `DecodeError` for a document that is not a YAML mapping
    /// - `PathSyntaxError` for a target path that does not parse or is longer
    ///   than 250 characters
    /// - `PathConflict` when a target path descends through a non-container
    #[instrument(
        skip(self, references, inline),
        fields(references = references.len(), inline = inline.is_some())
    )]
    pub async fn compose(
        &self,
        namespace: &str,
        references: &[ValuesReference],
        inline: Option<&[u8]>,
    ) -> ValuesResult<Values> {
        let mut result = self.compose_references(namespace, references).await?;

        if let Some(raw) = inline {
            let values =
                Values::from_yaml_slice(raw).map_err(|e| ValuesError::DecodeError {
                    origin: ValuesOrigin::Inline,
                    reason: e.reason,
                })?;
            result.merge(values);
        }

        debug!(keys = result.len(), "Composed release values");
        Ok(result)
    }

    /// Composes values from the values section of a release spec.
    ///
    /// Identical to [`ValuesComposer::compose`] except that the inline values
    /// arrive as an already parsed JSON document.
    #[instrument(
        skip(self, spec),
        fields(references = spec.values_from.len(), inline = spec.values.is_some())
    )]
    pub async fn compose_spec(&self, namespace: &str, spec: &ValuesSpec) -> ValuesResult<Values> {
        let mut result = self.compose_references(namespace, &spec.values_from).await?;

        if let Some(document) = &spec.values {
            let values =
                Values::from_json(document.clone()).map_err(|e| ValuesError::DecodeError {
                    origin: ValuesOrigin::Inline,
                    reason: e.reason,
                })?;
            result.merge(values);
        }

        debug!(keys = result.len(), "Composed release values");
        Ok(result)
    }

    async fn compose_references(
        &self,
        namespace: &str,
        references: &[ValuesReference],
    ) -> ValuesResult<Values> {
        let mut result = Values::new();

        for reference in references {
            let key = reference.values_key();
            let Some(kind) = reference.source_kind() else {
                warn!(
                    kind = %reference.kind,
                    name = %reference.name,
                    "Unsupported values reference kind"
                );
                return Err(ValuesError::UnsupportedReferenceKind {
                    kind: reference.kind.clone(),
                    name: reference.name.clone(),
                    key: key.to_string(),
                });
            };

            let source = match self.resolver.get(kind, namespace, &reference.name).await {
                Ok(Some(source)) => source,
                Ok(None) if reference.optional => {
                    info!(
                        "Could not find optional {} '{}/{}', skipping values reference",
                        kind, namespace, reference.name
                    );
                    continue;
                }
                Ok(None) => {
                    return Err(ValuesError::SourceNotFound {
                        kind,
                        namespace: namespace.to_string(),
                        name: reference.name.clone(),
                        key: key.to_string(),
                    })
                }
                Err(e) => {
                    warn!("Failed to get {} '{}/{}': {}", kind, namespace, reference.name, e);
                    return Err(ValuesError::SourceFetchFailed {
                        kind,
                        namespace: namespace.to_string(),
                        name: reference.name.clone(),
                        reason: e.reason,
                    });
                }
            };

            let raw = source.get(key).ok_or_else(|| ValuesError::SourceKeyNotFound {
                kind,
                namespace: namespace.to_string(),
                name: reference.name.clone(),
                key: key.to_string(),
            })?;
            let origin = ValuesOrigin::reference(kind, namespace, &reference.name, key);

            if reference.target_path.is_empty() {
                let values = Values::from_yaml_slice(raw).map_err(|e| ValuesError::DecodeError {
                    origin,
                    reason: e.reason,
                })?;
                result.merge(values);
            } else {
                let path = TargetPath::parse(&reference.target_path)
                    .map_err(|e| ValuesError::from_path_error(e, origin.clone()))?;
                let value = coerce_scalar(&String::from_utf8_lossy(raw));
                path.inject(&mut result, value)
                    .map_err(|e| ValuesError::from_path_error(e, origin))?;
            }

            debug!(
                "Merged values from key '{}' of {} '{}/{}'",
                key, kind, namespace, reference.name
            );
        }

        Ok(result)
    }
}
