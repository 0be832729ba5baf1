//! Values composition error types.
//!
//! Every failure of a composition call is reported as a single `ValuesError`
//! that names the reference (kind, namespace, name and key) it came from, so
//! callers can render a precise diagnostic without inspecting internal state.

use crate::reference::SourceKind;
use std::fmt;
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Identifies where a values document came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuesOrigin {
    /// A key inside a ConfigMap or Secret named by a values reference.
    Reference {
        kind: SourceKind,
        namespace: String,
        name: String,
        key: String,
    },

    /// The inline values document of the release.
    Inline,
}

impl ValuesOrigin {
    /// Creates an origin for a key of a referenced source object.
    pub fn reference(
        kind: SourceKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::Reference {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ValuesOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference {
                kind,
                namespace,
                name,
                key,
            } => write!(f, "key '{}' of {} '{}/{}'", key, kind, namespace, name),
            Self::Inline => write!(f, "inline values"),
        }
    }
}

/// Values composition errors.
///
/// All variants are terminal for the composition call that produced them.
/// Only `SourceNotFound` is ever suppressed, and only for references marked
/// as optional.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuesError {
    #[error(
        "unsupported values reference kind '{kind}' for key '{key}' of '{name}' \
         (expected ConfigMap or Secret)"
    )]
    UnsupportedReferenceKind {
        kind: String,
        name: String,
        key: String,
    },

    #[error("could not find {kind} '{namespace}/{name}' holding key '{key}'")]
    SourceNotFound {
        kind: SourceKind,
        namespace: String,
        name: String,
        key: String,
    },

    #[error("failed to get {kind} '{namespace}/{name}': {reason}")]
    SourceFetchFailed {
        kind: SourceKind,
        namespace: String,
        name: String,
        reason: String,
    },

    #[error("missing key '{key}' in {kind} '{namespace}/{name}'")]
    SourceKeyNotFound {
        kind: SourceKind,
        namespace: String,
        name: String,
        key: String,
    },

    #[error("unable to read values from {origin}: {reason}")]
    DecodeError { origin: ValuesOrigin, reason: String },

    #[error("invalid target path '{path}' for {origin}: {reason}")]
    PathSyntaxError {
        origin: ValuesOrigin,
        path: String,
        reason: String,
    },

    #[error("unable to replace value at '{path}' for {origin}: '{segment}' holds a {found}")]
    PathConflict {
        origin: ValuesOrigin,
        path: String,
        segment: String,
        found: String,
    },

    #[error("invalid values reference '{name}': {field} - {reason}")]
    InvalidReference {
        name: String,
        field: String,
        reason: String,
    },
}

impl ValuesError {
    /// Returns true when the error signals an absent source object.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SourceNotFound { .. })
    }

    /// Returns the origin of the failing document, when the error has one.
    pub fn origin(&self) -> Option<&ValuesOrigin> {
        match self {
            Self::DecodeError { origin, .. }
            | Self::PathSyntaxError { origin, .. }
            | Self::PathConflict { origin, .. } => Some(origin),
            _ => None,
        }
    }

    pub(crate) fn from_path_error(error: PathError, origin: ValuesOrigin) -> Self {
        match error {
            PathError::Syntax { path, reason } => Self::PathSyntaxError {
                origin,
                path,
                reason,
            },
            PathError::Conflict {
                path,
                segment,
                found,
            } => Self::PathConflict {
                origin,
                path,
                segment,
                found,
            },
        }
    }
}

/// Result type alias for values composition.
pub type ValuesResult<T> = Result<T, ValuesError>;

/// Target path parsing and injection errors.
///
/// These carry no reference context; the composer attaches the origin when
/// converting them into a `ValuesError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid target path '{path}': {reason}")]
    Syntax { path: String, reason: String },

    #[error("cannot descend through '{segment}' of target path '{path}': it holds a {found}")]
    Conflict {
        path: String,
        segment: String,
        found: String,
    },
}

/// A values document could not be decoded into a mapping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct DocumentError {
    pub reason: String,
}

impl DocumentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A reference resolver failed for a reason other than absence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ResolverError {
    pub reason: String,
}

impl ResolverError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Result type alias for reference resolvers.
pub type ResolverResult<T> = Result<T, ResolverError>;
