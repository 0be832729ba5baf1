//! Values composition for releases.
//!
//! A release declares its values as an ordered list of references to
//! ConfigMaps and Secrets plus an optional inline document. This crate turns
//! that declaration into a single values tree:
//!
//! 1. each reference is resolved through a [`ReferenceResolver`];
//! 2. its values key is either decoded as a whole document and deep-merged,
//!    or, when a target path is set, coerced to a scalar and injected at that
//!    path;
//! 3. the inline document is merged last.
//!
//! Nothing here mutates a cluster. The result is a plain [`Values`] tree that
//! the caller hands to whatever installs or upgrades the release.

pub mod coercion;
pub mod composer;
pub mod errors;
pub mod reference;
pub mod resolver;
pub mod target_path;
pub mod value;

pub use coercion::coerce_scalar;
pub use composer::ValuesComposer;
pub use errors::{
    DocumentError, PathError, ResolverError, ResolverResult, ValuesError, ValuesOrigin,
    ValuesResult,
};
pub use reference::{SourceKind, ValuesReference, ValuesSpec, DEFAULT_VALUES_KEY};
pub use resolver::{InMemoryResolver, ReferenceResolver, SourceData};
pub use target_path::{PathSegment, TargetPath, MAX_INDEX, MAX_TARGET_PATH_LENGTH};
pub use value::{Number, Value, Values};
