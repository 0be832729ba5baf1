//! Release action parameters.
//!
//! Derives the parameters of release actions from the declarative release
//! spec and the release status recorded by the controller. Executing the
//! action is left to the caller.

pub mod duration;
pub mod errors;
pub mod rollback;

pub use duration::KubeDuration;
pub use errors::{ActionError, ActionResult};
pub use rollback::{
    build_rollback_parameters, dry_run, ReleaseIdentity, ReleaseSnapshot, RollbackBuilder,
    RollbackDefaults, RollbackOption, RollbackParameters, RollbackSpec, DEFAULT_RELEASE_TIMEOUT,
};
