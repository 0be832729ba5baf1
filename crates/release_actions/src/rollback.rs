//! Rollback action parameters.
//!
//! Turns the declarative rollback section of a release spec into the concrete
//! parameters handed to the release execution engine. The mapping is pure:
//! nothing is fetched and nothing can fail once the inputs are typed.
//!
//! # Version continuity
//!
//! The controller records the release that preceded its most recent action.
//! That pointer only targets the rollback when it still describes the same
//! release (same name and namespace). After a rename or a namespace move the
//! pointer is stale, so no version is set and the execution engine falls back
//! to the latest deployed revision.

use crate::duration::KubeDuration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;

/// Timeout used when neither the rollback nor the release sets one.
pub const DEFAULT_RELEASE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// The rollback section of a release spec.
///
/// The `disable*` flags have inverted polarity: leaving them unset keeps the
/// corresponding behaviour enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<KubeDuration>,
    #[serde(default)]
    pub disable_wait: bool,
    #[serde(default)]
    pub disable_wait_for_jobs: bool,
    #[serde(default)]
    pub disable_hooks: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub recreate: bool,
    #[serde(default)]
    pub cleanup_on_fail: bool,
}

impl RollbackSpec {
    /// The rollback timeout, or `fallback` when none is set.
    pub fn timeout_or(&self, fallback: KubeDuration) -> KubeDuration {
        self.timeout.unwrap_or(fallback)
    }
}

/// Name and namespace of a release as known to the release engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseIdentity {
    pub name: String,
    pub namespace: String,
}

impl ReleaseIdentity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ReleaseIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The controller's record of a release revision.
///
/// Chart and status details are informational and do not influence the
/// rollback target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSnapshot {
    pub name: String,
    pub namespace: String,
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ReleaseSnapshot {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            version,
            chart_name: None,
            chart_version: None,
            status: None,
        }
    }

    /// Whether this snapshot was taken of `release`.
    pub fn targets(&self, release: &ReleaseIdentity) -> bool {
        self.name == release.name && self.namespace == release.namespace
    }
}

/// Release-level settings the rollback falls back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackDefaults {
    /// The release timeout, used when the rollback spec sets none.
    pub timeout: KubeDuration,
}

impl Default for RollbackDefaults {
    fn default() -> Self {
        Self {
            timeout: KubeDuration::new(DEFAULT_RELEASE_TIMEOUT),
        }
    }
}

/// Concrete parameters for one rollback action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackParameters {
    pub release_name: String,
    pub timeout: KubeDuration,
    pub wait: bool,
    pub wait_for_jobs: bool,
    pub disable_hooks: bool,
    pub force: bool,
    pub recreate: bool,
    pub cleanup_on_fail: bool,
    /// Revision to roll back to; `None` lets the engine pick the latest
    /// deployed revision.
    pub version: Option<u32>,
    pub dry_run: bool,
}

/// A modification applied to the parameters after they are derived from
/// the spec.
pub type RollbackOption = Box<dyn FnOnce(&mut RollbackParameters) + Send>;

/// Option that turns the rollback into a dry run.
pub fn dry_run() -> RollbackOption {
    Box::new(|params| params.dry_run = true)
}

/// Builds [`RollbackParameters`] for a release.
///
/// # Examples
///
/// ```
/// use release_actions::{
///     dry_run, KubeDuration, ReleaseIdentity, ReleaseSnapshot, RollbackBuilder, RollbackSpec,
/// };
///
/// let spec = RollbackSpec {
///     disable_wait: true,
///     ..RollbackSpec::default()
/// };
/// let release = ReleaseIdentity::new("podinfo", "apps");
/// let previous = ReleaseSnapshot::new("podinfo", "apps", 3);
///
/// let params = RollbackBuilder::new(&spec, &release)
///     .previous(Some(&previous))
///     .release_timeout(KubeDuration::from_secs(600))
///     .option(dry_run())
///     .build();
///
/// assert_eq!(params.version, Some(3));
/// assert!(!params.wait);
/// assert!(params.dry_run);
/// assert_eq!(params.timeout.to_string(), "10m0s");
/// ```
pub struct RollbackBuilder<'a> {
    spec: &'a RollbackSpec,
    release: &'a ReleaseIdentity,
    previous: Option<&'a ReleaseSnapshot>,
    defaults: RollbackDefaults,
    options: Vec<RollbackOption>,
}

impl<'a> RollbackBuilder<'a> {
    pub fn new(spec: &'a RollbackSpec, release: &'a ReleaseIdentity) -> Self {
        Self {
            spec,
            release,
            previous: None,
            defaults: RollbackDefaults::default(),
            options: Vec::new(),
        }
    }

    /// Sets the previous release pointer from the release status.
    pub fn previous(mut self, previous: Option<&'a ReleaseSnapshot>) -> Self {
        self.previous = previous;
        self
    }

    pub fn defaults(mut self, defaults: RollbackDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Sets the release-level timeout the rollback falls back on.
    pub fn release_timeout(mut self, timeout: KubeDuration) -> Self {
        self.defaults.timeout = timeout;
        self
    }

    /// Adds an option. Options run in the order they are added, after the
    /// spec has been applied.
    pub fn option(mut self, option: RollbackOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn options(mut self, options: impl IntoIterator<Item = RollbackOption>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn build(self) -> RollbackParameters {
        let spec = self.spec;
        let mut params = RollbackParameters {
            release_name: self.release.name.clone(),
            timeout: spec.timeout_or(self.defaults.timeout),
            wait: !spec.disable_wait,
            wait_for_jobs: !spec.disable_wait_for_jobs,
            disable_hooks: spec.disable_hooks,
            force: spec.force,
            recreate: spec.recreate,
            cleanup_on_fail: spec.cleanup_on_fail,
            version: None,
            dry_run: false,
        };

        match self.previous {
            Some(previous) if previous.targets(self.release) => {
                params.version = Some(previous.version);
            }
            Some(previous) => {
                debug!(
                    release = %self.release,
                    previous_name = %previous.name,
                    previous_namespace = %previous.namespace,
                    "Previous release pointer describes another release, using latest revision"
                );
            }
            None => {}
        }

        for option in self.options {
            option(&mut params);
        }

        params
    }
}

impl fmt::Debug for RollbackBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackBuilder")
            .field("spec", self.spec)
            .field("release", self.release)
            .field("previous", &self.previous)
            .field("defaults", &self.defaults)
            .field("options", &self.options.len())
            .finish()
    }
}

/// Derives rollback parameters with the default release settings.
///
/// `previous` is the release pointer recorded in the release status; its
/// version is only used when it describes `release`.
pub fn build_rollback_parameters(
    spec: &RollbackSpec,
    release: &ReleaseIdentity,
    previous: Option<&ReleaseSnapshot>,
    options: impl IntoIterator<Item = RollbackOption>,
) -> RollbackParameters {
    RollbackBuilder::new(spec, release)
        .previous(previous)
        .options(options)
        .build()
}
