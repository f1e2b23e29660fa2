//! Structured resolution failures.

use miette::Diagnostic;
use thiserror::Error;

use platoon_core::identity::ModuleIdentity;

/// One independent reason a resolution run failed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ResolveError {
    /// The selected version of a module has no usable metadata.
    #[error("Could not resolve {module}: {reason} (requested by {})", .requested_by.join(", "))]
    #[diagnostic(help("Check that a catalog publishes this module version"))]
    UnresolvedModule {
        module: String,
        requested_by: Vec<String>,
        reason: String,
    },

    /// Two or more forced requests for the same module disagree.
    #[error("Conflicting forced versions for {module}: {}", .requests.join(", "))]
    #[diagnostic(help("Remove one of the forced requests or force a single version"))]
    VersionConflict {
        module: ModuleIdentity,
        requests: Vec<String>,
    },

    /// The build/resolve/align loop hit its iteration ceiling.
    #[error("Platform alignment did not converge after {iterations} iteration(s); oscillating: {}", .oscillating.join(", "))]
    #[diagnostic(help("Raise `max-iterations` or check for platforms that realign each other"))]
    AlignmentNonConvergence {
        iterations: usize,
        oscillating: Vec<String>,
    },

    /// Enforced constraints on the same module pin different versions.
    #[error("Enforced constraints on {module} disagree: {}", .constraints.join(", "))]
    #[diagnostic(help("Force the module explicitly to override the enforced platforms"))]
    CyclicForcedConstraint {
        module: ModuleIdentity,
        constraints: Vec<String>,
    },
}

/// Every error from a failed run, reported together.
#[derive(Debug, Error, Diagnostic)]
#[error("Dependency resolution failed with {} error(s)", .errors.len())]
pub struct ResolutionFailure {
    #[related]
    pub errors: Vec<ResolveError>,
}

impl ResolutionFailure {
    pub fn new(errors: Vec<ResolveError>) -> Self {
        Self { errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conflict_names_requesters() {
        let err = ResolveError::VersionConflict {
            module: ModuleIdentity::new("com.fasterxml.jackson.core", "jackson-core"),
            requests: vec![
                "com.example:app:1.0 forced 2.9.0".to_string(),
                "com.example:app:1.0 forced 2.9.5".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("jackson-core"));
        assert!(msg.contains("2.9.0"));
        assert!(msg.contains("2.9.5"));
    }

    #[test]
    fn failure_counts_errors() {
        let failure = ResolutionFailure::new(vec![ResolveError::AlignmentNonConvergence {
            iterations: 3,
            oscillating: vec!["org:lib:2.0".to_string()],
        }]);
        assert_eq!(
            failure.to_string(),
            "Dependency resolution failed with 1 error(s)"
        );
        assert!(failure.errors[0].to_string().contains("after 3 iteration(s)"));
    }
}
