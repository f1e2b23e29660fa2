//! Version constraints: restrictions on candidate versions that never add
//! modules to the graph by themselves.

use std::fmt;

use serde::Deserialize;

use platoon_util::errors::PlatoonError;

use crate::identity::{ModuleIdentity, ModuleVersion};
use crate::requirement::VersionRequirement;

/// Where a constraint came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintSource {
    /// Declared directly in the resolution request.
    Declared,
    /// Published by a module descriptor (typically a BOM-style platform).
    Published(ModuleVersion),
    /// Injected by the alignment engine for a virtual platform.
    Alignment(ModuleIdentity),
}

impl fmt::Display for ConstraintSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => f.write_str("declared constraint"),
            Self::Published(mv) => write!(f, "constraint from {mv}"),
            Self::Alignment(platform) => write!(f, "alignment with platform {platform}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constraint {
    pub target: ModuleIdentity,
    pub requirement: VersionRequirement,
    pub source: ConstraintSource,
    /// Forced constraints come from enforced platforms and override
    /// highest-version-wins.
    pub forced: bool,
}

impl Constraint {
    pub fn new(
        target: ModuleIdentity,
        requirement: VersionRequirement,
        source: ConstraintSource,
    ) -> Self {
        Self {
            target,
            requirement,
            source,
            forced: false,
        }
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.target, self.requirement, self.source)?;
        if self.forced {
            f.write_str(" [forced]")?;
        }
        Ok(())
    }
}

/// A constraint as written in a request or a module catalog.
///
/// ```toml
/// { module = "org.example:lib", version = "1.1" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConstraint")]
pub struct DeclaredConstraint {
    pub target: ModuleIdentity,
    pub requirement: VersionRequirement,
}

impl DeclaredConstraint {
    pub fn new(target: ModuleIdentity, requirement: VersionRequirement) -> Self {
        Self {
            target,
            requirement,
        }
    }

    pub fn into_constraint(self, source: ConstraintSource) -> Constraint {
        Constraint::new(self.target, self.requirement, source)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConstraint {
    module: ModuleIdentity,
    version: String,
}

impl TryFrom<RawConstraint> for DeclaredConstraint {
    type Error = PlatoonError;

    fn try_from(raw: RawConstraint) -> Result<Self, Self::Error> {
        Ok(Self {
            target: raw.module,
            requirement: VersionRequirement::parse(&raw.version)?,
        })
    }
}
