//! Resolution requests: the root module, its declared dependencies and
//! constraints, and the platform rule table.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use platoon_util::errors::PlatoonError;

use crate::config::ResolutionOverrides;
use crate::constraint::{Constraint, ConstraintSource, DeclaredConstraint};
use crate::dependency::Dependency;
use crate::identity::ModuleVersion;
use crate::platform::{PlatformRule, PlatformRules};

/// Everything the resolver needs from the caller.
///
/// ```toml
/// [root]
/// id = "com.example:app:1.0"
///
/// [[dependency]]
/// module = "org.example:db"
/// version = "1.0"
///
/// [[platform-rule]]
/// module = "org.example:db"
/// platform = "org.example:platform"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionRequest {
    pub root: RootModule,
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<Dependency>,
    #[serde(default, rename = "constraint")]
    pub constraints: Vec<DeclaredConstraint>,
    #[serde(default, rename = "platform-rule")]
    pub rules: Vec<PlatformRule>,
    #[serde(default)]
    pub resolution: ResolutionOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootModule {
    pub id: ModuleVersion,
}

impl ResolutionRequest {
    pub fn new(root: ModuleVersion) -> Self {
        Self {
            root: RootModule { id: root },
            dependencies: Vec::new(),
            constraints: Vec::new(),
            rules: Vec::new(),
            resolution: ResolutionOverrides::default(),
        }
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_constraint(mut self, constraint: DeclaredConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_rule(mut self, rule: PlatformRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Load and parse a request file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlatoonError::Request {
            message: format!("Failed to read request {}: {e}", path.display()),
        })?;
        Ok(Self::parse_toml(&content)?)
    }

    pub fn parse_toml(content: &str) -> Result<Self, PlatoonError> {
        let request: Self = toml::from_str(content).map_err(|e| PlatoonError::Request {
            message: format!("Failed to parse request: {e}"),
        })?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), PlatoonError> {
        let root = &self.root.id.id;
        if let Some(dep) = self.dependencies.iter().find(|d| d.target == *root) {
            return Err(PlatoonError::Request {
                message: format!("root module {root} cannot depend on itself ({dep})"),
            });
        }
        Ok(())
    }

    /// The request's declared constraints, tagged with their source.
    pub fn initial_constraints(&self) -> BTreeSet<Constraint> {
        self.constraints
            .iter()
            .cloned()
            .map(|c| c.into_constraint(ConstraintSource::Declared))
            .collect()
    }

    pub fn platform_rules(&self) -> PlatformRules {
        self.rules.iter().cloned().collect()
    }
}
