//! Module descriptors and TOML module catalogs.
//!
//! A descriptor is what the metadata layer knows about one published module
//! version: what it depends on, what it constrains, which variant category it
//! publishes, and which platforms it claims membership of.

use std::path::Path;

use serde::Deserialize;

use platoon_util::errors::PlatoonError;

use crate::constraint::DeclaredConstraint;
use crate::dependency::{Category, Dependency};
use crate::identity::{ModuleIdentity, ModuleVersion};
use crate::platform::Membership;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDescriptor {
    pub id: ModuleVersion,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub constraints: Vec<DeclaredConstraint>,
    #[serde(default, rename = "belongs-to")]
    pub belongs_to: Vec<Membership>,
}

impl ModuleDescriptor {
    /// A library descriptor with no dependencies.
    pub fn new(id: ModuleVersion) -> Self {
        Self {
            id,
            category: Category::Library,
            dependencies: Vec::new(),
            constraints: Vec::new(),
            belongs_to: Vec::new(),
        }
    }

    pub fn identity(&self) -> &ModuleIdentity {
        &self.id.id
    }

    pub fn version(&self) -> &str {
        &self.id.version
    }

    /// True for the enforced-platform variant, whose constraints are forced.
    pub fn has_forced_constraints(&self) -> bool {
        self.category == Category::EnforcedPlatform
    }
}

/// A set of module descriptors loaded from a TOML file.
///
/// ```toml
/// [[module]]
/// id = "org.example:db:1.0"
/// dependencies = [{ module = "org.example:lib", version = "2.0" }]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleCatalog {
    #[serde(default)]
    pub module: Vec<ModuleDescriptor>,
}

impl ModuleCatalog {
    /// Load and parse a catalog file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlatoonError::Request {
            message: format!("Failed to read catalog {}: {e}", path.display()),
        })?;
        let catalog: Self = toml::from_str(&content).map_err(|e| PlatoonError::Request {
            message: format!("Failed to parse catalog {}: {e}", path.display()),
        })?;
        catalog.check_duplicates()?;
        Ok(catalog)
    }

    pub fn parse_toml(content: &str) -> Result<Self, PlatoonError> {
        let catalog: Self = toml::from_str(content).map_err(|e| PlatoonError::Request {
            message: format!("Failed to parse catalog: {e}"),
        })?;
        catalog.check_duplicates()?;
        Ok(catalog)
    }

    /// Merge another catalog into this one.
    pub fn extend(&mut self, other: ModuleCatalog) -> Result<(), PlatoonError> {
        self.module.extend(other.module);
        self.check_duplicates()
    }

    pub fn len(&self) -> usize {
        self.module.len()
    }

    pub fn is_empty(&self) -> bool {
        self.module.is_empty()
    }

    fn check_duplicates(&self) -> Result<(), PlatoonError> {
        let mut seen = std::collections::HashSet::new();
        for m in &self.module {
            if !seen.insert(&m.id) {
                return Err(PlatoonError::Request {
                    message: format!("module {} is declared more than once", m.id),
                });
            }
        }
        Ok(())
    }
}
