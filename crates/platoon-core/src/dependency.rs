use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use platoon_util::errors::PlatoonError;

use crate::identity::ModuleIdentity;
use crate::requirement::VersionRequirement;

/// Variant category of a module, or the category a dependency asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    Library,
    /// A published platform whose constraints participate in normal resolution.
    Platform,
    /// A published platform whose constraints are forced.
    EnforcedPlatform,
}

impl Category {
    pub fn is_platform(self) -> bool {
        matches!(self, Self::Platform | Self::EnforcedPlatform)
    }
}

/// A transitive dependency to exclude: a whole group or a single module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Exclusion {
    pub group: String,
    pub name: Option<String>,
}

impl Exclusion {
    pub fn module(id: &ModuleIdentity) -> Self {
        Self {
            group: id.group.clone(),
            name: Some(id.name.clone()),
        }
    }

    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: None,
        }
    }

    pub fn matches(&self, id: &ModuleIdentity) -> bool {
        self.group == id.group && self.name.as_ref().map_or(true, |n| *n == id.name)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}:{name}", self.group),
            None => f.write_str(&self.group),
        }
    }
}

impl TryFrom<String> for Exclusion {
    type Error = PlatoonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(PlatoonError::Request {
                message: "empty exclusion".to_string(),
            });
        }
        match ModuleIdentity::parse(&value) {
            Some(id) => Ok(Self::module(&id)),
            None if !value.contains(':') => Ok(Self::group(value)),
            None => Err(PlatoonError::Request {
                message: format!("invalid exclusion `{value}`, expected `group` or `group:name`"),
            }),
        }
    }
}

impl From<Exclusion> for String {
    fn from(value: Exclusion) -> Self {
        value.to_string()
    }
}

/// Whether any exclusion in `set` matches `id`.
pub fn excludes(set: &BTreeSet<Exclusion>, id: &ModuleIdentity) -> bool {
    set.iter().any(|e| e.matches(id))
}

/// A declared dependency on another module.
///
/// In TOML:
///
/// ```toml
/// { module = "org.example:lib", version = "[1.0,2.0)", force = true, exclude = ["org.other"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDependency")]
pub struct Dependency {
    pub target: ModuleIdentity,
    pub requirement: VersionRequirement,
    /// Bypasses highest-version-wins.
    pub forced: bool,
    /// Requested variant category, set when depending on a module as a platform.
    pub category: Option<Category>,
    /// Modules skipped in everything reached through this edge.
    pub exclusions: BTreeSet<Exclusion>,
}

impl Dependency {
    pub fn new(target: ModuleIdentity, requirement: VersionRequirement) -> Self {
        Self {
            target,
            requirement,
            forced: false,
            category: None,
            exclusions: BTreeSet::new(),
        }
    }

    /// Shorthand for an exact request, e.g. `Dependency::exact("org:lib", "1.0")`.
    pub fn exact(target: &str, version: &str) -> Result<Self, PlatoonError> {
        let id = ModuleIdentity::try_from(target.to_string())?;
        Ok(Self::new(id, VersionRequirement::parse(version)?))
    }

    pub fn forced(mut self) -> Self {
        self.forced = true;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn excluding(mut self, exclusion: Exclusion) -> Self {
        self.exclusions.insert(exclusion);
        self
    }

    /// True when the dependency asks for the target as a platform.
    pub fn targets_platform(&self) -> bool {
        self.category.is_some_and(Category::is_platform)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target, self.requirement)?;
        if self.forced {
            f.write_str(" (forced)")?;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependency {
    module: ModuleIdentity,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    prefer: Option<String>,
    #[serde(default)]
    force: bool,
    #[serde(default)]
    category: Option<Category>,
    #[serde(default)]
    exclude: BTreeSet<Exclusion>,
}

impl TryFrom<RawDependency> for Dependency {
    type Error = PlatoonError;

    fn try_from(raw: RawDependency) -> Result<Self, Self::Error> {
        let requirement = match (raw.version, raw.prefer) {
            (Some(v), None) => VersionRequirement::parse(&v)?,
            (None, Some(p)) if !p.trim().is_empty() => {
                VersionRequirement::Prefer(p.trim().to_string())
            }
            (Some(_), Some(_)) => {
                return Err(PlatoonError::Request {
                    message: format!(
                        "dependency on {} declares both `version` and `prefer`",
                        raw.module
                    ),
                })
            }
            _ => {
                return Err(PlatoonError::Request {
                    message: format!(
                        "dependency on {} must declare `version` or `prefer`",
                        raw.module
                    ),
                })
            }
        };
        if raw.force && requirement.is_prefer() {
            return Err(PlatoonError::Request {
                message: format!("dependency on {} cannot force a preferred version", raw.module),
            });
        }
        Ok(Self {
            target: raw.module,
            requirement,
            forced: raw.force,
            category: raw.category,
            exclusions: raw.exclude,
        })
    }
}
