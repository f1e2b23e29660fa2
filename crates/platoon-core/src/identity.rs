//! Module identities and versioned module coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

use platoon_util::errors::PlatoonError;

/// A `group:name` pair identifying a logical module independent of version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleIdentity {
    pub group: String,
    pub name: String,
}

impl ModuleIdentity {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse `"group:name"` into an identity.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, name) = s.split_once(':')?;
        if group.is_empty() || name.is_empty() || name.contains(':') {
            return None;
        }
        Some(Self::new(group, name))
    }

    /// Attach a version to this identity.
    pub fn at(&self, version: impl Into<String>) -> ModuleVersion {
        ModuleVersion {
            id: self.clone(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl TryFrom<String> for ModuleIdentity {
    type Error = PlatoonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| PlatoonError::Request {
            message: format!("invalid module identity `{value}`, expected `group:name`"),
        })
    }
}

impl From<ModuleIdentity> for String {
    fn from(value: ModuleIdentity) -> Self {
        value.to_string()
    }
}

/// A module identity together with a concrete version string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleVersion {
    pub id: ModuleIdentity,
    pub version: String,
}

impl ModuleVersion {
    /// Parse `"group:name:version"` into coordinates.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, name, version]
                if !group.is_empty() && !name.is_empty() && !version.is_empty() =>
            {
                Some(ModuleIdentity::new(*group, *name).at(*version))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.version)
    }
}

impl TryFrom<String> for ModuleVersion {
    type Error = PlatoonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| PlatoonError::Request {
            message: format!("invalid module coordinates `{value}`, expected `group:name:version`"),
        })
    }
}

impl From<ModuleVersion> for String {
    fn from(value: ModuleVersion) -> Self {
        value.to_string()
    }
}
