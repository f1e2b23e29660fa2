//! Platform membership rules.
//!
//! A rule says "modules matching X belong to platform P". The rule table is
//! closed: every rule is one of three kinds, so the alignment engine can
//! handle them exhaustively.

use std::fmt;

use serde::Deserialize;

use platoon_util::errors::PlatoonError;

use crate::identity::ModuleIdentity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum RuleKind {
    /// Members are aligned to one version; alignment constraints are soft.
    #[serde(rename = "virtual")]
    VirtualRegular,
    /// Members are aligned to one version; alignment constraints are forced.
    #[serde(rename = "virtual-enforced")]
    VirtualEnforced,
    /// The platform is a real module whose published constraints are
    /// trusted as-is; no alignment is computed.
    #[serde(rename = "published")]
    PublishedTrusted,
}

impl RuleKind {
    pub fn is_virtual(self) -> bool {
        !matches!(self, Self::PublishedTrusted)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VirtualRegular => "virtual",
            Self::VirtualEnforced => "virtual-enforced",
            Self::PublishedTrusted => "published",
        })
    }
}

/// Which modules a rule claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberMatcher {
    Module(ModuleIdentity),
    Group(String),
}

impl MemberMatcher {
    pub fn matches(&self, id: &ModuleIdentity) -> bool {
        match self {
            Self::Module(m) => m == id,
            Self::Group(g) => *g == id.group,
        }
    }
}

/// A `belongsTo`-style declaration.
///
/// ```toml
/// [[platform-rule]]
/// group = "com.fasterxml.jackson.core"
/// platform = "com.fasterxml.jackson:jackson-platform"
/// kind = "virtual"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRule")]
pub struct PlatformRule {
    pub members: MemberMatcher,
    pub platform: ModuleIdentity,
    pub kind: RuleKind,
}

impl PlatformRule {
    pub fn new(members: MemberMatcher, platform: ModuleIdentity, kind: RuleKind) -> Self {
        Self {
            members,
            platform,
            kind,
        }
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(default)]
    module: Option<ModuleIdentity>,
    #[serde(default)]
    group: Option<String>,
    platform: ModuleIdentity,
    #[serde(default = "default_kind")]
    kind: RuleKind,
}

fn default_kind() -> RuleKind {
    RuleKind::VirtualRegular
}

impl TryFrom<RawRule> for PlatformRule {
    type Error = PlatoonError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let members = match (raw.module, raw.group) {
            (Some(m), None) => MemberMatcher::Module(m),
            (None, Some(g)) if !g.is_empty() => MemberMatcher::Group(g),
            _ => {
                return Err(PlatoonError::Request {
                    message: format!(
                        "platform rule for {} needs exactly one of `module` or `group`",
                        raw.platform
                    ),
                })
            }
        };
        Ok(Self::new(members, raw.platform, raw.kind))
    }
}

/// Platform membership published in a module descriptor.
///
/// ```toml
/// belongs-to = [{ platform = "org.example:platform", virtual = true }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Membership {
    pub platform: ModuleIdentity,
    #[serde(default = "default_virtual", rename = "virtual")]
    pub virtual_platform: bool,
}

fn default_virtual() -> bool {
    true
}

impl Membership {
    pub fn kind(&self) -> RuleKind {
        if self.virtual_platform {
            RuleKind::VirtualRegular
        } else {
            RuleKind::PublishedTrusted
        }
    }
}

/// The closed rule table consulted during resolution.
#[derive(Debug, Clone, Default)]
pub struct PlatformRules {
    rules: Vec<PlatformRule>,
}

impl PlatformRules {
    pub fn new(rules: Vec<PlatformRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: PlatformRule) {
        self.rules.push(rule);
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformRule> {
        self.rules.iter()
    }

    /// Every rule claiming `id`.
    pub fn memberships<'a>(
        &'a self,
        id: &'a ModuleIdentity,
    ) -> impl Iterator<Item = &'a PlatformRule> + 'a {
        self.rules.iter().filter(move |r| r.members.matches(id))
    }
}

impl FromIterator<PlatformRule> for PlatformRules {
    fn from_iter<I: IntoIterator<Item = PlatformRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
