//! Requested versions: exact, range, or preferred.

use std::cmp::Ordering;
use std::fmt;

use platoon_util::errors::PlatoonError;

use crate::version::VersionScheme;

/// What a dependency or constraint asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionRequirement {
    /// A specific version, subject to highest-version-wins.
    Exact(String),
    /// A bracketed range, resolved to the highest available version inside it.
    Range(VersionRange),
    /// A soft preference used only when nothing else asks for the module.
    Prefer(String),
}

impl VersionRequirement {
    /// Parse a requirement string: bracketed strings are ranges, anything
    /// else is an exact version.
    pub fn parse(spec: &str) -> Result<Self, PlatoonError> {
        let s = spec.trim();
        if s.is_empty() {
            return Err(PlatoonError::Request {
                message: "empty version requirement".to_string(),
            });
        }
        if s.starts_with('[') || s.starts_with('(') {
            return VersionRange::parse(s).map(Self::Range);
        }
        Ok(Self::Exact(s.to_string()))
    }

    /// The version string this requirement names, if it names exactly one.
    pub fn version(&self) -> Option<&str> {
        match self {
            Self::Exact(v) | Self::Prefer(v) => Some(v),
            Self::Range(_) => None,
        }
    }

    pub fn is_prefer(&self) -> bool {
        matches!(self, Self::Prefer(_))
    }

    /// Whether `version` satisfies this requirement under `scheme`.
    pub fn accepts(&self, scheme: &dyn VersionScheme, version: &str) -> bool {
        match self {
            Self::Exact(v) | Self::Prefer(v) => scheme.same(v, version),
            Self::Range(range) => range.contains(scheme, version),
        }
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => f.write_str(v),
            Self::Range(r) => write!(f, "{r}"),
            Self::Prefer(v) => write!(f, "prefer {v}"),
        }
    }
}

/// A Maven-style version range expression.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionRange {
    pub lower: Option<RangeBound>,
    pub upper: Option<RangeBound>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeBound {
    pub version: String,
    pub inclusive: bool,
}

impl VersionRange {
    pub fn parse(spec: &str) -> Result<Self, PlatoonError> {
        let s = spec.trim();
        let malformed = || PlatoonError::Request {
            message: format!("malformed version range `{spec}`"),
        };
        let open_inclusive = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(malformed()),
        };
        let close_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(malformed()),
        };
        if s.len() < 2 {
            return Err(malformed());
        }
        let inner = &s[1..s.len() - 1];

        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| RangeBound {
                version: text.to_string(),
                inclusive,
            })
        };

        match inner.split_once(',') {
            Some((lower, upper)) => {
                if upper.contains(',') {
                    return Err(malformed());
                }
                Ok(VersionRange {
                    lower: bound(lower, open_inclusive),
                    upper: bound(upper, close_inclusive),
                })
            }
            // `[1.0]` means exactly 1.0
            None if open_inclusive && close_inclusive && !inner.trim().is_empty() => {
                Ok(VersionRange {
                    lower: bound(inner, true),
                    upper: bound(inner, true),
                })
            }
            None => Err(malformed()),
        }
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, scheme: &dyn VersionScheme, version: &str) -> bool {
        if let Some(lower) = &self.lower {
            match scheme.compare(version, &lower.version) {
                Ordering::Less => return false,
                Ordering::Equal if !lower.inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match scheme.compare(version, &upper.version) {
                Ordering::Greater => return false,
                Ordering::Equal if !upper.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(l), Some(u)) = (&self.lower, &self.upper) {
            if l == u && l.inclusive {
                return write!(f, "[{}]", l.version);
            }
        }
        let open = match &self.lower {
            Some(b) if b.inclusive => '[',
            _ => '(',
        };
        let close = match &self.upper {
            Some(b) if b.inclusive => ']',
            _ => ')',
        };
        let lower = self.lower.as_ref().map_or("", |b| b.version.as_str());
        let upper = self.upper.as_ref().map_or("", |b| b.version.as_str());
        write!(f, "{open}{lower},{upper}{close}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::MavenScheme;

    fn range(s: &str) -> VersionRange {
        VersionRange::parse(s).unwrap()
    }

    #[test]
    fn version_range_inclusive() {
        let r = range("[1.0,2.0]");
        assert!(r.contains(&MavenScheme, "1.0"));
        assert!(r.contains(&MavenScheme, "1.5"));
        assert!(r.contains(&MavenScheme, "2.0"));
        assert!(!r.contains(&MavenScheme, "0.9"));
        assert!(!r.contains(&MavenScheme, "2.1"));
    }

    #[test]
    fn version_range_exclusive_upper() {
        let r = range("[1.0,2.0)");
        assert!(r.contains(&MavenScheme, "1.9.9"));
        assert!(!r.contains(&MavenScheme, "2.0"));
        assert!(!r.contains(&MavenScheme, "2.0.0"));
    }

    #[test]
    fn version_range_open_lower() {
        let r = range("(,2.0)");
        assert!(r.contains(&MavenScheme, "0.1"));
        assert!(!r.contains(&MavenScheme, "2.0"));
    }

    #[test]
    fn version_range_exact() {
        let r = range("[1.5]");
        assert!(r.contains(&MavenScheme, "1.5"));
        assert!(!r.contains(&MavenScheme, "1.4"));
        assert_eq!(r.to_string(), "[1.5]");
    }

    #[test]
    fn malformed_ranges_rejected() {
        assert!(VersionRange::parse("[1.0,2.0").is_err());
        assert!(VersionRange::parse("(1.0)").is_err());
        assert!(VersionRange::parse("[1,2,3]").is_err());
        assert!(VersionRange::parse("[").is_err());
    }

    #[test]
    fn requirement_parse() {
        assert_eq!(
            VersionRequirement::parse("1.0").unwrap(),
            VersionRequirement::Exact("1.0".into())
        );
        assert!(matches!(
            VersionRequirement::parse("[1.0,)").unwrap(),
            VersionRequirement::Range(_)
        ));
        assert!(VersionRequirement::parse("  ").is_err());
    }

    #[test]
    fn requirement_display() {
        assert_eq!(VersionRequirement::parse("[1.0,2.0)").unwrap().to_string(), "[1.0,2.0)");
        assert_eq!(VersionRequirement::Prefer("3.1".into()).to_string(), "prefer 3.1");
    }

    #[test]
    fn requirement_accepts_equivalent_versions() {
        let exact = VersionRequirement::Exact("1.0".into());
        assert!(exact.accepts(&MavenScheme, "1.0.0"));
        assert!(!exact.accepts(&MavenScheme, "1.1"));
    }
}
