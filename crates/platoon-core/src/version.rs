//! Version ordering strategies.
//!
//! Resolution only ever needs a total order over version strings, so the
//! ordering is a [`VersionScheme`] chosen per resolution run:
//!
//! - [`MavenScheme`] (default): segments split on `.` and `-`, numeric
//!   segments compare as numbers, well-known qualifiers order as
//!   `alpha` < `beta` < `milestone` < `rc` < `snapshot` < `""` (release) < `sp`,
//!   unknown text sorts below numbers and compares case-insensitively.
//!   Trailing zero segments are insignificant, so `1.0 == 1.0.0`.
//! - [`SemverScheme`]: semver 2.0 precedence. Strings that are not valid
//!   semver sort below every valid version and compare lexically among
//!   themselves.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A total, deterministic order over version strings.
pub trait VersionScheme: fmt::Debug + Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &'static str;

    fn compare(&self, a: &str, b: &str) -> Ordering;

    fn same(&self, a: &str, b: &str) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    /// The greatest of `versions`, keeping the first on ties.
    fn max_of<'a>(&self, versions: &[&'a str]) -> Option<&'a str> {
        let mut best: Option<&'a str> = None;
        for &v in versions {
            best = match best {
                Some(b) if self.compare(v, b) != Ordering::Greater => Some(b),
                _ => Some(v),
            };
        }
        best
    }
}

/// Which built-in scheme to use, as named in configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSchemeKind {
    #[default]
    Maven,
    Semver,
}

impl VersionSchemeKind {
    pub fn scheme(self) -> Arc<dyn VersionScheme> {
        match self {
            Self::Maven => Arc::new(MavenScheme),
            Self::Semver => Arc::new(SemverScheme),
        }
    }
}

/// Maven-style segment ordering.
#[derive(Debug, Clone, Copy, Default)]
pub struct MavenScheme;

impl VersionScheme for MavenScheme {
    fn name(&self) -> &'static str {
        "maven"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        MavenVersion::parse(a).cmp(&MavenVersion::parse(b))
    }
}

/// Semver 2.0 precedence.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverScheme;

impl VersionScheme for SemverScheme {
    fn name(&self) -> &'static str {
        "semver"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        match (semver::Version::parse(a), semver::Version::parse(b)) {
            // Build metadata is ignored for precedence.
            (Ok(x), Ok(y)) => {
                (x.major, x.minor, x.patch, &x.pre).cmp(&(y.major, y.minor, y.patch, &y.pre))
            }
            (Ok(_), Err(_)) => Ordering::Greater,
            (Err(_), Ok(_)) => Ordering::Less,
            (Err(_), Err(_)) => a.cmp(b),
        }
    }
}

/// A parsed Maven version with comparable segments.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    pub original: String,
    segments: Vec<Segment>,
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    Numeric(u64),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

impl MavenVersion {
    pub fn parse(version: &str) -> Self {
        Self {
            original: version.to_string(),
            segments: parse_segments(version),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        (0..len)
            .map(|i| compare_segments(self.segments.get(i), other.segments.get(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_to_missing(s),
        (None, Some(s)) => compare_to_missing(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

/// A missing segment behaves like `0` / release.
fn compare_to_missing(seg: &Segment) -> Ordering {
    match seg {
        Segment::Numeric(n) => n.cmp(&0),
        Segment::Qualifier(q) => q.cmp(&QualifierKind::Release),
        Segment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    use Segment::*;
    match (a, b) {
        (Numeric(a), Numeric(b)) => a.cmp(b),
        (Qualifier(a), Qualifier(b)) => a.cmp(b),
        (Text(a), Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
        (Numeric(_), _) => Ordering::Greater,
        (_, Numeric(_)) => Ordering::Less,
        (Qualifier(q), Text(_)) => {
            if *q >= QualifierKind::Release {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (Text(_), Qualifier(q)) => {
            if *q >= QualifierKind::Release {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
    }
}

fn parse_segments(version: &str) -> Vec<Segment> {
    version
        .split(['.', '-'])
        .filter(|token| !token.is_empty())
        .map(classify)
        .collect()
}

fn classify(token: &str) -> Segment {
    if let Ok(n) = token.parse::<u64>() {
        return Segment::Numeric(n);
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        _ => Segment::Text(token.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maven(a: &str, b: &str) -> Ordering {
        MavenScheme.compare(a, b)
    }

    #[test]
    fn basic_ordering() {
        assert_eq!(maven("1.0", "2.0"), Ordering::Less);
        assert_eq!(maven("1.0.1", "1.0.0"), Ordering::Greater);
        assert_eq!(maven("1.10", "1.9"), Ordering::Greater);
    }

    #[test]
    fn qualifier_ordering() {
        let ordered = [
            "1.0-alpha",
            "1.0-beta",
            "1.0-milestone",
            "1.0-rc",
            "1.0-SNAPSHOT",
            "1.0",
            "1.0-sp",
        ];
        for pair in ordered.windows(2) {
            assert_eq!(maven(pair[0], pair[1]), Ordering::Less, "{pair:?}");
        }
    }

    #[test]
    fn trailing_zeros_equal() {
        assert!(MavenScheme.same("1.0", "1.0.0"));
        assert!(MavenScheme.same("2", "2.0"));
        assert!(MavenScheme.same("1.0-final", "1.0"));
    }

    #[test]
    fn numeric_beats_text_qualifier() {
        assert_eq!(maven("1.0.0", "1.0.0-jre"), Ordering::Greater);
        assert_eq!(maven("31.0-jre", "32.0-jre"), Ordering::Less);
    }

    #[test]
    fn snapshot_flag() {
        assert!(MavenVersion::parse("1.0-SNAPSHOT").is_snapshot());
        assert!(!MavenVersion::parse("1.0").is_snapshot());
    }

    #[test]
    fn max_of_keeps_first_on_ties() {
        assert_eq!(MavenScheme.max_of(&["1.0", "2.0", "2.0.0"]), Some("2.0"));
        assert_eq!(MavenScheme.max_of(&[]), None);
    }

    #[test]
    fn semver_prerelease_before_release() {
        assert_eq!(SemverScheme.compare("1.0.0-rc.1", "1.0.0"), Ordering::Less);
        assert_eq!(SemverScheme.compare("1.2.0", "1.10.0"), Ordering::Less);
        assert!(SemverScheme.same("1.0.0+build.5", "1.0.0"));
    }

    #[test]
    fn semver_invalid_sorts_first() {
        assert_eq!(SemverScheme.compare("banana", "0.0.1"), Ordering::Less);
        assert_eq!(SemverScheme.compare("b", "a"), Ordering::Greater);
    }

    #[test]
    fn scheme_kind_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            scheme: VersionSchemeKind,
        }
        let w: Wrapper = toml::from_str("scheme = \"semver\"").unwrap();
        assert_eq!(w.scheme, VersionSchemeKind::Semver);
        assert_eq!(w.scheme.scheme().name(), "semver");
    }
}
