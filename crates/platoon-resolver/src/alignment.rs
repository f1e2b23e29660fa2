//! Virtual platform alignment.
//!
//! Members of a virtual platform are pinned to one version: the highest of
//! their current selections, or the version a forced request or an enforced
//! constraint gave one of them. Published platforms never show up here; their constraints
//! reach the resolver through ordinary graph edges.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use platoon_core::constraint::{Constraint, ConstraintSource};
use platoon_core::identity::ModuleIdentity;
use platoon_core::platform::{PlatformRules, RuleKind};
use platoon_core::requirement::VersionRequirement;
use platoon_core::version::VersionScheme;

use crate::builder::CandidateGraph;
use crate::error::ResolveError;
use crate::resolver::{distinct, RequestKind, Resolution, ResolutionReason, Selection};

/// A virtual platform and the version its members were aligned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignedPlatform {
    pub platform: ModuleIdentity,
    pub version: String,
    /// Alignment constraints are forced for this platform.
    pub enforced: bool,
    /// The version came from a forced request or an enforced constraint on
    /// one of the members.
    pub forced_by_member: bool,
    pub members: Vec<ModuleIdentity>,
}

#[derive(Debug, Default)]
pub struct Alignment {
    pub constraints: BTreeSet<Constraint>,
    pub platforms: Vec<AlignedPlatform>,
    pub errors: Vec<ResolveError>,
}

#[derive(Default)]
struct Members<'a> {
    enforced: bool,
    selections: BTreeMap<ModuleIdentity, &'a Selection>,
}

/// Compute alignment constraints for every virtual platform with a selected member.
pub fn align(
    resolution: &Resolution,
    graph: &CandidateGraph,
    rules: &PlatformRules,
    scheme: &dyn VersionScheme,
) -> Alignment {
    let mut platforms: BTreeMap<ModuleIdentity, Members<'_>> = BTreeMap::new();

    for (id, selection) in &resolution.selections {
        let descriptor = graph
            .node(id, &selection.version)
            .and_then(|n| n.descriptor());
        if descriptor.is_some_and(|d| d.category.is_platform()) {
            continue;
        }
        let from_rules = rules
            .memberships(id)
            .filter(|r| r.kind.is_virtual())
            .map(|r| (r.platform.clone(), r.kind == RuleKind::VirtualEnforced));
        let from_metadata = descriptor
            .into_iter()
            .flat_map(|d| d.belongs_to.iter())
            .filter(|m| m.kind().is_virtual())
            .map(|m| (m.platform.clone(), false));

        for (platform, enforced) in from_rules.chain(from_metadata) {
            if platform == *id {
                continue;
            }
            let members = platforms.entry(platform).or_default();
            members.enforced |= enforced;
            members.selections.insert(id.clone(), selection);
        }
    }

    let mut alignment = Alignment::default();
    for (platform, members) in platforms {
        let own = ConstraintSource::Alignment(platform.clone()).to_string();
        let forced = pins(&members, |s| {
            (s.reason == ResolutionReason::Forced).then(|| {
                s.requests
                    .iter()
                    .filter(|r| r.kind == RequestKind::ForcedEdge)
                    .map(ToString::to_string)
                    .collect()
            })
        });
        // Enforced constraints other than this platform's own alignment.
        let enforced = pins(&members, |s| {
            let from: Vec<String> = s
                .requests
                .iter()
                .filter(|r| r.kind == RequestKind::ForcedConstraint && r.requester != own)
                .filter(|r| r.requirement.accepts(scheme, &s.version))
                .map(ToString::to_string)
                .collect();
            (s.reason == ResolutionReason::ByConstraint && !from.is_empty()).then_some(from)
        });

        let (version, forced_by_member) = if !forced.is_empty() {
            match agreed(&forced, scheme) {
                Ok(v) => (Some(v), true),
                Err(requests) => {
                    alignment.errors.push(ResolveError::VersionConflict {
                        module: platform.clone(),
                        requests,
                    });
                    continue;
                }
            }
        } else if !enforced.is_empty() {
            match agreed(&enforced, scheme) {
                Ok(v) => (Some(v), true),
                Err(constraints) => {
                    alignment.errors.push(ResolveError::CyclicForcedConstraint {
                        module: platform.clone(),
                        constraints,
                    });
                    continue;
                }
            }
        } else {
            let versions: Vec<&str> = members
                .selections
                .values()
                .map(|s| s.version.as_str())
                .collect();
            (scheme.max_of(&versions).map(str::to_string), false)
        };
        let Some(version) = version else {
            continue;
        };

        let strict = members.enforced || forced_by_member;
        tracing::debug!(
            "Aligning platform {platform} to {version} ({} member(s){})",
            members.selections.len(),
            if strict { ", forced" } else { "" }
        );
        for member in members.selections.keys() {
            let constraint = Constraint::new(
                member.clone(),
                VersionRequirement::Exact(version.clone()),
                ConstraintSource::Alignment(platform.clone()),
            );
            alignment.constraints.insert(if strict {
                constraint.forced()
            } else {
                constraint
            });
        }
        alignment.platforms.push(AlignedPlatform {
            platform,
            version,
            enforced: members.enforced,
            forced_by_member,
            members: members.selections.into_keys().collect(),
        });
    }
    alignment
}

/// A member whose version was fixed by a forced request or an enforced
/// constraint, with the requests that fixed it.
struct Pin<'a> {
    member: &'a ModuleIdentity,
    version: &'a str,
    by: Vec<String>,
}

fn pins<'m>(
    members: &'m Members<'_>,
    pinned_by: impl Fn(&Selection) -> Option<Vec<String>>,
) -> Vec<Pin<'m>> {
    members
        .selections
        .iter()
        .filter_map(|(id, &s)| {
            pinned_by(s).map(|by| Pin {
                member: id,
                version: s.version.as_str(),
                by,
            })
        })
        .collect()
}

/// The single version every pin agrees on, or a description of each pin.
fn agreed(pins: &[Pin<'_>], scheme: &dyn VersionScheme) -> Result<String, Vec<String>> {
    let versions: Vec<&str> = pins.iter().map(|p| p.version).collect();
    match distinct(&versions, scheme).as_slice() {
        [one] => Ok(one.to_string()),
        _ => Err(pins
            .iter()
            .flat_map(|p| p.by.iter().map(move |r| format!("{} ({r})", p.member)))
            .collect()),
    }
}

/// Members of a platform left at another version than the platform's.
///
/// The only accepted gap is regular alignment to a version the member never
/// published.
pub fn misaligned(
    resolution: &Resolution,
    graph: &CandidateGraph,
    platforms: &[AlignedPlatform],
    scheme: &dyn VersionScheme,
) -> Vec<ResolveError> {
    let mut errors = Vec::new();
    for platform in platforms {
        let strict = platform.enforced || platform.forced_by_member;
        let astray: Vec<String> = platform
            .members
            .iter()
            .filter_map(|member| {
                let version = resolution.version_of(member)?;
                if scheme.same(version, &platform.version) {
                    return None;
                }
                let published = graph
                    .node(member, &platform.version)
                    .is_some_and(|n| n.descriptor().is_some());
                (strict || published).then(|| format!("{member} resolved {version}"))
            })
            .collect();
        if !astray.is_empty() {
            tracing::debug!(
                "Platform {} aligned to {} but {} member(s) differ",
                platform.platform,
                platform.version,
                astray.len()
            );
            errors.push(ResolveError::VersionConflict {
                module: platform.platform.clone(),
                requests: astray,
            });
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::builder::{build, BuildOptions};
    use crate::conflict::ConflictReport;
    use crate::provider::InMemoryProvider;
    use platoon_core::dependency::Dependency;
    use platoon_core::descriptor::ModuleCatalog;
    use platoon_core::identity::ModuleVersion;
    use platoon_core::version::MavenScheme;

    fn id(s: &str) -> ModuleIdentity {
        ModuleIdentity::parse(s).unwrap()
    }

    fn selected(version: &str) -> Selection {
        Selection {
            version: version.to_string(),
            reason: ResolutionReason::Default,
            conflicted: false,
            requests: Vec::new(),
        }
    }

    async fn graph() -> CandidateGraph {
        let catalog = ModuleCatalog::parse_toml(
            r#"
[[module]]
id = "org:a:2.0"
[[module]]
id = "org:b:1.0"
[[module]]
id = "org:b:2.0"
"#,
        )
        .unwrap();
        let provider = Arc::new(InMemoryProvider::new(catalog, Arc::new(MavenScheme)));
        let deps = vec![
            Dependency::exact("org:a", "2.0").unwrap(),
            Dependency::exact("org:b", "1.0").unwrap(),
            Dependency::exact("org:b", "2.0").unwrap(),
        ];
        build(
            &ModuleVersion::parse("com.example:app:1.0").unwrap(),
            &deps,
            &BTreeSet::new(),
            &PlatformRules::default(),
            &provider,
            &BuildOptions::default(),
        )
        .await
    }

    fn platform(version: &str, enforced: bool) -> AlignedPlatform {
        AlignedPlatform {
            platform: id("org:platform"),
            version: version.to_string(),
            enforced,
            forced_by_member: false,
            members: vec![id("org:a"), id("org:b")],
        }
    }

    #[tokio::test]
    async fn member_left_behind_is_reported() {
        let graph = graph().await;
        let resolution = Resolution {
            selections: [(id("org:a"), selected("2.0")), (id("org:b"), selected("1.0"))]
                .into_iter()
                .collect(),
            edges: Vec::new(),
            conflicts: ConflictReport::new(),
            errors: Vec::new(),
        };

        let errors = misaligned(&resolution, &graph, &[platform("2.0", false)], &MavenScheme);
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ResolveError::VersionConflict { module, requests } => {
                assert_eq!(*module, id("org:platform"));
                assert_eq!(requests, &vec!["org:b resolved 1.0".to_string()]);
            }
            other => panic!("expected a version conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unpublished_target_only_excused_for_regular_alignment() {
        let graph = graph().await;
        let resolution = Resolution {
            selections: [(id("org:a"), selected("2.0")), (id("org:b"), selected("2.0"))]
                .into_iter()
                .collect(),
            edges: Vec::new(),
            conflicts: ConflictReport::new(),
            errors: Vec::new(),
        };

        assert!(misaligned(&resolution, &graph, &[platform("3.0", false)], &MavenScheme).is_empty());
        assert_eq!(
            misaligned(&resolution, &graph, &[platform("3.0", true)], &MavenScheme).len(),
            1
        );
    }
}
