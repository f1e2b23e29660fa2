//! Conflict resolution: select exactly one version per module identity.
//!
//! Selection alternates with a walk of the candidate graph from the root that
//! follows only the currently selected versions, so requests made by evicted
//! versions stop counting. Exclusions are tracked per identity during the
//! walk as the intersection over every live path reaching it.
//!
//! Policy per identity, in priority order:
//!
//! 1. forced dependency edges (disagreement is a version conflict)
//! 2. forced constraints from enforced platforms (disagreement is a cyclic
//!    forced constraint)
//! 3. the highest version among exact and range edges and soft constraints,
//!    narrowed to one that satisfies every range when such a version exists
//! 4. preferred versions, only when nothing else asks for the module

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use serde::Serialize;

use platoon_core::constraint::{Constraint, ConstraintSource};
use platoon_core::dependency::{excludes, Category, Exclusion};
use platoon_core::identity::{ModuleIdentity, ModuleVersion};
use platoon_core::requirement::VersionRequirement;
use platoon_core::version::VersionScheme;

use crate::builder::{CandidateEdge, CandidateGraph, EdgeId};
use crate::conflict::{ConflictReport, VersionConflict};
use crate::error::ResolveError;

/// Why a module ended up at its selected version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionReason {
    /// Every request agreed.
    Default,
    /// An explicit forced dependency.
    Forced,
    /// Highest version won among differing requests.
    ConflictResolved,
    /// A constraint picked the version, including enforced platform constraints.
    ByConstraint,
    /// The edge was cut by an exclusion on one of its ancestors.
    ByAncestorExclusion,
}

impl fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Forced => "forced",
            Self::ConflictResolved => "conflict-resolved",
            Self::ByConstraint => "by-constraint",
            Self::ByAncestorExclusion => "by-ancestor-exclusion",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestKind {
    Edge,
    ForcedEdge,
    Prefer,
    Constraint,
    ForcedConstraint,
}

/// One request for a module: an edge or a constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Request {
    pub requester: String,
    pub requirement: VersionRequirement,
    pub kind: RequestKind,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            RequestKind::ForcedEdge => "forced",
            RequestKind::ForcedConstraint => "enforced",
            RequestKind::Prefer => "preferred",
            RequestKind::Constraint => "constrained",
            RequestKind::Edge => "requested",
        };
        write!(f, "{} {verb} {}", self.requester, self.requirement)
    }
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub version: String,
    pub reason: ResolutionReason,
    /// The selected version differs from at least one request.
    pub conflicted: bool,
    pub requests: Vec<Request>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    /// The selected version satisfies the edge's requirement.
    Honored,
    /// Another request won.
    Overridden,
    /// An ancestor excluded the target.
    Excluded,
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Honored => "honored",
            Self::Overridden => "overridden",
            Self::Excluded => "excluded",
        })
    }
}

/// Fate of one edge leaving a selected module (or the root).
#[derive(Debug, Clone)]
pub struct EdgeOutcome {
    pub edge: EdgeId,
    pub status: EdgeStatus,
    pub selected: Option<String>,
    pub reason: ResolutionReason,
}

/// Output of one conflict resolution pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub selections: BTreeMap<ModuleIdentity, Selection>,
    pub edges: Vec<EdgeOutcome>,
    pub conflicts: ConflictReport,
    pub errors: Vec<ResolveError>,
}

impl Resolution {
    pub fn version_of(&self, id: &ModuleIdentity) -> Option<&str> {
        self.selections.get(id).map(|s| s.version.as_str())
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Select one version per identity reachable from the root.
pub fn resolve(
    graph: &CandidateGraph,
    constraints: &BTreeSet<Constraint>,
    scheme: &dyn VersionScheme,
) -> Resolution {
    let mut guide: BTreeMap<ModuleIdentity, String> = BTreeMap::new();
    let mut history: Vec<BTreeMap<ModuleIdentity, String>> = Vec::new();
    // Set once selections start cycling. From then on requests are never
    // forgotten, which makes the loop monotone.
    let mut accumulated: Option<BTreeMap<ModuleIdentity, BTreeSet<Candidate>>> = None;
    let mut rounds = 0usize;

    loop {
        rounds += 1;
        let live = walk(graph, &guide);
        let mut candidates = gather(graph, &live, &guide, constraints);

        let mut grew = false;
        if let Some(acc) = accumulated.as_mut() {
            for (id, current) in candidates.iter_mut() {
                let all = acc.entry(id.clone()).or_default();
                for c in current.iter() {
                    grew |= all.insert(c.clone());
                }
                *current = all.clone();
            }
        }

        let round = select_all(graph, &candidates, scheme);
        let next: BTreeMap<ModuleIdentity, String> = round
            .selections
            .iter()
            .map(|(id, s)| (id.clone(), s.version.clone()))
            .collect();
        let current: BTreeMap<ModuleIdentity, String> = guide
            .iter()
            .filter(|(id, _)| candidates.contains_key(*id))
            .map(|(id, v)| (id.clone(), v.clone()))
            .collect();

        if next == current && !grew {
            tracing::debug!("Selections stable after {rounds} round(s)");
            return finish(graph, &live, round, scheme);
        }

        if accumulated.is_some() {
            guide.extend(next);
        } else {
            if history.contains(&next) {
                tracing::debug!("Selections cycle after {rounds} round(s); keeping every request seen");
                accumulated = Some(candidates);
            }
            history.push(next.clone());
            guide = next;
        }
    }
}

/// A request together with the version it resolved to in the candidate graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    request: Request,
    version: Result<String, String>,
}

impl Candidate {
    fn resolved(&self) -> Option<&str> {
        self.version.as_deref().ok()
    }
}

#[derive(Debug, Default)]
struct LiveGraph {
    nodes: BTreeSet<ModuleVersion>,
    exclusions: BTreeMap<ModuleIdentity, BTreeSet<Exclusion>>,
    /// Non-excluded edges into each reached identity.
    incoming: BTreeMap<ModuleIdentity, Vec<EdgeId>>,
    /// Edges from live nodes whose target an ancestor excluded.
    excluded: Vec<EdgeId>,
}

fn target_version(edge: &CandidateEdge, guide: &BTreeMap<ModuleIdentity, String>) -> Option<String> {
    guide
        .get(edge.target())
        .cloned()
        .or_else(|| edge.resolved.clone())
}

/// Walk from the root following the guide's versions, or each edge's own
/// version for identities the guide does not cover yet.
fn walk(graph: &CandidateGraph, guide: &BTreeMap<ModuleIdentity, String>) -> LiveGraph {
    let mut live = LiveGraph::default();
    let mut queue: VecDeque<(EdgeId, BTreeSet<Exclusion>)> = graph
        .root_edges()
        .iter()
        .map(|&e| (e, graph.edge(e).dependency.exclusions.clone()))
        .collect();

    while let Some((e, inherited)) = queue.pop_front() {
        let edge = graph.edge(e);
        let target = edge.target();
        let narrowed = match live.exclusions.get_mut(target) {
            None => {
                live.exclusions.insert(target.clone(), inherited);
                true
            }
            Some(current) => {
                let next: BTreeSet<Exclusion> = current.intersection(&inherited).cloned().collect();
                let changed = next != *current;
                *current = next;
                changed
            }
        };
        let reached = target_version(edge, guide).map(|v| target.at(v));
        let is_new = reached.as_ref().is_some_and(|n| live.nodes.insert(n.clone()));

        let to_expand: Vec<ModuleVersion> = if narrowed {
            live.nodes.iter().filter(|n| n.id == *target).cloned().collect()
        } else if is_new {
            reached.into_iter().collect()
        } else {
            Vec::new()
        };

        let set = live.exclusions.get(target).cloned().unwrap_or_default();
        for node in to_expand {
            let Some(candidate) = graph.node(&node.id, &node.version) else {
                continue;
            };
            for &out in &candidate.outgoing {
                let dep = &graph.edge(out).dependency;
                if excludes(&set, &dep.target) {
                    continue;
                }
                let mut next = set.clone();
                next.extend(dep.exclusions.iter().cloned());
                queue.push_back((out, next));
            }
        }
    }

    for &e in graph.root_edges() {
        live.incoming
            .entry(graph.edge(e).target().clone())
            .or_default()
            .push(e);
    }
    for node in &live.nodes {
        let Some(candidate) = graph.node(&node.id, &node.version) else {
            continue;
        };
        let set = live.exclusions.get(&node.id);
        for &out in &candidate.outgoing {
            let target = graph.edge(out).target();
            if set.is_some_and(|s| excludes(s, target)) {
                live.excluded.push(out);
            } else {
                live.incoming.entry(target.clone()).or_default().push(out);
            }
        }
    }
    live
}

/// Collect every request for each live identity.
fn gather(
    graph: &CandidateGraph,
    live: &LiveGraph,
    guide: &BTreeMap<ModuleIdentity, String>,
    constraints: &BTreeSet<Constraint>,
) -> BTreeMap<ModuleIdentity, BTreeSet<Candidate>> {
    let mut out: BTreeMap<ModuleIdentity, BTreeSet<Candidate>> = BTreeMap::new();

    for (target, edges) in &live.incoming {
        let set = out.entry(target.clone()).or_default();
        for &e in edges {
            let edge = graph.edge(e);
            let dep = &edge.dependency;
            let kind = if dep.forced {
                RequestKind::ForcedEdge
            } else if dep.requirement.is_prefer() {
                RequestKind::Prefer
            } else {
                RequestKind::Edge
            };
            let version = match &edge.resolved {
                Some(v) => Ok(v.clone()),
                None => Err(unresolved_reason(graph, target, &dep.requirement)),
            };
            set.insert(Candidate {
                request: Request {
                    requester: edge.from.to_string(),
                    requirement: dep.requirement.clone(),
                    kind,
                },
                version,
            });
        }
    }

    for node in &live.nodes {
        let Some(descriptor) = graph
            .node(&node.id, &node.version)
            .and_then(|n| n.descriptor())
        else {
            continue;
        };
        if descriptor.constraints.is_empty() {
            continue;
        }
        let enforced = descriptor.has_forced_constraints()
            || live.incoming.get(&node.id).is_some_and(|edges| {
                edges.iter().any(|&e| {
                    let edge = graph.edge(e);
                    edge.dependency.category == Some(Category::EnforcedPlatform)
                        && target_version(edge, guide).as_deref() == Some(node.version.as_str())
                })
            });
        for declared in &descriptor.constraints {
            let mut constraint = declared
                .clone()
                .into_constraint(ConstraintSource::Published(node.clone()));
            if enforced {
                constraint = constraint.forced();
            }
            add_constraint(graph, &mut out, &constraint);
        }
    }

    for constraint in constraints {
        add_constraint(graph, &mut out, constraint);
    }
    out
}

fn unresolved_reason(
    graph: &CandidateGraph,
    target: &ModuleIdentity,
    requirement: &VersionRequirement,
) -> String {
    match graph.lookup(target, requirement) {
        Some(Err(reason)) => reason.clone(),
        _ => format!("no version of {target} matches {requirement}"),
    }
}

/// Constraints only apply to identities already reached by an edge.
fn add_constraint(
    graph: &CandidateGraph,
    out: &mut BTreeMap<ModuleIdentity, BTreeSet<Candidate>>,
    constraint: &Constraint,
) {
    let Some(set) = out.get_mut(&constraint.target) else {
        return;
    };
    let version = match graph.lookup(&constraint.target, &constraint.requirement) {
        Some(outcome) => outcome.clone(),
        None => Err(format!("{constraint} was never looked up")),
    };
    let published = version
        .as_ref()
        .ok()
        .and_then(|v| graph.node(&constraint.target, v))
        .is_some_and(|n| n.descriptor().is_some());
    if !published
        && !constraint.forced
        && matches!(constraint.source, ConstraintSource::Alignment(_))
    {
        tracing::debug!(
            "Not aligning {} to {}: that version is not published",
            constraint.target,
            constraint.requirement
        );
        return;
    }
    set.insert(Candidate {
        request: Request {
            requester: constraint.source.to_string(),
            requirement: constraint.requirement.clone(),
            kind: if constraint.forced {
                RequestKind::ForcedConstraint
            } else {
                RequestKind::Constraint
            },
        },
        version,
    });
}

struct Round {
    selections: BTreeMap<ModuleIdentity, Selection>,
    errors: Vec<ResolveError>,
}

struct Choice {
    version: Option<String>,
    reason: ResolutionReason,
    error: Option<ResolveError>,
}

fn select_all(
    graph: &CandidateGraph,
    candidates: &BTreeMap<ModuleIdentity, BTreeSet<Candidate>>,
    scheme: &dyn VersionScheme,
) -> Round {
    let mut round = Round {
        selections: BTreeMap::new(),
        errors: Vec::new(),
    };
    for (id, requests) in candidates {
        let choice = select(id, requests, graph, scheme);
        round.errors.extend(choice.error);
        let Some(version) = choice.version else {
            continue;
        };

        let missing = match graph.node(id, &version) {
            Some(node) => node.missing_reason().map(str::to_string),
            None => Some("metadata was never fetched".to_string()),
        };
        if let Some(reason) = missing {
            round.errors.push(ResolveError::UnresolvedModule {
                module: id.at(&version).to_string(),
                requested_by: requests.iter().map(|c| c.request.to_string()).collect(),
                reason,
            });
        }

        let conflicted = requests
            .iter()
            .any(|c| !c.request.requirement.accepts(scheme, &version));
        round.selections.insert(
            id.clone(),
            Selection {
                version,
                reason: choice.reason,
                conflicted,
                requests: requests.iter().map(|c| c.request.clone()).collect(),
            },
        );
    }
    round
}

fn select(
    id: &ModuleIdentity,
    candidates: &BTreeSet<Candidate>,
    graph: &CandidateGraph,
    scheme: &dyn VersionScheme,
) -> Choice {
    let forced = of_kind(candidates, &[RequestKind::ForcedEdge]);
    if !forced.is_empty() {
        return pick_forced(id, &forced, scheme, ResolutionReason::Forced, |requests| {
            ResolveError::VersionConflict {
                module: id.clone(),
                requests,
            }
        });
    }

    let enforced = of_kind(candidates, &[RequestKind::ForcedConstraint]);
    if !enforced.is_empty() {
        return pick_forced(id, &enforced, scheme, ResolutionReason::ByConstraint, |constraints| {
            ResolveError::CyclicForcedConstraint {
                module: id.clone(),
                constraints,
            }
        });
    }

    let pool = of_kind(candidates, &[RequestKind::Edge, RequestKind::Constraint]);
    if !pool.is_empty() {
        return pick_highest(id, &pool, graph, scheme);
    }
    pick_highest(id, &of_kind(candidates, &[RequestKind::Prefer]), graph, scheme)
}

fn of_kind<'a>(candidates: &'a BTreeSet<Candidate>, kinds: &[RequestKind]) -> Vec<&'a Candidate> {
    candidates
        .iter()
        .filter(|c| kinds.contains(&c.request.kind))
        .collect()
}

pub(crate) fn distinct<'a>(versions: &[&'a str], scheme: &dyn VersionScheme) -> Vec<&'a str> {
    let mut out: Vec<&'a str> = Vec::new();
    for &v in versions {
        if !out.iter().any(|d| scheme.same(d, v)) {
            out.push(v);
        }
    }
    out
}

fn pick_forced(
    id: &ModuleIdentity,
    forced: &[&Candidate],
    scheme: &dyn VersionScheme,
    reason: ResolutionReason,
    conflict: impl FnOnce(Vec<String>) -> ResolveError,
) -> Choice {
    let versions: Vec<&str> = forced.iter().filter_map(|c| c.resolved()).collect();
    let distinct = distinct(&versions, scheme);
    let Some(best) = scheme.max_of(&distinct) else {
        return unresolved(id, forced);
    };
    let error = (distinct.len() > 1)
        .then(|| conflict(forced.iter().map(|c| c.request.to_string()).collect()));
    Choice {
        version: Some(best.to_string()),
        reason,
        error,
    }
}

fn pick_highest(
    id: &ModuleIdentity,
    pool: &[&Candidate],
    graph: &CandidateGraph,
    scheme: &dyn VersionScheme,
) -> Choice {
    let versions: Vec<&str> = pool.iter().filter_map(|c| c.resolved()).collect();
    let Some(highest) = scheme.max_of(&versions) else {
        return unresolved(id, pool);
    };
    // A range edge that matched nothing cannot be satisfied by whatever the
    // other requests picked.
    let unmatched: Vec<&Candidate> = pool
        .iter()
        .copied()
        .filter(|c| {
            c.request.kind == RequestKind::Edge
                && matches!(c.request.requirement, VersionRequirement::Range(_))
                && c.resolved().is_none()
        })
        .collect();
    if !unmatched.is_empty() {
        let mut choice = unresolved(id, &unmatched);
        choice.version = Some(highest.to_string());
        choice.reason = ResolutionReason::ConflictResolved;
        return choice;
    }
    let mut best = highest.to_string();
    let mut narrowed = false;

    let ranges: Vec<&VersionRequirement> = pool
        .iter()
        .map(|c| &c.request.requirement)
        .filter(|r| matches!(r, VersionRequirement::Range(_)))
        .collect();
    if !ranges.iter().all(|r| r.accepts(scheme, &best)) {
        let fitting: Vec<&str> = graph
            .versions(id)
            .filter(|n| n.descriptor().is_some())
            .map(|n| n.id.version.as_str())
            .filter(|v| ranges.iter().all(|r| r.accepts(scheme, v)))
            .collect();
        match scheme.max_of(&fitting) {
            Some(v) => {
                tracing::debug!("{id}: {best} is outside a requested range, using {v}");
                best = v.to_string();
                narrowed = true;
            }
            None => tracing::debug!("{id}: no version satisfies every range, keeping {best}"),
        }
    }

    let from_edge = pool.iter().any(|c| {
        c.request.kind != RequestKind::Constraint
            && c.resolved().is_some_and(|v| scheme.same(v, &best))
    });
    let reason = if narrowed || (from_edge && distinct(&versions, scheme).len() > 1) {
        ResolutionReason::ConflictResolved
    } else if !from_edge {
        ResolutionReason::ByConstraint
    } else {
        ResolutionReason::Default
    };
    Choice {
        version: Some(best),
        reason,
        error: None,
    }
}

fn unresolved(id: &ModuleIdentity, requests: &[&Candidate]) -> Choice {
    let reason = requests
        .iter()
        .find_map(|c| c.version.as_ref().err())
        .cloned()
        .unwrap_or_else(|| "nothing requested a concrete version".to_string());
    Choice {
        version: None,
        reason: ResolutionReason::Default,
        error: Some(ResolveError::UnresolvedModule {
            module: id.to_string(),
            requested_by: requests.iter().map(|c| c.request.to_string()).collect(),
            reason,
        }),
    }
}

fn finish(
    graph: &CandidateGraph,
    live: &LiveGraph,
    round: Round,
    scheme: &dyn VersionScheme,
) -> Resolution {
    let mut edges = Vec::new();
    for (target, incoming) in &live.incoming {
        let Some(selection) = round.selections.get(target) else {
            continue;
        };
        for &e in incoming {
            let accepted = graph
                .edge(e)
                .dependency
                .requirement
                .accepts(scheme, &selection.version);
            edges.push(EdgeOutcome {
                edge: e,
                status: if accepted {
                    EdgeStatus::Honored
                } else {
                    EdgeStatus::Overridden
                },
                selected: Some(selection.version.clone()),
                reason: selection.reason,
            });
        }
    }
    for &e in &live.excluded {
        edges.push(EdgeOutcome {
            edge: e,
            status: EdgeStatus::Excluded,
            selected: None,
            reason: ResolutionReason::ByAncestorExclusion,
        });
    }
    edges.sort_by_key(|o| o.edge);

    let mut conflicts = ConflictReport::new();
    for (id, selection) in &round.selections {
        if !selection.conflicted {
            continue;
        }
        for request in &selection.requests {
            if request.requirement.accepts(scheme, &selection.version) {
                continue;
            }
            conflicts.add(VersionConflict {
                module: id.clone(),
                requester: request.requester.clone(),
                requested: request.requirement.to_string(),
                resolved: selection.version.clone(),
                reason: selection.reason,
            });
        }
    }

    Resolution {
        selections: round.selections,
        edges,
        conflicts,
        errors: round.errors,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::builder::{build, BuildOptions};
    use crate::provider::InMemoryProvider;
    use platoon_core::dependency::Dependency;
    use platoon_core::descriptor::ModuleCatalog;
    use platoon_core::platform::PlatformRules;
    use platoon_core::version::MavenScheme;

    fn id(s: &str) -> ModuleIdentity {
        ModuleIdentity::parse(s).unwrap()
    }

    async fn resolve_with(
        catalog: &str,
        deps: Vec<Dependency>,
        constraints: BTreeSet<Constraint>,
    ) -> Resolution {
        let catalog = ModuleCatalog::parse_toml(catalog).unwrap();
        let provider = Arc::new(InMemoryProvider::new(catalog, Arc::new(MavenScheme)));
        let root = ModuleVersion::parse("com.example:app:1.0").unwrap();
        let graph = build(
            &root,
            &deps,
            &constraints,
            &PlatformRules::default(),
            &provider,
            &BuildOptions::default(),
        )
        .await;
        resolve(&graph, &constraints, &MavenScheme)
    }

    const LIBS: &str = r#"
[[module]]
id = "org:lib:1.0"
[[module]]
id = "org:lib:1.5"
[[module]]
id = "org:lib:2.0"
[[module]]
id = "org:a:1.0"
dependencies = [{ module = "org:lib", version = "2.0" }]
"#;

    #[tokio::test]
    async fn highest_version_wins() {
        let r = resolve_with(
            LIBS,
            vec![
                Dependency::exact("org:lib", "1.0").unwrap(),
                Dependency::exact("org:a", "1.0").unwrap(),
            ],
            BTreeSet::new(),
        )
        .await;
        assert!(r.is_ok(), "{:?}", r.errors);
        let lib = &r.selections[&id("org:lib")];
        assert_eq!(lib.version, "2.0");
        assert_eq!(lib.reason, ResolutionReason::ConflictResolved);
        assert!(lib.conflicted);
        assert_eq!(r.conflicts.len(), 1);
        assert_eq!(r.selections[&id("org:a")].reason, ResolutionReason::Default);
    }

    #[tokio::test]
    async fn prefer_only_applies_alone() {
        let prefer = Dependency::new(id("org:lib"), VersionRequirement::Prefer("1.5".into()));
        let r = resolve_with(LIBS, vec![prefer.clone()], BTreeSet::new()).await;
        assert_eq!(r.version_of(&id("org:lib")), Some("1.5"));

        let r = resolve_with(
            LIBS,
            vec![prefer, Dependency::exact("org:lib", "1.0").unwrap()],
            BTreeSet::new(),
        )
        .await;
        assert_eq!(r.version_of(&id("org:lib")), Some("1.0"));
    }

    #[tokio::test]
    async fn range_narrows_the_maximum() {
        let r = resolve_with(
            LIBS,
            vec![
                Dependency::exact("org:lib", "[1.0,2.0)").unwrap(),
                Dependency::exact("org:a", "1.0").unwrap(),
            ],
            BTreeSet::new(),
        )
        .await;
        let lib = &r.selections[&id("org:lib")];
        assert_eq!(lib.version, "1.5");
        assert_eq!(lib.reason, ResolutionReason::ConflictResolved);
    }

    #[tokio::test]
    async fn unmatched_range_beside_exact_is_unresolved() {
        let r = resolve_with(
            LIBS,
            vec![
                Dependency::exact("org:lib", "[3.0,4.0)").unwrap(),
                Dependency::exact("org:lib", "1.0").unwrap(),
            ],
            BTreeSet::new(),
        )
        .await;
        assert_eq!(r.errors.len(), 1);
        match &r.errors[0] {
            ResolveError::UnresolvedModule {
                module,
                requested_by,
                reason,
            } => {
                assert_eq!(module, "org:lib");
                assert_eq!(requested_by.len(), 1);
                assert!(reason.contains("no version of org:lib matches"));
            }
            other => panic!("expected an unresolved module, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn constraint_raises_version() {
        let constraints: BTreeSet<Constraint> = [Constraint::new(
            id("org:lib"),
            VersionRequirement::Exact("1.5".into()),
            ConstraintSource::Declared,
        )]
        .into_iter()
        .collect();
        let r = resolve_with(
            LIBS,
            vec![Dependency::exact("org:lib", "1.0").unwrap()],
            constraints,
        )
        .await;
        let lib = &r.selections[&id("org:lib")];
        assert_eq!(lib.version, "1.5");
        assert_eq!(lib.reason, ResolutionReason::ByConstraint);
    }

    #[tokio::test]
    async fn evicted_versions_stop_requesting() {
        let catalog = r#"
[[module]]
id = "org:a:1.0"
dependencies = [{ module = "org:x", version = "5.0" }]
[[module]]
id = "org:a:2.0"
dependencies = [{ module = "org:x", version = "3.0" }]
[[module]]
id = "org:b:1.0"
dependencies = [{ module = "org:a", version = "2.0" }]
[[module]]
id = "org:x:3.0"
[[module]]
id = "org:x:5.0"
"#;
        let r = resolve_with(
            catalog,
            vec![
                Dependency::exact("org:a", "1.0").unwrap(),
                Dependency::exact("org:b", "1.0").unwrap(),
            ],
            BTreeSet::new(),
        )
        .await;
        assert!(r.is_ok(), "{:?}", r.errors);
        assert_eq!(r.version_of(&id("org:a")), Some("2.0"));
        assert_eq!(r.version_of(&id("org:x")), Some("3.0"));
    }

    #[tokio::test]
    async fn missing_selected_version_is_unresolved() {
        let r = resolve_with(
            LIBS,
            vec![Dependency::exact("org:lib", "9.9").unwrap()],
            BTreeSet::new(),
        )
        .await;
        assert_eq!(r.errors.len(), 1);
        assert!(matches!(
            &r.errors[0],
            ResolveError::UnresolvedModule { module, .. } if module == "org:lib:9.9"
        ));
    }

    #[tokio::test]
    async fn missing_but_evicted_version_is_fine() {
        let r = resolve_with(
            LIBS,
            vec![
                Dependency::exact("org:lib", "0.5").unwrap(),
                Dependency::exact("org:lib", "2.0").unwrap(),
            ],
            BTreeSet::new(),
        )
        .await;
        assert!(r.is_ok(), "{:?}", r.errors);
        assert_eq!(r.version_of(&id("org:lib")), Some("2.0"));
    }

    #[tokio::test]
    async fn edge_outcomes_reported() {
        let r = resolve_with(
            LIBS,
            vec![
                Dependency::exact("org:lib", "1.0").unwrap(),
                Dependency::exact("org:a", "1.0").unwrap(),
            ],
            BTreeSet::new(),
        )
        .await;
        let statuses: Vec<EdgeStatus> = r.edges.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![EdgeStatus::Overridden, EdgeStatus::Honored, EdgeStatus::Honored]
        );
    }

    #[test]
    fn reason_display_matches_serde() {
        assert_eq!(ResolutionReason::ConflictResolved.to_string(), "conflict-resolved");
        assert_eq!(
            serde_json::to_string(&ResolutionReason::ByAncestorExclusion).unwrap(),
            "\"by-ancestor-exclusion\""
        );
    }
}
