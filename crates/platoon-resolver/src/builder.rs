//! Candidate graph construction.
//!
//! The builder expands the root's dependencies breadth-first, one level at a
//! time, prefetching the metadata for each level concurrently. It records every
//! version any edge or constraint asks for, so the conflict resolver can choose
//! between them without further lookups.
//!
//! Missing or failed metadata is recorded on the node instead of being raised:
//! it only becomes an error if that version is eventually selected.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};

use platoon_core::constraint::Constraint;
use platoon_core::dependency::{excludes, Category, Dependency, Exclusion};
use platoon_core::descriptor::ModuleDescriptor;
use platoon_core::identity::{ModuleIdentity, ModuleVersion};
use platoon_core::platform::{PlatformRules, RuleKind};
use platoon_core::requirement::VersionRequirement;

use crate::provider::{LookupError, LookupResult, MetadataProvider};

pub type EdgeId = usize;

/// What the builder learned about one module version.
#[derive(Debug, Clone)]
pub enum NodeState {
    Resolved(Arc<ModuleDescriptor>),
    /// No usable metadata, with the reason.
    Missing(String),
}

#[derive(Debug, Clone)]
pub struct CandidateNode {
    pub id: ModuleVersion,
    pub state: NodeState,
    /// Outgoing edges, filled in when the node is first expanded.
    pub outgoing: Vec<EdgeId>,
}

impl CandidateNode {
    pub fn descriptor(&self) -> Option<&ModuleDescriptor> {
        match &self.state {
            NodeState::Resolved(d) => Some(d),
            NodeState::Missing(_) => None,
        }
    }

    pub fn missing_reason(&self) -> Option<&str> {
        match &self.state {
            NodeState::Resolved(_) => None,
            NodeState::Missing(reason) => Some(reason),
        }
    }
}

/// A dependency edge from a concrete module version to a module identity.
#[derive(Debug, Clone)]
pub struct CandidateEdge {
    pub id: EdgeId,
    pub from: ModuleVersion,
    pub dependency: Dependency,
    /// Version the requirement resolved to. `None` until the edge is followed,
    /// or when no published version satisfies it.
    pub resolved: Option<String>,
    /// Added for published platform membership, not declared by the module.
    pub synthetic: bool,
}

impl CandidateEdge {
    pub fn target(&self) -> &ModuleIdentity {
        &self.dependency.target
    }
}

/// The candidate graph: an arena of module versions keyed by identity, with
/// edges held in a flat list and addressed by [`EdgeId`]. Cycles are allowed.
#[derive(Debug, Clone)]
pub struct CandidateGraph {
    root: ModuleVersion,
    root_edges: Vec<EdgeId>,
    nodes: BTreeMap<ModuleIdentity, BTreeMap<String, CandidateNode>>,
    edges: Vec<CandidateEdge>,
    lookups: HashMap<(ModuleIdentity, VersionRequirement), Result<String, String>>,
}

impl CandidateGraph {
    pub fn root(&self) -> &ModuleVersion {
        &self.root
    }

    pub fn root_edges(&self) -> &[EdgeId] {
        &self.root_edges
    }

    pub fn edge(&self, id: EdgeId) -> &CandidateEdge {
        &self.edges[id]
    }

    pub fn edges(&self) -> &[CandidateEdge] {
        &self.edges
    }

    pub fn node(&self, id: &ModuleIdentity, version: &str) -> Option<&CandidateNode> {
        self.nodes.get(id)?.get(version)
    }

    /// Every recorded version of a module, resolved or missing.
    pub fn versions<'a>(&'a self, id: &ModuleIdentity) -> impl Iterator<Item = &'a CandidateNode> {
        self.nodes.get(id).into_iter().flat_map(|vs| vs.values())
    }

    pub fn contains(&self, id: &ModuleIdentity) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.values().map(BTreeMap::len).sum()
    }

    /// The version a requirement resolved to during the build, or why it did not.
    pub fn lookup(
        &self,
        id: &ModuleIdentity,
        requirement: &VersionRequirement,
    ) -> Option<&Result<String, String>> {
        self.lookups.get(&(id.clone(), requirement.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub max_concurrent_lookups: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: 8,
        }
    }
}

/// Expand `dependencies` of `root` into a candidate graph.
///
/// `constraints` never add modules, but every version they name for a module
/// already in the graph is fetched and expanded so it can be selected.
pub async fn build<P: MetadataProvider>(
    root: &ModuleVersion,
    dependencies: &[Dependency],
    constraints: &BTreeSet<Constraint>,
    rules: &PlatformRules,
    provider: &Arc<P>,
    options: &BuildOptions,
) -> CandidateGraph {
    let mut builder = GraphBuilder::new(root.clone(), rules);
    for c in constraints {
        builder.constrained.push((c.target.clone(), c.requirement.clone()));
    }

    let mut queue: VecDeque<Arrival> = VecDeque::new();
    for dep in dependencies {
        if dep.target == root.id {
            tracing::debug!("Ignoring root dependency on itself: {dep}");
            continue;
        }
        let edge = builder.add_edge(root.clone(), dep.clone(), false);
        builder.graph.root_edges.push(edge);
        queue.push_back(Arrival::Edge {
            edge,
            exclusions: dep.exclusions.clone(),
        });
    }

    let semaphore = Arc::new(Semaphore::new(options.max_concurrent_lookups.max(1)));

    while !queue.is_empty() {
        let level: Vec<Arrival> = queue.drain(..).collect();
        builder.prefetch(&level, provider, &semaphore).await;
        for arrival in level {
            builder.process(arrival, &mut queue);
        }
        queue.extend(builder.pending_probes());
    }

    tracing::debug!(
        "Built candidate graph: {} nodes, {} edges",
        builder.graph.node_count(),
        builder.graph.edges.len()
    );
    builder.graph
}

/// Work item for one BFS level.
enum Arrival {
    /// An edge was reached with the given inherited exclusions.
    Edge {
        edge: EdgeId,
        exclusions: BTreeSet<Exclusion>,
    },
    /// A constraint names a version of a module already in the graph.
    Probe {
        target: ModuleIdentity,
        requirement: VersionRequirement,
    },
}

struct GraphBuilder<'a> {
    graph: CandidateGraph,
    rules: &'a PlatformRules,
    /// Exclusions in force for each identity: the intersection over every
    /// path reaching it. Sets only shrink.
    exclusions: HashMap<ModuleIdentity, BTreeSet<Exclusion>>,
    expanded: HashSet<ModuleVersion>,
    constrained: Vec<(ModuleIdentity, VersionRequirement)>,
    probed: HashSet<(ModuleIdentity, VersionRequirement)>,
}

impl<'a> GraphBuilder<'a> {
    fn new(root: ModuleVersion, rules: &'a PlatformRules) -> Self {
        Self {
            graph: CandidateGraph {
                root,
                root_edges: Vec::new(),
                nodes: BTreeMap::new(),
                edges: Vec::new(),
                lookups: HashMap::new(),
            },
            rules,
            exclusions: HashMap::new(),
            expanded: HashSet::new(),
            constrained: Vec::new(),
            probed: HashSet::new(),
        }
    }

    fn add_edge(&mut self, from: ModuleVersion, dependency: Dependency, synthetic: bool) -> EdgeId {
        let id = self.graph.edges.len();
        self.graph.edges.push(CandidateEdge {
            id,
            from,
            dependency,
            resolved: None,
            synthetic,
        });
        id
    }

    fn request_of(&self, arrival: &Arrival) -> (ModuleIdentity, VersionRequirement) {
        match arrival {
            Arrival::Edge { edge, .. } => {
                let dep = &self.graph.edges[*edge].dependency;
                (dep.target.clone(), dep.requirement.clone())
            }
            Arrival::Probe {
                target,
                requirement,
            } => (target.clone(), requirement.clone()),
        }
    }

    /// Fetch metadata for every request in `level` not looked up yet.
    async fn prefetch<P: MetadataProvider>(
        &mut self,
        level: &[Arrival],
        provider: &Arc<P>,
        semaphore: &Arc<Semaphore>,
    ) {
        let to_fetch: HashSet<(ModuleIdentity, VersionRequirement)> = level
            .iter()
            .map(|a| self.request_of(a))
            .filter(|key| !self.graph.lookups.contains_key(key))
            .collect();
        if to_fetch.is_empty() {
            return;
        }

        let mut join_set = JoinSet::new();
        let mut tasks: HashMap<task::Id, (ModuleIdentity, VersionRequirement)> = HashMap::new();
        for (id, requirement) in to_fetch {
            let provider = provider.clone();
            let sem = semaphore.clone();
            let key = (id.clone(), requirement.clone());
            let handle = join_set.spawn(async move {
                let _permit = sem.acquire().await;
                tracing::debug!("Looking up {id}:{requirement}");
                provider.lookup(&id, &requirement).await
            });
            tasks.insert(handle.id(), key);
        }
        while let Some(joined) = join_set.join_next_with_id().await {
            let (task_id, result) = match joined {
                Ok((task_id, result)) => (task_id, Ok(result)),
                Err(e) => (e.id(), Err(e)),
            };
            let Some((id, requirement)) = tasks.remove(&task_id) else {
                continue;
            };
            // A panicked or cancelled task still counts as a failed lookup.
            let result = result.unwrap_or_else(|e| {
                tracing::warn!("Metadata lookup task for {id}:{requirement} failed: {e}");
                Err(LookupError::Unavailable {
                    module: id.to_string(),
                    message: format!("lookup task failed: {e}"),
                })
            });
            self.record_lookup(id, requirement, result);
        }
    }

    fn record_lookup(
        &mut self,
        id: ModuleIdentity,
        requirement: VersionRequirement,
        result: LookupResult,
    ) {
        let outcome = match result {
            Ok(Some(descriptor)) => {
                let version = descriptor.version().to_string();
                self.insert_node(id.at(&version), NodeState::Resolved(descriptor));
                Ok(version)
            }
            Ok(None) => self.record_miss(&id, &requirement, "no metadata found".to_string()),
            Err(e) => {
                tracing::warn!("Lookup of {id}:{requirement} failed: {e}");
                self.record_miss(&id, &requirement, e.to_string())
            }
        };
        self.graph.lookups.insert((id, requirement), outcome);
    }

    fn record_miss(
        &mut self,
        id: &ModuleIdentity,
        requirement: &VersionRequirement,
        reason: String,
    ) -> Result<String, String> {
        match requirement.version() {
            Some(version) => {
                self.insert_node(id.at(version), NodeState::Missing(reason));
                Ok(version.to_string())
            }
            None => Err(format!("no version of {id} matches {requirement} ({reason})")),
        }
    }

    fn insert_node(&mut self, id: ModuleVersion, state: NodeState) {
        self.graph
            .nodes
            .entry(id.id.clone())
            .or_default()
            .entry(id.version.clone())
            .or_insert(CandidateNode {
                id,
                state,
                outgoing: Vec::new(),
            });
    }

    fn resolved_version(&self, id: &ModuleIdentity, requirement: &VersionRequirement) -> Option<String> {
        let key = (id.clone(), requirement.clone());
        match self.graph.lookups.get(&key) {
            Some(Ok(version)) => Some(version.clone()),
            Some(Err(_)) => None,
            None => {
                tracing::debug!("No lookup recorded for {id}:{requirement}");
                None
            }
        }
    }

    fn process(&mut self, arrival: Arrival, queue: &mut VecDeque<Arrival>) {
        match arrival {
            Arrival::Edge { edge, exclusions } => {
                let dep = &self.graph.edges[edge].dependency;
                let (target, requirement) = (dep.target.clone(), dep.requirement.clone());
                let narrowed = self.offer_exclusions(&target, exclusions);
                let version = self.resolved_version(&target, &requirement);
                self.graph.edges[edge].resolved = version.clone();

                if narrowed {
                    let versions: Vec<String> = self
                        .graph
                        .versions(&target)
                        .map(|n| n.id.version.clone())
                        .filter(|v| self.expanded.contains(&target.at(v)))
                        .collect();
                    for v in versions {
                        self.expand(&target.at(v), queue);
                    }
                }
                if let Some(v) = version {
                    let node = target.at(v);
                    if !self.expanded.contains(&node) {
                        self.expand(&node, queue);
                    }
                }
            }
            Arrival::Probe {
                target,
                requirement,
            } => {
                if let Some(v) = self.resolved_version(&target, &requirement) {
                    let node = target.at(v);
                    if !self.expanded.contains(&node) {
                        self.expand(&node, queue);
                    }
                }
            }
        }
    }

    /// Intersect the identity's exclusion set with `incoming`. Returns true if
    /// the set is new or narrowed.
    fn offer_exclusions(&mut self, id: &ModuleIdentity, incoming: BTreeSet<Exclusion>) -> bool {
        match self.exclusions.get_mut(id) {
            None => {
                self.exclusions.insert(id.clone(), incoming);
                true
            }
            Some(current) => {
                let narrowed: BTreeSet<Exclusion> =
                    current.intersection(&incoming).cloned().collect();
                if narrowed == *current {
                    false
                } else {
                    *current = narrowed;
                    true
                }
            }
        }
    }

    /// Create the node's edges on first visit and queue the ones not excluded.
    fn expand(&mut self, node: &ModuleVersion, queue: &mut VecDeque<Arrival>) {
        let first_visit = self.expanded.insert(node.clone());
        if first_visit {
            self.create_edges(node);
        }
        let Some(inherited) = self.exclusions.get(&node.id).cloned() else {
            return;
        };
        let outgoing = self
            .graph
            .node(&node.id, &node.version)
            .map(|n| n.outgoing.clone())
            .unwrap_or_default();
        for edge in outgoing {
            let dep = &self.graph.edges[edge].dependency;
            if excludes(&inherited, &dep.target) {
                tracing::debug!("{node}: skipping excluded {}", dep.target);
                continue;
            }
            let mut exclusions = inherited.clone();
            exclusions.extend(dep.exclusions.iter().cloned());
            queue.push_back(Arrival::Edge { edge, exclusions });
        }
    }

    fn create_edges(&mut self, node: &ModuleVersion) {
        let descriptor = match self.graph.node(&node.id, &node.version).map(|n| &n.state) {
            Some(NodeState::Resolved(d)) => Arc::clone(d),
            _ => return,
        };

        let mut outgoing = Vec::new();
        for dep in &descriptor.dependencies {
            if dep.target == node.id || dep.target == self.graph.root.id {
                tracing::debug!("{node}: ignoring dependency cycle back to {}", dep.target);
                continue;
            }
            outgoing.push(self.add_edge(node.clone(), dep.clone(), false));
        }

        for platform in self.published_platforms(&descriptor) {
            let dep = Dependency::new(
                platform,
                VersionRequirement::Exact(node.version.clone()),
            )
            .with_category(Category::Platform);
            tracing::debug!("{node}: member of published platform {}", dep.target);
            outgoing.push(self.add_edge(node.clone(), dep, true));
        }

        for c in &descriptor.constraints {
            self.constrained
                .push((c.target.clone(), c.requirement.clone()));
        }

        if let Some(n) = self
            .graph
            .nodes
            .get_mut(&node.id)
            .and_then(|vs| vs.get_mut(&node.version))
        {
            n.outgoing = outgoing;
        }
    }

    /// Published platforms the module belongs to, from rules and its own metadata.
    fn published_platforms(&self, descriptor: &ModuleDescriptor) -> BTreeSet<ModuleIdentity> {
        let id = descriptor.identity();
        let from_rules = self
            .rules
            .memberships(id)
            .filter(|r| r.kind == RuleKind::PublishedTrusted)
            .map(|r| r.platform.clone());
        let from_metadata = descriptor
            .belongs_to
            .iter()
            .filter(|m| !m.kind().is_virtual())
            .map(|m| m.platform.clone());
        from_rules
            .chain(from_metadata)
            .filter(|p| p != id && *p != self.graph.root.id)
            .collect()
    }

    /// Constraint versions for modules now in the graph that were not fetched yet.
    fn pending_probes(&mut self) -> Vec<Arrival> {
        let mut probes = Vec::new();
        for (target, requirement) in &self.constrained {
            if !self.exclusions.contains_key(target) {
                continue;
            }
            if self.probed.insert((target.clone(), requirement.clone())) {
                probes.push(Arrival::Probe {
                    target: target.clone(),
                    requirement: requirement.clone(),
                });
            }
        }
        probes
    }
}
