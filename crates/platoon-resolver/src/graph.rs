//! The resolved dependency graph handed to callers.
//!
//! One node per module identity at its selected version, plus the full edge
//! report (honored, overridden or excluded) so callers can explain a result
//! without resolving again.

use std::collections::{BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

use platoon_core::dependency::{Dependency, Exclusion};
use platoon_core::identity::{ModuleIdentity, ModuleVersion};
use platoon_core::requirement::VersionRequirement;

use crate::alignment::AlignedPlatform;
use crate::builder::CandidateGraph;
use crate::conflict::ConflictReport;
use crate::resolver::{EdgeStatus, Resolution, ResolutionReason};

/// A selected module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModule {
    pub module: ModuleIdentity,
    pub version: String,
    pub reason: ResolutionReason,
}

impl ResolvedModule {
    pub fn coordinates(&self) -> ModuleVersion {
        self.module.at(&self.version)
    }
}

/// What happened to one declared edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeReport {
    pub from: ModuleVersion,
    pub to: ModuleIdentity,
    pub requested: String,
    pub selected: Option<String>,
    pub status: EdgeStatus,
    pub reason: ResolutionReason,
    pub forced: bool,
    /// Added for published platform membership.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl EdgeReport {
    /// Tree label: `group:name:requested`, with ` -> selected` when overridden.
    fn label(&self) -> String {
        let mut label = format!("{}:{}", self.to, self.requested);
        if self.status == EdgeStatus::Overridden {
            if let Some(selected) = &self.selected {
                label.push_str(&format!(" -> {selected}"));
            }
        }
        if self.forced {
            label.push_str(" (forced)");
        }
        if self.synthetic {
            label.push_str(" (platform)");
        }
        label
    }
}

/// The final, immutable resolution result backed by petgraph.
#[derive(Debug)]
pub struct ResolvedGraph {
    graph: DiGraph<ModuleVersion, usize>,
    /// Lookup from identity to its node (only the selected version exists).
    index: HashMap<ModuleIdentity, NodeIndex>,
    root: NodeIndex,
    modules: Vec<ResolvedModule>,
    edges: Vec<EdgeReport>,
    platforms: Vec<AlignedPlatform>,
    conflicts: ConflictReport,
    iterations: usize,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    root: &'a ModuleVersion,
    iterations: usize,
    modules: &'a [ResolvedModule],
    edges: &'a [EdgeReport],
    platforms: &'a [AlignedPlatform],
    conflicts: &'a ConflictReport,
}

impl ResolvedGraph {
    pub fn new(root: ModuleVersion) -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(root);
        Self {
            graph,
            index: HashMap::new(),
            root,
            modules: Vec::new(),
            edges: Vec::new(),
            platforms: Vec::new(),
            conflicts: ConflictReport::new(),
            iterations: 0,
        }
    }

    /// Assemble the output of a converged run.
    pub fn from_resolution(
        candidates: &CandidateGraph,
        resolution: &Resolution,
        platforms: Vec<AlignedPlatform>,
        iterations: usize,
    ) -> Self {
        let mut graph = Self::new(candidates.root().clone());
        for (id, selection) in &resolution.selections {
            graph.add_module(ResolvedModule {
                module: id.clone(),
                version: selection.version.clone(),
                reason: selection.reason,
            });
        }
        for outcome in &resolution.edges {
            let edge = candidates.edge(outcome.edge);
            graph.add_edge(EdgeReport {
                from: edge.from.clone(),
                to: edge.target().clone(),
                requested: edge.dependency.requirement.to_string(),
                selected: outcome.selected.clone(),
                status: outcome.status,
                reason: outcome.reason,
                forced: edge.dependency.forced,
                synthetic: edge.synthetic,
            });
        }
        graph.platforms = platforms;
        graph.conflicts = resolution.conflicts.clone();
        graph.iterations = iterations;
        graph
    }

    /// Add a module, or return the existing node for its identity.
    pub fn add_module(&mut self, module: ResolvedModule) -> NodeIndex {
        if let Some(&idx) = self.index.get(&module.module) {
            return idx;
        }
        let idx = self.graph.add_node(module.coordinates());
        self.index.insert(module.module.clone(), idx);
        let pos = self
            .modules
            .partition_point(|m| m.module < module.module);
        self.modules.insert(pos, module);
        idx
    }

    /// Record an edge. Excluded edges are only reported, never linked.
    pub fn add_edge(&mut self, report: EdgeReport) {
        let id = self.edges.len();
        if report.status != EdgeStatus::Excluded {
            let from = if report.from == self.graph[self.root] {
                Some(self.root)
            } else {
                self.index.get(&report.from.id).copied()
            };
            let to = self.index.get(&report.to).copied();
            if let (Some(from), Some(to)) = (from, to) {
                if !self.graph.edges(from).any(|e| e.target() == to) {
                    self.graph.add_edge(from, to, id);
                }
            }
        }
        self.edges.push(report);
    }

    pub fn root(&self) -> &ModuleVersion {
        &self.graph[self.root]
    }

    /// Selected modules, sorted by identity.
    pub fn modules(&self) -> &[ResolvedModule] {
        &self.modules
    }

    pub fn edges(&self) -> &[EdgeReport] {
        &self.edges
    }

    pub fn platforms(&self) -> &[AlignedPlatform] {
        &self.platforms
    }

    pub fn conflicts(&self) -> &ConflictReport {
        &self.conflicts
    }

    /// Build/resolve/align iterations it took to converge.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn version_of(&self, id: &ModuleIdentity) -> Option<&str> {
        self.index
            .get(id)
            .map(|&idx| self.graph[idx].version.as_str())
    }

    pub fn contains(&self, id: &ModuleIdentity) -> bool {
        self.index.contains_key(id)
    }

    /// Identities cut by exclusions that did not make it into the result.
    pub fn excluded(&self) -> BTreeSet<&ModuleIdentity> {
        self.edges
            .iter()
            .filter(|e| e.status == EdgeStatus::Excluded && !self.contains(&e.to))
            .map(|e| &e.to)
            .collect()
    }

    /// The result as forced exact-version root requests.
    ///
    /// Resolving these again yields the same modules at the same versions:
    /// forcing pins every module, and excluded identities stay excluded.
    pub fn to_root_requests(&self) -> Vec<Dependency> {
        let exclusions: BTreeSet<Exclusion> =
            self.excluded().into_iter().map(Exclusion::module).collect();
        self.modules
            .iter()
            .map(|m| {
                let mut dep = Dependency::new(
                    m.module.clone(),
                    VersionRequirement::Exact(m.version.clone()),
                )
                .forced();
                dep.exclusions = exclusions.clone();
                dep
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReport {
            root: self.root(),
            iterations: self.iterations,
            modules: &self.modules,
            edges: &self.edges,
            platforms: &self.platforms,
            conflicts: &self.conflicts,
        })
    }

    /// Outgoing edges of a node, sorted by label for stable output.
    fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &EdgeReport)> {
        let mut deps: Vec<(NodeIndex, &EdgeReport)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), &self.edges[*e.weight()]))
            .collect();
        deps.sort_by(|a, b| (&a.1.to, &a.1.requested).cmp(&(&b.1.to, &b.1.requested)));
        deps
    }

    fn dependents_of(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut deps: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.source())
            .collect();
        deps.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        deps
    }

    /// Print the dependency tree, Gradle style: overridden requests show
    /// `requested -> selected`.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = format!("{}\n", self.graph[self.root]);
        let mut visited = HashSet::new();
        visited.insert(self.root);

        let deps = self.dependencies_of(self.root);
        let count = deps.len();
        for (i, (idx, edge)) in deps.into_iter().enumerate() {
            self.print_subtree(
                &mut output,
                idx,
                edge,
                "",
                i == count - 1,
                1,
                max_depth,
                &mut visited,
            );
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &EdgeReport,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", edge.label()));

        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }
        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, child_edge)) in deps.into_iter().enumerate() {
            self.print_subtree(
                output,
                child,
                child_edge,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }

        visited.remove(&idx);
    }

    /// Resolve a user-provided key to a node index.
    ///
    /// Tries exact `group:name` first, then falls back to matching by name.
    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(id) = ModuleIdentity::parse(key) {
            return self.index.get(&id).copied();
        }
        let mut matches: Vec<(&ModuleIdentity, NodeIndex)> = self
            .index
            .iter()
            .filter(|(id, _)| id.name == key)
            .map(|(id, &idx)| (id, idx))
            .collect();
        matches.sort();
        matches.first().map(|(_, idx)| *idx)
    }

    /// Find the path from root to a module: why is it in the graph?
    ///
    /// Accepts either `group:name` or just `name`.
    pub fn find_path(&self, target_key: &str) -> Option<Vec<&ModuleVersion>> {
        let target = self.resolve_key(target_key)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(self.root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Build an inverted dependency tree (reverse edges) for a single module.
    ///
    /// Accepts either `group:name` or just `name`.
    pub fn print_inverted_tree(&self, target_key: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.resolve_key(target_key) else {
            return output;
        };

        output.push_str(&format!("{}\n", self.graph[idx]));

        let mut visited = HashSet::new();
        visited.insert(idx);

        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep_idx) in dependents.into_iter().enumerate() {
            self.print_inverted_subtree(&mut output, dep_idx, "", i == count - 1, &mut visited);
        }
        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));

        if !visited.insert(idx) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, dep_idx) in dependents.into_iter().enumerate() {
            self.print_inverted_subtree(output, dep_idx, &child_prefix, i == count - 1, visited);
        }

        visited.remove(&idx);
    }

    /// Number of selected modules (excluding root).
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
