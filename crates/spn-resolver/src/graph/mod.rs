//! Resolved dependency graph using petgraph
//!
//! Built from a finished resolution to derive the reverse "dependents"
//! edges recorded in spn.lock and the order libraries are handed to the
//! linker.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use spn_core::error::SpnError;
use spn_core::types::{LockEntry, Version};

use crate::{Resolution, ResolverResult};

/// Node in the resolved graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub name: String,
    /// `None` for the root project
    pub version: Option<Version>,
    pub commit: String,
}

/// Directed graph of resolved packages; edges point from dependent to dependency
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, ()>,
    node_map: HashMap<String, NodeIndex>,
    root: Option<NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph for a resolution, including the root project node
    pub fn from_resolution(resolution: &Resolution) -> ResolverResult<Self> {
        let mut graph = Self::default();

        let root = graph.add_node(GraphNode {
            name: resolution.root.clone(),
            version: None,
            commit: String::new(),
        });
        graph.root = Some(root);

        for package in resolution.packages() {
            graph.add_node(GraphNode {
                name: package.name.clone(),
                version: Some(package.version),
                commit: package.commit.clone(),
            });
        }

        for dep in &resolution.root_deps {
            graph.add_edge(&resolution.root, dep)?;
        }
        for package in resolution.packages() {
            for dep in &package.deps {
                graph.add_edge(&package.name, dep)?;
            }
        }

        Ok(graph)
    }

    fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(index) = self.node_map.get(&node.name) {
            return *index;
        }
        let name = node.name.clone();
        let index = self.graph.add_node(node);
        self.node_map.insert(name, index);
        index
    }

    fn add_edge(&mut self, from: &str, to: &str) -> ResolverResult<()> {
        let from_index = self.index_of(from)?;
        let to_index = self.index_of(to)?;
        if from_index == to_index {
            return Err(SpnError::CircularDependency {
                package: from.to_string(),
            });
        }
        self.graph.update_edge(from_index, to_index, ());
        Ok(())
    }

    fn index_of(&self, name: &str) -> ResolverResult<NodeIndex> {
        self.node_map
            .get(name)
            .copied()
            .ok_or_else(|| SpnError::PackageNotFound {
                name: name.to_string(),
            })
    }

    fn names(&self, index: NodeIndex, direction: Direction) -> Vec<String> {
        let mut names: Vec<String> = self
            .graph
            .neighbors_directed(index, direction)
            .map(|neighbor| self.graph[neighbor].name.clone())
            .collect();
        names.sort();
        names
    }

    /// Direct dependency names of a package, sorted
    pub fn deps_of(&self, name: &str) -> Vec<String> {
        self.node_map
            .get(name)
            .map(|index| self.names(*index, Direction::Outgoing))
            .unwrap_or_default()
    }

    /// Names of packages that directly depend on `name`, sorted
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.node_map
            .get(name)
            .map(|index| self.names(*index, Direction::Incoming))
            .unwrap_or_default()
    }

    /// Lock entries for every resolved package, sorted by name
    pub fn lock_entries(&self) -> Vec<LockEntry> {
        let mut entries: Vec<LockEntry> = self
            .graph
            .node_indices()
            .filter(|index| Some(*index) != self.root)
            .filter_map(|index| {
                let node = &self.graph[index];
                let version = node.version?;
                let mut entry = LockEntry::new(node.name.clone(), version, node.commit.clone());
                entry.deps = self.names(index, Direction::Outgoing);
                entry.dependents = self.names(index, Direction::Incoming);
                Some(entry)
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Package names with every dependent ahead of its dependencies.
    ///
    /// This is the order static libraries must appear on a link line.
    pub fn link_order(&self) -> ResolverResult<Vec<String>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| SpnError::CircularDependency {
            package: self.graph[cycle.node_id()].name.clone(),
        })?;

        Ok(sorted
            .into_iter()
            .filter(|index| Some(*index) != self.root)
            .map(|index| self.graph[index].name.clone())
            .collect())
    }

    pub fn package_count(&self) -> usize {
        self.graph.node_count().saturating_sub(1)
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }
}
