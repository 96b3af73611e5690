//
//  lattice.rs
//  cbv
//

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

use crate::snapshot::{Inheritance, KlassRecord};

/// Direct inheritance edges for every discovered class, in class order then
/// base order. Bases that were not discovered produce no edge.
pub fn inheritance_edges(klasses: &[KlassRecord]) -> Vec<Inheritance> {
    let known: HashSet<&str> = klasses.iter().map(|k| k.path.as_str()).collect();

    klasses
        .iter()
        .flat_map(|klass| {
            klass
                .bases
                .iter()
                .enumerate()
                .filter(|(_, base)| known.contains(base.as_str()))
                .map(|(order, base)| Inheritance {
                    parent: base.clone(),
                    child: klass.path.clone(),
                    order,
                })
        })
        .collect()
}

/// Parent -> child graph over class paths.
pub struct InheritanceGraph {
    graph: DiGraph<String, usize>,
    index: HashMap<String, NodeIndex>,
    descendants: HashMap<NodeIndex, HashSet<NodeIndex>>,
}

impl InheritanceGraph {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a str>, edges: &[Inheritance]) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        for path in paths {
            index
                .entry(path.to_string())
                .or_insert_with(|| graph.add_node(path.to_string()));
        }
        for edge in edges {
            if let (Some(&parent), Some(&child)) = (index.get(&edge.parent), index.get(&edge.child)) {
                graph.add_edge(parent, child, edge.order);
            }
        }

        Self {
            graph,
            index,
            descendants: HashMap::new(),
        }
    }

    /// Build from discovered classes and their edges.
    pub fn from_klasses(klasses: &[KlassRecord], edges: &[Inheritance]) -> Self {
        Self::new(klasses.iter().map(|k| k.path.as_str()), edges)
    }

    /// Memoized descendant set of one node.
    fn memoized(&mut self, start: NodeIndex) -> &HashSet<NodeIndex> {
        let graph = &self.graph;
        self.descendants.entry(start).or_insert_with(|| {
            let mut reached = HashSet::new();
            let mut dfs = Dfs::new(graph, start);
            // The first node visited is `start`.
            dfs.next(graph);
            while let Some(node) = dfs.next(graph) {
                reached.insert(node);
            }
            reached
        })
    }

    pub fn node(&self, path: &str) -> Option<NodeIndex> {
        self.index.get(path).copied()
    }

    /// Every class reachable from `path` in the child direction. Unknown
    /// paths have no descendants.
    pub fn descendants(&mut self, path: &str) -> HashSet<&str> {
        let Some(start) = self.node(path) else {
            return HashSet::new();
        };
        self.memoized(start);
        self.descendants[&start]
            .iter()
            .map(|&node| self.graph[node].as_str())
            .collect()
    }

    /// Union of the descendant sets of every path in `paths`.
    pub fn union_descendants<'p>(&mut self, paths: impl IntoIterator<Item = &'p str>) -> HashSet<NodeIndex> {
        let mut union = HashSet::new();
        for path in paths {
            if let Some(start) = self.node(path) {
                union.extend(self.memoized(start).iter().copied());
            }
        }
        union
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
