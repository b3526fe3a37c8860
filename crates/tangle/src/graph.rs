//! Dependency graph core shared by the module-level and function-level
//! pipelines.
//!
//! Node identities are opaque newtypes (`ModuleId`, `FunctionId`) backed by a
//! [`NameArena`] that interns canonical names. Ids are allocated from the
//! lexicographically sorted name list, so the derived `Ord` on an id matches
//! lexicographic order on its name. Cycle canonicalization (rotate to the
//! minimum id) therefore rotates to the lexicographically smallest node.

use std::{fmt, hash::Hash, marker::PhantomData};

use indexmap::IndexSet;
use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::{FxHashMap, FxHashSet};

/// Common contract for graph node identifiers.
pub trait NodeKey: Copy + Eq + Hash + Ord + fmt::Debug {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

/// Unique identifier for a module within one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(u32);

/// Unique identifier for a qualified function within one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(u32);

impl NodeKey for ModuleId {
    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl NodeKey for FunctionId {
    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interner mapping ids of one key type to their canonical names.
///
/// Built once per graph from the full node set; names are sorted before
/// interning so that id order equals name order.
#[derive(Debug, Clone)]
pub struct NameArena<I: NodeKey> {
    names: IndexSet<String>,
    _key: PhantomData<I>,
}

impl<I: NodeKey> NameArena<I> {
    /// Intern the given names, sorted and deduplicated.
    pub fn from_names(names: impl IntoIterator<Item = String>) -> Self {
        let mut sorted: Vec<String> = names.into_iter().collect();
        sorted.sort();
        sorted.dedup();
        Self {
            names: sorted.into_iter().collect(),
            _key: PhantomData,
        }
    }

    /// Look up the id for a canonical name.
    pub fn get(&self, name: &str) -> Option<I> {
        self.names.get_index_of(name).map(I::from_index)
    }

    /// Resolve an id back to its canonical name.
    ///
    /// Panics if the id was not produced by this arena.
    pub fn name(&self, id: I) -> &str {
        self.names
            .get_index(id.index())
            .expect("id out of range for arena")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All ids in ascending (lexicographic-name) order.
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        (0..self.names.len()).map(I::from_index)
    }
}

/// Directed dependency graph over interned node ids.
///
/// Backed by a petgraph `DiGraph` with an id-to-index side table. Edges are
/// deduplicated; self-edges are rejected at insertion so the cycle finder
/// never sees a length-one loop.
#[derive(Debug, Clone)]
pub struct DepGraph<I: NodeKey> {
    graph: DiGraph<I, ()>,
    indices: FxHashMap<I, NodeIndex>,
}

impl<I: NodeKey> DepGraph<I> {
    /// Create a graph containing the given nodes and no edges.
    pub fn with_nodes(ids: impl IntoIterator<Item = I>) -> Self {
        let mut graph = DiGraph::new();
        let mut indices = FxHashMap::default();
        for id in ids {
            indices.entry(id).or_insert_with(|| graph.add_node(id));
        }
        Self { graph, indices }
    }

    /// Add a directed edge, ignoring self-references and unknown endpoints.
    pub fn add_edge(&mut self, from: I, to: I) {
        if from == to {
            return;
        }
        if let (Some(&a), Some(&b)) = (self.indices.get(&from), self.indices.get(&to)) {
            self.graph.update_edge(a, b, ());
        }
    }

    pub fn contains_edge(&self, from: I, to: I) -> bool {
        match (self.indices.get(&from), self.indices.get(&to)) {
            (Some(&a), Some(&b)) => self.graph.find_edge(a, b).is_some(),
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node ids in ascending order.
    pub fn nodes(&self) -> Vec<I> {
        let mut ids: Vec<I> = self.indices.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Outgoing neighbors of a node in ascending order.
    pub fn neighbors(&self, id: I) -> Vec<I> {
        let Some(&idx) = self.indices.get(&id) else {
            return Vec::new();
        };
        let mut out: Vec<I> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out
    }

    pub fn out_degree(&self, id: I) -> usize {
        self.indices
            .get(&id)
            .map_or(0, |&idx| self.graph.edges(idx).count())
    }

    pub fn max_out_degree(&self) -> usize {
        self.indices
            .values()
            .map(|&idx| self.graph.edges(idx).count())
            .max()
            .unwrap_or(0)
    }

    /// Simulate extracting one node: a copy of the graph without the node and
    /// without any edge touching it.
    pub fn without_node(&self, removed: I) -> Self {
        let mut pruned = Self::with_nodes(self.nodes().into_iter().filter(|&id| id != removed));
        for from in pruned.nodes() {
            for to in self.neighbors(from) {
                if to != removed {
                    pruned.add_edge(from, to);
                }
            }
        }
        pruned
    }

    /// Find cycles with an explicit-stack depth-first search.
    ///
    /// Starts are taken in ascending id order for determinism. When a gray
    /// (on-path) node is re-encountered, the path segment from its first
    /// occurrence forms a cycle; it is rotated to its minimum element so the
    /// same cycle found from different entry points deduplicates. The explicit
    /// stack keeps deep call graphs from overflowing the thread stack.
    pub fn find_cycles(&self) -> Vec<Vec<I>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        struct Frame<I> {
            id: I,
            neighbors: Vec<I>,
            next: usize,
        }

        let mut colors: FxHashMap<I, Color> = self
            .indices
            .keys()
            .map(|&id| (id, Color::White))
            .collect();
        let mut cycles: Vec<Vec<I>> = Vec::new();
        let mut seen: FxHashSet<Vec<I>> = FxHashSet::default();

        for start in self.nodes() {
            if colors[&start] != Color::White {
                continue;
            }
            let mut stack = vec![Frame {
                id: start,
                neighbors: self.neighbors(start),
                next: 0,
            }];
            let mut path = vec![start];
            colors.insert(start, Color::Gray);

            while let Some(frame) = stack.last_mut() {
                if frame.next < frame.neighbors.len() {
                    let next = frame.neighbors[frame.next];
                    frame.next += 1;
                    match colors[&next] {
                        Color::White => {
                            colors.insert(next, Color::Gray);
                            path.push(next);
                            stack.push(Frame {
                                id: next,
                                neighbors: self.neighbors(next),
                                next: 0,
                            });
                        }
                        Color::Gray => {
                            if let Some(pos) = path.iter().position(|&n| n == next) {
                                let mut cycle = path[pos..].to_vec();
                                canonicalize_cycle(&mut cycle);
                                if seen.insert(cycle.clone()) {
                                    cycles.push(cycle);
                                }
                            }
                        }
                        Color::Black => {}
                    }
                } else {
                    colors.insert(frame.id, Color::Black);
                    stack.pop();
                    path.pop();
                }
            }
        }

        cycles
    }
}

/// Rotate a cycle so it starts at its minimum element.
///
/// Idempotent: re-canonicalizing an already-canonical cycle is a no-op. The
/// closing edge back to the first element is implicit; the terminal node is
/// not repeated.
pub fn canonicalize_cycle<I: NodeKey>(cycle: &mut Vec<I>) {
    if cycle.is_empty() {
        return;
    }
    let min_pos = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map(|(pos, _)| pos)
        .unwrap_or(0);
    cycle.rotate_left(min_pos);
}
