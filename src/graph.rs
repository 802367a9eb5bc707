//! Interbank Network Topology
//!
//! Adjacency-set graph over a fixed vertex count. Directed graphs keep
//! separate out/in sets; undirected graphs store each edge in both
//! endpoints' sets. Sets are ordered so that every random pick made from a
//! neighbor list is reproducible for a given seed.
//!
//! ## Exchange Format
//! Graphs (de)serialize as `{ "vertices": N, "directed": bool, "edges": [[s, t], ...] }`.
//! Edges are written sorted; reading validates ranges, self-loops and duplicates.

use std::collections::BTreeSet;

use petgraph::algo::{connected_components, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GraphSpec", into = "GraphSpec")]
pub struct Graph {
    directed: bool,
    out: Vec<BTreeSet<usize>>,
    inc: Vec<BTreeSet<usize>>,
    edges: usize,
}

/// Serialized form of a [`Graph`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub vertices: usize,
    pub directed: bool,
    pub edges: Vec<(usize, usize)>,
}

impl Graph {
    pub fn new(vertices: usize, directed: bool) -> Self {
        Self {
            directed,
            out: vec![BTreeSet::new(); vertices],
            inc: if directed {
                vec![BTreeSet::new(); vertices]
            } else {
                Vec::new()
            },
            edges: 0,
        }
    }

    pub fn directed(vertices: usize) -> Self {
        Self::new(vertices, true)
    }

    pub fn undirected(vertices: usize) -> Self {
        Self::new(vertices, false)
    }

    /// Builds a graph from an edge list, rejecting anything the mutators
    /// would never produce.
    pub fn from_edges(
        vertices: usize,
        directed: bool,
        edges: &[(usize, usize)],
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new(vertices, directed);
        for &(u, v) in edges {
            for vertex in [u, v] {
                if vertex >= vertices {
                    return Err(GraphError::VertexOutOfRange { vertex, vertices });
                }
            }
            if u == v {
                return Err(GraphError::SelfLoop(u));
            }
            if !graph.add_edge(u, v) {
                return Err(GraphError::DuplicateEdge(u, v));
            }
        }
        Ok(graph)
    }

    pub fn vertex_count(&self) -> usize {
        self.out.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Out-neighbors for directed graphs, all neighbors otherwise.
    pub fn neighbors(&self, v: usize) -> &BTreeSet<usize> {
        &self.out[v]
    }

    pub fn in_neighbors(&self, v: usize) -> &BTreeSet<usize> {
        if self.directed {
            &self.inc[v]
        } else {
            &self.out[v]
        }
    }

    pub fn out_degree(&self, v: usize) -> usize {
        self.out[v].len()
    }

    pub fn in_degree(&self, v: usize) -> usize {
        self.in_neighbors(v).len()
    }

    /// True if the edge `u -> v` exists (either orientation when undirected).
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.out[u].contains(&v)
    }

    /// True if `u` and `v` are joined in either direction.
    pub fn are_adjacent(&self, u: usize, v: usize) -> bool {
        self.has_edge(u, v) || self.has_edge(v, u)
    }

    /// Adds `u -> v`. Returns false, leaving the graph untouched, for
    /// self-loops and edges that already exist.
    pub fn add_edge(&mut self, u: usize, v: usize) -> bool {
        debug_assert!(u < self.vertex_count() && v < self.vertex_count());
        if u == v || self.has_edge(u, v) {
            return false;
        }
        self.out[u].insert(v);
        if self.directed {
            self.inc[v].insert(u);
        } else {
            self.out[v].insert(u);
        }
        self.edges += 1;
        true
    }

    pub fn remove_edge(&mut self, u: usize, v: usize) -> bool {
        if !self.out[u].remove(&v) {
            return false;
        }
        if self.directed {
            self.inc[v].remove(&u);
        } else {
            self.out[v].remove(&u);
        }
        self.edges -= 1;
        true
    }

    /// Sorted edge list; undirected edges are reported once as `(low, high)`.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = Vec::with_capacity(self.edges);
        for (u, targets) in self.out.iter().enumerate() {
            for &v in targets {
                if self.directed || u < v {
                    edges.push((u, v));
                }
            }
        }
        edges
    }

    pub fn vertices_with_neighbors(&self) -> Vec<usize> {
        (0..self.vertex_count())
            .filter(|&v| !self.out[v].is_empty())
            .collect()
    }

    /// Collapses direction; mutual directed edges become a single edge.
    pub fn to_undirected(&self) -> Graph {
        if !self.directed {
            return self.clone();
        }
        let mut graph = Graph::undirected(self.vertex_count());
        for (u, v) in self.edges() {
            graph.add_edge(u, v);
        }
        graph
    }

    /// Petgraph view with one arc per adjacency; undirected edges become
    /// two opposite arcs. Node `v` is `NodeIndex::new(v)`.
    pub fn arcs(&self) -> DiGraph<(), ()> {
        let n = self.vertex_count();
        let mut view = DiGraph::with_capacity(n, self.out.iter().map(BTreeSet::len).sum());
        for _ in 0..n {
            view.add_node(());
        }
        for (u, targets) in self.out.iter().enumerate() {
            for &v in targets {
                view.add_edge(NodeIndex::new(u), NodeIndex::new(v), ());
            }
        }
        view
    }

    /// Ignores direction.
    pub fn weak_component_count(&self) -> usize {
        connected_components(&self.arcs())
    }

    /// Strongly connected components for directed graphs, connected
    /// components for undirected ones.
    pub fn component_count(&self) -> usize {
        if self.directed {
            tarjan_scc(&self.arcs()).len()
        } else {
            self.weak_component_count()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.component_count() == 1
    }
}

impl TryFrom<GraphSpec> for Graph {
    type Error = GraphError;

    fn try_from(spec: GraphSpec) -> Result<Self, Self::Error> {
        Graph::from_edges(spec.vertices, spec.directed, &spec.edges)
    }
}

impl From<Graph> for GraphSpec {
    fn from(graph: Graph) -> Self {
        GraphSpec {
            vertices: graph.vertex_count(),
            directed: graph.directed,
            edges: graph.edges(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remove_directed() {
        let mut g = Graph::directed(3);
        assert!(g.add_edge(0, 1));
        assert!(!g.add_edge(0, 1));
        assert!(g.add_edge(1, 0));
        assert!(!g.add_edge(2, 2));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.out_degree(0), 1);
        assert_eq!(g.in_degree(0), 1);

        assert!(g.remove_edge(0, 1));
        assert!(!g.remove_edge(0, 1));
        assert_eq!(g.edge_count(), 1);
        assert!(g.are_adjacent(0, 1));
        assert!(!g.has_edge(0, 1));
    }

    #[test]
    fn test_undirected_edges_are_symmetric() {
        let mut g = Graph::undirected(3);
        assert!(g.add_edge(2, 0));
        assert!(!g.add_edge(0, 2));
        assert!(g.has_edge(0, 2));
        assert_eq!(g.edges(), vec![(0, 2)]);
        assert_eq!(g.in_degree(0), 1);
    }

    #[test]
    fn test_component_counts() {
        // 0 -> 1 -> 2 -> 0 is one strong component, 3 hangs off it
        let g = Graph::from_edges(5, true, &[(0, 1), (1, 2), (2, 0), (2, 3)]).unwrap();
        assert_eq!(g.component_count(), 3);
        assert_eq!(g.weak_component_count(), 2);

        let u = g.to_undirected();
        assert_eq!(u.component_count(), 2);
        assert_eq!(u.edge_count(), 4);
    }

    #[test]
    fn test_arcs_view() {
        let u = Graph::from_edges(3, false, &[(0, 1)]).unwrap();
        let view = u.arcs();
        assert_eq!(view.node_count(), 3);
        assert_eq!(view.edge_count(), 2);
        assert_eq!(u.weak_component_count(), 2);

        // a directed cycle plus a tail is one strong component per tail vertex
        let d = Graph::from_edges(4, true, &[(0, 1), (1, 0), (1, 2), (2, 3)]).unwrap();
        assert_eq!(d.arcs().edge_count(), 4);
        assert_eq!(d.component_count(), 3);
        assert!(!d.is_connected());
        assert_eq!(Graph::directed(0).component_count(), 0);
    }

    #[test]
    fn test_from_edges_rejects_bad_input() {
        assert_eq!(
            Graph::from_edges(2, true, &[(0, 2)]),
            Err(GraphError::VertexOutOfRange { vertex: 2, vertices: 2 })
        );
        assert_eq!(Graph::from_edges(2, true, &[(1, 1)]), Err(GraphError::SelfLoop(1)));
        assert_eq!(
            Graph::from_edges(2, false, &[(0, 1), (1, 0)]),
            Err(GraphError::DuplicateEdge(1, 0))
        );
    }

    #[test]
    fn test_json_round_trip() {
        let g = Graph::from_edges(4, true, &[(3, 0), (0, 1), (1, 0)]).unwrap();
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"vertices":4,"directed":true,"edges":[[0,1],[1,0],[3,0]]}"#);
        let back: Graph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn test_json_rejects_self_loop() {
        let result: Result<Graph, _> =
            serde_json::from_str(r#"{"vertices":2,"directed":false,"edges":[[1,1]]}"#);
        assert!(result.is_err());
    }
}
