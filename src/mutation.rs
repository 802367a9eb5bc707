//! Graph-Edit Mutations
//!
//! Five operators perturb a topology for the annealing search. A call works
//! either locally (around existing neighborhoods) or globally.
//!
//! | Operator       | Edges  | Move                                            |
//! |----------------|--------|-------------------------------------------------|
//! | RemoveEdge     | -1     | drop a random outgoing edge                     |
//! | AddEdge        | +1     | join two unconnected vertices                   |
//! | GlobalRewire   | 0      | `i->j, m->n` becomes `m->j, i->n`               |
//! | ConnectLocal   | +1     | link a vertex to one within a few hops          |
//! | LocalRewire    | 0      | `o->j, o->k` becomes `o->k, j->k` (closes a triangle) |
//!
//! A step whose preconditions fail or whose retry budget runs out is
//! skipped, so the requested count is an upper bound.

use std::collections::BTreeSet;

use rand::seq::{index, SliceRandom};
use rand::Rng;
use tracing::trace;

use crate::graph::Graph;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Locality {
    Local,
    Global,
}

impl Locality {
    pub fn operators(self) -> [MutationOp; 3] {
        match self {
            Self::Local => [
                MutationOp::RemoveEdge,
                MutationOp::ConnectLocal,
                MutationOp::LocalRewire,
            ],
            Self::Global => [
                MutationOp::RemoveEdge,
                MutationOp::AddEdge,
                MutationOp::GlobalRewire,
            ],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOp {
    RemoveEdge,
    AddEdge,
    GlobalRewire,
    ConnectLocal,
    LocalRewire,
}

/// Draws candidates until one is accepted or `budget` draws are spent.
/// A generator returning `None` burns one attempt.
pub fn retry<T, R: Rng + ?Sized>(
    budget: usize,
    rng: &mut R,
    mut generate: impl FnMut(&mut R) -> Option<T>,
    mut accept: impl FnMut(&T) -> bool,
) -> Option<T> {
    for _ in 0..budget {
        if let Some(candidate) = generate(rng) {
            if accept(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

fn retry_budget(with_neighbors: usize) -> usize {
    (with_neighbors * with_neighbors).max(1)
}

fn random_neighbor<R: Rng + ?Sized>(graph: &Graph, v: usize, rng: &mut R) -> Option<usize> {
    let neighbors = graph.neighbors(v);
    if neighbors.is_empty() {
        return None;
    }
    neighbors.iter().nth(rng.gen_range(0..neighbors.len())).copied()
}

fn distinct_pair<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Option<(usize, usize)> {
    if len < 2 {
        return None;
    }
    let picked = index::sample(rng, len, 2);
    Some((picked.index(0), picked.index(1)))
}

#[derive(Clone, Copy, Debug)]
pub struct Mutator {
    /// Breadth-first rounds used by `ConnectLocal` beyond the direct neighbors.
    pub local_hops: usize,
}

impl Default for Mutator {
    fn default() -> Self {
        Self { local_hops: 3 }
    }
}

impl Mutator {
    /// Applies up to `count` random steps; returns how many changed the graph.
    ///
    /// With `locality` unset a fair coin picks the operator set once for the
    /// whole call.
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        graph: &mut Graph,
        count: usize,
        locality: Option<Locality>,
        rng: &mut R,
    ) -> usize {
        let locality = locality.unwrap_or_else(|| {
            if rng.gen_bool(0.5) {
                Locality::Local
            } else {
                Locality::Global
            }
        });
        let operators = locality.operators();

        let mut applied = 0;
        for _ in 0..count {
            let op = operators[rng.gen_range(0..operators.len())];
            if self.apply(op, graph, rng) {
                applied += 1;
            } else {
                trace!(?op, "mutation skipped");
            }
        }
        applied
    }

    pub fn apply<R: Rng + ?Sized>(&self, op: MutationOp, graph: &mut Graph, rng: &mut R) -> bool {
        match op {
            MutationOp::RemoveEdge => remove_edge(graph, rng),
            MutationOp::AddEdge => add_edge(graph, rng),
            MutationOp::GlobalRewire => global_rewire(graph, rng),
            MutationOp::ConnectLocal => self.connect_local(graph, rng),
            MutationOp::LocalRewire => local_rewire(graph, rng),
        }
    }

    fn connect_local<R: Rng + ?Sized>(&self, graph: &mut Graph, rng: &mut R) -> bool {
        let with_neighbors = graph.vertices_with_neighbors();
        let Some(&origin) = with_neighbors.choose(rng) else {
            return false;
        };

        let direct = graph.neighbors(origin).clone();
        let mut reached = direct.clone();
        for _ in 0..self.local_hops {
            let frontier: Vec<usize> = reached.iter().copied().collect();
            for v in frontier {
                reached.extend(graph.neighbors(v).iter().copied());
            }
        }

        let candidates: Vec<usize> = reached
            .difference(&direct)
            .copied()
            .filter(|&v| v != origin)
            .collect();
        if candidates.len() < 2 {
            return false;
        }
        match candidates.choose(rng) {
            Some(&target) => graph.add_edge(origin, target),
            None => false,
        }
    }
}

fn remove_edge<R: Rng + ?Sized>(graph: &mut Graph, rng: &mut R) -> bool {
    let with_neighbors = graph.vertices_with_neighbors();
    let Some(&node) = with_neighbors.choose(rng) else {
        return false;
    };
    match random_neighbor(graph, node, rng) {
        Some(j) => graph.remove_edge(node, j),
        None => false,
    }
}

fn add_edge<R: Rng + ?Sized>(graph: &mut Graph, rng: &mut R) -> bool {
    let n = graph.vertex_count();
    let budget = retry_budget(graph.vertices_with_neighbors().len());
    let view: &Graph = graph;
    let pair = retry(
        budget,
        rng,
        |rng| distinct_pair(n, rng),
        |&(i, j)| !view.are_adjacent(i, j),
    );
    match pair {
        Some((i, j)) => graph.add_edge(i, j),
        None => false,
    }
}

fn global_rewire<R: Rng + ?Sized>(graph: &mut Graph, rng: &mut R) -> bool {
    let with_neighbors = graph.vertices_with_neighbors();
    if with_neighbors.len() < 2 {
        return false;
    }
    let view: &Graph = graph;
    let quad = retry(
        retry_budget(with_neighbors.len()),
        rng,
        |rng| {
            let (a, b) = distinct_pair(with_neighbors.len(), rng)?;
            let (i, m) = (with_neighbors[a], with_neighbors[b]);
            let j = random_neighbor(view, i, rng)?;
            let n = random_neighbor(view, m, rng)?;
            Some((i, j, m, n))
        },
        |&(i, j, m, n)| {
            let distinct: BTreeSet<usize> = [i, j, m, n].into_iter().collect();
            distinct.len() == 4
                && !view.are_adjacent(i, m)
                && !view.are_adjacent(i, n)
                && !view.are_adjacent(j, m)
                && !view.are_adjacent(j, n)
        },
    );

    let Some((i, j, m, n)) = quad else {
        return false;
    };
    graph.remove_edge(i, j);
    graph.remove_edge(m, n);
    graph.add_edge(m, j);
    graph.add_edge(i, n);
    true
}

fn local_rewire<R: Rng + ?Sized>(graph: &mut Graph, rng: &mut R) -> bool {
    let with_neighbors = graph.vertices_with_neighbors();
    let hubs: Vec<usize> = with_neighbors
        .iter()
        .copied()
        .filter(|&v| graph.out_degree(v) > 2)
        .collect();
    if hubs.is_empty() {
        return false;
    }
    let view: &Graph = graph;
    let triple = retry(
        retry_budget(with_neighbors.len()),
        rng,
        |rng| {
            let &origin = hubs.choose(rng)?;
            let neighbors: Vec<usize> = view.neighbors(origin).iter().copied().collect();
            let (a, b) = distinct_pair(neighbors.len(), rng)?;
            Some((origin, neighbors[a], neighbors[b]))
        },
        |&(_, j, k)| !view.are_adjacent(j, k),
    );

    let Some((origin, j, k)) = triple else {
        return false;
    };
    graph.remove_edge(origin, j);
    graph.add_edge(j, k);
    true
}
