//! Random Interbank Topologies
//!
//! Seed graphs for synthesis and reference networks for contagion runs.
//!
//! ## Generators
//! - `random_directed`: each unordered pair linked with probability `p`,
//!   orientation chosen by a fair coin
//! - `random_directed_pairs`: each ordered pair linked independently
//! - `random_undirected`: classic G(n, p)
//! - `stochastic_block_model`: pair `(u, v)`, `u < v`, linked `u -> v` with the
//!   probability of their blocks
//!
//! All generators take the caller's generator so results are reproducible.

use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::error::GraphError;
use crate::graph::Graph;

fn coin(p: f64) -> Result<Bernoulli, GraphError> {
    Bernoulli::new(p).map_err(|_| GraphError::InvalidProbability(p))
}

pub fn random_directed<R: Rng + ?Sized>(
    n: usize,
    p: f64,
    rng: &mut R,
) -> Result<Graph, GraphError> {
    let link = coin(p)?;
    let mut graph = Graph::directed(n);
    for i in 0..n {
        for j in 0..i {
            if link.sample(rng) {
                if rng.gen_bool(0.5) {
                    graph.add_edge(i, j);
                } else {
                    graph.add_edge(j, i);
                }
            }
        }
    }
    Ok(graph)
}

/// Mutual links are possible here, unlike [`random_directed`].
pub fn random_directed_pairs<R: Rng + ?Sized>(
    n: usize,
    p: f64,
    rng: &mut R,
) -> Result<Graph, GraphError> {
    let link = coin(p)?;
    let mut graph = Graph::directed(n);
    for i in 0..n {
        for j in 0..n {
            if i != j && link.sample(rng) {
                graph.add_edge(i, j);
            }
        }
    }
    Ok(graph)
}

pub fn random_undirected<R: Rng + ?Sized>(
    n: usize,
    p: f64,
    rng: &mut R,
) -> Result<Graph, GraphError> {
    let link = coin(p)?;
    let mut graph = Graph::undirected(n);
    for i in 0..n {
        for j in 0..i {
            if link.sample(rng) {
                graph.add_edge(j, i);
            }
        }
    }
    Ok(graph)
}

/// `probabilities[a][b]` is the link probability from block `a` to block `b`;
/// `blocks[v]` is the block of vertex `v`.
pub fn stochastic_block_model<R: Rng + ?Sized>(
    probabilities: &[Vec<f64>],
    blocks: &[usize],
    rng: &mut R,
) -> Result<Graph, GraphError> {
    let k = probabilities.len();
    if let Some(row) = probabilities.iter().position(|row| row.len() != k) {
        return Err(GraphError::UnknownBlock { block: row });
    }
    if let Some(&block) = blocks.iter().find(|&&b| b >= k) {
        return Err(GraphError::UnknownBlock { block });
    }
    let links = probabilities
        .iter()
        .map(|row| row.iter().map(|&p| coin(p)).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<_>, _>>()?;

    let n = blocks.len();
    let mut graph = Graph::directed(n);
    for u in 0..n {
        for v in (u + 1)..n {
            if links[blocks[u]][blocks[v]].sample(rng) {
                graph.add_edge(u, v);
            }
        }
    }
    Ok(graph)
}

/// Keeps one randomly oriented edge per adjacent pair.
pub fn make_directed<R: Rng + ?Sized>(graph: &Graph, rng: &mut R) -> Graph {
    let mut directed = Graph::directed(graph.vertex_count());
    for (u, v) in graph.to_undirected().edges() {
        if rng.gen_bool(0.5) {
            directed.add_edge(u, v);
        } else {
            directed.add_edge(v, u);
        }
    }
    directed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_extreme_probabilities() {
        let mut rng = rng();
        assert_eq!(random_directed(6, 0.0, &mut rng).unwrap().edge_count(), 0);
        assert_eq!(random_directed(6, 1.0, &mut rng).unwrap().edge_count(), 15);
        assert_eq!(random_directed_pairs(6, 1.0, &mut rng).unwrap().edge_count(), 30);
        assert_eq!(random_undirected(6, 1.0, &mut rng).unwrap().edge_count(), 15);
    }

    #[test]
    fn test_random_directed_has_no_mutual_links() {
        let g = random_directed(20, 0.7, &mut rng()).unwrap();
        assert!(g.is_directed());
        for (u, v) in g.edges() {
            assert!(!g.has_edge(v, u));
        }
    }

    #[test]
    fn test_invalid_probability() {
        assert_eq!(
            random_undirected(4, 1.5, &mut rng()),
            Err(GraphError::InvalidProbability(1.5))
        );
    }

    #[test]
    fn test_same_seed_same_graph() {
        let a = random_directed_pairs(15, 0.3, &mut rng()).unwrap();
        let b = random_directed_pairs(15, 0.3, &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_block_model_respects_blocks() {
        // dense inside blocks, nothing across
        let probabilities = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let blocks = [0, 0, 0, 1, 1];
        let g = stochastic_block_model(&probabilities, &blocks, &mut rng()).unwrap();
        assert_eq!(g.edges(), vec![(0, 1), (0, 2), (1, 2), (3, 4)]);
        assert_eq!(g.weak_component_count(), 2);
    }

    #[test]
    fn test_block_model_bad_input() {
        let probabilities = vec![vec![0.5, 0.5], vec![0.5, 0.5]];
        assert_eq!(
            stochastic_block_model(&probabilities, &[0, 2], &mut rng()),
            Err(GraphError::UnknownBlock { block: 2 })
        );
        let ragged = vec![vec![0.5, 0.5], vec![0.5]];
        assert_eq!(
            stochastic_block_model(&ragged, &[0, 1], &mut rng()),
            Err(GraphError::UnknownBlock { block: 1 })
        );
    }

    #[test]
    fn test_make_directed_keeps_one_direction() {
        let g = Graph::from_edges(4, true, &[(0, 1), (1, 0), (1, 2), (2, 3)]).unwrap();
        let d = make_directed(&g, &mut rng());
        assert!(d.is_directed());
        assert_eq!(d.edge_count(), 3);
        assert!(d.are_adjacent(0, 1));
        assert!(d.are_adjacent(2, 3));
        assert!(!(d.has_edge(0, 1) && d.has_edge(1, 0)));
    }
}
