//! Topological Metrics
//!
//! Each [`Metric`] carries its own target and knows how to score a graph
//! against it. Scores live in `[0, 1]` with 1 meaning an exact match.
//!
//! ## Scoring
//! - Linear (`density`, `clustering`, `modularity`): `1 - |target - value|`
//! - Inverse (`apl`, `components`, `communities`): `1 / (|target - value| + 1)`
//!
//! Metrics that are undefined on a graph (no vertex with two neighbors, no
//! reachable pair, a disconnected graph for community detection) score 0
//! with a raw value of 0 instead of leaking NaN into the energy sum.

use petgraph::algo::dijkstra;
use serde::{Deserialize, Serialize};

use crate::error::InvalidTargetError;
use crate::graph::Graph;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Metric {
    Density(f64),
    Clustering(f64),
    AveragePathLength(f64),
    Components(f64),
    Communities(f64),
    /// Modularity of the greedy dendrogram cut at `clusters` communities.
    Modularity { clusters: usize, target: f64 },
}

/// Target value as written in a request: a scalar or a pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    Scalar(f64),
    Pair(f64, f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Scale {
    Linear,
    Inverse,
}

/// Score of one metric together with the measured value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub score: f64,
    pub value: f64,
}

impl Evaluation {
    const UNDEFINED: Evaluation = Evaluation {
        score: 0.0,
        value: 0.0,
    };
}

impl Metric {
    pub const NAMES: [&'static str; 6] = [
        "density",
        "clustering",
        "apl",
        "components",
        "communities",
        "modularity",
    ];

    /// Resolves a string-keyed target. Unknown names are configuration bugs.
    pub fn parse(name: &str, value: TargetValue) -> Result<Self, InvalidTargetError> {
        let scalar = |metric: &'static str| match value {
            TargetValue::Scalar(v) if v.is_finite() => Ok(v),
            _ => Err(InvalidTargetError::MalformedValue {
                metric,
                expected: "a finite number",
            }),
        };

        match name {
            "density" => Ok(Self::Density(scalar("density")?)),
            "clustering" => Ok(Self::Clustering(scalar("clustering")?)),
            "apl" => Ok(Self::AveragePathLength(scalar("apl")?)),
            "components" => Ok(Self::Components(scalar("components")?)),
            "communities" => Ok(Self::Communities(scalar("communities")?)),
            "modularity" => match value {
                TargetValue::Pair(clusters, target)
                    if clusters.is_finite() && clusters >= 1.0 && target.is_finite() =>
                {
                    Ok(Self::Modularity {
                        clusters: clusters.round() as usize,
                        target,
                    })
                }
                _ => Err(InvalidTargetError::MalformedValue {
                    metric: "modularity",
                    expected: "a (clusters >= 1, modularity) pair",
                }),
            },
            other => Err(InvalidTargetError::UnknownMetric(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Density(_) => "density",
            Self::Clustering(_) => "clustering",
            Self::AveragePathLength(_) => "apl",
            Self::Components(_) => "components",
            Self::Communities(_) => "communities",
            Self::Modularity { .. } => "modularity",
        }
    }

    pub fn target(&self) -> f64 {
        match *self {
            Self::Density(t)
            | Self::Clustering(t)
            | Self::AveragePathLength(t)
            | Self::Components(t)
            | Self::Communities(t) => t,
            Self::Modularity { target, .. } => target,
        }
    }

    fn scale(&self) -> Scale {
        match self {
            Self::Density(_) | Self::Clustering(_) | Self::Modularity { .. } => Scale::Linear,
            Self::AveragePathLength(_) | Self::Components(_) | Self::Communities(_) => {
                Scale::Inverse
            }
        }
    }

    /// Measures the raw statistic, `None` when it is undefined on `graph`.
    pub fn measure(&self, graph: &Graph) -> Option<f64> {
        match *self {
            Self::Density(_) => Some(density(graph)),
            Self::Clustering(_) => average_clustering(graph),
            Self::AveragePathLength(_) => average_path_length(graph),
            Self::Components(_) => Some(graph.component_count() as f64),
            Self::Communities(_) => {
                if graph.component_count() > 1 {
                    return None;
                }
                Dendrogram::build(graph).map(|d| d.optimal_count() as f64)
            }
            Self::Modularity { clusters, .. } => {
                if graph.component_count() > 1 {
                    return None;
                }
                Dendrogram::build(graph).map(|d| d.modularity_at(clusters))
            }
        }
    }

    pub fn evaluate(&self, graph: &Graph) -> Evaluation {
        let value = match self.measure(graph) {
            Some(v) if v.is_finite() => v,
            _ => return Evaluation::UNDEFINED,
        };
        let distance = (self.target() - value).abs();
        let score = match self.scale() {
            Scale::Linear => (1.0 - distance).clamp(0.0, 1.0),
            Scale::Inverse => 1.0 / (distance + 1.0),
        };
        Evaluation { score, value }
    }
}

/// Edge density without loops; 0 for graphs with fewer than two vertices.
pub fn density(graph: &Graph) -> f64 {
    let n = graph.vertex_count() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let pairs = n * (n - 1.0);
    let edges = graph.edge_count() as f64;
    if graph.is_directed() {
        edges / pairs
    } else {
        2.0 * edges / pairs
    }
}

/// Mean local clustering coefficient of the undirected projection, taken
/// over vertices with at least two neighbors.
pub fn average_clustering(graph: &Graph) -> Option<f64> {
    let g = graph.to_undirected();
    let mut sum = 0.0;
    let mut counted = 0usize;

    for v in 0..g.vertex_count() {
        let neighbors: Vec<usize> = g.neighbors(v).iter().copied().collect();
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        let mut links = 0usize;
        for (idx, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[idx + 1..] {
                if g.has_edge(a, b) {
                    links += 1;
                }
            }
        }
        sum += 2.0 * links as f64 / (k * (k - 1)) as f64;
        counted += 1;
    }

    (counted > 0).then(|| sum / counted as f64)
}

/// Mean shortest-path length over ordered pairs where the target is
/// reachable; arcs follow edge direction.
pub fn average_path_length(graph: &Graph) -> Option<f64> {
    let arcs = graph.arcs();
    let mut total = 0usize;
    let mut pairs = 0usize;

    for source in arcs.node_indices() {
        let distances = dijkstra(&arcs, source, None, |_| 1usize);
        total += distances.values().sum::<usize>();
        pairs += distances.len() - 1;
    }

    (pairs > 0).then(|| total as f64 / pairs as f64)
}

/// Newman modularity of a vertex partition over the undirected projection.
pub fn modularity(graph: &Graph, membership: &[usize]) -> f64 {
    let g = graph.to_undirected();
    let m2 = 2.0 * g.edge_count() as f64;
    if m2 == 0.0 {
        return 0.0;
    }
    let groups = membership.iter().copied().max().map_or(0, |c| c + 1);
    let mut internal = vec![0.0; groups];
    let mut degree = vec![0.0; groups];

    for v in 0..g.vertex_count() {
        degree[membership[v]] += g.out_degree(v) as f64;
    }
    for (u, v) in g.edges() {
        if membership[u] == membership[v] {
            internal[membership[u]] += 2.0;
        }
    }

    internal
        .iter()
        .zip(&degree)
        .map(|(e, a)| e / m2 - (a / m2).powi(2))
        .sum()
}

/// Merge history of greedy modularity agglomeration (Clauset–Newman–Moore).
///
/// Starting from singletons, repeatedly joins the pair of adjacent
/// communities with the largest modularity gain. Ties go to the pair seen
/// first in `(i, j)` scan order.
#[derive(Clone, Debug)]
pub struct Dendrogram {
    vertices: usize,
    merges: Vec<(usize, usize)>,
    /// `modularity[k]` is the modularity after `k` merges.
    modularity: Vec<f64>,
}

impl Dendrogram {
    /// `None` when the graph has no edges.
    pub fn build(graph: &Graph) -> Option<Self> {
        let g = graph.to_undirected();
        let n = g.vertex_count();
        let m2 = 2.0 * g.edge_count() as f64;
        if m2 == 0.0 {
            return None;
        }

        let mut e = vec![vec![0.0; n]; n];
        let mut a = vec![0.0; n];
        for (u, v) in g.edges() {
            e[u][v] += 1.0 / m2;
            e[v][u] += 1.0 / m2;
        }
        for (v, share) in a.iter_mut().enumerate() {
            *share = g.out_degree(v) as f64 / m2;
        }

        let mut active = vec![true; n];
        let mut q = -a.iter().map(|x| x * x).sum::<f64>();
        let mut merges = Vec::with_capacity(n.saturating_sub(1));
        let mut modularity = vec![q];

        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for i in (0..n).filter(|&i| active[i]) {
                for j in (i + 1..n).filter(|&j| active[j]) {
                    if e[i][j] <= 0.0 {
                        continue;
                    }
                    let gain = 2.0 * (e[i][j] - a[i] * a[j]);
                    if best.map_or(true, |(_, _, best_gain)| gain > best_gain) {
                        best = Some((i, j, gain));
                    }
                }
            }
            let Some((i, j, gain)) = best else { break };

            for k in 0..n {
                e[i][k] += e[j][k];
            }
            for row in e.iter_mut() {
                row[i] += row[j];
            }
            for k in 0..n {
                e[j][k] = 0.0;
                e[k][j] = 0.0;
            }
            a[i] += a[j];
            a[j] = 0.0;
            active[j] = false;

            q += gain;
            merges.push((i, j));
            modularity.push(q);
        }

        Some(Self {
            vertices: n,
            merges,
            modularity,
        })
    }

    /// Community count at the first modularity maximum.
    pub fn optimal_count(&self) -> usize {
        let mut best = 0;
        for (k, &q) in self.modularity.iter().enumerate() {
            if q > self.modularity[best] {
                best = k;
            }
        }
        self.vertices - best
    }

    pub fn min_clusters(&self) -> usize {
        self.vertices - self.merges.len()
    }

    fn merges_for(&self, clusters: usize) -> usize {
        let clusters = clusters.clamp(self.min_clusters(), self.vertices);
        self.vertices - clusters
    }

    pub fn modularity_at(&self, clusters: usize) -> f64 {
        self.modularity[self.merges_for(clusters)]
    }

    /// Community label per vertex for the cut at `clusters`, labels `0..clusters`.
    pub fn membership(&self, clusters: usize) -> Vec<usize> {
        let mut root: Vec<usize> = (0..self.vertices).collect();
        for &(i, j) in &self.merges[..self.merges_for(clusters)] {
            for r in root.iter_mut() {
                if *r == j {
                    *r = i;
                }
            }
        }
        let mut labels = vec![usize::MAX; self.vertices];
        let mut next = 0;
        root.iter()
            .map(|&r| {
                if labels[r] == usize::MAX {
                    labels[r] = next;
                    next += 1;
                }
                labels[r]
            })
            .collect()
    }
}
