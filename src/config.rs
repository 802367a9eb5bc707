//! Request Types
//!
//! JSON-deserializable descriptions of one synthesis run and one contagion
//! run. Every field has a default, so a request file only needs the values
//! it changes; binaries layer their command-line flags on top.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::annealing::{AnnealingConfig, AnnealingSynthesizer, SynthesisResult, Termination};
use crate::balance_sheet::{BalanceSheet, BalanceSheetParams};
use crate::batch::BatchRunner;
use crate::cascade::{CascadeConfig, CascadeSimulator, Shock};
use crate::energy::{EnergyModel, MetricReport, TargetConfig, TargetSpec};
use crate::error::Result;
use crate::generators::{random_directed, random_undirected};
use crate::graph::Graph;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    #[default]
    Annealing,
    Greedy,
}

impl SearchMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SearchMethod::Annealing => "Simulated Annealing",
            SearchMethod::Greedy => "Greedy Descent",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreedyConfig {
    pub iterations: usize,
    pub candidates: usize,
}

impl Default for GreedyConfig {
    fn default() -> Self {
        Self {
            iterations: 2000,
            candidates: 50,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisRequest {
    pub vertices: usize,
    pub directed: bool,
    pub targets: Vec<TargetConfig>,
    pub seed: u64,
    /// Start from a random graph with this link probability
    /// instead of an empty one.
    pub initial_density: Option<f64>,
    pub method: SearchMethod,
    pub annealing: AnnealingConfig,
    pub greedy: GreedyConfig,
}

impl Default for SynthesisRequest {
    fn default() -> Self {
        Self {
            vertices: 25,
            directed: true,
            targets: Vec::new(),
            seed: 0,
            initial_density: None,
            method: SearchMethod::default(),
            annealing: AnnealingConfig::default(),
            greedy: GreedyConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SynthesisReport {
    pub graph: Graph,
    pub energy: f64,
    pub iterations: usize,
    pub termination: Termination,
    pub metrics: Vec<MetricReport>,
}

impl SynthesisRequest {
    /// Builds the energy model and runs the configured search. Missing
    /// target weights and the initial graph are drawn from `seed`.
    pub fn run(&self) -> Result<SynthesisReport> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let model = EnergyModel::new(TargetSpec::from_config(&self.targets, &mut rng)?);

        let initial = match self.initial_density {
            Some(p) if self.directed => random_directed(self.vertices, p, &mut rng)?,
            Some(p) => random_undirected(self.vertices, p, &mut rng)?,
            None => Graph::new(self.vertices, self.directed),
        };

        info!(
            vertices = self.vertices,
            targets = self.targets.len(),
            method = self.method.name(),
            seed = self.seed,
            "synthesizing"
        );
        let mut synthesizer =
            AnnealingSynthesizer::new(model, self.annealing.clone(), rng.gen());
        let SynthesisResult {
            graph,
            energy,
            iterations,
            termination,
        } = match self.method {
            SearchMethod::Annealing => synthesizer.run(initial),
            SearchMethod::Greedy => synthesizer.greedy_descent(
                initial,
                self.greedy.iterations,
                self.greedy.candidates,
            ),
        };
        let metrics = synthesizer.model().report(&graph);

        Ok(SynthesisReport {
            graph,
            energy,
            iterations,
            termination,
            metrics,
        })
    }

    /// `runs` copies of this request with consecutive seeds.
    pub fn with_seeds(&self, runs: usize) -> Vec<SynthesisRequest> {
        (0..runs as u64)
            .map(|i| SynthesisRequest {
                seed: self.seed.wrapping_add(i),
                ..self.clone()
            })
            .collect()
    }

    /// Runs every request on `runner`. A failed unit keeps its error in its
    /// own slot; only a pool that cannot be built fails the whole batch.
    pub fn run_batch(
        runner: &BatchRunner,
        requests: &[SynthesisRequest],
    ) -> Result<Vec<Option<Result<SynthesisReport>>>> {
        runner.run(requests, SynthesisRequest::run)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContagionRequest {
    pub params: BalanceSheetParams,
    pub shock_size: f64,
    /// `None` shocks every bank in turn and averages.
    pub shock_node: Option<usize>,
    pub cascade: CascadeConfig,
}

impl Default for ContagionRequest {
    fn default() -> Self {
        Self {
            params: BalanceSheetParams::default(),
            shock_size: 100_000.0,
            shock_node: None,
            cascade: CascadeConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContagionReport {
    pub banks: usize,
    pub shock_node: Option<usize>,
    /// Exact count for one origin, mean over origins otherwise.
    pub defaults: f64,
    pub default_fraction: f64,
}

impl ContagionRequest {
    pub fn run(&self, graph: &Graph) -> Result<ContagionReport> {
        let sheet = BalanceSheet::build(graph, &self.params)?;
        let simulator = CascadeSimulator::new(&sheet).with_config(self.cascade);
        let banks = sheet.banks();

        let (defaults, default_fraction) = match self.shock_node {
            Some(node) => {
                let outcome = simulator.run(Shock {
                    size: self.shock_size,
                    node,
                })?;
                (outcome.defaults as f64, outcome.default_fraction())
            }
            None => {
                let sweep = simulator.run_all_origins(self.shock_size)?;
                (sweep.mean_defaults, sweep.default_fraction)
            }
        };

        Ok(ContagionReport {
            banks,
            shock_node: self.shock_node,
            defaults,
            default_fraction,
        })
    }

    /// One unit per graph. Errors stay with the graph that caused them.
    pub fn run_batch(
        &self,
        runner: &BatchRunner,
        graphs: &[Graph],
    ) -> Result<Vec<Option<Result<ContagionReport>>>> {
        runner.run(graphs, |graph| self.run(graph))
    }
}
