//! Simulated-Annealing Topology Synthesis
//!
//! Searches for a graph whose statistics match an [`EnergyModel`]'s targets.
//!
//! ## Search Loop
//! 1. Clone the current graph and apply a few random mutations
//! 2. Accept the candidate with probability `exp(-max(0, dE) / T)`
//! 3. Remember the lowest-energy candidate ever seen
//! 4. Cool: `T = T0 / (1 + r * t)`
//!
//! The chain stops once the accepted energy drops to the tolerance
//! (`Converged`), the temperature reaches `T0 / (1 + r * max_iterations)`
//! (`Cooled`), or an optional wall-clock budget runs out (`BudgetExhausted`).
//! The best-ever graph is returned, which need not be the last accepted one.
//!
//! All randomness comes from one seeded ChaCha stream, so a seed, a config
//! and an initial graph fully determine the result.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::energy::EnergyModel;
use crate::graph::Graph;
use crate::mutation::{Locality, Mutator};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealingConfig {
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    pub max_iterations: usize,
    /// Energy at or below which the chain counts as converged.
    pub tolerance: f64,
    pub mutations_per_step: usize,
    /// Wall-clock limit in seconds.
    pub time_budget_secs: Option<f64>,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 0.03,
            cooling_rate: 0.001,
            max_iterations: 100_000,
            tolerance: 1e-6,
            mutations_per_step: 3,
            time_budget_secs: None,
        }
    }
}

impl AnnealingConfig {
    /// Looser tolerance for quick batch generation.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-4,
            ..Self::default()
        }
    }

    pub fn temperature(&self, iteration: usize) -> f64 {
        self.initial_temperature / (1.0 + self.cooling_rate * iteration as f64)
    }

    pub fn min_temperature(&self) -> f64 {
        self.temperature(self.max_iterations)
    }

    /// Negative, NaN and unrepresentably large budgets mean no limit.
    fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Converged,
    Cooled,
    BudgetExhausted,
    /// Greedy descent ran all of its iterations.
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnealingState {
    Searching,
    Finished(Termination),
}

#[derive(Clone, Debug)]
pub struct SynthesisResult {
    pub graph: Graph,
    pub energy: f64,
    pub iterations: usize,
    pub termination: Termination,
}

pub struct AnnealingSynthesizer {
    model: EnergyModel,
    mutator: Mutator,
    config: AnnealingConfig,
    rng: ChaCha8Rng,
}

impl AnnealingSynthesizer {
    pub fn new(model: EnergyModel, config: AnnealingConfig, seed: u64) -> Self {
        Self {
            model,
            mutator: Mutator::default(),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn with_mutator(mut self, mutator: Mutator) -> Self {
        self.mutator = mutator;
        self
    }

    pub fn model(&self) -> &EnergyModel {
        &self.model
    }

    pub fn config(&self) -> &AnnealingConfig {
        &self.config
    }

    /// Begins a chain that can be advanced one iteration at a time.
    pub fn start(&mut self, initial: Graph) -> AnnealingRun<'_> {
        let energy = self.model.energy(&initial);
        AnnealingRun {
            temperature: self.config.initial_temperature,
            min_temperature: self.config.min_temperature(),
            deadline: self.config.time_budget().map(|b| Instant::now() + b),
            print_step: (self.config.max_iterations / 1000).max(1),
            synth: self,
            best: initial.clone(),
            best_energy: energy,
            current: initial,
            current_energy: energy,
            iteration: 0,
            state: AnnealingState::Searching,
        }
    }

    /// Runs a chain to its terminal state.
    pub fn run(&mut self, initial: Graph) -> SynthesisResult {
        let mut chain = self.start(initial);
        while chain.step() == AnnealingState::Searching {}
        chain.finish()
    }

    /// Steepest-descent alternative to annealing: every iteration moves to
    /// the best of `candidates` mutated copies, even when it is worse.
    /// Local moves become more likely as the search progresses.
    pub fn greedy_descent(
        &mut self,
        initial: Graph,
        iterations: usize,
        candidates: usize,
    ) -> SynthesisResult {
        let deadline = self.config.time_budget().map(|b| Instant::now() + b);
        let mut energy = self.model.energy(&initial);
        let mut graph = initial;
        let mut termination = Termination::Completed;
        let mut done = 0;

        for i in 0..iterations {
            if energy <= self.config.tolerance {
                termination = Termination::Converged;
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                termination = Termination::BudgetExhausted;
                break;
            }

            let progress = i as f64 / iterations as f64;
            let mut best: Option<(Graph, f64)> = None;
            for _ in 0..candidates.max(1) {
                let mut candidate = graph.clone();
                let locality = if progress > self.rng.gen::<f64>() {
                    Locality::Local
                } else {
                    Locality::Global
                };
                self.mutator.mutate(
                    &mut candidate,
                    self.config.mutations_per_step,
                    Some(locality),
                    &mut self.rng,
                );
                let e = self.model.energy(&candidate);
                if best.as_ref().map_or(true, |(_, best_e)| e < *best_e) {
                    best = Some((candidate, e));
                }
            }
            if let Some((g, e)) = best {
                graph = g;
                energy = e;
            }
            done += 1;
        }

        info!(iterations = done, energy, ?termination, "greedy descent finished");
        SynthesisResult {
            graph,
            energy,
            iterations: done,
            termination,
        }
    }
}

/// One annealing chain in progress.
pub struct AnnealingRun<'a> {
    synth: &'a mut AnnealingSynthesizer,
    current: Graph,
    current_energy: f64,
    best: Graph,
    best_energy: f64,
    temperature: f64,
    min_temperature: f64,
    iteration: usize,
    deadline: Option<Instant>,
    print_step: usize,
    state: AnnealingState,
}

impl AnnealingRun<'_> {
    pub fn state(&self) -> AnnealingState {
        self.state
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn current_energy(&self) -> f64 {
        self.current_energy
    }

    pub fn best_energy(&self) -> f64 {
        self.best_energy
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    fn terminal(&self) -> Option<Termination> {
        if self.current_energy <= self.synth.config.tolerance {
            Some(Termination::Converged)
        } else if self.temperature <= self.min_temperature {
            Some(Termination::Cooled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Termination::BudgetExhausted)
        } else {
            None
        }
    }

    /// Performs one Metropolis iteration, or settles into a terminal state.
    pub fn step(&mut self) -> AnnealingState {
        if self.state != AnnealingState::Searching {
            return self.state;
        }
        if let Some(termination) = self.terminal() {
            self.state = AnnealingState::Finished(termination);
            info!(
                iterations = self.iteration,
                energy = self.best_energy,
                ?termination,
                "annealing finished"
            );
            return self.state;
        }

        let synth = &mut *self.synth;
        let mut candidate = self.current.clone();
        synth.mutator.mutate(
            &mut candidate,
            synth.config.mutations_per_step,
            None,
            &mut synth.rng,
        );
        let candidate_energy = synth.model.energy(&candidate);

        let delta = (candidate_energy - self.current_energy).max(0.0);
        let accepted = (-delta / self.temperature).exp() > synth.rng.gen::<f64>();

        if candidate_energy < self.best_energy {
            self.best = candidate.clone();
            self.best_energy = candidate_energy;
        }
        if accepted {
            self.current = candidate;
            self.current_energy = candidate_energy;
        }

        self.temperature = synth.config.temperature(self.iteration);
        self.iteration += 1;

        if self.iteration % self.print_step == 0 {
            debug!(
                temperature = self.temperature,
                progress = self.iteration as f64 / synth.config.max_iterations.max(1) as f64,
                energy = self.current_energy,
                "annealing"
            );
        }
        self.state
    }

    pub fn finish(self) -> SynthesisResult {
        let termination = match self.state {
            AnnealingState::Finished(t) => t,
            AnnealingState::Searching => Termination::BudgetExhausted,
        };
        SynthesisResult {
            graph: self.best,
            energy: self.best_energy,
            iterations: self.iteration,
            termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::{Target, TargetSpec};
    use crate::metrics::Metric;

    fn density_model(target: f64) -> EnergyModel {
        EnergyModel::new(
            TargetSpec::new(vec![
                Target::new(Metric::Density(target), 1.0),
                Target::new(Metric::Components(1.0), 1.0),
            ])
            .unwrap(),
        )
    }

    fn quick_config() -> AnnealingConfig {
        AnnealingConfig {
            max_iterations: 2_000,
            tolerance: 1e-4,
            ..AnnealingConfig::default()
        }
    }

    #[test]
    fn test_temperature_schedule() {
        let config = AnnealingConfig::default();
        assert_eq!(config.temperature(0), 0.03);
        assert!((config.min_temperature() - 0.03 / 101.0).abs() < 1e-15);
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = |seed| {
            let mut synth = AnnealingSynthesizer::new(density_model(0.3), quick_config(), seed);
            synth.run(Graph::undirected(10))
        };
        let a = run(42);
        let b = run(42);
        assert_eq!(a.graph, b.graph);
        assert_eq!(a.energy, b.energy);
        assert_eq!(a.iterations, b.iterations);
        assert_eq!(a.termination, b.termination);
    }

    #[test]
    fn test_best_energy_never_worse_than_initial() {
        let model = density_model(0.5);
        let initial = Graph::undirected(8);
        let initial_energy = model.energy(&initial);
        let mut synth = AnnealingSynthesizer::new(model, quick_config(), 3);
        let result = synth.run(initial);
        assert!(result.energy <= initial_energy);
        assert!((synth.model().energy(&result.graph) - result.energy).abs() < 1e-12);
        assert_eq!(result.graph.vertex_count(), 8);
    }

    #[test]
    fn test_converged_start_stops_immediately() {
        let model = EnergyModel::new(
            TargetSpec::new(vec![Target::new(Metric::Density(0.0), 1.0)]).unwrap(),
        );
        let mut synth = AnnealingSynthesizer::new(model, quick_config(), 1);
        let result = synth.run(Graph::directed(5));
        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_chain_cools() {
        let config = AnnealingConfig {
            max_iterations: 50,
            tolerance: 0.0,
            ..AnnealingConfig::default()
        };
        let mut synth = AnnealingSynthesizer::new(density_model(0.9), config, 11);
        let mut chain = synth.start(Graph::undirected(6));
        let mut steps = 0;
        while chain.step() == AnnealingState::Searching {
            steps += 1;
            assert!(steps < 1_000);
        }
        assert_eq!(chain.state(), AnnealingState::Finished(Termination::Cooled));
        assert!(chain.best_energy() <= chain.current_energy());
        assert!(chain.temperature() <= AnnealingConfig::default().temperature(50));
        let result = chain.finish();
        assert_eq!(result.termination, Termination::Cooled);
        assert_eq!(result.iterations, 51);
    }

    #[test]
    fn test_zero_time_budget() {
        let config = AnnealingConfig {
            time_budget_secs: Some(0.0),
            ..quick_config()
        };
        let mut synth = AnnealingSynthesizer::new(density_model(0.4), config, 5);
        let result = synth.run(Graph::undirected(6));
        assert_eq!(result.termination, Termination::BudgetExhausted);
    }

    #[test]
    fn test_oversized_time_budget_is_unlimited() {
        for secs in [1e300, f64::INFINITY, f64::NAN, -1.0] {
            let config = AnnealingConfig {
                max_iterations: 20,
                tolerance: 0.0,
                time_budget_secs: Some(secs),
                ..AnnealingConfig::default()
            };
            assert_eq!(config.time_budget(), None);
            let mut synth = AnnealingSynthesizer::new(density_model(0.9), config, 2);
            let result = synth.run(Graph::undirected(6));
            assert_eq!(result.termination, Termination::Cooled);
        }
    }

    #[test]
    fn test_greedy_descent_improves() {
        let model = density_model(0.4);
        let initial = Graph::undirected(8);
        let initial_energy = model.energy(&initial);
        let mut synth = AnnealingSynthesizer::new(model, quick_config(), 9);
        let result = synth.greedy_descent(initial, 30, 20);
        assert!(result.energy < initial_energy);
        assert!(result.iterations <= 30);
    }
}
