//! Graph Energy
//!
//! Folds a weighted list of metric targets into one mismatch score:
//! `energy = 1 - sum(weight * score) / sum(weight)`, where 0 means every
//! target is met exactly.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::InvalidTargetError;
use crate::graph::Graph;
use crate::metrics::{Metric, TargetValue};

/// One target as written in a synthesis request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub metric: String,
    pub value: TargetValue,
    /// Drawn uniformly from `[0.5, 1.5)` when absent.
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    pub metric: Metric,
    pub weight: f64,
}

impl Target {
    pub fn new(metric: Metric, weight: f64) -> Self {
        Self { metric, weight }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TargetSpec {
    targets: Vec<Target>,
    weight_sum: f64,
}

impl TargetSpec {
    pub fn new(targets: Vec<Target>) -> Result<Self, InvalidTargetError> {
        for target in &targets {
            if !(target.weight >= 0.0 && target.weight.is_finite()) {
                return Err(InvalidTargetError::NegativeWeight {
                    metric: target.metric.name().to_string(),
                    weight: target.weight,
                });
            }
        }

        let mut weight_sum: f64 = targets.iter().map(|t| t.weight).sum();
        if weight_sum == 0.0 {
            weight_sum = 1.0;
        }

        Ok(Self {
            targets,
            weight_sum,
        })
    }

    pub fn from_config(
        configs: &[TargetConfig],
        rng: &mut impl Rng,
    ) -> Result<Self, InvalidTargetError> {
        let targets = configs
            .iter()
            .map(|config| -> Result<Target, InvalidTargetError> {
                let metric = Metric::parse(&config.metric, config.value)?;
                let weight = config
                    .weight
                    .unwrap_or_else(|| 0.5 + rng.gen::<f64>());
                Ok(Target::new(metric, weight))
            })
            .collect::<Result<Vec<_>, InvalidTargetError>>()?;
        Self::new(targets)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn weight_sum(&self) -> f64 {
        self.weight_sum
    }
}

/// Measured value of one target next to what was asked for.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricReport {
    pub metric: &'static str,
    pub value: f64,
    pub target: f64,
    pub score: f64,
    pub weight: f64,
}

#[derive(Clone, Debug)]
pub struct EnergyModel {
    spec: TargetSpec,
}

impl EnergyModel {
    pub fn new(spec: TargetSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &TargetSpec {
        &self.spec
    }

    pub fn energy(&self, graph: &Graph) -> f64 {
        let psi: f64 = self
            .spec
            .targets
            .iter()
            .map(|t| t.weight * t.metric.evaluate(graph).score)
            .sum();
        (1.0 - psi / self.spec.weight_sum).clamp(0.0, 1.0)
    }

    pub fn report(&self, graph: &Graph) -> Vec<MetricReport> {
        self.spec
            .targets
            .iter()
            .map(|t| {
                let eval = t.metric.evaluate(graph);
                MetricReport {
                    metric: t.metric.name(),
                    value: eval.value,
                    target: t.metric.target(),
                    score: eval.score,
                    weight: t.weight,
                }
            })
            .collect()
    }
}
