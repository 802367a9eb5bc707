//! Default Cascade Simulation
//!
//! Propagates an exogenous loss through the interbank exposure matrix.
//!
//! ## Cascade Mechanics
//! 1. A shock hits one bank (capped at its total assets)
//! 2. Net worth absorbs as much as it can
//! 3. The remainder, capped at the bank's outstanding interbank debt, is
//!    passed to its creditors in proportion to what it owes each of them
//! 4. Creditors absorb their share on the same or the next pass
//!
//! Banks are scanned in index order every pass, so a given shock always
//! produces the same cascade. Exposures and liabilities only shrink, which
//! bounds the number of passes.
//!
//! A bank counts as defaulted when it was hit during the run and its net
//! worth ended below `epsilon`.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::balance_sheet::BalanceSheet;
use crate::error::ContagionError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Losses and net worth at or below this are treated as zero.
    pub epsilon: f64,
    pub max_passes: usize,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            max_passes: 10_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shock {
    pub size: f64,
    pub node: usize,
}

/// Only banks that received a loss above `epsilon` can default: a bank whose
/// net worth starts below `epsilon` but is never hit is not counted.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeOutcome {
    pub defaults: usize,
    pub passes: usize,
    pub defaulted: Vec<bool>,
}

impl CascadeOutcome {
    pub fn default_fraction(&self) -> f64 {
        if self.defaulted.is_empty() {
            return 0.0;
        }
        self.defaults as f64 / self.defaulted.len() as f64
    }
}

/// Result of shocking every bank in turn.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OriginSweep {
    pub per_origin: Vec<usize>,
    pub mean_defaults: f64,
    /// `mean_defaults / N`.
    pub default_fraction: f64,
}

/// Scratch state of one run; never shared between runs.
struct ShockState {
    shock: Array1<f64>,
    net_worth: Array1<f64>,
    liabilities: Array1<f64>,
    exposures: Array2<f64>,
    hit: Vec<bool>,
}

impl ShockState {
    fn new(sheet: &BalanceSheet) -> Self {
        Self {
            shock: Array1::zeros(sheet.banks()),
            net_worth: sheet.net_worth().clone(),
            liabilities: sheet.interbank_liabilities().clone(),
            exposures: sheet.exposures().clone(),
            hit: vec![false; sheet.banks()],
        }
    }

    /// Absorbs bank `s`'s pending shock and forwards the unabsorbed part
    /// to its creditors.
    fn absorb(&mut self, s: usize, epsilon: f64) {
        let loss = self.shock[s];
        if loss > epsilon {
            self.hit[s] = true;
            let spill = (loss - self.net_worth[s]).max(0.0).min(self.liabilities[s]);
            self.net_worth[s] = (self.net_worth[s] - loss).max(0.0);

            if spill > 0.0 {
                self.liabilities[s] -= spill;
                let mut owed_to = self.exposures.column_mut(s);
                let owed = owed_to.sum();
                // zero recorded debt: the loss stops here
                if owed > 0.0 {
                    let scale = spill / owed;
                    for (creditor, exposure) in owed_to.iter_mut().enumerate() {
                        let share = *exposure * scale;
                        *exposure -= share;
                        self.shock[creditor] += share;
                    }
                }
            }
        }
        self.shock[s] = 0.0;
    }
}

fn max(values: &Array1<f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, |m, &x| m.max(x))
}

pub struct CascadeSimulator<'a> {
    sheet: &'a BalanceSheet,
    config: CascadeConfig,
}

impl<'a> CascadeSimulator<'a> {
    pub fn new(sheet: &'a BalanceSheet) -> Self {
        Self {
            sheet,
            config: CascadeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CascadeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn run(&self, shock: Shock) -> Result<CascadeOutcome, ContagionError> {
        let n = self.sheet.banks();
        if shock.node >= n {
            return Err(ContagionError::ShockNodeOutOfRange {
                node: shock.node,
                vertices: n,
            });
        }
        if !(shock.size.is_finite() && shock.size >= 0.0) {
            return Err(ContagionError::InvalidShock(shock.size));
        }

        let epsilon = self.config.epsilon;
        let mut state = ShockState::new(self.sheet);
        state.shock[shock.node] = shock.size.min(self.sheet.total_assets()[shock.node]);

        let mut passes = 0;
        while max(&state.shock) > epsilon && max(&state.net_worth) > epsilon {
            if passes >= self.config.max_passes {
                warn!(passes, node = shock.node, "cascade pass limit reached");
                break;
            }
            for s in 0..n {
                state.absorb(s, epsilon);
            }
            passes += 1;
        }

        let defaulted: Vec<bool> = state
            .hit
            .iter()
            .zip(state.net_worth.iter())
            .map(|(&hit, &c)| hit && c < epsilon)
            .collect();
        let defaults = defaulted.iter().filter(|&&d| d).count();
        debug!(node = shock.node, size = shock.size, defaults, passes, "cascade settled");

        Ok(CascadeOutcome {
            defaults,
            passes,
            defaulted,
        })
    }

    /// Shocks each bank in turn with the same loss.
    pub fn run_all_origins(&self, shock_size: f64) -> Result<OriginSweep, ContagionError> {
        let n = self.sheet.banks();
        let per_origin = (0..n)
            .map(|node| {
                self.run(Shock {
                    size: shock_size,
                    node,
                })
                .map(|outcome| outcome.defaults)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mean_defaults = per_origin.iter().sum::<usize>() as f64 / n as f64;
        Ok(OriginSweep {
            per_origin,
            mean_defaults,
            default_fraction: mean_defaults / n as f64,
        })
    }
}

/// Number of banks that default after `shock_size` hits `shock_node`.
pub fn simulate(
    sheet: &BalanceSheet,
    shock_size: f64,
    shock_node: usize,
) -> Result<usize, ContagionError> {
    CascadeSimulator::new(sheet)
        .run(Shock {
            size: shock_size,
            node: shock_node,
        })
        .map(|outcome| outcome.defaults)
}
