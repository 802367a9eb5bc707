//! Bank Balance Sheets
//!
//! Derives every bank's balance sheet from the interbank topology and three
//! scalars: total external assets `E`, net-worth fraction `gamma` and
//! interbank-asset fraction `theta`.
//!
//! ## Construction
//! - Total assets `A = E / (1 - theta)`, interbank volume `I = theta * A`
//! - Each exposure (edge `i -> j`: j owes i) carries `w = I / Z`
//! - Interbank assets are out-degree times `w`, liabilities in-degree times `w`
//! - External assets cover the funding gap `b - i`; what is left of `E` is
//!   spread evenly, so external assets always sum to `E`
//! - Net worth `c = gamma * a`, deposits `d = a - c - b`
//!
//! An undirected edge counts as two mutual exposures.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::ContagionError;
use crate::graph::Graph;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceSheetParams {
    /// Total external assets `E` across the system.
    pub external_assets: f64,
    /// Net worth as a fraction of each bank's total assets.
    pub gamma: f64,
    /// Interbank assets as a fraction of total assets.
    pub theta: f64,
}

impl Default for BalanceSheetParams {
    fn default() -> Self {
        Self {
            external_assets: 100_000.0,
            gamma: 0.05,
            theta: 0.2,
        }
    }
}

impl BalanceSheetParams {
    pub fn validate(&self) -> Result<(), ContagionError> {
        if !(self.external_assets.is_finite() && self.external_assets >= 0.0) {
            return Err(ContagionError::InvalidParameters(format!(
                "external assets must be finite and non-negative, got {}",
                self.external_assets
            )));
        }
        if !(self.gamma > 0.0 && self.gamma.is_finite()) {
            return Err(ContagionError::InvalidParameters(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        if !(self.theta > 0.0 && self.theta < 1.0) {
            return Err(ContagionError::InvalidParameters(format!(
                "theta must lie in (0, 1), got {}",
                self.theta
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BalanceSheet {
    total_assets: Array1<f64>,
    external_assets: Array1<f64>,
    interbank_assets: Array1<f64>,
    net_worth: Array1<f64>,
    deposits: Array1<f64>,
    interbank_liabilities: Array1<f64>,
    /// `exposures[[i, j]]` is what bank j owes bank i.
    exposures: Array2<f64>,
}

impl BalanceSheet {
    pub fn build(graph: &Graph, params: &BalanceSheetParams) -> Result<Self, ContagionError> {
        params.validate()?;
        let n = graph.vertex_count();
        if n == 0 {
            return Err(ContagionError::InvalidParameters(
                "graph has no banks".to_string(),
            ));
        }

        let beta = 1.0 - params.theta;
        let assets = params.external_assets / beta;
        let interbank = params.theta * assets;

        let adjacency =
            Array2::from_shape_fn((n, n), |(i, j)| if graph.has_edge(i, j) { 1.0 } else { 0.0 });
        let links = adjacency.sum();
        let w = if links > 0.0 { interbank / links } else { 0.0 };

        let exposures = adjacency * w;
        let interbank_assets = exposures.sum_axis(Axis(1));
        let interbank_liabilities = exposures.sum_axis(Axis(0));

        let funding_gap = &interbank_liabilities - &interbank_assets;
        let left = params.external_assets - funding_gap.sum();
        let external_assets = funding_gap + left / n as f64;

        let total_assets = &external_assets + &interbank_assets;
        let net_worth = &total_assets * params.gamma;
        let deposits = &total_assets - &net_worth - &interbank_liabilities;

        Ok(Self {
            total_assets,
            external_assets,
            interbank_assets,
            net_worth,
            deposits,
            interbank_liabilities,
            exposures,
        })
    }

    pub fn banks(&self) -> usize {
        self.total_assets.len()
    }

    pub fn total_assets(&self) -> &Array1<f64> {
        &self.total_assets
    }

    pub fn external_assets(&self) -> &Array1<f64> {
        &self.external_assets
    }

    pub fn interbank_assets(&self) -> &Array1<f64> {
        &self.interbank_assets
    }

    pub fn net_worth(&self) -> &Array1<f64> {
        &self.net_worth
    }

    pub fn deposits(&self) -> &Array1<f64> {
        &self.deposits
    }

    pub fn interbank_liabilities(&self) -> &Array1<f64> {
        &self.interbank_liabilities
    }

    pub fn exposures(&self) -> &Array2<f64> {
        &self.exposures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(n: usize) -> Graph {
        let mut g = Graph::directed(n);
        for i in 0..n {
            for j in 0..n {
                g.add_edge(i, j);
            }
        }
        g
    }

    #[test]
    fn test_complete_graph_sheet() {
        let params = BalanceSheetParams {
            external_assets: 1000.0,
            gamma: 0.01,
            theta: 0.5,
        };
        let sheet = BalanceSheet::build(&complete(4), &params).unwrap();
        assert_eq!(sheet.banks(), 4);
        for v in 0..4 {
            assert!((sheet.interbank_assets()[v] - 250.0).abs() < 1e-9);
            assert!((sheet.interbank_liabilities()[v] - 250.0).abs() < 1e-9);
            assert!((sheet.external_assets()[v] - 250.0).abs() < 1e-9);
            assert!((sheet.total_assets()[v] - 500.0).abs() < 1e-9);
            assert!((sheet.net_worth()[v] - 5.0).abs() < 1e-9);
            assert!((sheet.deposits()[v] - 245.0).abs() < 1e-9);
        }
        assert!((sheet.exposures()[[0, 1]] - 1000.0 / 12.0).abs() < 1e-9);
        assert_eq!(sheet.exposures()[[2, 2]], 0.0);
    }

    #[test]
    fn test_external_assets_sum_to_total() {
        // a chain gives every bank a different funding gap
        let g = Graph::from_edges(4, true, &[(0, 1), (1, 2), (2, 3), (0, 3)]).unwrap();
        let params = BalanceSheetParams::default();
        let sheet = BalanceSheet::build(&g, &params).unwrap();
        assert!((sheet.external_assets().sum() - params.external_assets).abs() < 1e-6);
        for v in 0..4 {
            let a = sheet.external_assets()[v] + sheet.interbank_assets()[v];
            assert!((sheet.total_assets()[v] - a).abs() < 1e-9);
        }
        assert!(
            (sheet.exposures().sum() - params.theta * params.external_assets / (1.0 - params.theta))
                .abs()
                < 1e-6
        );
    }

    #[test]
    fn test_edgeless_graph_has_no_interbank_linkage() {
        let sheet = BalanceSheet::build(&Graph::directed(5), &BalanceSheetParams::default()).unwrap();
        assert_eq!(sheet.exposures().sum(), 0.0);
        assert_eq!(sheet.interbank_liabilities().sum(), 0.0);
        for v in 0..5 {
            assert!((sheet.external_assets()[v] - 20_000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_params() {
        let g = complete(3);
        for params in [
            BalanceSheetParams { theta: 0.0, ..Default::default() },
            BalanceSheetParams { theta: 1.0, ..Default::default() },
            BalanceSheetParams { gamma: 0.0, ..Default::default() },
            BalanceSheetParams { external_assets: f64::NAN, ..Default::default() },
        ] {
            assert!(matches!(
                BalanceSheet::build(&g, &params),
                Err(ContagionError::InvalidParameters(_))
            ));
        }
        assert!(BalanceSheet::build(&Graph::directed(0), &BalanceSheetParams::default()).is_err());
    }
}
