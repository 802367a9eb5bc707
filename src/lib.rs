//! Interbank Contagion Library
//!
//! Synthesizes interbank network topologies that match target statistics and
//! simulates default cascades on them.
//!
//! ## Modules
//!
//! - `graph`: directed/undirected simple graph with the JSON exchange format
//! - `metrics`: density, clustering, path length, components, communities
//! - `energy`: weighted target mismatch in `[0, 1]`
//! - `mutation`: local and global edge edits
//! - `annealing`: simulated-annealing and greedy topology search
//! - `balance_sheet`: bank balance sheets derived from the topology
//! - `cascade`: proportional loss propagation and default counting
//! - `generators`: random seed topologies
//! - `batch`: parallel independent runs with cancellation
//! - `config`, `io`, `error`: requests, graph files, error types
//!
//! ## Usage
//!
//! ```bash
//! # Synthesize a 25-bank network
//! cargo run --bin synthesize --release -- --vertices 25 \
//!     --target components=1 --target clustering=0.52 --output network.json
//!
//! # Count defaults after shocking every bank in turn
//! cargo run --bin contagion --release -- --graph network.json
//! ```

pub mod annealing;
pub mod balance_sheet;
pub mod batch;
pub mod cascade;
pub mod config;
pub mod energy;
pub mod error;
pub mod generators;
pub mod graph;
pub mod io;
pub mod metrics;
pub mod mutation;

pub use annealing::{AnnealingConfig, AnnealingSynthesizer, SynthesisResult, Termination};
pub use balance_sheet::{BalanceSheet, BalanceSheetParams};
pub use cascade::{CascadeConfig, CascadeSimulator, Shock};
pub use energy::{EnergyModel, Target, TargetSpec};
pub use error::{Error, Result};
pub use graph::Graph;
pub use metrics::Metric;
