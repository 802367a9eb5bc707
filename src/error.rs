//! Error types shared across the crate.

use thiserror::Error;

/// A synthesis target that cannot be evaluated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidTargetError {
    #[error("invalid target \"{0}\"")]
    UnknownMetric(String),
    #[error("target \"{metric}\" expects {expected}")]
    MalformedValue {
        metric: &'static str,
        expected: &'static str,
    },
    #[error("target \"{metric}\" has negative weight {weight}")]
    NegativeWeight { metric: String, weight: f64 },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("vertex {vertex} out of range for graph with {vertices} vertices")]
    VertexOutOfRange { vertex: usize, vertices: usize },
    #[error("self-loop on vertex {0}")]
    SelfLoop(usize),
    #[error("duplicate edge ({0}, {1})")]
    DuplicateEdge(usize, usize),
    #[error("block {block} has no row/column in the probability matrix")]
    UnknownBlock { block: usize },
    #[error("edge probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContagionError {
    #[error("invalid balance sheet parameters: {0}")]
    InvalidParameters(String),
    #[error("shock node {node} out of range for {vertices} banks")]
    ShockNodeOutOfRange { node: usize, vertices: usize },
    #[error("shock size must be finite and non-negative, got {0}")]
    InvalidShock(f64),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Target(#[from] InvalidTargetError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Contagion(#[from] ContagionError),
    #[error("batch worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
