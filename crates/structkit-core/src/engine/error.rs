use thiserror::Error;

use crate::core::models::structure::StructureError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Structural data error: {source}")]
    Structure {
        #[from]
        source: StructureError,
    },

    #[error("Coordinate assembly failed: {0}")]
    Coordinates(String),

    #[error("Coordinate sets differ in shape: {0}")]
    ShapeMismatch(String),

    #[error("At least {required} structures are required, but only {found} were given")]
    TooFewStructures { required: usize, found: usize },

    #[error("Requested {requested} modes, but only {available} are available")]
    TooManyModes { requested: usize, available: usize },

    #[error("Algorithm failed to converge after {iterations} iterations")]
    Convergence { iterations: usize },

    #[error("Numerical failure: {0}")]
    Numerical(String),
}
