use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

/// Fatal configuration errors. Stochastic outcomes are never errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("invalid grid dimensions: {rows}x{cols}")]
    InvalidGridDimensions { rows: usize, cols: usize },

    #[error("unknown species: {0}")]
    UnknownSpecies(String),
}
