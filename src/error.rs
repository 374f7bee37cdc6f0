use std::fmt;

/// The quantity that went non-finite during a training batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instability {
    /// A hidden activation or the network output.
    Activation,
    /// A per-neuron error term from the backward pass.
    ErrorTerm,
    /// An accumulated gradient sum.
    Gradient,
}

impl fmt::Display for Instability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instability::Activation => f.write_str("activation"),
            Instability::ErrorTerm => f.write_str("error term"),
            Instability::Gradient => f.write_str("gradient"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("numeric instability in epoch {epoch}, batch {batch}: non-finite {what}")]
    NumericInstability {
        epoch: usize,
        batch: usize,
        what: Instability,
    },
    #[error("training task failed: {0}")]
    Training(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
