use thiserror::Error;

use crate::types::Key;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ElimError {
    #[error("Singular system: pivot {pivot:e} for variable {key} is zero, negative or not finite")]
    SingularSystem { key: Key, pivot: f64 },

    #[error("Variable {0} is not bound")]
    UnboundVariable(Key),

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("Dimension mismatch: expected {expected}, got {got} in {context}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        context: String,
    },

    #[error("Invalid conditional: {0}")]
    InvalidConditional(String),

    #[error("Ordering violation: parent {key} of conditional {position} is not eliminated later in the chain")]
    OrderingViolation { key: Key, position: usize },

    #[error("Variable {0} is frontal in more than one clique")]
    DuplicateFrontal(Key),

    #[error("Running intersection violated: separator variable {key} of the clique on {clique} is not in its parent clique")]
    RunningIntersection { clique: Key, key: Key },
}

pub type Result<T> = std::result::Result<T, ElimError>;
