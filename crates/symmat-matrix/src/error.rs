use symmat_symbolic::SymbolicError;

/// Errors raised by matrix-expression construction and evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MatrixError {
    #[error("invalid dimension {0}: expected a nonnegative integer")]
    InvalidDimension(String),

    #[error("index ({i}, {j}) out of range for a {rows}x{cols} matrix")]
    IndexOutOfRange {
        i: String,
        j: String,
        rows: String,
        cols: String,
    },

    #[error("cannot multiply {left} by {right}: inner dimensions differ")]
    ShapeMismatch { left: String, right: String },

    #[error("matrix is not square: {0}")]
    NonSquare(String),

    #[error("shape is not concrete: {0}")]
    NotConcrete(String),

    #[error("{rows}x{cols} matrix exceeds the explicit size limit of {limit}")]
    TooLarge { rows: u64, cols: u64, limit: u64 },

    #[error(transparent)]
    Symbolic(#[from] SymbolicError),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
