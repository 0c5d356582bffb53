//! Symmat Symbolic Expression Engine
//!
//! Exact symbolic scalars for the lazy matrix nodes in `symmat-matrix`.
//!
//! # Architecture
//!
//! The engine uses a tree-based expression representation with:
//! - Exact arbitrary-precision rational coefficients (float fallback)
//! - Free symbols with assumptions, plus fresh dummy variables
//! - Unevaluated `Sum`/`Product` nodes over integer ranges
//! - Staged normalization pipeline
//! - Bytecode compilation for numeric evaluation
//!
//! # Design Principles
//!
//! 1. **Lazy**: closed forms stay symbolic until `doit()` or `evaluate()`
//! 2. **Exact**: no silent rounding on integer or rational inputs
//! 3. **Shareable**: expressions are immutable and `Send + Sync`

mod coeff;
mod compiler;
mod eval;
mod expr;
pub mod functions;
mod normalize;
mod symbol;

pub use coeff::Coefficient;
pub use compiler::{compile, compile_with_vars, BytecodeCompiler, BytecodeOp, CompiledExpr};
pub use eval::EvalOptions;
pub use expr::{Bounded, SymExpr, SymExprKind};
pub use normalize::{NormPass, NormProof, NormStep, StagedNormalizer};
pub use symbol::{Symbol, SymbolAttrs, SymbolId, SymbolScope};

/// Error type for symbolic operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SymbolicError {
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric overflow")]
    NumericOverflow,

    #[error("expression is not concrete; free symbols: {0}")]
    NotConcrete(String),

    #[error("expansion needs {terms} terms, limit is {limit}")]
    EvaluationLimit { terms: u128, limit: u64 },
}

pub type Result<T> = std::result::Result<T, SymbolicError>;
