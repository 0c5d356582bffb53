//! Symmat Lazy Matrix Expressions
//!
//! Symbolic matrix nodes that answer shape, entry, determinant and inverse
//! queries by closed-form formulas instead of materialized arrays.
//!
//! ```
//! use symmat_matrix::{HilbertMatrix, MatExpr};
//! use symmat_symbolic::SymExpr;
//!
//! let h = HilbertMatrix::new(2).unwrap();
//! assert_eq!(h.entry(0, 1), SymExpr::rational(1, 2));
//! assert_eq!(h.determinant().doit().unwrap(), SymExpr::rational(1, 12));
//! assert_eq!(h.inverse().entry(1, 1), SymExpr::int(12));
//!
//! let product = (MatExpr::from(h.clone()) * MatExpr::from(h.inverse())).unwrap();
//! assert!(product.as_explicit().unwrap().is_identity());
//! ```
//!
//! # Nodes
//!
//! - [`HilbertMatrix`] and [`InverseHilbertMatrix`], the pair `inverse()`
//!   toggles between
//! - [`Identity`] and [`MatMul`], used when composing and simplifying
//!
//! All nodes share the [`MatrixExpr`] capability and are wrapped by the
//! [`MatExpr`] enum for composition.

pub mod config;
mod dims;
mod error;
mod explicit;
mod expr;
mod hilbert;
mod identity;
mod matmul;

pub use config::{ConfigLoader, EvaluationConfig, LoggingConfig, SymmatConfig};
pub use dims::check_dim;
pub use error::{MatrixError, Result};
pub use explicit::{ExplicitConfig, ExplicitMatrix};
pub use expr::{MatExpr, MatrixExpr};
pub use hilbert::{HilbertMatrix, InverseHilbertMatrix};
pub use identity::Identity;
pub use matmul::MatMul;
