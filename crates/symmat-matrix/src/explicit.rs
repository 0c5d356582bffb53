//! Materialized matrices, used to check lazy nodes against their entries

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use symmat_symbolic::{EvalOptions, SymExpr};

/// Bounds on `MatExpr::as_explicit_with`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplicitConfig {
    /// Largest row or column count that may be materialized
    pub max_dim: u64,
}

impl Default for ExplicitConfig {
    fn default() -> Self {
        ExplicitConfig { max_dim: 64 }
    }
}

/// Row-major `rows x cols` entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<SymExpr>,
}

impl ExplicitMatrix {
    pub(crate) fn new(rows: usize, cols: usize, entries: Vec<SymExpr>) -> Self {
        debug_assert_eq!(entries.len(), rows * cols);
        ExplicitMatrix {
            rows,
            cols,
            entries,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, i: usize, j: usize) -> Option<&SymExpr> {
        if i < self.rows && j < self.cols {
            self.entries.get(i * self.cols + j)
        } else {
            None
        }
    }

    /// Evaluate every entry with [`SymExpr::doit_with`]
    pub fn doit(&self, options: &EvalOptions) -> Result<ExplicitMatrix> {
        let entries = self
            .entries
            .iter()
            .map(|e| e.doit_with(options))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ExplicitMatrix::new(self.rows, self.cols, entries))
    }

    pub fn is_identity(&self) -> bool {
        self.rows == self.cols
            && (0..self.rows).all(|i| {
                (0..self.cols).all(|j| {
                    let expected = if i == j { 1 } else { 0 };
                    self.get(i, j)
                        .map_or(false, |e| e.simplify() == SymExpr::int(expected))
                })
            })
    }
}

impl fmt::Display for ExplicitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.rows {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[")?;
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.entries[i * self.cols + j])?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_detection_and_display() {
        let eye = ExplicitMatrix::new(
            2,
            2,
            vec![
                SymExpr::int(1),
                SymExpr::int(0),
                SymExpr::int(2) - SymExpr::int(2),
                SymExpr::int(1),
            ],
        );
        assert!(eye.is_identity());
        assert_eq!(eye.get(1, 1), Some(&SymExpr::int(1)));
        assert_eq!(eye.get(2, 0), None);

        let m = ExplicitMatrix::new(1, 2, vec![SymExpr::int(1), SymExpr::rational(1, 2)]);
        assert!(!m.is_identity());
        assert_eq!(m.to_string(), "[[1, 1/2]]");
    }
}
