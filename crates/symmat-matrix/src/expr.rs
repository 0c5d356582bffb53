//! Matrix-expression capability and the closed set of nodes implementing it

use crate::dims::{concrete, index_out_of_range, provably_equal};
use crate::error::{MatrixError, Result};
use crate::explicit::{ExplicitConfig, ExplicitMatrix};
use crate::hilbert::{HilbertMatrix, InverseHilbertMatrix};
use crate::identity::Identity;
use crate::matmul::{cancel, MatMul};
use std::fmt;
use std::ops::Mul;
use symmat_symbolic::{compile_with_vars, SymExpr, SymbolicError};

/// What every lazy matrix node answers
pub trait MatrixExpr {
    /// `(rows, cols)`
    fn shape(&self) -> (SymExpr, SymExpr);

    /// Entry at 0-based `(i, j)`; no range validation
    fn entry(&self, i: &SymExpr, j: &SymExpr) -> SymExpr;

    fn eval_determinant(&self) -> Result<SymExpr>;

    fn eval_inverse(&self) -> Result<MatExpr>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatExpr {
    Hilbert(HilbertMatrix),
    InverseHilbert(InverseHilbertMatrix),
    Identity(Identity),
    MatMul(MatMul),
}

impl MatExpr {
    fn node(&self) -> &dyn MatrixExpr {
        match self {
            MatExpr::Hilbert(m) => m,
            MatExpr::InverseHilbert(m) => m,
            MatExpr::Identity(m) => m,
            MatExpr::MatMul(m) => m,
        }
    }

    pub fn shape(&self) -> (SymExpr, SymExpr) {
        self.node().shape()
    }

    pub fn rows(&self) -> SymExpr {
        self.shape().0
    }

    pub fn cols(&self) -> SymExpr {
        self.shape().1
    }

    /// True when rows and cols are provably equal
    pub fn is_square(&self) -> bool {
        let (rows, cols) = self.shape();
        provably_equal(&rows, &cols)
    }

    /// Entry without index validation
    pub fn entry(&self, i: &SymExpr, j: &SymExpr) -> SymExpr {
        self.node().entry(i, j)
    }

    /// Entry at `(i, j)`; fails only when an index is provably out of range
    pub fn get(&self, i: impl Into<SymExpr>, j: impl Into<SymExpr>) -> Result<SymExpr> {
        let (i, j) = (i.into(), j.into());
        let (rows, cols) = self.shape();
        if index_out_of_range(&i, &rows) || index_out_of_range(&j, &cols) {
            return Err(MatrixError::IndexOutOfRange {
                i: i.to_string(),
                j: j.to_string(),
                rows: rows.to_string(),
                cols: cols.to_string(),
            });
        }
        Ok(self.entry(&i, &j))
    }

    pub fn determinant(&self) -> Result<SymExpr> {
        if !self.is_square() {
            return Err(MatrixError::NonSquare(self.to_string()));
        }
        self.node().eval_determinant()
    }

    pub fn inverse(&self) -> Result<MatExpr> {
        if !self.is_square() {
            return Err(MatrixError::NonSquare(self.to_string()));
        }
        self.node().eval_inverse()
    }

    /// Numeric determinant with the free symbols bound by name
    pub fn determinant_f64(&self, bindings: &[(&str, f64)]) -> Result<f64> {
        let det = self.determinant()?;
        let names: Vec<&str> = bindings.iter().map(|(name, _)| *name).collect();
        let compiled = compile_with_vars(&det, &names);
        if let Some(unbound) = compiled.variables.get(names.len()) {
            return Err(SymbolicError::UndefinedSymbol(unbound.clone()).into());
        }
        let values: Vec<f64> = bindings.iter().map(|(_, value)| *value).collect();
        Ok(compiled.eval(&values)?)
    }

    pub fn matmul(&self, other: &MatExpr) -> Result<MatExpr> {
        Ok(MatMul::new(vec![self.clone(), other.clone()])?.into())
    }

    /// Structural simplification
    ///
    /// Products cancel neighbouring `H * H^-1` pairs and drop identity
    /// factors; a product that cancels completely becomes `Identity`.
    pub fn doit(&self) -> MatExpr {
        let MatExpr::MatMul(product) = self else {
            return self.clone();
        };
        let _span =
            tracing::info_span!("matrix.doit", factors = product.factors().len()).entered();
        let rows = self.rows();
        let factors = cancel(product.factors().iter().map(MatExpr::doit).collect());
        log::debug!(
            "{} reduced from {} to {} factors",
            self,
            product.factors().len(),
            factors.len()
        );
        match factors.len() {
            // Shape-checked factors that cancelled completely leave a square identity
            0 => MatExpr::Identity(Identity::from_checked(rows)),
            1 => factors.into_iter().next().unwrap_or_else(|| self.clone()),
            _ => MatMul::new(factors)
                .map(MatExpr::MatMul)
                .unwrap_or_else(|_| self.clone()),
        }
    }

    pub fn as_explicit(&self) -> Result<ExplicitMatrix> {
        self.as_explicit_with(&ExplicitConfig::default())
    }

    /// Materialize every entry; only for concrete shapes within the size limit
    pub fn as_explicit_with(&self, config: &ExplicitConfig) -> Result<ExplicitMatrix> {
        let (rows, cols) = self.shape();
        let (Some(r), Some(c)) = (concrete(&rows), concrete(&cols)) else {
            return Err(MatrixError::NotConcrete(format!("{} x {}", rows, cols)));
        };
        if r > config.max_dim || c > config.max_dim {
            return Err(MatrixError::TooLarge {
                rows: r,
                cols: c,
                limit: config.max_dim,
            });
        }

        let mut entries = Vec::with_capacity((r * c) as usize);
        for i in 0..r {
            for j in 0..c {
                entries.push(self.entry(&SymExpr::from(i), &SymExpr::from(j)));
            }
        }
        Ok(ExplicitMatrix::new(r as usize, c as usize, entries))
    }
}

impl Mul for MatExpr {
    type Output = Result<MatExpr>;

    fn mul(self, rhs: MatExpr) -> Result<MatExpr> {
        self.matmul(&rhs)
    }
}

impl Mul for &MatExpr {
    type Output = Result<MatExpr>;

    fn mul(self, rhs: &MatExpr) -> Result<MatExpr> {
        self.matmul(rhs)
    }
}

impl From<HilbertMatrix> for MatExpr {
    fn from(m: HilbertMatrix) -> Self {
        MatExpr::Hilbert(m)
    }
}

impl From<InverseHilbertMatrix> for MatExpr {
    fn from(m: InverseHilbertMatrix) -> Self {
        MatExpr::InverseHilbert(m)
    }
}

impl From<Identity> for MatExpr {
    fn from(m: Identity) -> Self {
        MatExpr::Identity(m)
    }
}

impl From<MatMul> for MatExpr {
    fn from(m: MatMul) -> Self {
        MatExpr::MatMul(m)
    }
}

impl fmt::Display for MatExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatExpr::Hilbert(m) => write!(f, "{}", m),
            MatExpr::InverseHilbert(m) => write!(f, "{}", m),
            MatExpr::Identity(m) => write!(f, "{}", m),
            MatExpr::MatMul(m) => write!(f, "{}", m),
        }
    }
}
