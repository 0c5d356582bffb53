//! Hilbert matrix and its exact inverse as lazy closed-form nodes
//!
//! Neither node ever holds entries. `entry`, `determinant` and `inverse`
//! build small expressions from the dimension on every call, so a symbolic
//! `n` or a concrete `n` in the millions costs the same.

use crate::dims::validated_dim;
use crate::error::Result;
use crate::expr::{MatExpr, MatrixExpr};
use std::fmt;
use symmat_symbolic::{SymExpr, Symbol};

/// `H[i, j] = 1 / (i + j + 1)`, 0-indexed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HilbertMatrix {
    n: SymExpr,
}

/// Exact inverse of [`HilbertMatrix`] with the same dimension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InverseHilbertMatrix {
    n: SymExpr,
}

/// `∏_{k=1}^{upper} k!` over the given bound variable
fn factorial_product(k: &Symbol, upper: SymExpr) -> SymExpr {
    SymExpr::product(
        SymExpr::factorial(SymExpr::symbol(k.clone())),
        k.clone(),
        SymExpr::int(1),
        upper,
    )
}

/// The two products of the determinant formula, `(∏_{1}^{n-1} k!, ∏_{1}^{2n-1} k!)`
fn determinant_factors(n: &SymExpr) -> (SymExpr, SymExpr) {
    let k = Symbol::dummy("i");
    let small = factorial_product(&k, n.clone() - 1);
    let large = factorial_product(&k, SymExpr::int(2) * n.clone() - 1);
    (small, large)
}

impl HilbertMatrix {
    /// Fails with `InvalidDimension` unless `n` could be a nonnegative integer
    pub fn new(n: impl Into<SymExpr>) -> Result<Self> {
        let n = validated_dim(n)?;
        log::debug!("HilbertMatrix({}) constructed", n);
        Ok(HilbertMatrix { n })
    }

    pub fn dim(&self) -> &SymExpr {
        &self.n
    }

    pub fn shape(&self) -> (SymExpr, SymExpr) {
        (self.n.clone(), self.n.clone())
    }

    pub fn entry(&self, i: impl Into<SymExpr>, j: impl Into<SymExpr>) -> SymExpr {
        let (i, j) = (i.into(), j.into());
        log::trace!("HilbertMatrix({}) entry ({}, {})", self.n, i, j);
        SymExpr::pow(i + j + 1, SymExpr::int(-1)).simplify()
    }

    /// `(∏_{k=1}^{n-1} k!)^4 / ∏_{k=1}^{2n-1} k!`, left unevaluated
    pub fn determinant(&self) -> SymExpr {
        let _span = tracing::info_span!("matrix.determinant", node = %self).entered();
        log::trace!("HilbertMatrix({}) determinant", self.n);
        let (small, large) = determinant_factors(&self.n);
        SymExpr::mul(vec![
            SymExpr::pow(small, SymExpr::int(4)),
            SymExpr::pow(large, SymExpr::int(-1)),
        ])
    }

    pub fn inverse(&self) -> InverseHilbertMatrix {
        log::debug!("HilbertMatrix({}) -> InverseHilbertMatrix", self.n);
        InverseHilbertMatrix { n: self.n.clone() }
    }
}

impl InverseHilbertMatrix {
    pub fn new(n: impl Into<SymExpr>) -> Result<Self> {
        let n = validated_dim(n)?;
        log::debug!("InverseHilbertMatrix({}) constructed", n);
        Ok(InverseHilbertMatrix { n })
    }

    pub fn dim(&self) -> &SymExpr {
        &self.n
    }

    pub fn shape(&self) -> (SymExpr, SymExpr) {
        (self.n.clone(), self.n.clone())
    }

    /// `(-1)^(i+j) (i+j+1) C(n+i, n-j-1) C(n+j, n-i-1) C(i+j, i)^2`
    pub fn entry(&self, i: impl Into<SymExpr>, j: impl Into<SymExpr>) -> SymExpr {
        let (i, j) = (i.into(), j.into());
        log::trace!("InverseHilbertMatrix({}) entry ({}, {})", self.n, i, j);
        let n = &self.n;
        let sum = i.clone() + j.clone();
        SymExpr::mul(vec![
            SymExpr::pow(SymExpr::int(-1), sum.clone()),
            sum.clone() + 1,
            SymExpr::binomial(n.clone() + i.clone(), n.clone() - j.clone() - 1),
            SymExpr::binomial(n.clone() + j, n.clone() - i.clone() - 1),
            SymExpr::pow(SymExpr::binomial(sum, i), SymExpr::int(2)),
        ])
        .simplify()
    }

    /// `∏_{k=1}^{2n-1} k! / (∏_{k=1}^{n-1} k!)^4`, the reciprocal of the Hilbert determinant
    pub fn determinant(&self) -> SymExpr {
        let _span = tracing::info_span!("matrix.determinant", node = %self).entered();
        log::trace!("InverseHilbertMatrix({}) determinant", self.n);
        let (small, large) = determinant_factors(&self.n);
        SymExpr::mul(vec![large, SymExpr::pow(small, SymExpr::int(-4))])
    }

    pub fn inverse(&self) -> HilbertMatrix {
        log::debug!("InverseHilbertMatrix({}) -> HilbertMatrix", self.n);
        HilbertMatrix { n: self.n.clone() }
    }
}

impl MatrixExpr for HilbertMatrix {
    fn shape(&self) -> (SymExpr, SymExpr) {
        HilbertMatrix::shape(self)
    }

    fn entry(&self, i: &SymExpr, j: &SymExpr) -> SymExpr {
        HilbertMatrix::entry(self, i, j)
    }

    fn eval_determinant(&self) -> Result<SymExpr> {
        Ok(self.determinant())
    }

    fn eval_inverse(&self) -> Result<MatExpr> {
        Ok(self.inverse().into())
    }
}

impl MatrixExpr for InverseHilbertMatrix {
    fn shape(&self) -> (SymExpr, SymExpr) {
        InverseHilbertMatrix::shape(self)
    }

    fn entry(&self, i: &SymExpr, j: &SymExpr) -> SymExpr {
        InverseHilbertMatrix::entry(self, i, j)
    }

    fn eval_determinant(&self) -> Result<SymExpr> {
        Ok(self.determinant())
    }

    fn eval_inverse(&self) -> Result<MatExpr> {
        Ok(self.inverse().into())
    }
}

impl fmt::Display for HilbertMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HilbertMatrix({})", self.n)
    }
}

impl fmt::Display for InverseHilbertMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InverseHilbertMatrix({})", self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symmat_symbolic::SymExprKind;

    #[test]
    fn entry_is_reciprocal_of_index_sum() {
        let h = HilbertMatrix::new(5).unwrap();
        assert_eq!(h.entry(0, 0), SymExpr::int(1));
        assert_eq!(h.entry(2, 3), SymExpr::rational(1, 6));
        assert_eq!(h.entry(4, 4), SymExpr::rational(1, 9));
    }

    #[test]
    fn symbolic_entry_stays_symbolic() {
        let h = HilbertMatrix::new(SymExpr::var("n")).unwrap();
        let e = h.entry(SymExpr::var("i"), SymExpr::var("j"));
        let at = e
            .substitute("i", &SymExpr::int(1))
            .substitute("j", &SymExpr::int(2))
            .simplify();
        assert_eq!(at, SymExpr::rational(1, 4));
    }

    #[test]
    fn determinant_is_a_ratio_of_products() {
        let h = HilbertMatrix::new(SymExpr::var("n")).unwrap();
        let det = h.determinant();
        let factors = det.as_mul().expect("product of two powers");
        assert_eq!(factors.len(), 2);
        for f in factors {
            match f.kind.as_ref() {
                SymExprKind::Pow(base, _) => {
                    assert!(matches!(base.kind.as_ref(), SymExprKind::Product(_)))
                }
                other => panic!("unexpected factor {other:?}"),
            }
        }
        assert!(det.to_string().contains("factorial(_i)"));
    }

    #[test]
    fn each_determinant_uses_a_fresh_dummy() {
        let h = HilbertMatrix::new(SymExpr::var("n")).unwrap();
        assert_ne!(h.determinant(), h.determinant());
        assert_eq!(h.determinant().simplify(), h.determinant().simplify());
    }

    #[test]
    fn inverse_entries_for_three() {
        // Known inverse of the 3x3 Hilbert matrix
        let expected = [[9, -36, 30], [-36, 192, -180], [30, -180, 180]];
        let inv = InverseHilbertMatrix::new(3).unwrap();
        for (i, row) in expected.iter().enumerate() {
            for (j, value) in row.iter().enumerate() {
                assert_eq!(inv.entry(i, j), SymExpr::int(*value), "entry ({i}, {j})");
            }
        }
    }

    #[test]
    fn involution() {
        let h = HilbertMatrix::new(SymExpr::var("n")).unwrap();
        assert_eq!(h.inverse().inverse(), h);
        let inv = InverseHilbertMatrix::new(4).unwrap();
        assert_eq!(inv.inverse().inverse(), inv);
        assert_eq!(h.to_string(), "HilbertMatrix(n)");
        assert_eq!(inv.to_string(), "InverseHilbertMatrix(4)");
    }
}
