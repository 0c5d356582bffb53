//! Matrix products
//!
//! A product keeps its factors and answers `entry` with the row-by-column
//! sum. `MatExpr::doit` is where products get cancelled down.

use crate::dims::{concrete, provably_different, provably_equal};
use crate::error::{MatrixError, Result};
use crate::expr::{MatExpr, MatrixExpr};
use std::fmt;
use symmat_symbolic::{SymExpr, Symbol};

/// Inner dimensions up to this size are summed term by term; larger or
/// symbolic ones become a bound `Sum`
const EXPLICIT_INNER_LIMIT: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatMul {
    factors: Vec<MatExpr>,
}

impl MatMul {
    /// Multiply two or more factors left to right
    ///
    /// Nested products are flattened. Fails with `ShapeMismatch` when the
    /// inner dimensions of a neighbouring pair are provably different.
    pub fn new(factors: Vec<MatExpr>) -> Result<Self> {
        let mut flat = Vec::with_capacity(factors.len());
        for factor in factors {
            match factor {
                MatExpr::MatMul(inner) => flat.extend(inner.factors),
                other => flat.push(other),
            }
        }

        for pair in flat.windows(2) {
            let (_, left_cols) = pair[0].shape();
            let (right_rows, _) = pair[1].shape();
            if provably_different(&left_cols, &right_rows) {
                return Err(MatrixError::ShapeMismatch {
                    left: pair[0].to_string(),
                    right: pair[1].to_string(),
                });
            }
        }

        Ok(MatMul { factors: flat })
    }

    pub fn factors(&self) -> &[MatExpr] {
        &self.factors
    }

    fn all_square(&self) -> Result<()> {
        match self.factors.iter().find(|f| !f.is_square()) {
            Some(f) => Err(MatrixError::NonSquare(f.to_string())),
            None => Ok(()),
        }
    }
}

/// `Σ_k left(i, k) right(k, j)` over an inner dimension `inner`
fn row_times_column(
    left: &dyn Fn(&SymExpr) -> SymExpr,
    right: &dyn Fn(&SymExpr) -> SymExpr,
    inner: &SymExpr,
) -> SymExpr {
    match concrete(inner).filter(|m| *m <= EXPLICIT_INNER_LIMIT) {
        Some(m) => SymExpr::add(
            (0..m)
                .map(|k| {
                    let k = SymExpr::from(k);
                    left(&k) * right(&k)
                })
                .collect(),
        ),
        None => {
            let k = Symbol::dummy("k");
            let ks = SymExpr::symbol(k.clone());
            SymExpr::sum(left(&ks) * right(&ks), k, SymExpr::int(0), inner.clone() - 1)
        }
    }
}

impl MatrixExpr for MatMul {
    fn shape(&self) -> (SymExpr, SymExpr) {
        let rows = self
            .factors
            .first()
            .map(|f| f.shape().0)
            .unwrap_or_else(|| SymExpr::int(0));
        let cols = self
            .factors
            .last()
            .map(|f| f.shape().1)
            .unwrap_or_else(|| SymExpr::int(0));
        (rows, cols)
    }

    fn entry(&self, i: &SymExpr, j: &SymExpr) -> SymExpr {
        let _span =
            tracing::trace_span!("matrix.matmul.entry", factors = self.factors.len()).entered();
        log::trace!("MatMul entry ({}, {}) over {} factors", i, j, self.factors.len());
        match self.factors.as_slice() {
            [] => SymExpr::int(0),
            [only] => only.entry(i, j),
            [first, rest @ ..] => {
                let rest = MatMul {
                    factors: rest.to_vec(),
                };
                let inner = first.shape().1;
                row_times_column(&|k| first.entry(i, k), &|k| rest.entry(k, j), &inner)
                    .simplify()
            }
        }
    }

    fn eval_determinant(&self) -> Result<SymExpr> {
        self.all_square()?;
        let dets = self
            .factors
            .iter()
            .map(MatExpr::determinant)
            .collect::<Result<Vec<_>>>()?;
        Ok(SymExpr::mul(dets))
    }

    fn eval_inverse(&self) -> Result<MatExpr> {
        self.all_square()?;
        let inverses = self
            .factors
            .iter()
            .rev()
            .map(MatExpr::inverse)
            .collect::<Result<Vec<_>>>()?;
        Ok(MatMul::new(inverses)?.into())
    }
}

/// Cancel neighbouring inverse pairs and drop identity factors
pub(crate) fn cancel(factors: Vec<MatExpr>) -> Vec<MatExpr> {
    let mut out: Vec<MatExpr> = Vec::with_capacity(factors.len());
    for factor in factors {
        if matches!(factor, MatExpr::Identity(_)) {
            continue;
        }
        let cancels = out.last().map_or(false, |prev| is_inverse_pair(prev, &factor));
        if cancels {
            out.pop();
        } else {
            out.push(factor);
        }
    }
    out
}

fn is_inverse_pair(a: &MatExpr, b: &MatExpr) -> bool {
    match (a, b) {
        (MatExpr::Hilbert(h), MatExpr::InverseHilbert(inv))
        | (MatExpr::InverseHilbert(inv), MatExpr::Hilbert(h)) => {
            provably_equal(h.dim(), inv.dim())
        }
        _ => false,
    }
}

impl fmt::Display for MatMul {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, factor) in self.factors.iter().enumerate() {
            if idx > 0 {
                write!(f, "*")?;
            }
            write!(f, "{}", factor)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hilbert::HilbertMatrix;
    use crate::identity::Identity;

    fn hilbert(n: i64) -> MatExpr {
        HilbertMatrix::new(n).unwrap().into()
    }

    #[test]
    fn flattens_nested_products() {
        let inner: MatExpr = MatMul::new(vec![hilbert(2), hilbert(2)]).unwrap().into();
        let outer = MatMul::new(vec![inner, hilbert(2)]).unwrap();
        assert_eq!(outer.factors().len(), 3);
        assert_eq!(
            outer.to_string(),
            "HilbertMatrix(2)*HilbertMatrix(2)*HilbertMatrix(2)"
        );
    }

    #[test]
    fn rejects_mismatched_inner_dimensions() {
        let err = MatMul::new(vec![hilbert(2), hilbert(3)]).unwrap_err();
        assert!(matches!(err, MatrixError::ShapeMismatch { .. }));
        // Unknown relation between n and m is allowed
        let n: MatExpr = HilbertMatrix::new(SymExpr::var("n")).unwrap().into();
        let m: MatExpr = HilbertMatrix::new(SymExpr::var("m")).unwrap().into();
        assert!(MatMul::new(vec![n, m]).is_ok());
    }

    #[test]
    fn concrete_entry_sums_explicitly() {
        // (H2 * H2)[0, 0] = 1 + 1/4
        let p = MatMul::new(vec![hilbert(2), hilbert(2)]).unwrap();
        assert_eq!(
            p.entry(&SymExpr::int(0), &SymExpr::int(0)),
            SymExpr::rational(5, 4)
        );
    }

    #[test]
    fn symbolic_entry_is_a_bound_sum() {
        let h: MatExpr = HilbertMatrix::new(SymExpr::var("n")).unwrap().into();
        let p = MatMul::new(vec![h.clone(), h]).unwrap();
        let e = p.entry(&SymExpr::int(0), &SymExpr::int(0));
        assert!(e.to_string().starts_with("Sum("));
        let at_two = e.substitute("n", &SymExpr::int(2)).doit().unwrap();
        assert_eq!(at_two, SymExpr::rational(5, 4));
    }

    #[test]
    fn cancel_removes_inverse_pairs_and_identities() {
        let h = HilbertMatrix::new(3).unwrap();
        let eye: MatExpr = Identity::new(3).unwrap().into();
        let left = cancel(vec![
            h.clone().into(),
            eye,
            h.inverse().into(),
            h.clone().into(),
        ]);
        assert_eq!(left, vec![MatExpr::from(h)]);
    }
}
