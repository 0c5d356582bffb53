use crate::dims::validated_dim;
use crate::error::Result;
use crate::expr::{MatExpr, MatrixExpr};
use std::fmt;
use symmat_symbolic::SymExpr;

/// The `n x n` identity; entries are Kronecker deltas
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    n: SymExpr,
}

impl Identity {
    pub fn new(n: impl Into<SymExpr>) -> Result<Self> {
        Ok(Identity {
            n: validated_dim(n)?,
        })
    }

    /// For dimensions taken from an already validated node
    pub(crate) fn from_checked(n: SymExpr) -> Self {
        Identity { n }
    }

    pub fn dim(&self) -> &SymExpr {
        &self.n
    }
}

impl MatrixExpr for Identity {
    fn shape(&self) -> (SymExpr, SymExpr) {
        (self.n.clone(), self.n.clone())
    }

    fn entry(&self, i: &SymExpr, j: &SymExpr) -> SymExpr {
        SymExpr::kronecker_delta(i.clone(), j.clone()).simplify()
    }

    fn eval_determinant(&self) -> Result<SymExpr> {
        Ok(SymExpr::int(1))
    }

    fn eval_inverse(&self) -> Result<MatExpr> {
        Ok(self.clone().into())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_kronecker_deltas() {
        let eye = Identity::new(3).unwrap();
        assert_eq!(eye.entry(&SymExpr::int(1), &SymExpr::int(1)), SymExpr::int(1));
        assert_eq!(eye.entry(&SymExpr::int(0), &SymExpr::int(2)), SymExpr::int(0));
        let i = SymExpr::var("i");
        assert_eq!(eye.entry(&i, &i), SymExpr::int(1));
        assert!(eye.entry(&i, &SymExpr::var("j")).to_string().starts_with("kronecker_delta"));
    }

    #[test]
    fn rejects_bad_dimension() {
        assert!(Identity::new(-2).is_err());
    }
}
