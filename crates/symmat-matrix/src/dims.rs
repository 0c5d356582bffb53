//! Dimension and index validation shared by every matrix node
//!
//! Checks only reject what is provably wrong. A bare symbol with no
//! assumptions is a valid dimension; `-1`, `1.5` or a symbol declared
//! negative are not.

use crate::error::{MatrixError, Result};
use num_bigint::BigInt;
use symmat_symbolic::SymExpr;

/// Validate a matrix dimension
pub fn check_dim(n: &SymExpr) -> Result<()> {
    let simplified = n.simplify();
    if simplified.is_integer() == Some(false) || simplified.is_nonnegative() == Some(false) {
        return Err(MatrixError::InvalidDimension(n.to_string()));
    }
    Ok(())
}

/// Coerce and validate in one step; every node constructor goes through here
pub(crate) fn validated_dim(n: impl Into<SymExpr>) -> Result<SymExpr> {
    let n = n.into();
    check_dim(&n)?;
    Ok(n)
}

/// The dimension as a machine integer, when it is a literal that fits
pub(crate) fn concrete(n: &SymExpr) -> Option<u64> {
    n.simplify().as_integer().and_then(|v| u64::try_from(v).ok())
}

/// `a - b` reduced to a literal, if it reduces to one
fn literal_difference(a: &SymExpr, b: &SymExpr) -> Option<BigInt> {
    (a.clone() - b.clone()).simplify().as_integer()
}

pub(crate) fn provably_equal(a: &SymExpr, b: &SymExpr) -> bool {
    a == b || literal_difference(a, b).map_or(false, |d| d == BigInt::from(0))
}

pub(crate) fn provably_different(a: &SymExpr, b: &SymExpr) -> bool {
    literal_difference(a, b).map_or(false, |d| d != BigInt::from(0))
}

/// True when `idx` cannot be a valid 0-based index below `dim`
pub(crate) fn index_out_of_range(idx: &SymExpr, dim: &SymExpr) -> bool {
    let idx = idx.simplify();
    if idx.is_integer() == Some(false) || idx.is_nonnegative() == Some(false) {
        return true;
    }
    literal_difference(dim, &idx).map_or(false, |room| room <= BigInt::from(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use symmat_symbolic::{Symbol, SymbolAttrs};

    #[test]
    fn accepts_integers_and_plain_symbols() {
        assert!(check_dim(&SymExpr::int(0)).is_ok());
        assert!(check_dim(&SymExpr::int(7)).is_ok());
        assert!(check_dim(&SymExpr::var("n")).is_ok());
        let n = SymExpr::symbol(Symbol::with_attrs("n", SymbolAttrs::dimension()));
        assert!(check_dim(&(n * 2 + 1)).is_ok());
    }

    #[test]
    fn rejects_provably_invalid() {
        for bad in [
            SymExpr::int(-1),
            SymExpr::float(1.5),
            SymExpr::float(3.0),
            SymExpr::float(1e20),
            SymExpr::rational(1, 2),
        ] {
            assert!(matches!(
                check_dim(&bad),
                Err(MatrixError::InvalidDimension(_))
            ));
        }
        let negative = Symbol::with_attrs(
            "m",
            SymbolAttrs {
                negative: true,
                ..Default::default()
            },
        );
        assert!(check_dim(&SymExpr::symbol(negative)).is_err());
        // n - n - 1 reduces to -1
        let n = SymExpr::var("n");
        assert!(check_dim(&(n.clone() - n - 1)).is_err());
    }

    #[test]
    fn index_checks() {
        let n = SymExpr::var("n");
        assert!(!index_out_of_range(&SymExpr::int(1), &SymExpr::int(2)));
        assert!(index_out_of_range(&SymExpr::int(2), &SymExpr::int(2)));
        assert!(index_out_of_range(&SymExpr::int(-1), &n));
        assert!(index_out_of_range(&n, &n));
        assert!(!index_out_of_range(&(n.clone() - 1), &n));
        assert!(!index_out_of_range(&SymExpr::var("i"), &n));
    }

    #[test]
    fn equality_of_dimensions() {
        let n = SymExpr::var("n");
        assert!(provably_equal(&(n.clone() + 1 - 1), &n));
        assert!(provably_different(&(n.clone() + 1), &n));
        assert!(!provably_different(&SymExpr::var("m"), &n));
        assert_eq!(concrete(&(SymExpr::int(2) + SymExpr::int(3))), Some(5));
        assert_eq!(concrete(&n), None);
    }
}
