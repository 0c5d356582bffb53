//! Exact integer special functions
//!
//! `factorial`, `binomial` and `kronecker_delta` are kept as named `Func`
//! nodes while their arguments are symbolic and fold to exact integers once
//! the arguments become integer literals.

use crate::expr::{SymExpr, SymExprKind};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

pub const FACTORIAL: &str = "factorial";
pub const BINOMIAL: &str = "binomial";
pub const KRONECKER_DELTA: &str = "kronecker_delta";

/// `n!` for a nonnegative `n`
pub fn factorial(n: u64) -> BigInt {
    (2..=n).fold(BigInt::one(), |acc, k| acc * BigInt::from(k))
}

/// Binomial coefficient for integer arguments
///
/// `k < 0` gives `0`. For `n >= 0`, `k > n` gives `0`. A negative `n` uses
/// the generalized identity `C(n, k) = (-1)^k C(k - n - 1, k)`.
pub fn binomial(n: &BigInt, k: &BigInt) -> BigInt {
    if k.is_negative() {
        return BigInt::zero();
    }
    if n.is_negative() {
        let flipped = binomial(&(k - n - BigInt::one()), k);
        return if k.is_odd() { -flipped } else { flipped };
    }
    if k > n {
        return BigInt::zero();
    }

    // Multiplicative formula over the shorter side keeps huge `n` cheap
    let nk = n - k;
    let k = if &nk < k { nk } else { k.clone() };
    let mut result = BigInt::one();
    let mut i = BigInt::zero();
    while i < k {
        result = result * (n - &i) / (&i + BigInt::one());
        i += 1u32;
    }
    result
}

/// Evaluate a special-function node whose arguments are literals
///
/// Returns `None` when `expr` is not one of the functions above or its
/// arguments are not concrete integers in the function's domain.
pub fn fold(expr: &SymExpr) -> Option<SymExpr> {
    let SymExprKind::Func(name, args) = expr.kind.as_ref() else {
        return None;
    };
    match (name.as_str(), args.as_slice()) {
        (FACTORIAL, [x]) => {
            let n = x.as_integer()?;
            if n.is_negative() {
                return None;
            }
            Some(SymExpr::big(factorial(n.to_u64()?)))
        }
        (BINOMIAL, [n, k]) => {
            let n = n.as_integer()?;
            let k = k.as_integer()?;
            Some(SymExpr::big(binomial(&n, &k)))
        }
        (KRONECKER_DELTA, [i, j]) => {
            let i = i.as_coeff()?;
            let j = j.as_coeff()?;
            Some(SymExpr::int(if i == j { 1 } else { 0 }))
        }
        _ => None,
    }
}

/// Floating-point factorial; `NaN` outside the nonnegative integers
pub fn factorial_f64(x: f64) -> f64 {
    if x < 0.0 || x.fract() != 0.0 || !x.is_finite() {
        return f64::NAN;
    }
    if x > 170.0 {
        return f64::INFINITY;
    }
    (2..=(x as u64)).fold(1.0, |acc, k| acc * k as f64)
}

/// Floating-point binomial for integral arguments
pub fn binomial_f64(n: f64, k: f64) -> f64 {
    if n.fract() != 0.0 || k.fract() != 0.0 || !n.is_finite() || !k.is_finite() {
        return f64::NAN;
    }
    binomial(&BigInt::from(n as i64), &BigInt::from(k as i64))
        .to_f64()
        .unwrap_or(f64::INFINITY)
}
