//! Coefficient representation for symbolic expressions
//!
//! Coefficients are exact arbitrary-precision rationals, with a
//! floating-point variant for inputs that were never exact to begin with.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A coefficient in a symbolic expression
///
/// Hilbert determinants outgrow any fixed-width integer after a handful of
/// rows, so the exact variant is backed by `BigRational`. `Float` only
/// appears when a caller hands in a non-integral `f64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Coefficient {
    /// Exact rational number, always in lowest terms with a positive denominator
    Rational(BigRational),
    /// Floating-point approximation
    Float(f64),
}

impl Coefficient {
    /// Create an integer coefficient
    pub fn int(n: i64) -> Self {
        Coefficient::Rational(BigRational::from_integer(BigInt::from(n)))
    }

    /// Create an integer coefficient from a big integer
    pub fn big(n: BigInt) -> Self {
        Coefficient::Rational(BigRational::from_integer(n))
    }

    /// Create a rational coefficient, automatically reducing
    pub fn rational(num: i64, den: i64) -> Self {
        if den == 0 {
            return Coefficient::Float(if num >= 0 {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            });
        }
        // `BigRational::new` normalizes sign and reduces by the gcd
        Coefficient::Rational(BigRational::new(BigInt::from(num), BigInt::from(den)))
    }

    /// Create a floating-point coefficient
    pub fn float(f: f64) -> Self {
        Coefficient::Float(f)
    }

    /// Check if coefficient is zero
    pub fn is_zero(&self) -> bool {
        match self {
            Coefficient::Rational(r) => r.is_zero(),
            Coefficient::Float(f) => *f == 0.0,
        }
    }

    /// Check if coefficient is one
    pub fn is_one(&self) -> bool {
        match self {
            Coefficient::Rational(r) => r.is_one(),
            Coefficient::Float(f) => (*f - 1.0).abs() < 1e-15,
        }
    }

    /// Check if coefficient is negative one
    pub fn is_neg_one(&self) -> bool {
        match self {
            Coefficient::Rational(r) => (-r).is_one(),
            Coefficient::Float(f) => (*f + 1.0).abs() < 1e-15,
        }
    }

    /// Check if coefficient is negative
    pub fn is_negative(&self) -> bool {
        match self {
            Coefficient::Rational(r) => r.is_negative(),
            Coefficient::Float(f) => *f < 0.0,
        }
    }

    /// Check if coefficient is an exact integer
    ///
    /// Floats never count: `1.5` and `2.0` supplied as floats are not
    /// integer-typed values.
    pub fn is_integer(&self) -> bool {
        match self {
            Coefficient::Rational(r) => r.is_integer(),
            Coefficient::Float(_) => false,
        }
    }

    /// Check if coefficient is exact
    pub fn is_exact(&self) -> bool {
        matches!(self, Coefficient::Rational(_))
    }

    /// The integer value, if this is an exact integer
    pub fn to_integer(&self) -> Option<BigInt> {
        match self {
            Coefficient::Rational(r) if r.is_integer() => Some(r.to_integer()),
            _ => None,
        }
    }

    /// The integer value, if this is an exact integer that fits in `i64`
    pub fn to_i64(&self) -> Option<i64> {
        self.to_integer().and_then(|n| n.to_i64())
    }

    /// Convert to f64
    pub fn to_f64(&self) -> f64 {
        match self {
            Coefficient::Rational(r) => r.to_f64().unwrap_or(f64::NAN),
            Coefficient::Float(f) => *f,
        }
    }

    /// Try to convert f64 to exact rational if possible
    pub fn from_f64_exact(f: f64) -> Self {
        if f.fract() == 0.0 && f.is_finite() && f.abs() < i64::MAX as f64 {
            Coefficient::int(f as i64)
        } else {
            Coefficient::Float(f)
        }
    }

    /// Compute power with integer exponent
    pub fn pow_int(&self, exp: i32) -> Self {
        if exp == 0 {
            return Coefficient::int(1);
        }
        if exp == 1 {
            return self.clone();
        }

        match self {
            Coefficient::Rational(r) => {
                if r.is_zero() && exp < 0 {
                    return Coefficient::Float(f64::INFINITY);
                }
                Coefficient::Rational(r.pow(exp))
            }
            Coefficient::Float(f) => Coefficient::Float(f.powi(exp)),
        }
    }

    /// Compute power with coefficient exponent
    pub fn pow(&self, exp: &Coefficient) -> Self {
        match exp.to_integer().and_then(|n| n.to_i32()) {
            Some(n) => self.pow_int(n),
            None => Coefficient::Float(self.to_f64().powf(exp.to_f64())),
        }
    }

    /// Absolute value
    pub fn abs(&self) -> Self {
        match self {
            Coefficient::Rational(r) => Coefficient::Rational(r.abs()),
            Coefficient::Float(f) => Coefficient::Float(f.abs()),
        }
    }
}

impl PartialEq for Coefficient {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Coefficient::Rational(a), Coefficient::Rational(b)) => a == b,
            (Coefficient::Float(f1), Coefficient::Float(f2)) => {
                (f1 - f2).abs() < 1e-15 || (f1.is_nan() && f2.is_nan())
            }
            _ => (self.to_f64() - other.to_f64()).abs() < 1e-15,
        }
    }
}

impl Eq for Coefficient {}

impl PartialOrd for Coefficient {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coefficient {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Coefficient::Rational(a), Coefficient::Rational(b)) => a.cmp(b),
            _ => {
                let a = self.to_f64();
                let b = other.to_f64();
                a.partial_cmp(&b).unwrap_or(Ordering::Equal)
            }
        }
    }
}

impl std::hash::Hash for Coefficient {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Coefficient::Rational(r) => {
                state.write_u8(0);
                r.numer().hash(state);
                r.denom().hash(state);
            }
            Coefficient::Float(f) => {
                state.write_u8(1);
                f.to_bits().hash(state);
            }
        }
    }
}

impl Default for Coefficient {
    fn default() -> Self {
        Coefficient::int(0)
    }
}

impl From<i64> for Coefficient {
    fn from(n: i64) -> Self {
        Coefficient::int(n)
    }
}

impl From<i32> for Coefficient {
    fn from(n: i32) -> Self {
        Coefficient::int(n as i64)
    }
}

impl From<BigInt> for Coefficient {
    fn from(n: BigInt) -> Self {
        Coefficient::big(n)
    }
}

impl From<BigRational> for Coefficient {
    fn from(r: BigRational) -> Self {
        Coefficient::Rational(r)
    }
}

impl From<f64> for Coefficient {
    fn from(f: f64) -> Self {
        Coefficient::from_f64_exact(f)
    }
}

impl Neg for Coefficient {
    type Output = Coefficient;

    fn neg(self) -> Self::Output {
        match self {
            Coefficient::Rational(r) => Coefficient::Rational(-r),
            Coefficient::Float(f) => Coefficient::Float(-f),
        }
    }
}

impl Add for Coefficient {
    type Output = Coefficient;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Coefficient::Rational(a), Coefficient::Rational(b)) => Coefficient::Rational(a + b),
            (a, b) => Coefficient::Float(a.to_f64() + b.to_f64()),
        }
    }
}

impl Sub for Coefficient {
    type Output = Coefficient;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Mul for Coefficient {
    type Output = Coefficient;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Coefficient::Rational(a), Coefficient::Rational(b)) => Coefficient::Rational(a * b),
            (a, b) => Coefficient::Float(a.to_f64() * b.to_f64()),
        }
    }
}

impl Div for Coefficient {
    type Output = Coefficient;

    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Coefficient::Rational(a), Coefficient::Rational(b)) => {
                if b.is_zero() {
                    Coefficient::Float(if a.is_negative() {
                        f64::NEG_INFINITY
                    } else {
                        f64::INFINITY
                    })
                } else {
                    Coefficient::Rational(a / b)
                }
            }
            (a, b) => Coefficient::Float(a.to_f64() / b.to_f64()),
        }
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coefficient::Rational(r) => {
                if r.is_integer() {
                    write!(f, "{}", r.numer())
                } else {
                    write!(f, "{}/{}", r.numer(), r.denom())
                }
            }
            Coefficient::Float(v) => write!(f, "{}", v),
        }
    }
}
