//! Symbolic expression tree
//!
//! Nodes are immutable and share children through `Arc`, so cloning an
//! expression is cheap and expressions can be handed across threads freely.

use crate::coeff::Coefficient;
use crate::functions;
use crate::symbol::Symbol;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use std::collections::HashSet;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

/// An inclusive integer range `var = lower..=upper` over `term`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bounded {
    pub term: SymExpr,
    pub var: Symbol,
    pub lower: SymExpr,
    pub upper: SymExpr,
}

impl Bounded {
    /// Rebuild with `f` applied to the term and both limits
    pub fn map(&self, mut f: impl FnMut(&SymExpr) -> SymExpr) -> Bounded {
        Bounded {
            term: f(&self.term),
            var: self.var.clone(),
            lower: f(&self.lower),
            upper: f(&self.upper),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymExprKind {
    Num(Coefficient),
    Var(Symbol),
    Add(Vec<SymExpr>),
    Mul(Vec<SymExpr>),
    Pow(Box<SymExpr>, Box<SymExpr>),
    Neg(Box<SymExpr>),
    Func(String, Vec<SymExpr>),
    Sum(Bounded),
    Product(Bounded),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymExpr {
    pub kind: Arc<SymExprKind>,
}

impl SymExpr {
    fn from_kind(kind: SymExprKind) -> Self {
        SymExpr {
            kind: Arc::new(kind),
        }
    }

    pub fn num(c: Coefficient) -> Self {
        Self::from_kind(SymExprKind::Num(c))
    }

    pub fn int(n: i64) -> Self {
        Self::num(Coefficient::int(n))
    }

    pub fn big(n: BigInt) -> Self {
        Self::num(Coefficient::big(n))
    }

    pub fn rational(num: i64, den: i64) -> Self {
        Self::num(Coefficient::rational(num, den))
    }

    /// A float input, kept as a float even when integral
    ///
    /// Use [`Coefficient::from_f64_exact`] to opt into exact conversion.
    pub fn float(f: f64) -> Self {
        Self::num(Coefficient::float(f))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::symbol(Symbol::new(name))
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Self::from_kind(SymExprKind::Var(symbol))
    }

    /// Sum of terms; a single term is returned as-is and no terms give `0`
    pub fn add(mut terms: Vec<SymExpr>) -> Self {
        match terms.len() {
            0 => Self::int(0),
            1 => terms.remove(0),
            _ => Self::from_kind(SymExprKind::Add(terms)),
        }
    }

    /// Product of factors; a single factor is returned as-is and no factors give `1`
    pub fn mul(mut factors: Vec<SymExpr>) -> Self {
        match factors.len() {
            0 => Self::int(1),
            1 => factors.remove(0),
            _ => Self::from_kind(SymExprKind::Mul(factors)),
        }
    }

    pub fn pow(base: SymExpr, exp: SymExpr) -> Self {
        Self::from_kind(SymExprKind::Pow(Box::new(base), Box::new(exp)))
    }

    pub fn neg(inner: SymExpr) -> Self {
        Self::from_kind(SymExprKind::Neg(Box::new(inner)))
    }

    pub fn func(name: impl Into<String>, args: Vec<SymExpr>) -> Self {
        Self::from_kind(SymExprKind::Func(name.into(), args))
    }

    pub fn sin(x: SymExpr) -> Self {
        Self::func("sin", vec![x])
    }

    pub fn cos(x: SymExpr) -> Self {
        Self::func("cos", vec![x])
    }

    pub fn exp(x: SymExpr) -> Self {
        Self::func("exp", vec![x])
    }

    pub fn log(x: SymExpr) -> Self {
        Self::func("log", vec![x])
    }

    pub fn sqrt(x: SymExpr) -> Self {
        Self::pow(x, Self::rational(1, 2))
    }

    /// `x!`, evaluated immediately when `x` is a nonnegative integer literal
    pub fn factorial(x: SymExpr) -> Self {
        let unevaluated = Self::func(functions::FACTORIAL, vec![x]);
        functions::fold(&unevaluated).unwrap_or(unevaluated)
    }

    /// `C(n, k)`, evaluated immediately when both arguments are integer literals
    pub fn binomial(n: SymExpr, k: SymExpr) -> Self {
        let unevaluated = Self::func(functions::BINOMIAL, vec![n, k]);
        functions::fold(&unevaluated).unwrap_or(unevaluated)
    }

    /// `1` when `i == j`, `0` otherwise; evaluated immediately on literals
    pub fn kronecker_delta(i: SymExpr, j: SymExpr) -> Self {
        if i == j {
            return Self::int(1);
        }
        let unevaluated = Self::func(functions::KRONECKER_DELTA, vec![i, j]);
        functions::fold(&unevaluated).unwrap_or(unevaluated)
    }

    /// Unevaluated `Sum(term, (var, lower, upper))`
    pub fn sum(term: SymExpr, var: Symbol, lower: SymExpr, upper: SymExpr) -> Self {
        Self::sum_bounded(Bounded {
            term,
            var,
            lower,
            upper,
        })
    }

    /// Unevaluated `Product(term, (var, lower, upper))`
    pub fn product(term: SymExpr, var: Symbol, lower: SymExpr, upper: SymExpr) -> Self {
        Self::product_bounded(Bounded {
            term,
            var,
            lower,
            upper,
        })
    }

    pub fn sum_bounded(bounded: Bounded) -> Self {
        Self::from_kind(SymExprKind::Sum(bounded))
    }

    pub fn product_bounded(bounded: Bounded) -> Self {
        Self::from_kind(SymExprKind::Product(bounded))
    }

    pub fn is_num(&self) -> bool {
        matches!(self.kind.as_ref(), SymExprKind::Num(_))
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind.as_ref(), SymExprKind::Var(_))
    }

    pub fn is_add(&self) -> bool {
        matches!(self.kind.as_ref(), SymExprKind::Add(_))
    }

    pub fn is_mul(&self) -> bool {
        matches!(self.kind.as_ref(), SymExprKind::Mul(_))
    }

    pub fn is_zero(&self) -> bool {
        self.as_coeff().map(|c| c.is_zero()).unwrap_or(false)
    }

    pub fn is_one(&self) -> bool {
        self.as_coeff().map(|c| c.is_one()).unwrap_or(false)
    }

    pub fn as_coeff(&self) -> Option<&Coefficient> {
        match self.kind.as_ref() {
            SymExprKind::Num(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&Symbol> {
        match self.kind.as_ref() {
            SymExprKind::Var(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_add(&self) -> Option<&[SymExpr]> {
        match self.kind.as_ref() {
            SymExprKind::Add(terms) => Some(terms),
            _ => None,
        }
    }

    pub fn as_mul(&self) -> Option<&[SymExpr]> {
        match self.kind.as_ref() {
            SymExprKind::Mul(factors) => Some(factors),
            _ => None,
        }
    }

    /// The exact integer value of a numeric literal
    pub fn as_integer(&self) -> Option<BigInt> {
        self.as_coeff().and_then(Coefficient::to_integer)
    }

    /// Number of nodes in the tree
    pub fn node_count(&self) -> usize {
        1 + match self.kind.as_ref() {
            SymExprKind::Num(_) | SymExprKind::Var(_) => 0,
            SymExprKind::Add(items) | SymExprKind::Mul(items) | SymExprKind::Func(_, items) => {
                items.iter().map(SymExpr::node_count).sum()
            }
            SymExprKind::Pow(base, exp) => base.node_count() + exp.node_count(),
            SymExprKind::Neg(inner) => inner.node_count(),
            SymExprKind::Sum(b) | SymExprKind::Product(b) => {
                b.term.node_count() + b.lower.node_count() + b.upper.node_count()
            }
        }
    }

    /// Symbols not bound by an enclosing `Sum` or `Product`
    pub fn free_vars(&self) -> HashSet<Symbol> {
        let mut out = HashSet::new();
        self.collect_free_vars(&mut out);
        out
    }

    fn collect_free_vars(&self, out: &mut HashSet<Symbol>) {
        match self.kind.as_ref() {
            SymExprKind::Num(_) => {}
            SymExprKind::Var(s) => {
                out.insert(s.clone());
            }
            SymExprKind::Add(items) | SymExprKind::Mul(items) | SymExprKind::Func(_, items) => {
                for item in items {
                    item.collect_free_vars(out);
                }
            }
            SymExprKind::Pow(base, exp) => {
                base.collect_free_vars(out);
                exp.collect_free_vars(out);
            }
            SymExprKind::Neg(inner) => inner.collect_free_vars(out),
            SymExprKind::Sum(b) | SymExprKind::Product(b) => {
                let mut inner = HashSet::new();
                b.term.collect_free_vars(&mut inner);
                inner.remove(&b.var);
                out.extend(inner);
                b.lower.collect_free_vars(out);
                b.upper.collect_free_vars(out);
            }
        }
    }

    /// True when the expression mentions no free symbol
    pub fn is_constant(&self) -> bool {
        self.free_vars().is_empty()
    }

    /// Replace every free symbol called `name` with `replacement`
    ///
    /// Bound and dummy variables are never touched, even when their display
    /// name matches.
    pub fn substitute(&self, name: &str, replacement: &SymExpr) -> SymExpr {
        self.rewrite_vars(&|s: &Symbol| s.is_free() && s.name == name, replacement)
    }

    /// Replace exactly `symbol` with `replacement`
    pub fn replace_symbol(&self, symbol: &Symbol, replacement: &SymExpr) -> SymExpr {
        self.rewrite_vars(&|s: &Symbol| s == symbol, replacement)
    }

    fn rewrite_vars(&self, matches: &dyn Fn(&Symbol) -> bool, replacement: &SymExpr) -> SymExpr {
        match self.kind.as_ref() {
            SymExprKind::Num(_) => self.clone(),
            SymExprKind::Var(s) => {
                if matches(s) {
                    replacement.clone()
                } else {
                    self.clone()
                }
            }
            SymExprKind::Add(terms) => SymExpr::add(
                terms
                    .iter()
                    .map(|t| t.rewrite_vars(matches, replacement))
                    .collect(),
            ),
            SymExprKind::Mul(factors) => SymExpr::mul(
                factors
                    .iter()
                    .map(|f| f.rewrite_vars(matches, replacement))
                    .collect(),
            ),
            SymExprKind::Pow(base, exp) => SymExpr::pow(
                base.rewrite_vars(matches, replacement),
                exp.rewrite_vars(matches, replacement),
            ),
            SymExprKind::Neg(inner) => SymExpr::neg(inner.rewrite_vars(matches, replacement)),
            SymExprKind::Func(name, args) => SymExpr::func(
                name.clone(),
                args.iter()
                    .map(|a| a.rewrite_vars(matches, replacement))
                    .collect(),
            ),
            SymExprKind::Sum(b) => {
                SymExpr::sum_bounded(rewrite_bounded(b, matches, replacement))
            }
            SymExprKind::Product(b) => {
                SymExpr::product_bounded(rewrite_bounded(b, matches, replacement))
            }
        }
    }

    /// Whether the expression is known to be an integer
    ///
    /// `Some(true)` / `Some(false)` when provable, `None` when unknown.
    pub fn is_integer(&self) -> Option<bool> {
        match self.kind.as_ref() {
            SymExprKind::Num(c) => Some(c.is_integer()),
            SymExprKind::Var(s) => s.attrs.integer.then_some(true),
            SymExprKind::Add(items) | SymExprKind::Mul(items) => {
                all_true(items.iter().map(SymExpr::is_integer))
            }
            SymExprKind::Neg(inner) => inner.is_integer(),
            SymExprKind::Pow(base, exp) => {
                let exp_ok = exp.is_integer() == Some(true) && exp.is_nonnegative() == Some(true);
                (exp_ok && base.is_integer() == Some(true)).then_some(true)
            }
            SymExprKind::Func(name, args) => match name.as_str() {
                functions::FACTORIAL | functions::BINOMIAL => {
                    all_true(args.iter().map(SymExpr::is_integer))
                }
                functions::KRONECKER_DELTA => Some(true),
                _ => None,
            },
            SymExprKind::Sum(b) => b.term.is_integer().filter(|known| *known),
            SymExprKind::Product(b) => b.term.is_integer().filter(|known| *known),
        }
    }

    /// Whether the expression is known to be `>= 0`
    pub fn is_nonnegative(&self) -> Option<bool> {
        match self.kind.as_ref() {
            SymExprKind::Num(c) => Some(!c.is_negative()),
            SymExprKind::Var(s) => {
                if s.attrs.positive || s.attrs.nonnegative {
                    Some(true)
                } else if s.attrs.negative {
                    Some(false)
                } else {
                    None
                }
            }
            SymExprKind::Add(items) | SymExprKind::Mul(items) => {
                all_true(items.iter().map(SymExpr::is_nonnegative))
            }
            SymExprKind::Neg(inner) => {
                if inner.is_zero() {
                    Some(true)
                } else {
                    match inner.kind.as_ref() {
                        SymExprKind::Var(s) if s.attrs.positive => Some(false),
                        SymExprKind::Var(s) if s.attrs.negative => Some(true),
                        _ => None,
                    }
                }
            }
            SymExprKind::Pow(base, exp) => {
                let even = exp.as_integer().map(|e| e.is_even()).unwrap_or(false);
                (even || base.is_nonnegative() == Some(true)).then_some(true)
            }
            SymExprKind::Func(name, args) => match name.as_str() {
                functions::FACTORIAL => args[0].is_nonnegative().filter(|known| *known),
                functions::KRONECKER_DELTA => Some(true),
                _ => None,
            },
            SymExprKind::Sum(b) | SymExprKind::Product(b) => {
                b.term.is_nonnegative().filter(|known| *known)
            }
        }
    }
}

fn rewrite_bounded(
    b: &Bounded,
    matches: &dyn Fn(&Symbol) -> bool,
    replacement: &SymExpr,
) -> Bounded {
    let term = if matches(&b.var) {
        b.term.clone()
    } else {
        b.term.rewrite_vars(matches, replacement)
    };
    Bounded {
        term,
        var: b.var.clone(),
        lower: b.lower.rewrite_vars(matches, replacement),
        upper: b.upper.rewrite_vars(matches, replacement),
    }
}

/// `Some(true)` when every item is provably true, `None` otherwise
fn all_true(mut items: impl Iterator<Item = Option<bool>>) -> Option<bool> {
    items.all(|item| item == Some(true)).then_some(true)
}

impl From<Coefficient> for SymExpr {
    fn from(c: Coefficient) -> Self {
        SymExpr::num(c)
    }
}

impl From<i64> for SymExpr {
    fn from(n: i64) -> Self {
        SymExpr::int(n)
    }
}

impl From<i32> for SymExpr {
    fn from(n: i32) -> Self {
        SymExpr::int(n as i64)
    }
}

impl From<u32> for SymExpr {
    fn from(n: u32) -> Self {
        SymExpr::int(n as i64)
    }
}

impl From<u64> for SymExpr {
    fn from(n: u64) -> Self {
        SymExpr::big(BigInt::from(n))
    }
}

impl From<usize> for SymExpr {
    fn from(n: usize) -> Self {
        SymExpr::big(BigInt::from(n))
    }
}

impl From<f64> for SymExpr {
    fn from(f: f64) -> Self {
        SymExpr::float(f)
    }
}

impl From<BigInt> for SymExpr {
    fn from(n: BigInt) -> Self {
        SymExpr::big(n)
    }
}

impl From<BigRational> for SymExpr {
    fn from(r: BigRational) -> Self {
        SymExpr::num(Coefficient::Rational(r))
    }
}

impl From<Symbol> for SymExpr {
    fn from(s: Symbol) -> Self {
        SymExpr::symbol(s)
    }
}

impl From<&str> for SymExpr {
    fn from(name: &str) -> Self {
        SymExpr::var(name)
    }
}

impl From<&SymExpr> for SymExpr {
    fn from(e: &SymExpr) -> Self {
        e.clone()
    }
}

impl Add for SymExpr {
    type Output = SymExpr;

    fn add(self, rhs: SymExpr) -> SymExpr {
        SymExpr::add(vec![self, rhs])
    }
}

impl Sub for SymExpr {
    type Output = SymExpr;

    fn sub(self, rhs: SymExpr) -> SymExpr {
        SymExpr::add(vec![self, SymExpr::neg(rhs)])
    }
}

impl Mul for SymExpr {
    type Output = SymExpr;

    fn mul(self, rhs: SymExpr) -> SymExpr {
        SymExpr::mul(vec![self, rhs])
    }
}

impl Div for SymExpr {
    type Output = SymExpr;

    fn div(self, rhs: SymExpr) -> SymExpr {
        SymExpr::mul(vec![self, SymExpr::pow(rhs, SymExpr::int(-1))])
    }
}

impl Neg for SymExpr {
    type Output = SymExpr;

    fn neg(self) -> SymExpr {
        SymExpr::neg(self)
    }
}

impl Add<i64> for SymExpr {
    type Output = SymExpr;

    fn add(self, rhs: i64) -> SymExpr {
        self + SymExpr::int(rhs)
    }
}

impl Sub<i64> for SymExpr {
    type Output = SymExpr;

    fn sub(self, rhs: i64) -> SymExpr {
        self - SymExpr::int(rhs)
    }
}

impl Mul<i64> for SymExpr {
    type Output = SymExpr;

    fn mul(self, rhs: i64) -> SymExpr {
        SymExpr::int(rhs) * self
    }
}

/// Atoms never need parentheses
fn is_atom(e: &SymExpr) -> bool {
    match e.kind.as_ref() {
        SymExprKind::Num(c) => !c.is_negative() && c.is_integer(),
        SymExprKind::Var(_) | SymExprKind::Func(_, _) => true,
        SymExprKind::Sum(_) | SymExprKind::Product(_) => true,
        _ => false,
    }
}

fn fmt_operand(e: &SymExpr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if is_atom(e) {
        write!(f, "{}", e)
    } else {
        write!(f, "({})", e)
    }
}

fn fmt_bounded(name: &str, b: &Bounded, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({}, ({}, {}, {}))", name, b.term, b.var, b.lower, b.upper)
}

impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            SymExprKind::Num(c) => write!(f, "{}", c),
            SymExprKind::Var(s) => write!(f, "{}", s),
            SymExprKind::Add(terms) => {
                for (idx, t) in terms.iter().enumerate() {
                    if idx == 0 {
                        write!(f, "{}", t)?;
                    } else if let SymExprKind::Neg(inner) = t.kind.as_ref() {
                        write!(f, " - ")?;
                        fmt_operand(inner, f)?;
                    } else {
                        write!(f, " + {}", t)?;
                    }
                }
                Ok(())
            }
            SymExprKind::Mul(factors) => {
                for (idx, factor) in factors.iter().enumerate() {
                    if idx > 0 {
                        write!(f, "*")?;
                    }
                    if matches!(factor.kind.as_ref(), SymExprKind::Pow(_, _)) {
                        write!(f, "{}", factor)?;
                    } else {
                        fmt_operand(factor, f)?;
                    }
                }
                Ok(())
            }
            SymExprKind::Pow(base, exp) => {
                fmt_operand(base, f)?;
                write!(f, "^")?;
                fmt_operand(exp, f)
            }
            SymExprKind::Neg(inner) => {
                write!(f, "-")?;
                fmt_operand(inner, f)
            }
            SymExprKind::Func(name, args) => {
                write!(f, "{}(", name)?;
                for (idx, a) in args.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            SymExprKind::Sum(b) => fmt_bounded("Sum", b, f),
            SymExprKind::Product(b) => fmt_bounded("Product", b, f),
        }
    }
}
