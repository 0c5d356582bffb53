//! Evaluation of unevaluated sums and products
//!
//! `doit` expands every `Sum`/`Product` whose bounds have become integer
//! literals and simplifies what is left. Nodes with symbolic bounds are kept.

use crate::coeff::Coefficient;
use crate::compiler::compile;
use crate::expr::{Bounded, SymExpr, SymExprKind};
use crate::{Result, SymbolicError};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Limits applied while expanding sums and products
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Total number of terms all expansions in one call may produce
    pub max_terms: u64,
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions { max_terms: 100_000 }
    }
}

struct Expander<'a> {
    options: &'a EvalOptions,
    used: u64,
}

impl SymExpr {
    /// Expand concrete sums and products with the default limits
    pub fn doit(&self) -> Result<SymExpr> {
        self.doit_with(&EvalOptions::default())
    }

    pub fn doit_with(&self, options: &EvalOptions) -> Result<SymExpr> {
        let _span = tracing::info_span!("symbolic.doit", max_terms = options.max_terms).entered();
        let mut expander = Expander { options, used: 0 };
        let expanded = expander.expand(self)?;
        Ok(expanded.simplify())
    }

    /// Reduce to a single number
    ///
    /// Fails with `NotConcrete` while free symbols remain. Constant
    /// expressions with no exact value (`sin(1)`) fall back to a float.
    pub fn evaluate(&self, options: &EvalOptions) -> Result<Coefficient> {
        let done = self.doit_with(options)?;
        if let Some(c) = done.as_coeff() {
            if !c.is_exact() && c.to_f64().is_infinite() {
                return Err(SymbolicError::DivisionByZero);
            }
            return Ok(c.clone());
        }

        let free = done.free_vars();
        if !free.is_empty() {
            let mut names: Vec<_> = free.iter().map(|s| s.to_string()).collect();
            names.sort();
            return Err(SymbolicError::NotConcrete(names.join(", ")));
        }

        let value = compile(&done).eval(&[])?;
        Ok(Coefficient::float(value))
    }
}

impl Expander<'_> {
    fn expand(&mut self, expr: &SymExpr) -> Result<SymExpr> {
        Ok(match expr.kind.as_ref() {
            SymExprKind::Num(_) | SymExprKind::Var(_) => expr.clone(),
            SymExprKind::Add(terms) => SymExpr::add(self.expand_all(terms)?),
            SymExprKind::Mul(factors) => SymExpr::mul(self.expand_all(factors)?),
            SymExprKind::Pow(base, exp) => SymExpr::pow(self.expand(base)?, self.expand(exp)?),
            SymExprKind::Neg(inner) => SymExpr::neg(self.expand(inner)?),
            SymExprKind::Func(name, args) => SymExpr::func(name.clone(), self.expand_all(args)?),
            SymExprKind::Sum(b) => self.expand_range(b, false)?,
            SymExprKind::Product(b) => self.expand_range(b, true)?,
        })
    }

    fn expand_all(&mut self, items: &[SymExpr]) -> Result<Vec<SymExpr>> {
        items.iter().map(|item| self.expand(item)).collect()
    }

    fn expand_range(&mut self, b: &Bounded, product: bool) -> Result<SymExpr> {
        let lower = self.expand(&b.lower)?.simplify();
        let upper = self.expand(&b.upper)?.simplify();

        let (Some(lo), Some(hi)) = (lower.as_integer(), upper.as_integer()) else {
            let rebuilt = Bounded {
                term: self.expand(&b.term)?,
                var: b.var.clone(),
                lower,
                upper,
            };
            return Ok(if product {
                SymExpr::product_bounded(rebuilt)
            } else {
                SymExpr::sum_bounded(rebuilt)
            });
        };

        let lo = lo.to_i64().ok_or(SymbolicError::NumericOverflow)?;
        let hi = hi.to_i64().ok_or(SymbolicError::NumericOverflow)?;
        let count = (hi as i128 - lo as i128 + 1).max(0) as u128;
        let needed = self.used as u128 + count;
        if needed > self.options.max_terms as u128 {
            return Err(SymbolicError::EvaluationLimit {
                terms: needed,
                limit: self.options.max_terms,
            });
        }
        self.used = needed as u64;
        log::trace!(
            "expanding {} over {}..={} ({} terms)",
            if product { "product" } else { "sum" },
            lo,
            hi,
            count
        );

        let mut items = Vec::with_capacity(count as usize);
        for k in lo..=hi {
            let term = b.term.replace_symbol(&b.var, &SymExpr::int(k));
            items.push(self.expand(&term)?.simplify());
        }

        // An empty range gives the identity of the operation
        Ok(if product {
            SymExpr::mul(items)
        } else {
            SymExpr::add(items)
        })
    }
}
