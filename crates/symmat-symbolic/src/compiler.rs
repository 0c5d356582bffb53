//! Symbolic-to-numeric bytecode compiler
//!
//! Compiles symbolic expressions to stack-based bytecode for fast `f64`
//! evaluation. Ranged sums and products compile to nested sub-programs
//! that are run once per index value.

use crate::expr::{Bounded, SymExpr, SymExprKind};
use crate::functions;
use crate::{Result, SymbolicError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bytecode instruction for the expression evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BytecodeOp {
    /// Push a constant onto the stack
    PushConst(usize), // Index into constants array
    /// Load a variable onto the stack
    LoadVar(usize), // Index into variables array
    /// Binary operations (pop 2, push 1)
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// Unary operations (pop 1, push 1)
    Neg,
    /// Function calls (pop n args, push 1 result)
    Call(String, usize), // Function name, argument count
    /// Ranged sum (pop upper, lower; push result)
    Sum(usize), // Index into sub-programs
    /// Ranged product (pop upper, lower; push result)
    Product(usize),
    /// Duplicate top of stack
    Dup,
    /// Swap top two stack elements
    Swap,
    /// Pop and discard top of stack
    Pop,
}

/// Body of a ranged sum or product
#[derive(Debug, Clone)]
pub struct RangeProgram {
    pub body: CompiledExpr,
    /// For each body variable: the outer variable slot it reads, or `None`
    /// for the range index itself
    pub slots: Vec<Option<usize>>,
}

/// Compiled bytecode representation of a symbolic expression
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    /// Bytecode instructions
    pub ops: Vec<BytecodeOp>,
    /// Constant values
    pub constants: Vec<f64>,
    /// Variable names (in order)
    pub variables: Vec<String>,
    /// Maximum stack depth required
    pub max_stack: usize,
    pub ranges: Vec<RangeProgram>,
}

fn underflow() -> SymbolicError {
    SymbolicError::InvalidOperation("stack underflow".to_string())
}

impl CompiledExpr {
    /// Evaluate the compiled expression with given variable values
    pub fn eval(&self, var_values: &[f64]) -> Result<f64> {
        if var_values.len() != self.variables.len() {
            return Err(SymbolicError::InvalidOperation(format!(
                "expected {} variable values, got {}",
                self.variables.len(),
                var_values.len()
            )));
        }

        let mut stack: Vec<f64> = Vec::with_capacity(self.max_stack);
        self.run(var_values, &mut stack)
    }

    /// Get variable names for binding
    pub fn variable_names(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate the compiled expression for multiple input sets (vectorized)
    pub fn eval_batch(&self, var_values_batch: &[&[f64]]) -> Result<Vec<f64>> {
        let n_vars = self.variables.len();

        for (i, vars) in var_values_batch.iter().enumerate() {
            if vars.len() != n_vars {
                return Err(SymbolicError::InvalidOperation(format!(
                    "input set {} has {} values, expected {}",
                    i,
                    vars.len(),
                    n_vars
                )));
            }
        }

        let mut results = Vec::with_capacity(var_values_batch.len());
        let mut stack: Vec<f64> = Vec::with_capacity(self.max_stack);

        for var_values in var_values_batch {
            stack.clear();
            results.push(self.run(var_values, &mut stack)?);
        }

        Ok(results)
    }

    /// Evaluate for a single variable over a range of values
    pub fn eval_range(&self, values: &[f64]) -> Result<Vec<f64>> {
        if self.variables.len() != 1 {
            return Err(SymbolicError::InvalidOperation(format!(
                "eval_range requires single-variable expression, got {} variables",
                self.variables.len()
            )));
        }

        let batch: Vec<&[f64]> = values.iter().map(std::slice::from_ref).collect();
        self.eval_batch(&batch)
    }

    fn run(&self, var_values: &[f64], stack: &mut Vec<f64>) -> Result<f64> {
        for op in &self.ops {
            match op {
                BytecodeOp::PushConst(idx) => {
                    stack.push(self.constants[*idx]);
                }
                BytecodeOp::LoadVar(idx) => {
                    stack.push(var_values[*idx]);
                }
                BytecodeOp::Add => {
                    let b = stack.pop().ok_or_else(underflow)?;
                    let a = stack.pop().ok_or_else(underflow)?;
                    stack.push(a + b);
                }
                BytecodeOp::Sub => {
                    let b = stack.pop().ok_or_else(underflow)?;
                    let a = stack.pop().ok_or_else(underflow)?;
                    stack.push(a - b);
                }
                BytecodeOp::Mul => {
                    let b = stack.pop().ok_or_else(underflow)?;
                    let a = stack.pop().ok_or_else(underflow)?;
                    stack.push(a * b);
                }
                BytecodeOp::Div => {
                    let b = stack.pop().ok_or_else(underflow)?;
                    let a = stack.pop().ok_or_else(underflow)?;
                    stack.push(a / b);
                }
                BytecodeOp::Pow => {
                    let b = stack.pop().ok_or_else(underflow)?;
                    let a = stack.pop().ok_or_else(underflow)?;
                    stack.push(a.powf(b));
                }
                BytecodeOp::Neg => {
                    let a = stack.pop().ok_or_else(underflow)?;
                    stack.push(-a);
                }
                BytecodeOp::Call(name, argc) => {
                    let mut args = Vec::with_capacity(*argc);
                    for _ in 0..*argc {
                        args.push(stack.pop().ok_or_else(underflow)?);
                    }
                    args.reverse();
                    let result = call_function(name, &args)?;
                    stack.push(result);
                }
                BytecodeOp::Sum(idx) | BytecodeOp::Product(idx) => {
                    let upper = stack.pop().ok_or_else(underflow)?;
                    let lower = stack.pop().ok_or_else(underflow)?;
                    let product = matches!(op, BytecodeOp::Product(_));
                    let result = self.ranges[*idx].run(var_values, lower, upper, product)?;
                    stack.push(result);
                }
                BytecodeOp::Dup => {
                    let a = *stack.last().ok_or_else(underflow)?;
                    stack.push(a);
                }
                BytecodeOp::Swap => {
                    let len = stack.len();
                    if len < 2 {
                        return Err(underflow());
                    }
                    stack.swap(len - 1, len - 2);
                }
                BytecodeOp::Pop => {
                    stack.pop().ok_or_else(underflow)?;
                }
            }
        }

        stack
            .pop()
            .ok_or_else(|| SymbolicError::InvalidOperation("empty stack at end".to_string()))
    }
}

impl RangeProgram {
    fn run(&self, outer: &[f64], lower: f64, upper: f64, product: bool) -> Result<f64> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(SymbolicError::InvalidOperation(format!(
                "non-finite range bounds {}..={}",
                lower, upper
            )));
        }
        let (lo, hi) = (lower.round() as i64, upper.round() as i64);

        let mut acc = if product { 1.0 } else { 0.0 };
        let mut values = vec![0.0; self.slots.len()];
        let mut stack = Vec::with_capacity(self.body.max_stack);
        for k in lo..=hi {
            for (value, slot) in values.iter_mut().zip(&self.slots) {
                *value = match slot {
                    Some(idx) => outer[*idx],
                    None => k as f64,
                };
            }
            stack.clear();
            let term = self.body.run(&values, &mut stack)?;
            if product {
                acc *= term;
            } else {
                acc += term;
            }
        }
        Ok(acc)
    }
}

/// Evaluate a built-in function
fn call_function(name: &str, args: &[f64]) -> Result<f64> {
    match name {
        "sin" if args.len() == 1 => Ok(args[0].sin()),
        "cos" if args.len() == 1 => Ok(args[0].cos()),
        "tan" if args.len() == 1 => Ok(args[0].tan()),
        "exp" if args.len() == 1 => Ok(args[0].exp()),
        "log" if args.len() == 1 => Ok(args[0].ln()),
        "sqrt" if args.len() == 1 => Ok(args[0].sqrt()),
        "abs" if args.len() == 1 => Ok(args[0].abs()),
        functions::FACTORIAL if args.len() == 1 => Ok(functions::factorial_f64(args[0])),
        functions::BINOMIAL if args.len() == 2 => Ok(functions::binomial_f64(args[0], args[1])),
        functions::KRONECKER_DELTA if args.len() == 2 => {
            Ok(if args[0] == args[1] { 1.0 } else { 0.0 })
        }
        _ => Err(SymbolicError::InvalidOperation(format!(
            "unknown function: {}({})",
            name,
            args.len()
        ))),
    }
}

/// Bytecode compiler for symbolic expressions
#[derive(Debug, Default)]
pub struct BytecodeCompiler {
    constants: Vec<f64>,
    const_map: HashMap<u64, usize>, // f64 bits -> index
    variables: Vec<String>,
    var_map: HashMap<String, usize>,
    ranges: Vec<RangeProgram>,
}

impl BytecodeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a symbolic expression to bytecode
    pub fn compile(&mut self, expr: &SymExpr) -> CompiledExpr {
        let mut ops = Vec::new();
        let mut max_stack = 0;
        let mut current_stack = 0;

        self.compile_expr(expr, &mut ops, &mut current_stack, &mut max_stack);

        CompiledExpr {
            ops,
            constants: self.constants.clone(),
            variables: self.variables.clone(),
            max_stack,
            ranges: self.ranges.clone(),
        }
    }

    /// Compile with explicit variable ordering
    pub fn compile_with_vars(&mut self, expr: &SymExpr, var_order: &[&str]) -> CompiledExpr {
        // Pre-register variables in specified order
        for v in var_order {
            self.add_variable(v);
        }

        self.compile(expr)
    }

    fn add_constant(&mut self, value: f64) -> usize {
        let bits = value.to_bits();
        if let Some(&idx) = self.const_map.get(&bits) {
            return idx;
        }
        let idx = self.constants.len();
        self.constants.push(value);
        self.const_map.insert(bits, idx);
        idx
    }

    fn add_variable(&mut self, name: &str) -> usize {
        if let Some(&idx) = self.var_map.get(name) {
            return idx;
        }
        let idx = self.variables.len();
        self.variables.push(name.to_string());
        self.var_map.insert(name.to_string(), idx);
        idx
    }

    fn add_range(&mut self, b: &Bounded) -> usize {
        let bound = b.var.unique_name();
        let body = BytecodeCompiler::new().compile(&b.term);
        let slots = body
            .variables
            .iter()
            .map(|name| (*name != bound).then(|| self.add_variable(name)))
            .collect();
        self.ranges.push(RangeProgram { body, slots });
        self.ranges.len() - 1
    }

    fn push_const(
        &mut self,
        value: f64,
        ops: &mut Vec<BytecodeOp>,
        current_stack: &mut usize,
        max_stack: &mut usize,
    ) {
        let idx = self.add_constant(value);
        ops.push(BytecodeOp::PushConst(idx));
        *current_stack += 1;
        *max_stack = (*max_stack).max(*current_stack);
    }

    fn compile_expr(
        &mut self,
        expr: &SymExpr,
        ops: &mut Vec<BytecodeOp>,
        current_stack: &mut usize,
        max_stack: &mut usize,
    ) {
        match expr.kind.as_ref() {
            SymExprKind::Num(c) => {
                self.push_const(c.to_f64(), ops, current_stack, max_stack);
            }

            SymExprKind::Var(s) => {
                let idx = self.add_variable(&s.unique_name());
                ops.push(BytecodeOp::LoadVar(idx));
                *current_stack += 1;
                *max_stack = (*max_stack).max(*current_stack);
            }

            SymExprKind::Add(terms) => {
                if terms.is_empty() {
                    self.push_const(0.0, ops, current_stack, max_stack);
                    return;
                }

                self.compile_expr(&terms[0], ops, current_stack, max_stack);
                for t in &terms[1..] {
                    self.compile_expr(t, ops, current_stack, max_stack);
                    ops.push(BytecodeOp::Add);
                    *current_stack -= 1;
                }
            }

            SymExprKind::Mul(factors) => {
                if factors.is_empty() {
                    self.push_const(1.0, ops, current_stack, max_stack);
                    return;
                }

                self.compile_expr(&factors[0], ops, current_stack, max_stack);
                for f in &factors[1..] {
                    self.compile_expr(f, ops, current_stack, max_stack);
                    ops.push(BytecodeOp::Mul);
                    *current_stack -= 1;
                }
            }

            SymExprKind::Pow(base, exp) => {
                self.compile_expr(base, ops, current_stack, max_stack);
                self.compile_expr(exp, ops, current_stack, max_stack);
                ops.push(BytecodeOp::Pow);
                *current_stack -= 1;
            }

            SymExprKind::Neg(inner) => {
                self.compile_expr(inner, ops, current_stack, max_stack);
                ops.push(BytecodeOp::Neg);
            }

            SymExprKind::Func(name, args) => {
                for arg in args {
                    self.compile_expr(arg, ops, current_stack, max_stack);
                }
                ops.push(BytecodeOp::Call(name.clone(), args.len()));
                *current_stack -= args.len();
                *current_stack += 1; // result
                *max_stack = (*max_stack).max(*current_stack);
            }

            SymExprKind::Sum(b) | SymExprKind::Product(b) => {
                self.compile_expr(&b.lower, ops, current_stack, max_stack);
                self.compile_expr(&b.upper, ops, current_stack, max_stack);
                let idx = self.add_range(b);
                ops.push(if matches!(expr.kind.as_ref(), SymExprKind::Sum(_)) {
                    BytecodeOp::Sum(idx)
                } else {
                    BytecodeOp::Product(idx)
                });
                *current_stack -= 1;
            }
        }
    }
}

/// Convenience function to compile an expression
pub fn compile(expr: &SymExpr) -> CompiledExpr {
    let mut compiler = BytecodeCompiler::new();
    compiler.compile(expr)
}

/// Compile with explicit variable ordering
pub fn compile_with_vars(expr: &SymExpr, var_order: &[&str]) -> CompiledExpr {
    let mut compiler = BytecodeCompiler::new();
    compiler.compile_with_vars(expr, var_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn test_compile_constant() {
        let expr = SymExpr::int(42);
        let compiled = compile(&expr);

        assert_eq!(compiled.constants, vec![42.0]);
        assert!(compiled.variables.is_empty());

        let result = compiled.eval(&[]).unwrap();
        assert!((result - 42.0).abs() < 1e-10);
    }

    #[test]
    fn test_compile_polynomial() {
        // x^2 + 2*x + 1
        let x = SymExpr::var("x");
        let expr = SymExpr::add(vec![
            SymExpr::pow(x.clone(), SymExpr::int(2)),
            SymExpr::mul(vec![SymExpr::int(2), x.clone()]),
            SymExpr::int(1),
        ]);

        let compiled = compile(&expr);
        assert_eq!(compiled.variables, vec!["x"]);

        // Evaluate at x = 3: 9 + 6 + 1 = 16
        let result = compiled.eval(&[3.0]).unwrap();
        assert!((result - 16.0).abs() < 1e-10);

        let batch = compiled.eval_range(&[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(batch, vec![1.0, 4.0, 9.0]);
    }

    #[test]
    fn test_compile_with_var_order() {
        let x = SymExpr::var("x");
        let y = SymExpr::var("y");
        let expr = y.clone() - x.clone(); // y - x

        let compiled = compile_with_vars(&expr, &["x", "y"]);
        assert_eq!(compiled.variables, vec!["x", "y"]);

        // With x=1, y=5: 5 - 1 = 4
        let result = compiled.eval(&[1.0, 5.0]).unwrap();
        assert!((result - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_wrong_variable_count() {
        let compiled = compile(&SymExpr::var("x"));
        assert!(matches!(
            compiled.eval(&[]),
            Err(SymbolicError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_special_functions() {
        let n = SymExpr::var("n");
        let expr = SymExpr::binomial(n.clone() + 2, n.clone()) * SymExpr::factorial(n);
        let compiled = compile(&expr);
        // C(5, 3) * 3! = 60
        assert_eq!(compiled.eval(&[3.0]).unwrap(), 60.0);
    }

    #[test]
    fn test_product_reads_outer_variable() {
        // prod_{k=1}^{n} (k + x)
        let k = Symbol::dummy("k");
        let x = SymExpr::var("x");
        let expr = SymExpr::product(
            SymExpr::symbol(k.clone()) + x,
            k,
            SymExpr::int(1),
            SymExpr::var("n"),
        );
        let compiled = compile_with_vars(&expr, &["n", "x"]);
        assert_eq!(compiled.variables, vec!["n", "x"]);
        // (1 + 1)(2 + 1)(3 + 1) = 24
        assert_eq!(compiled.eval(&[3.0, 1.0]).unwrap(), 24.0);
        // Empty range
        assert_eq!(compiled.eval(&[0.0, 1.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_nested_ranges() {
        // sum_{i=1}^{3} sum_{j=1}^{i} j = 10
        let i = Symbol::dummy("i");
        let j = Symbol::dummy("j");
        let inner = SymExpr::sum(
            SymExpr::symbol(j.clone()),
            j,
            SymExpr::int(1),
            SymExpr::symbol(i.clone()),
        );
        let outer = SymExpr::sum(inner, i, SymExpr::int(1), SymExpr::int(3));
        let compiled = compile(&outer);
        assert!(compiled.variables.is_empty());
        assert_eq!(compiled.eval(&[]).unwrap(), 10.0);
    }
}
