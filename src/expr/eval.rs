//! Expression evaluation against a variable scope

use std::collections::{BTreeMap, HashMap};

use crate::suggest::find_similar;

use super::ast::*;
use super::error::ExprError;

/// Source of variable values for evaluation
pub trait Scope {
    /// Look up a variable by name
    fn lookup(&self, name: &str) -> Option<f64>;

    /// All names in scope, used for suggestions on lookup failure
    fn names(&self) -> Vec<&str>;
}

impl Scope for BTreeMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }

    fn names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

impl Scope for HashMap<String, f64> {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }

    fn names(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }
}

/// Constants available in every expression unless shadowed by the scope
const CONSTANTS: &[(&str, f64)] = &[("PI", std::f64::consts::PI), ("E", std::f64::consts::E)];

pub fn eval_expr(expr: &Spanned<Expr>, scope: &impl Scope) -> Result<f64, ExprError> {
    let value = match &expr.node {
        Expr::Number(n) => *n,
        Expr::Variable(name) => lookup(name, scope)?,
        Expr::Neg(inner) => -eval_expr(inner, scope)?,
        Expr::Binary { op, lhs, rhs } => {
            let a = eval_expr(lhs, scope)?;
            let b = eval_expr(rhs, scope)?;
            match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(ExprError::DivisionByZero {
                            span: rhs.span.clone(),
                        });
                    }
                    a / b
                }
                BinaryOp::Rem => {
                    if b == 0.0 {
                        return Err(ExprError::DivisionByZero {
                            span: rhs.span.clone(),
                        });
                    }
                    // Floored modulo: the result takes the sign of the divisor
                    a - b * (a / b).floor()
                }
                BinaryOp::Pow => a.powf(b),
            }
        }
        Expr::Call { name, args } => {
            let values = args
                .iter()
                .map(|a| eval_expr(a, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, &values, &expr.span)?
        }
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExprError::NonFinite {
            span: expr.span.clone(),
        })
    }
}

fn lookup(name: &Spanned<String>, scope: &impl Scope) -> Result<f64, ExprError> {
    if let Some(v) = scope.lookup(&name.node) {
        return Ok(v);
    }
    if let Some((_, v)) = CONSTANTS.iter().find(|(n, _)| *n == name.node) {
        return Ok(*v);
    }
    let mut known = scope.names();
    known.extend(CONSTANTS.iter().map(|(n, _)| *n));
    Err(ExprError::UnknownVariable {
        name: name.node.clone(),
        span: name.span.clone(),
        suggestions: find_similar(known, &name.node, 2),
    })
}

fn call(name: &Spanned<String>, args: &[f64], span: &Span) -> Result<f64, ExprError> {
    let arity = |expected: usize| -> Result<(), ExprError> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(ExprError::Arity {
                name: name.node.clone(),
                expected,
                found: args.len(),
                span: span.clone(),
            })
        }
    };

    let unary: Option<fn(f64) -> f64> = match name.node.as_str() {
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "asin" => Some(f64::asin),
        "acos" => Some(f64::acos),
        "atan" => Some(f64::atan),
        "sqrt" => Some(f64::sqrt),
        "abs" => Some(f64::abs),
        "exp" => Some(f64::exp),
        "floor" => Some(f64::floor),
        "ceil" => Some(f64::ceil),
        "round" => Some(f64::round_ties_even),
        _ => None,
    };
    if let Some(f) = unary {
        arity(1)?;
        return Ok(f(args[0]));
    }

    match name.node.as_str() {
        "log" => match args {
            [x] => Ok(x.ln()),
            [x, base] => Ok(x.log(*base)),
            _ => Err(ExprError::Arity {
                name: name.node.clone(),
                expected: 1,
                found: args.len(),
                span: span.clone(),
            }),
        },
        "pow" => {
            arity(2)?;
            Ok(args[0].powf(args[1]))
        }
        "atan2" => {
            arity(2)?;
            Ok(args[0].atan2(args[1]))
        }
        "hypot" => {
            arity(2)?;
            Ok(args[0].hypot(args[1]))
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(ExprError::Arity {
                    name: name.node.clone(),
                    expected: 1,
                    found: 0,
                    span: span.clone(),
                });
            }
            let pick: fn(f64, f64) -> f64 = if name.node == "min" {
                f64::min
            } else {
                f64::max
            };
            Ok(args[1..].iter().fold(args[0], |acc, v| pick(acc, *v)))
        }
        _ => Err(ExprError::UnknownFunction {
            name: name.node.clone(),
            span: name.span.clone(),
        }),
    }
}
