//! Arithmetic expressions used in length annotations
//!
//! Expressions support numbers, variables, `+ - * / % ^`, unary minus,
//! parentheses, and a small set of math functions (`sqrt`, `sin`, `max`, ...).
//! `PI` and `E` are predefined.

pub mod ast;
pub mod error;
mod eval;
mod grammar;
pub mod lexer;

use std::fmt;
use std::str::FromStr;

pub use ast::{BinaryOp, Expr, Span, Spanned};
pub use error::ExprError;
pub use eval::Scope;
pub use grammar::parse;

/// A parsed expression together with its source text
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Spanned<Expr>,
}

impl Expression {
    /// Parse an expression, failing on syntax errors
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let ast = grammar::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// The original source text
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Spanned<Expr> {
        &self.ast
    }

    /// Evaluate against a scope; unknown variables are errors
    pub fn eval(&self, scope: &impl Scope) -> Result<f64, ExprError> {
        eval::eval_expr(&self.ast, scope)
    }
}

impl FromStr for Expression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and evaluate `source` in one step
pub fn evaluate(source: &str, scope: &impl Scope) -> Result<f64, ExprError> {
    Expression::parse(source)?.eval(scope)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_evaluate_with_hashmap_scope() {
        let mut vars = HashMap::new();
        vars.insert("c".to_string(), 1.0);
        assert_eq!(evaluate("2*2", &vars).unwrap(), 4.0);
        assert_eq!(evaluate("c + 0.5", &vars).unwrap(), 1.5);
    }

    #[test]
    fn test_expression_keeps_source() {
        let expr: Expression = "c * 2".parse().unwrap();
        assert_eq!(expr.source(), "c * 2");
        assert_eq!(expr.to_string(), "c * 2");
    }
}
