//! Variable environment for annotation expressions
//!
//! The environment is seeded with caller constants, then with the custom
//! declarations found in the drawing's variables text. The reserved variable
//! `c` is rebound to each entity's natural measurement before its annotation
//! is evaluated.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::expr::{ExprError, Expression, Scope};

/// Variable holding the natural length / radius / dimension of the entity
/// being evaluated
pub const RESERVED: &str = "c";

/// Separator between the generated header and user declarations
pub const CUSTOM_MARKER: &str = "----- custom -----";

/// Paragraph break used by multi-line text entities
pub const PARAGRAPH_BREAK: &str = "\\P";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VariableError {
    #[error("declaration '{line}' is not of the form name: expression")]
    Malformed { line: String },

    #[error("'{name}' is not a valid variable name")]
    InvalidName { name: String },

    #[error("'c' is reserved and cannot be declared")]
    Reserved,

    #[error("invalid expression for variable '{name}': {source}")]
    Expression {
        name: String,
        expression: String,
        #[source]
        source: ExprError,
    },
}

/// One `name: expression` line
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub expression: Expression,
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse the declarations of a variables text. Only the part after the last
/// [`CUSTOM_MARKER`] is considered; without a marker the whole text is.
/// Lines are separated by `\P` or newlines; blank lines are skipped.
pub fn parse_declarations(text: &str) -> Result<Vec<Declaration>, VariableError> {
    let custom = text.rsplit(CUSTOM_MARKER).next().unwrap_or(text);
    custom
        .split(PARAGRAPH_BREAK)
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (name, expr) = line.split_once(':').ok_or_else(|| VariableError::Malformed {
                line: line.to_string(),
            })?;
            let name = name.trim();
            if !is_identifier(name) {
                return Err(VariableError::InvalidName {
                    name: name.to_string(),
                });
            }
            if name == RESERVED {
                return Err(VariableError::Reserved);
            }
            let expression =
                Expression::parse(expr.trim()).map_err(|source| VariableError::Expression {
                    name: name.to_string(),
                    expression: expr.trim().to_string(),
                    source,
                })?;
            Ok(Declaration {
                name: name.to_string(),
                expression,
            })
        })
        .collect()
}

/// Name to value mapping used when evaluating annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    values: BTreeMap<String, f64>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with caller-provided constants
    pub fn with_constants<I, K>(constants: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            values: constants.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    /// Rebind the reserved variable to an entity's natural measurement
    pub fn bind_natural(&mut self, value: f64) {
        self.values.insert(RESERVED.to_string(), value);
    }

    /// Evaluate declarations in order; each one sees every earlier one and
    /// overrides any constant of the same name.
    pub fn declare(&mut self, declarations: &[Declaration]) -> Result<(), VariableError> {
        for decl in declarations {
            let value = decl
                .expression
                .eval(&*self)
                .map_err(|source| VariableError::Expression {
                    name: decl.name.clone(),
                    expression: decl.expression.source().to_string(),
                    source,
                })?;
            debug!(name = %decl.name, value, "declared variable");
            self.values.insert(decl.name.clone(), value);
        }
        Ok(())
    }

    /// Evaluate an expression in this environment
    pub fn eval(&self, expression: &Expression) -> Result<f64, ExprError> {
        expression.eval(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Scope for Environment {
    fn lookup(&self, name: &str) -> Option<f64> {
        self.get(name)
    }

    fn names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }
}
