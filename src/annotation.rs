//! Typed parsing of entity side-data
//!
//! Each side-data string is `key:value`:
//!
//! | string              | meaning                                        |
//! |---------------------|------------------------------------------------|
//! | `c:<expr>`          | target length / radius                         |
//! | `c:?`               | deferred; geometry follows the endpoints       |
//! | `c:<w>@<h>`         | block width and height targets (either `?`)    |
//! | `line:<dash> <gap>` | custom dash line-style                         |
//! | `<label>:<label>`   | landmark name (the value is used)              |

use thiserror::Error;

use crate::expr::{ExprError, Expression};

/// Key for length / radius / scale constraints
pub const CONSTRAINT_KEY: &str = "c";

/// Key for dash line-styles
pub const LINE_KEY: &str = "line";

const DEFERRED: &str = "?";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnnotationError {
    #[error("annotation '{text}' is not of the form key:value")]
    MissingSeparator { text: String },

    #[error("annotation '{text}' has an empty {part}")]
    Empty { text: String, part: &'static str },

    #[error("invalid expression in annotation '{text}': {source}")]
    Expression {
        text: String,
        /// Expression text the error spans refer to
        expression: String,
        #[source]
        source: ExprError,
    },

    #[error("invalid dash pattern '{text}': {reason}")]
    InvalidDash { text: String, reason: String },

    #[error("annotation key '{key}' appears more than once")]
    Duplicate { key: String },
}

impl AnnotationError {
    fn dash(text: &str, reason: impl Into<String>) -> Self {
        Self::InvalidDash {
            text: text.to_string(),
            reason: reason.into(),
        }
    }

    /// The full annotation string this error was raised for, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::MissingSeparator { text }
            | Self::Empty { text, .. }
            | Self::Expression { text, .. }
            | Self::InvalidDash { text, .. } => Some(text),
            Self::Duplicate { .. } => None,
        }
    }
}

/// A single length target: an expression or the deferred marker
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Expr(Expression),
    Deferred,
}

impl Target {
    fn parse(value: &str, text: &str) -> Result<Self, AnnotationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AnnotationError::Empty {
                text: text.to_string(),
                part: "value",
            });
        }
        if value == DEFERRED {
            return Ok(Target::Deferred);
        }
        Expression::parse(value)
            .map(Target::Expr)
            .map_err(|source| AnnotationError::Expression {
                text: text.to_string(),
                expression: value.to_string(),
                source,
            })
    }
}

/// The `c:` annotation
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// One target, used by lines, circles and arcs
    Single(Target),
    /// Width and height targets, used by block references
    Pair { width: Target, height: Target },
}

impl Constraint {
    fn parse(value: &str, text: &str) -> Result<Self, AnnotationError> {
        match value.split_once('@') {
            Some((w, h)) => Ok(Constraint::Pair {
                width: Target::parse(w, text)?,
                height: Target::parse(h, text)?,
            }),
            None => Target::parse(value, text).map(Constraint::Single),
        }
    }
}

/// Dash and gap lengths of a custom line-style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dash {
    pub dash: f64,
    pub space: f64,
}

impl Dash {
    fn parse(value: &str, text: &str) -> Result<Self, AnnotationError> {
        let parts = value
            .split_whitespace()
            .map(|p| {
                p.parse::<f64>()
                    .map_err(|_| AnnotationError::dash(text, format!("'{}' is not a number", p)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [dash, space] if *dash >= 0.0 && *space >= 0.0 => Ok(Dash {
                dash: *dash,
                space: *space,
            }),
            [_, _] => Err(AnnotationError::dash(text, "lengths must not be negative")),
            _ => Err(AnnotationError::dash(
                text,
                format!("expected 2 lengths, found {}", parts.len()),
            )),
        }
    }
}

/// All annotations attached to one entity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Annotations {
    pub constraint: Option<Constraint>,
    pub dash: Option<Dash>,
    pub label: Option<String>,
}

impl Annotations {
    /// Parse every side-data string of an entity. The first label wins when
    /// several are present.
    pub fn parse<S: AsRef<str>>(xdata: &[S]) -> Result<Self, AnnotationError> {
        let mut out = Annotations::default();
        for text in xdata {
            let text = text.as_ref();
            let (key, value) = text
                .split_once(':')
                .ok_or_else(|| AnnotationError::MissingSeparator {
                    text: text.to_string(),
                })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(AnnotationError::Empty {
                    text: text.to_string(),
                    part: "key",
                });
            }

            match key {
                CONSTRAINT_KEY => {
                    if out.constraint.is_some() {
                        return Err(AnnotationError::Duplicate { key: key.to_string() });
                    }
                    out.constraint = Some(Constraint::parse(value, text)?);
                }
                LINE_KEY => {
                    if out.dash.is_some() {
                        return Err(AnnotationError::Duplicate { key: key.to_string() });
                    }
                    out.dash = Some(Dash::parse(value, text)?);
                }
                _ => {
                    let label = value.trim();
                    if label.is_empty() {
                        return Err(AnnotationError::Empty {
                            text: text.to_string(),
                            part: "label",
                        });
                    }
                    if out.label.is_none() {
                        out.label = Some(label.to_string());
                    }
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;

    fn expr(source: &str) -> Target {
        Target::Expr(Expression::parse(source).unwrap())
    }

    #[test]
    fn test_length_expression() {
        let a = Annotations::parse(&["c:2*2"]).unwrap();
        assert_eq!(a.constraint, Some(Constraint::Single(expr("2*2"))));
        assert_eq!(a.dash, None);
        assert_eq!(a.label, None);
    }

    #[test]
    fn test_deferred() {
        let a = Annotations::parse(&["c:?"]).unwrap();
        assert_eq!(a.constraint, Some(Constraint::Single(Target::Deferred)));
    }

    #[test]
    fn test_block_pair() {
        let a = Annotations::parse(&["c: 2*100 @ ?"]).unwrap();
        assert_eq!(
            a.constraint,
            Some(Constraint::Pair {
                width: expr("2*100"),
                height: Target::Deferred,
            })
        );
    }

    #[test]
    fn test_dash_and_length_together() {
        let a = Annotations::parse(&["c:c", "line:10 5"]).unwrap();
        assert_eq!(a.constraint, Some(Constraint::Single(expr("c"))));
        assert_eq!(
            a.dash,
            Some(Dash {
                dash: 10.0,
                space: 5.0
            })
        );
    }

    #[test]
    fn test_label_uses_value() {
        let a = Annotations::parse(&["origin:start", "other:second"]).unwrap();
        assert_eq!(a.label.as_deref(), Some("start"));
    }

    #[test]
    fn test_missing_separator() {
        let err = Annotations::parse(&["c2"]).unwrap_err();
        assert_snapshot!(err.to_string(), @"annotation 'c2' is not of the form key:value");
    }

    #[test]
    fn test_bad_expression_keeps_text() {
        let err = Annotations::parse(&["c:2*"]).unwrap_err();
        assert_eq!(err.text(), Some("c:2*"));
        assert!(matches!(err, AnnotationError::Expression { ref expression, .. } if expression == "2*"));
    }

    #[test]
    fn test_bad_dash() {
        let err = Annotations::parse(&["line:10"]).unwrap_err();
        assert_snapshot!(err.to_string(), @"invalid dash pattern 'line:10': expected 2 lengths, found 1");
        assert!(Annotations::parse(&["line:a 5"]).is_err());
    }

    #[test]
    fn test_duplicate_constraint() {
        let err = Annotations::parse(&["c:1", "c:2"]).unwrap_err();
        assert_eq!(err, AnnotationError::Duplicate { key: "c".to_string() });
    }
}
