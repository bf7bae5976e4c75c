//! Error types for expression parsing and evaluation

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use super::ast::Span;
use super::lexer::Token;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("unknown variable '{name}'")]
    UnknownVariable {
        name: String,
        span: Span,
        suggestions: Vec<String>,
    },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String, span: Span },

    #[error("function '{name}' takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    #[error("division by zero")]
    DivisionByZero { span: Span },

    #[error("expression does not evaluate to a finite number")]
    NonFinite { span: Span },
}

impl ExprError {
    /// Get the source span of the error
    pub fn span(&self) -> &Span {
        match self {
            ExprError::Syntax { span, .. }
            | ExprError::UnknownVariable { span, .. }
            | ExprError::UnknownFunction { span, .. }
            | ExprError::Arity { span, .. }
            | ExprError::DivisionByZero { span }
            | ExprError::NonFinite { span } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span().clone();
        let message = self.to_string();
        let mut detail = match self {
            ExprError::Syntax { message, expected, .. } if !expected.is_empty() => {
                format!("{}\nExpected: {}", message, expected.join(", "))
            }
            ExprError::Syntax { message, .. } => message.clone(),
            _ => message.clone(),
        };
        if let ExprError::UnknownVariable { suggestions, .. } = self {
            if !suggestions.is_empty() {
                detail.push_str(&format!("\nDid you mean: {}?", suggestions.join(", ")));
            }
        }

        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(detail)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => format!("{}: {}", filename, message),
        }
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for ExprError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ExprError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Number(n) => format!("number {}", n),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::Caret => "'^'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
    }
}
