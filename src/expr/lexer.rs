//! Lexer for annotation expressions using logos

use logos::Logos;

use super::ast::Span;
use super::error::ExprError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
}

/// Lex an expression into tokens with spans.
///
/// Unlike the grammar, the lexer fails on the first character it cannot
/// classify so the error can point at it.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, ExprError> {
    let mut tokens = Vec::new();
    for (tok, span) in Token::lexer(input).spanned() {
        match tok {
            Ok(t) => tokens.push((t, span)),
            Err(()) => {
                let found = input[span.clone()].to_string();
                return Err(ExprError::Syntax {
                    message: format!("Unexpected character '{}'", found),
                    span,
                    expected: vec![],
                });
            }
        }
    }
    Ok(tokens)
}
