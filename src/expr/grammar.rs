//! Expression parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use super::ast::*;
use super::error::ExprError;
use super::lexer::{lex, Token};

/// Parse an expression source string into an AST
pub fn parse(input: &str) -> Result<Spanned<Expr>, ExprError> {
    let len = input.len();

    let tokens = lex(input)?;
    let token_iter = tokens
        .into_iter()
        .map(|(tok, span)| (tok, SimpleSpan::from(span)));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .next()
                .map(ExprError::from)
                .unwrap_or_else(|| ExprError::Syntax {
                    span: 0..len,
                    message: "Invalid expression".to_string(),
                    expected: vec![],
                })
        })
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn expression_parser<'a, I>(
) -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let number = select! {
            Token::Number(n) => Expr::Number(n),
        }
        .map_with(|n, e| Spanned::new(n, span_range(&e.span())));

        let identifier = select! {
            Token::Ident(s) => s,
        }
        .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

        // Function call: name(arg, ...)
        let call = identifier
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .map_with(|(name, args), e| {
                Spanned::new(Expr::Call { name, args }, span_range(&e.span()))
            });

        let variable = identifier.map(|name: Spanned<String>| {
            let span = name.span.clone();
            Spanned::new(Expr::Variable(name), span)
        });

        let parenthesized = expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
            .map_with(|inner: Spanned<Expr>, e| Spanned::new(inner.node, span_range(&e.span())));

        // Calls must be tried before bare variables
        let atom = choice((number, call, variable, parenthesized)).boxed();

        // Exponentiation is right-associative and binds tighter than unary minus,
        // so `-2^2` is -4 and `2^-1` is 0.5
        let unary = recursive(|unary| {
            let power = atom
                .clone()
                .then(just(Token::Caret).ignore_then(unary).or_not())
                .map(|(base, exponent): (Spanned<Expr>, Option<Spanned<Expr>>)| match exponent {
                    Some(exp) => Spanned::binary(BinaryOp::Pow, base, exp),
                    None => base,
                });

            choice((just(Token::Minus).to(true), just(Token::Plus).to(false)))
                .map_with(|negate, e| (negate, span_range(&e.span())))
                .repeated()
                .foldr(power, |(negate, span), operand: Spanned<Expr>| {
                    if negate {
                        let full = span.start..operand.span.end;
                        Spanned::new(Expr::Neg(Box::new(operand)), full)
                    } else {
                        operand
                    }
                })
                .boxed()
        });

        let product_op = choice((
            just(Token::Star).to(BinaryOp::Mul),
            just(Token::Slash).to(BinaryOp::Div),
            just(Token::Percent).to(BinaryOp::Rem),
        ));
        let product = unary.clone().foldl(
            product_op.then(unary).repeated(),
            |lhs: Spanned<Expr>, (op, rhs): (BinaryOp, Spanned<Expr>)| {
                Spanned::binary(op, lhs, rhs)
            },
        );

        let sum_op = choice((
            just(Token::Plus).to(BinaryOp::Add),
            just(Token::Minus).to(BinaryOp::Sub),
        ));
        product
            .clone()
            .foldl(
                sum_op.then(product).repeated(),
                |lhs: Spanned<Expr>, (op, rhs): (BinaryOp, Spanned<Expr>)| {
                    Spanned::binary(op, lhs, rhs)
                },
            )
            .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(expr: &Spanned<Expr>) -> String {
        match &expr.node {
            Expr::Number(n) => format!("{}", n),
            Expr::Variable(v) => v.node.clone(),
            Expr::Neg(inner) => format!("(-{})", shape(inner)),
            Expr::Binary { op, lhs, rhs } => {
                format!("({} {} {})", shape(lhs), op.symbol(), shape(rhs))
            }
            Expr::Call { name, args } => format!(
                "{}({})",
                name.node,
                args.iter().map(shape).collect::<Vec<_>>().join(", ")
            ),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3").expect("Should parse");
        assert_eq!(shape(&expr), "(1 + (2 * 3))");
    }

    #[test]
    fn test_left_associative_subtraction() {
        let expr = parse("10 - 4 - 3").expect("Should parse");
        assert_eq!(shape(&expr), "((10 - 4) - 3)");
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = parse("2 ^ 3 ^ 2").expect("Should parse");
        assert_eq!(shape(&expr), "(2 ^ (3 ^ 2))");
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse("-2^2").expect("Should parse");
        assert_eq!(shape(&expr), "(-(2 ^ 2))");
    }

    #[test]
    fn test_call_and_variables() {
        let expr = parse("max(c, width / 2)").expect("Should parse");
        assert_eq!(shape(&expr), "max(c, (width / 2))");
        assert_eq!(expr.variables(), vec!["c", "width"]);
    }

    #[test]
    fn test_parenthesized_span_covers_parens() {
        let expr = parse("(c)").expect("Should parse");
        assert_eq!(expr.span, 0..3);
    }

    #[test]
    fn test_trailing_operator_is_error() {
        assert!(matches!(parse("2 *"), Err(ExprError::Syntax { .. })));
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(parse(""), Err(ExprError::Syntax { .. })));
    }

    #[test]
    fn test_unbalanced_parens_is_error() {
        assert!(parse("(1 + 2").is_err());
        assert!(parse("1 + 2)").is_err());
    }
}
