//! Syntax tree for annotation expressions

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(Spanned<String>),
    Neg(Box<Spanned<Expr>>),
    Binary {
        op: BinaryOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Call {
        name: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
}

impl Spanned<Expr> {
    pub(crate) fn binary(op: BinaryOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Self {
        let span = lhs.span.start..rhs.span.end;
        Spanned::new(
            Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    /// Names of every variable the expression references, in source order
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_variables(self, &mut out);
        out
    }
}

fn collect_variables<'a>(expr: &'a Spanned<Expr>, out: &mut Vec<&'a str>) {
    match &expr.node {
        Expr::Number(_) => {}
        Expr::Variable(name) => out.push(name.node.as_str()),
        Expr::Neg(inner) => collect_variables(inner, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_variables(lhs, out);
            collect_variables(rhs, out);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_variables(arg, out);
            }
        }
    }
}
