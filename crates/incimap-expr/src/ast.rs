//! AST for the filter expression sub-language.

use std::fmt;

/// A parsed expression tree.
///
/// `And`/`Or` are n-ary: chains of the same operator are flattened during
/// parsing, so `a and b and c` becomes `And([a, b, c])`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// OR-linked sub-expressions.
    Or(Vec<Expr>),
    /// AND-linked sub-expressions.
    And(Vec<Expr>),
    /// Logical negation.
    Not(Box<Expr>),
    /// A binary comparison.
    Compare {
        op: CompareOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A dotted field dereference into the bindings, e.g. `death.house`.
    Path(Vec<String>),
    /// A literal value.
    Literal(Literal),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Diacritic- and case-insensitive substring test.
    Contains,
    /// Membership in an array or comma-separated string.
    In,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Contains => "contains",
            CompareOp::In => "in",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Or(children) => write_joined(f, children, " or "),
            Expr::And(children) => write_joined(f, children, " and "),
            Expr::Not(inner) => write!(f, "not ({inner})"),
            Expr::Compare { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Expr::Path(segments) => write!(f, "{}", segments.join(".")),
            Expr::Literal(lit) => write!(f, "{lit}"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{s}'"),
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Float(n) => write!(f, "{n}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Null => write!(f, "null"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Expr], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}
