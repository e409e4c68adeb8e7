//! Expression parser using pest PEG grammar + Pratt parser.
//!
//! Parses filter expression strings like:
//! - `"death.house == 'pn' and death.count > 1"`
//! - `"fieldValue in death.keywords or not death.published"`
//! - `"death.section contains 'orleans'"`
//!
//! Operator precedence is NOT > comparison > AND > OR.

use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::ast::{CompareOp, Expr, Literal};
use crate::error::{ExprError, Result};

// ---------------------------------------------------------------------------
// Pest parser (generated from expr.pest grammar)
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[grammar = "src/expr.pest"]
struct FilterExprParser;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse an expression body (without the `expr:(...)` wrapper) into an AST.
///
/// # Examples
///
/// ```
/// use incimap_expr::parser::parse_expr;
///
/// let expr = parse_expr("death.house == 'pn' and death.count > 1").unwrap();
/// println!("{expr}");
/// ```
pub fn parse_expr(input: &str) -> Result<Expr> {
    let pairs = FilterExprParser::parse(Rule::expression, input)
        .map_err(|e| ExprError::Parse(e.to_string()))?;

    let pratt = PrattParser::new()
        .op(Op::infix(Rule::or_op, Assoc::Left))
        .op(Op::infix(Rule::and_op, Assoc::Left))
        .op(Op::infix(Rule::cmp_op, Assoc::Left))
        .op(Op::prefix(Rule::not_op));

    // expression = { SOI ~ expr ~ EOI }
    let expression_pair = pairs.into_iter().next().unwrap();
    let expr_pair = expression_pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .unwrap();

    build_expr(expr_pair, &pratt)
}

// ---------------------------------------------------------------------------
// Internal parsing helpers
// ---------------------------------------------------------------------------

fn build_expr(pair: Pair<'_, Rule>, pratt: &PrattParser<Rule>) -> Result<Expr> {
    pratt
        .map_primary(|primary| match primary.as_rule() {
            Rule::path => Ok(parse_path(primary)),
            Rule::string => Ok(parse_string(primary)),
            Rule::number => parse_number(primary),
            Rule::boolean => Ok(Expr::Literal(Literal::Bool(
                primary.as_str().eq_ignore_ascii_case("true"),
            ))),
            Rule::null => Ok(Expr::Literal(Literal::Null)),
            Rule::expr => build_expr(primary, pratt),
            other => unreachable!("unexpected primary rule: {other:?}"),
        })
        .map_prefix(|op, rhs| match op.as_rule() {
            Rule::not_op => Ok(Expr::Not(Box::new(rhs?))),
            other => unreachable!("unexpected prefix rule: {other:?}"),
        })
        .map_infix(|lhs, op, rhs| match op.as_rule() {
            Rule::and_op => Ok(merge_binary(Expr::And, lhs?, rhs?)),
            Rule::or_op => Ok(merge_binary(Expr::Or, lhs?, rhs?)),
            Rule::cmp_op => Ok(Expr::Compare {
                op: parse_cmp_op(op.as_str()),
                lhs: Box::new(lhs?),
                rhs: Box::new(rhs?),
            }),
            other => unreachable!("unexpected infix rule: {other:?}"),
        })
        .parse(pair.into_inner())
}

/// Flatten nested binary operators of the same kind.
/// `a AND (b AND c)` becomes `AND(a, b, c)` instead of `AND(a, AND(b, c))`.
fn merge_binary(ctor: fn(Vec<Expr>) -> Expr, lhs: Expr, rhs: Expr) -> Expr {
    let is_same = |expr: &Expr| -> bool {
        matches!(
            (&ctor(vec![]), expr),
            (Expr::And(_), Expr::And(_)) | (Expr::Or(_), Expr::Or(_))
        )
    };

    let mut args = Vec::new();

    for side in [lhs, rhs] {
        if is_same(&side) {
            match side {
                Expr::And(children) | Expr::Or(children) => args.extend(children),
                _ => unreachable!(),
            }
        } else {
            args.push(side);
        }
    }

    ctor(args)
}

fn parse_cmp_op(text: &str) -> CompareOp {
    match text.trim() {
        "==" => CompareOp::Eq,
        "!=" => CompareOp::Ne,
        "<" => CompareOp::Lt,
        "<=" => CompareOp::Le,
        ">" => CompareOp::Gt,
        ">=" => CompareOp::Ge,
        s if s.eq_ignore_ascii_case("contains") => CompareOp::Contains,
        s if s.eq_ignore_ascii_case("in") => CompareOp::In,
        other => unreachable!("unexpected comparison operator: {other:?}"),
    }
}

fn parse_path(pair: Pair<'_, Rule>) -> Expr {
    let segments = pair.as_str().split('.').map(str::to_string).collect();
    Expr::Path(segments)
}

fn parse_string(pair: Pair<'_, Rule>) -> Expr {
    // string = ${ ("\"" ~ dq_inner ~ "\"") | ("'" ~ sq_inner ~ "'") }
    let inner = pair
        .into_inner()
        .next()
        .expect("string must have inner content");
    Expr::Literal(Literal::String(inner.as_str().to_string()))
}

fn parse_number(pair: Pair<'_, Rule>) -> Result<Expr> {
    let text = pair.as_str();
    if text.contains('.') {
        let n: f64 = text
            .parse()
            .map_err(|_| ExprError::Parse(format!("invalid number '{text}'")))?;
        Ok(Expr::Literal(Literal::Float(n)))
    } else {
        let n: i64 = text
            .parse()
            .map_err(|_| ExprError::Parse(format!("invalid number '{text}'")))?;
        Ok(Expr::Literal(Literal::Integer(n)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Expr {
        Expr::Path(segments.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_simple_path() {
        let expr = parse_expr("death.published").unwrap();
        assert_eq!(expr, path(&["death", "published"]));
    }

    #[test]
    fn test_equality() {
        let expr = parse_expr("death.house == 'pn'").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Eq,
                lhs: Box::new(path(&["death", "house"])),
                rhs: Box::new(Expr::Literal(Literal::String("pn".to_string()))),
            }
        );
    }

    #[test]
    fn test_and() {
        let expr = parse_expr("a and b").unwrap();
        assert_eq!(expr, Expr::And(vec![path(&["a"]), path(&["b"])]));
    }

    #[test]
    fn test_symbolic_operators() {
        let expr = parse_expr("a && b || !c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(vec![
                Expr::And(vec![path(&["a"]), path(&["b"])]),
                Expr::Not(Box::new(path(&["c"]))),
            ])
        );
    }

    #[test]
    fn test_precedence_cmp_binds_tighter_than_and() {
        // "a == 1 and b == 2" parses as "(a == 1) and (b == 2)"
        let expr = parse_expr("a == 1 and b == 2").unwrap();
        assert_eq!(
            expr,
            Expr::And(vec![
                Expr::Compare {
                    op: CompareOp::Eq,
                    lhs: Box::new(path(&["a"])),
                    rhs: Box::new(Expr::Literal(Literal::Integer(1))),
                },
                Expr::Compare {
                    op: CompareOp::Eq,
                    lhs: Box::new(path(&["b"])),
                    rhs: Box::new(Expr::Literal(Literal::Integer(2))),
                },
            ])
        );
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        // "a or b and c" parses as "a or (b and c)"
        let expr = parse_expr("a or b and c").unwrap();
        assert_eq!(
            expr,
            Expr::Or(vec![
                path(&["a"]),
                Expr::And(vec![path(&["b"]), path(&["c"])]),
            ])
        );
    }

    #[test]
    fn test_parentheses() {
        let expr = parse_expr("(a or b) and c").unwrap();
        assert_eq!(
            expr,
            Expr::And(vec![
                Expr::Or(vec![path(&["a"]), path(&["b"])]),
                path(&["c"]),
            ])
        );
    }

    #[test]
    fn test_triple_and_flattened() {
        let expr = parse_expr("a and b and c").unwrap();
        assert_eq!(
            expr,
            Expr::And(vec![path(&["a"]), path(&["b"]), path(&["c"])])
        );
    }

    #[test]
    fn test_not_keyword() {
        let expr = parse_expr("not death.published").unwrap();
        assert_eq!(expr, Expr::Not(Box::new(path(&["death", "published"]))));
    }

    #[test]
    fn test_contains() {
        let expr = parse_expr("death.section contains 'orleans'").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Contains,
                lhs: Box::new(path(&["death", "section"])),
                rhs: Box::new(Expr::Literal(Literal::String("orleans".to_string()))),
            }
        );
    }

    #[test]
    fn test_in() {
        let expr = parse_expr("death.house in fieldValue").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::In,
                lhs: Box::new(path(&["death", "house"])),
                rhs: Box::new(path(&["fieldValue"])),
            }
        );
    }

    #[test]
    fn test_numeric_literals() {
        let expr = parse_expr("death.count >= 2.5").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Ge,
                lhs: Box::new(path(&["death", "count"])),
                rhs: Box::new(Expr::Literal(Literal::Float(2.5))),
            }
        );
    }

    #[test]
    fn test_negative_integer() {
        let expr = parse_expr("death.gps.lat < -5").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Lt,
                lhs: Box::new(path(&["death", "gps", "lat"])),
                rhs: Box::new(Expr::Literal(Literal::Integer(-5))),
            }
        );
    }

    #[test]
    fn test_double_quoted_string() {
        let expr = parse_expr(r#"fieldName == "house""#).unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Eq,
                lhs: Box::new(path(&["fieldName"])),
                rhs: Box::new(Expr::Literal(Literal::String("house".to_string()))),
            }
        );
    }

    #[test]
    fn test_identifier_with_keyword_substring() {
        // "organization" starts with "or" but must parse as a path
        let expr = parse_expr("organization and android").unwrap();
        assert_eq!(
            expr,
            Expr::And(vec![path(&["organization"]), path(&["android"])])
        );
    }

    #[test]
    fn test_bool_and_null_literals() {
        let expr = parse_expr("death.published == true or death.cause == null").unwrap();
        assert_eq!(
            expr,
            Expr::Or(vec![
                Expr::Compare {
                    op: CompareOp::Eq,
                    lhs: Box::new(path(&["death", "published"])),
                    rhs: Box::new(Expr::Literal(Literal::Bool(true))),
                },
                Expr::Compare {
                    op: CompareOp::Eq,
                    lhs: Box::new(path(&["death", "cause"])),
                    rhs: Box::new(Expr::Literal(Literal::Null)),
                },
            ])
        );
    }

    #[test]
    fn test_not_equal_is_not_negation() {
        // "!=" must not be parsed as "!" followed by "="
        let expr = parse_expr("a != 1").unwrap();
        assert_eq!(
            expr,
            Expr::Compare {
                op: CompareOp::Ne,
                lhs: Box::new(path(&["a"])),
                rhs: Box::new(Expr::Literal(Literal::Integer(1))),
            }
        );
    }

    #[test]
    fn test_parse_error() {
        assert!(parse_expr("and and").is_err());
        assert!(parse_expr("a ==").is_err());
        assert!(parse_expr("").is_err());
    }
}
