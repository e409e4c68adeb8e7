//! Tree-walking interpreter for parsed expressions.
//!
//! Expressions are evaluated against a JSON bindings object. The filter
//! engine injects `death` (the candidate record), `fieldName`, `fieldValue`
//! and `filters` (the full active filter set) as top-level keys.
//!
//! Paths resolve with flat-key precedence: a literal `"death.house"` key on
//! the bindings object wins over nested `{"death": {"house": ...}}`
//! traversal. A path that resolves nowhere yields `null`, so predicates over
//! missing fields evaluate to "does not match" rather than erroring.

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::ast::{CompareOp, Expr, Literal};
use crate::error::{EvaluationError, ExprError, Result};
use crate::parser::parse_expr;

/// A compiled expression: parse once, evaluate against many records.
///
/// # Example
///
/// ```
/// use incimap_expr::Expression;
/// use serde_json::json;
///
/// let expr = Expression::parse("death.house == 'pn' and death.count > 1").unwrap();
/// let bindings = json!({"death": {"house": "pn", "count": 3}});
/// assert!(expr.eval_bool(&bindings).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse an expression body into an evaluable form.
    pub fn parse(source: &str) -> std::result::Result<Self, EvaluationError> {
        let root =
            parse_expr(source).map_err(|e| EvaluationError::new(source, &e))?;
        Ok(Expression {
            source: source.to_string(),
            root,
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a bindings object, returning the raw result value.
    pub fn eval(&self, bindings: &Value) -> std::result::Result<Value, EvaluationError> {
        eval_expr(&self.root, bindings).map_err(|e| EvaluationError::new(&self.source, &e))
    }

    /// Evaluate and collapse the result to a boolean via truthiness.
    pub fn eval_bool(&self, bindings: &Value) -> std::result::Result<bool, EvaluationError> {
        Ok(is_truthy(&self.eval(bindings)?))
    }
}

/// Pluggable evaluation seam.
///
/// Hosts that need a different expression backend implement this trait; the
/// default [`ExprEvaluator`] parses and interprets the closed grammar.
pub trait Evaluator {
    fn evaluate(
        &self,
        expression: &str,
        bindings: &Value,
    ) -> std::result::Result<Value, EvaluationError>;
}

/// Default evaluator backed by [`Expression`].
#[derive(Debug, Default)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        bindings: &Value,
    ) -> std::result::Result<Value, EvaluationError> {
        Expression::parse(expression)?.eval(bindings)
    }
}

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

fn eval_expr(expr: &Expr, bindings: &Value) -> Result<Value> {
    match expr {
        Expr::Or(children) => {
            for child in children {
                if is_truthy(&eval_expr(child, bindings)?) {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Expr::And(children) => {
            for child in children {
                if !is_truthy(&eval_expr(child, bindings)?) {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Not(inner) => Ok(Value::Bool(!is_truthy(&eval_expr(inner, bindings)?))),
        Expr::Compare { op, lhs, rhs } => {
            let left = eval_expr(lhs, bindings)?;
            let right = eval_expr(rhs, bindings)?;
            compare(*op, &left, &right).map(Value::Bool)
        }
        Expr::Path(segments) => Ok(resolve_path(bindings, segments)
            .cloned()
            .unwrap_or(Value::Null)),
        Expr::Literal(lit) => Ok(literal_value(lit)),
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::String(s) => Value::String(s.clone()),
        Literal::Integer(n) => Value::from(*n),
        Literal::Float(n) => Value::from(*n),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

/// Truthiness: `false`, `null`, `0` and `""` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    match op {
        CompareOp::Eq => Ok(values_equal(lhs, rhs)),
        CompareOp::Ne => Ok(!values_equal(lhs, rhs)),
        CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
            let (a, b) = numeric_pair(op, lhs, rhs)?;
            Ok(match op {
                CompareOp::Lt => a < b,
                CompareOp::Le => a <= b,
                CompareOp::Gt => a > b,
                CompareOp::Ge => a >= b,
                _ => unreachable!(),
            })
        }
        CompareOp::Contains => Ok(contains(lhs, rhs)),
        CompareOp::In => membership(lhs, rhs),
    }
}

/// Equality with numeric/string coercion: a number and a numeric string
/// compare equal by value, everything else compares structurally.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (as_number(lhs), as_number(rhs)) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numeric_pair(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<(f64, f64)> {
    match (as_number(lhs), as_number(rhs)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ExprError::NonNumeric {
            op: op.to_string(),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }),
    }
}

/// Diacritic- and case-insensitive substring test.
///
/// Both sides are coerced to strings. An empty needle never matches.
fn contains(haystack: &Value, needle: &Value) -> bool {
    let (Some(h), Some(n)) = (value_to_str(haystack), value_to_str(needle)) else {
        return false;
    };
    if n.is_empty() {
        return false;
    }
    fold(&h).contains(&fold(&n))
}

/// `lhs in rhs`: membership in an array, or in a comma-separated string.
fn membership(lhs: &Value, rhs: &Value) -> Result<bool> {
    match rhs {
        Value::Array(items) => Ok(items.iter().any(|item| values_equal(lhs, item))),
        Value::String(list) => {
            let Some(needle) = value_to_str(lhs) else {
                return Ok(false);
            };
            let needle = fold(&needle);
            Ok(list.split(',').any(|part| fold(part.trim()) == needle))
        }
        other => Err(ExprError::InvalidMembership(other.to_string())),
    }
}

fn value_to_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// NFD-decompose, strip combining marks, lowercase.
fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Resolve a dotted path against the bindings, flat key first.
fn resolve_path<'a>(bindings: &'a Value, segments: &[String]) -> Option<&'a Value> {
    // Flat key check first
    if let Some(obj) = bindings.as_object() {
        let flat = segments.join(".");
        if let Some(v) = obj.get(&flat) {
            return Some(v);
        }
    }

    let mut current = bindings;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

// =============================================================================
// Tests
// =============================================================================
