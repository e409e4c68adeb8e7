//! Expression errors.

use thiserror::Error;

/// Errors raised while parsing or evaluating an expression body.
#[derive(Debug, Error)]
pub enum ExprError {
    /// The expression text does not match the grammar.
    #[error("parse error: {0}")]
    Parse(String),

    /// An ordering comparison was applied to non-numeric operands.
    #[error("operands of '{op}' must be numeric (got {lhs} and {rhs})")]
    NonNumeric {
        op: String,
        lhs: String,
        rhs: String,
    },

    /// The right-hand side of `in` is neither an array nor a string.
    #[error("'in' requires an array or comma-separated string on the right (got {0})")]
    InvalidMembership(String),
}

/// A failed evaluation, carrying the offending expression text.
///
/// This is the only error the filter engine sees: both parse and runtime
/// failures are wrapped so the caller can report which expression broke.
#[derive(Debug, Error)]
#[error("failed to evaluate '{expression}': {message}")]
pub struct EvaluationError {
    pub expression: String,
    pub message: String,
}

impl EvaluationError {
    pub fn new(expression: impl Into<String>, source: &ExprError) -> Self {
        EvaluationError {
            expression: expression.into(),
            message: source.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExprError>;
