//! # incimap-expr
//!
//! Safe boolean expression sub-language for incident record filtering.
//!
//! Power users can filter records with `expr:(...)`-wrapped predicates.
//! Instead of handing the expression to a host-language evaluator, this crate
//! parses a closed grammar and interprets it, so untrusted filter input can
//! never execute code.
//!
//! ## Architecture
//!
//! - **PEG grammar** ([`pest`]) with Pratt parsing for correct operator
//!   precedence (`NOT` > comparison > `AND` > `OR`)
//! - **Compile-then-evaluate**: [`Expression::parse`] builds the AST once,
//!   [`Expression::eval`] runs it per record with no shared mutable state
//! - **JSON bindings**: expressions see a `serde_json::Value` object with the
//!   candidate record and filter context injected as top-level keys
//!
//! ## Grammar
//!
//! ```text
//! expr     = or
//! or       = and ( ("or" | "||") and )*
//! and      = unary ( ("and" | "&&") unary )*
//! unary    = ("not" | "!") unary | compare
//! compare  = operand ( ("==" | "!=" | "<" | "<=" | ">" | ">=" |
//!                       "contains" | "in") operand )?
//! operand  = literal | path | "(" expr ")"
//! path     = ident ("." ident)*        e.g. death.house, fieldValue
//! literal  = string | number | true | false | null
//! ```
//!
//! `contains` is a diacritic- and case-insensitive substring test; `in`
//! checks membership in an array or a comma-separated string. Ordering
//! operators require numeric operands. Missing paths resolve to `null`.
//!
//! ## Quick Start
//!
//! ```rust
//! use incimap_expr::{Expression, get_evaluable};
//! use serde_json::json;
//!
//! let raw = "expr:(death.house == 'pn' and death.count > 1)";
//! let body = get_evaluable(raw).unwrap();
//! let expr = Expression::parse(body).unwrap();
//!
//! let bindings = json!({"death": {"house": "pn", "count": 3}});
//! assert!(expr.eval_bool(&bindings).unwrap());
//! ```

pub mod ast;
pub mod error;
pub mod eval;
pub mod parser;
pub mod wrapper;

// Re-export the most commonly used types and functions at crate root
pub use ast::{CompareOp, Expr, Literal};
pub use error::{EvaluationError, ExprError, Result};
pub use eval::{Evaluator, ExprEvaluator, Expression, is_truthy};
pub use parser::parse_expr;
pub use wrapper::{get_evaluable, is_evaluable};
