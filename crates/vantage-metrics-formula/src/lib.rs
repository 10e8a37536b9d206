//! # vantage-metrics-formula
//!
//! The restricted formula grammar for vantage-metrics.
//!
//! This crate provides:
//! - Template handling: `{name}` placeholder extraction and substitution
//! - A tokenizer and recursive-descent parser for the sanitized arithmetic
//!   expression (numbers, `+ - * / ( )`, unary minus)
//! - AST evaluation with explicit division-by-zero signaling
//! - The constraint-expression grammar used by hard and soft validation
//!
//! Formulas never reach a general-purpose evaluator: after placeholder
//! substitution the expression must pass a character-set guard and then
//! parse under the arithmetic grammar, so injection safety is structural.
//!
//! ## Example
//!
//! ```rust
//! use vantage_metrics_formula::{parse_expression, evaluate};
//!
//! let ast = parse_expression("10 * (2 + 3)").unwrap();
//! assert_eq!(evaluate(&ast).unwrap(), 50.0);
//! ```

pub mod ast;
pub mod constraint;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod template;

pub use ast::{BinaryOperator, Expr, UnaryOperator};
pub use constraint::{Comparison, Connective, Constraint};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::evaluate;
pub use parser::parse_expression;
pub use template::{evaluate_template, placeholders, Evaluation};
