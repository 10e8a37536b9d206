//! Arithmetic expression evaluation
//!
//! Evaluates expression ASTs to numbers. Division by zero is surfaced as
//! its own error variant so the caller can keep the conventional `0` result
//! while still logging the condition.

use crate::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};

/// Evaluate an arithmetic expression
pub fn evaluate(expr: &Expr) -> FormulaResult<f64> {
    match expr {
        Expr::Number(n) => Ok(*n),

        Expr::UnaryOp { op, operand } => {
            let value = evaluate(operand)?;
            match op {
                UnaryOperator::Negate => Ok(-value),
            }
        }

        Expr::BinaryOp { op, left, right } => {
            let left = evaluate(left)?;
            let right = evaluate(right)?;
            match op {
                BinaryOperator::Add => Ok(left + right),
                BinaryOperator::Subtract => Ok(left - right),
                BinaryOperator::Multiply => Ok(left * right),
                BinaryOperator::Divide => {
                    if right == 0.0 {
                        Err(FormulaError::DivisionByZero)
                    } else {
                        Ok(left / right)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn eval(input: &str) -> FormulaResult<f64> {
        evaluate(&parse_expression(input)?)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1+2*3").unwrap(), 7.0);
        assert_eq!(eval("(1+2)*3").unwrap(), 9.0);
        assert_eq!(eval("10/4").unwrap(), 2.5);
        assert_eq!(eval("-2 * 3").unwrap(), -6.0);
    }

    #[test]
    fn test_division_by_zero_is_signaled() {
        assert_eq!(eval("10/0"), Err(FormulaError::DivisionByZero));
        assert_eq!(eval("1/(2-2)"), Err(FormulaError::DivisionByZero));
    }
}
