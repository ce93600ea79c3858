//! Built-in operators and functions for expression evaluation.
//!
//! This module provides the default operator table and the `max`/`min` functions
//! installed by [`EvalContext::new`](crate::context::EvalContext::new). Every built-in
//! has the signature of [`ApplyFn`](crate::context::ApplyFn): it pops its operands
//! from the value stack, validates them and returns the result.
//!
//! Binary operators pop the right operand first and validate it before the left one,
//! so with two bad operands the error names the right-hand one. Integer arithmetic
//! wraps on overflow; integer division or remainder by zero is an error, while float
//! division by zero yields an infinity or NaN.

use crate::context::{EvalContext, OperatorSpec};
use crate::error::{ExprError, Result};
use crate::eval::stack_ops::ValueStack;
use crate::types::{Token, Value};

/// Precedence of prefix operators (`!`).
pub const PREFIX: u8 = 40;
/// Precedence of `<<` and `>>`.
pub const SHIFT: u8 = 30;
/// Precedence of `*`, `/`, `%`, `&` and `&&`.
pub const MULTIPLICATIVE: u8 = 20;
/// Precedence of the additive and comparison operators.
pub const ADDITIVE: u8 = 10;

type BuiltinFn = fn(&mut ValueStack, &Token) -> Result<Value>;

const BINARY_OPERATORS: [(&str, u8, BuiltinFn); 18] = [
    ("<<", SHIFT, shift_left),
    (">>", SHIFT, shift_right),
    ("*", MULTIPLICATIVE, mul),
    ("/", MULTIPLICATIVE, div),
    ("%", MULTIPLICATIVE, rem),
    ("&", MULTIPLICATIVE, bit_and),
    ("&&", MULTIPLICATIVE, logical_and),
    ("+", ADDITIVE, add),
    ("-", ADDITIVE, sub),
    ("|", ADDITIVE, bit_or),
    ("^", ADDITIVE, bit_xor),
    ("||", ADDITIVE, logical_or),
    ("==", ADDITIVE, equal),
    ("!=", ADDITIVE, not_equal),
    ("<", ADDITIVE, less),
    (">", ADDITIVE, greater),
    ("<=", ADDITIVE, less_equal),
    (">=", ADDITIVE, greater_equal),
];

const FUNCTIONS: [(&str, BuiltinFn); 2] = [("max", max), ("min", min)];

/// Installs the default operators and functions into `ctx`.
pub fn register_defaults(ctx: &mut EvalContext) -> Result<()> {
    for (symbol, precedence, apply) in BINARY_OPERATORS {
        ctx.register_operator(symbol, OperatorSpec::binary(precedence, apply))?;
    }
    ctx.register_operator("!", OperatorSpec::unary(PREFIX, not))?;
    for (name, apply) in FUNCTIONS {
        ctx.register_function(name, apply)?;
    }
    Ok(())
}

/// A numeric operand pair after promotion.
enum Numbers {
    Int(i64, i64),
    Float(f64, f64),
}

/// Pops two numbers; the pair is promoted to float unless both are integers.
fn pop_numbers(stack: &mut ValueStack, token: &Token) -> Result<Numbers> {
    let right = stack.pop(token)?;
    let left = stack.pop(token)?;
    let r = right.number()?;
    let l = left.number()?;
    Ok(match (left.value.as_int(), right.value.as_int()) {
        (Some(l), Some(r)) => Numbers::Int(l, r),
        _ => Numbers::Float(l, r),
    })
}

/// Pops two integers, returned as `(left, right)`.
fn pop_integers(stack: &mut ValueStack, token: &Token) -> Result<(i64, i64)> {
    let right = stack.pop(token)?;
    let left = stack.pop(token)?;
    let r = right.integer()?;
    let l = left.integer()?;
    Ok((l, r))
}

fn truth(condition: bool) -> Value {
    Value::Int(condition as i64)
}

/// Adds two numbers.
pub fn add(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    Ok(match pop_numbers(stack, token)? {
        Numbers::Int(l, r) => Value::Int(l.wrapping_add(r)),
        Numbers::Float(l, r) => Value::Float(l + r),
    })
}

/// Subtracts the right operand from the left.
pub fn sub(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    Ok(match pop_numbers(stack, token)? {
        Numbers::Int(l, r) => Value::Int(l.wrapping_sub(r)),
        Numbers::Float(l, r) => Value::Float(l - r),
    })
}

/// Multiplies two numbers.
pub fn mul(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    Ok(match pop_numbers(stack, token)? {
        Numbers::Int(l, r) => Value::Int(l.wrapping_mul(r)),
        Numbers::Float(l, r) => Value::Float(l * r),
    })
}

/// Divides the left operand by the right.
///
/// # Parameters
///
/// * `stack` - Value stack holding the dividend and divisor
/// * `token` - The `/` token, used for error positions
///
/// # Returns
///
/// The truncated quotient for two integers, the float quotient otherwise. An integer
/// divisor of zero is an error; a float divisor of zero gives an infinity or NaN.
pub fn div(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    match pop_numbers(stack, token)? {
        Numbers::Int(_, 0) => Err(ExprError::DivideByZero {
            position: token.position,
        }),
        Numbers::Int(l, r) => Ok(Value::Int(l.wrapping_div(r))),
        Numbers::Float(l, r) => Ok(Value::Float(l / r)),
    }
}

/// Integer remainder; the sign follows the dividend.
pub fn rem(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    match pop_integers(stack, token)? {
        (_, 0) => Err(ExprError::DivideByZero {
            position: token.position,
        }),
        (l, r) => Ok(Value::Int(l.wrapping_rem(r))),
    }
}

pub fn bit_and(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(Value::Int(l & r))
}

pub fn bit_or(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(Value::Int(l | r))
}

pub fn bit_xor(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(Value::Int(l ^ r))
}

/// Pops a value and a shift count. Negative counts are rejected; counts of 64 and
/// above are clamped to 64.
fn pop_shift(stack: &mut ValueStack, token: &Token) -> Result<(i64, u32)> {
    let right = stack.pop(token)?;
    let left = stack.pop(token)?;
    let count = right.integer()?;
    let value = left.integer()?;
    if count < 0 {
        return Err(right.type_error("must be non-negative"));
    }
    Ok((value, count.min(64) as u32))
}

/// Left shift; bits shifted past the top are lost.
pub fn shift_left(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (value, count) = pop_shift(stack, token)?;
    Ok(Value::Int(value.checked_shl(count).unwrap_or(0)))
}

/// Arithmetic right shift.
pub fn shift_right(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (value, count) = pop_shift(stack, token)?;
    let shifted = match value.checked_shr(count) {
        Some(shifted) => shifted,
        None if value < 0 => -1,
        None => 0,
    };
    Ok(Value::Int(shifted))
}

/// 1 when both operands are non-zero, else 0.
pub fn logical_and(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(truth(l != 0 && r != 0))
}

/// 1 when either operand is non-zero, else 0.
pub fn logical_or(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(truth(l != 0 || r != 0))
}

/// Compares the literal text of two operands.
///
/// No conversion takes place, so `1 == 1.0` is false while `"a" == "a"` is true.
pub fn equal(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let right = stack.pop(token)?;
    let left = stack.pop(token)?;
    Ok(truth(left.text == right.text))
}

/// Negation of [`equal`].
pub fn not_equal(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let right = stack.pop(token)?;
    let left = stack.pop(token)?;
    Ok(truth(left.text != right.text))
}

pub fn less(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(truth(l < r))
}

pub fn greater(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(truth(l > r))
}

pub fn less_equal(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(truth(l <= r))
}

pub fn greater_equal(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(truth(l >= r))
}

/// Logical not: 1 for zero, 0 for anything else.
pub fn not(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let n = stack.pop_integer(token)?;
    Ok(truth(n == 0))
}

/// Returns the larger of two integers.
pub fn max(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(Value::Int(l.max(r)))
}

/// Returns the smaller of two integers.
pub fn min(stack: &mut ValueStack, token: &Token) -> Result<Value> {
    let (l, r) = pop_integers(stack, token)?;
    Ok(Value::Int(l.min(r)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::stack_ops::Operand;
    use crate::types::TokenKind;

    fn operand(kind: TokenKind, text: &str, position: usize) -> Operand {
        Operand::from_token(&Token::new(kind, text, position)).unwrap()
    }

    fn int(text: &str) -> Operand {
        operand(TokenKind::Integer, text, 0)
    }

    fn float(text: &str) -> Operand {
        operand(TokenKind::Float, text, 0)
    }

    fn apply(f: BuiltinFn, operands: Vec<Operand>) -> Result<Value> {
        let mut stack = ValueStack::new();
        for op in operands {
            stack.push(op).unwrap();
        }
        f(&mut stack, &Token::new(TokenKind::Operator, "op", 9))
    }

    #[test]
    fn test_arithmetic_promotion() {
        assert_eq!(apply(add, vec![int("2"), int("3")]), Ok(Value::Int(5)));
        assert_eq!(apply(add, vec![int("2"), float("0.5")]), Ok(Value::Float(2.5)));
        assert_eq!(apply(sub, vec![float("1.5"), int("2")]), Ok(Value::Float(-0.5)));
        assert_eq!(apply(mul, vec![int("-4"), int("3")]), Ok(Value::Int(-12)));
        assert_eq!(apply(div, vec![int("7"), int("2")]), Ok(Value::Int(3)));
        assert_eq!(apply(div, vec![int("-7"), int("2")]), Ok(Value::Int(-3)));
        assert_eq!(apply(div, vec![int("7"), float("2.0")]), Ok(Value::Float(3.5)));
    }

    #[test]
    fn test_integer_overflow_wraps() {
        let max_int = i64::MAX.to_string();
        assert_eq!(
            apply(add, vec![int(&max_int), int("1")]),
            Ok(Value::Int(i64::MIN))
        );
        assert_eq!(
            apply(div, vec![Operand::computed(Value::Int(i64::MIN), 0), int("-1")]),
            Ok(Value::Int(i64::MIN))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(
            apply(div, vec![int("1"), int("0")]),
            Err(ExprError::DivideByZero { position: 9 })
        );
        assert_eq!(
            apply(rem, vec![int("1"), int("0")]),
            Err(ExprError::DivideByZero { position: 9 })
        );
        assert_eq!(
            apply(div, vec![float("1.0"), int("0")]),
            Ok(Value::Float(f64::INFINITY))
        );
    }

    #[test]
    fn test_remainder_requires_integers() {
        assert_eq!(apply(rem, vec![int("-7"), int("3")]), Ok(Value::Int(-1)));
        let err = apply(rem, vec![float("7.5"), int("2")]).unwrap_err();
        assert_eq!(
            err,
            ExprError::TypeError {
                token: "7.5".to_string(),
                position: 0,
                expected: "must be integer",
            }
        );
    }

    #[test]
    fn test_right_operand_is_validated_first() {
        let left = operand(TokenKind::Str, "'a'", 0);
        let right = operand(TokenKind::Float, "1.5", 4);
        match apply(bit_and, vec![left, right]) {
            Err(ExprError::TypeError { token, position, .. }) => {
                assert_eq!(token, "1.5");
                assert_eq!(position, 4);
            }
            other => panic!("Expected TypeError, got {:?}", other),
        }
    }

    #[test]
    fn test_bitwise_and_shift_operators() {
        assert_eq!(apply(bit_and, vec![int("6"), int("3")]), Ok(Value::Int(2)));
        assert_eq!(apply(bit_or, vec![int("6"), int("3")]), Ok(Value::Int(7)));
        assert_eq!(apply(bit_xor, vec![int("6"), int("3")]), Ok(Value::Int(5)));
        assert_eq!(apply(shift_left, vec![int("1"), int("4")]), Ok(Value::Int(16)));
        assert_eq!(apply(shift_left, vec![int("1"), int("64")]), Ok(Value::Int(0)));
        assert_eq!(apply(shift_right, vec![int("-16"), int("2")]), Ok(Value::Int(-4)));
        assert_eq!(apply(shift_right, vec![int("-16"), int("99")]), Ok(Value::Int(-1)));
        assert_eq!(apply(shift_right, vec![int("16"), int("99")]), Ok(Value::Int(0)));

        let negative = Operand::computed(Value::Int(-1), 2);
        assert!(matches!(
            apply(shift_left, vec![int("1"), negative]),
            Err(ExprError::TypeError {
                expected: "must be non-negative",
                ..
            })
        ));
    }

    #[test]
    fn test_logical_and_comparison_operators() {
        assert_eq!(apply(logical_and, vec![int("2"), int("3")]), Ok(Value::Int(1)));
        assert_eq!(apply(logical_and, vec![int("2"), int("0")]), Ok(Value::Int(0)));
        assert_eq!(apply(logical_or, vec![int("0"), int("0")]), Ok(Value::Int(0)));
        assert_eq!(apply(logical_or, vec![int("0"), int("-1")]), Ok(Value::Int(1)));
        assert_eq!(apply(less, vec![int("1"), int("2")]), Ok(Value::Int(1)));
        assert_eq!(apply(greater, vec![int("1"), int("2")]), Ok(Value::Int(0)));
        assert_eq!(apply(less_equal, vec![int("2"), int("2")]), Ok(Value::Int(1)));
        assert_eq!(apply(greater_equal, vec![int("1"), int("2")]), Ok(Value::Int(0)));
        assert!(apply(less, vec![float("1.0"), int("2")]).is_err());
    }

    #[test]
    fn test_equality_compares_literal_text() {
        assert_eq!(apply(equal, vec![int("1"), int("1")]), Ok(Value::Int(1)));
        assert_eq!(apply(equal, vec![int("1"), float("1.0")]), Ok(Value::Int(0)));
        assert_eq!(apply(not_equal, vec![int("1"), float("1.0")]), Ok(Value::Int(1)));
        let a = operand(TokenKind::Str, "\"a\"", 0);
        let b = operand(TokenKind::Str, "\"a\"", 6);
        assert_eq!(apply(equal, vec![a, b]), Ok(Value::Int(1)));
    }

    #[test]
    fn test_not_and_functions() {
        assert_eq!(apply(not, vec![int("0")]), Ok(Value::Int(1)));
        assert_eq!(apply(not, vec![int("5")]), Ok(Value::Int(0)));
        assert_eq!(apply(max, vec![int("3"), int("7")]), Ok(Value::Int(7)));
        assert_eq!(apply(min, vec![int("3"), int("7")]), Ok(Value::Int(3)));
        assert!(matches!(
            apply(max, vec![int("3")]),
            Err(ExprError::MalformedExpression { position: Some(9), .. })
        ));
    }
}
