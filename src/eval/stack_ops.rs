//! Value stack used by the postfix executor
//!
//! Operators and functions receive the stack directly and pop their own operands,
//! so every pop is checked: running out of operands is a malformed expression, never
//! a silent default.

use crate::error::{ExprError, Result};
use crate::types::{Token, TokenKind, Value, round_real};

/// Maximum depth of the value stack (prevents runaway evaluation)
pub const MAX_STACK_DEPTH: usize = 1000;

/// Initial capacity for the value stack (tuned for typical expressions)
const INITIAL_VALUE_CAPACITY: usize = 16;

/// One entry of the value stack.
///
/// `text` is the literal text of the operand: the source literal for values read
/// from the expression, the canonical rendering for computed values. Equality
/// operators compare this text.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub value: Value,
    pub text: String,
    pub position: usize,
}

impl Operand {
    /// Builds an operand from a number or string literal token.
    pub fn from_token(token: &Token) -> Result<Self> {
        let value = match token.kind {
            TokenKind::Integer => token
                .text
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ExprError::Syntax {
                    position: token.position,
                    message: format!("invalid integer literal '{}'", token.text),
                })?,
            TokenKind::Float => token
                .text
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ExprError::Syntax {
                    position: token.position,
                    message: format!("invalid float literal '{}'", token.text),
                })?,
            TokenKind::Str => Value::Raw(token.text.clone()),
            _ => {
                return Err(ExprError::Syntax {
                    position: token.position,
                    message: format!("'{}' is not an operand", token.text),
                });
            }
        };
        Ok(Self {
            value,
            text: token.text.clone(),
            position: token.position,
        })
    }

    /// Wraps the result of an operator or function.
    ///
    /// Floats are rounded to the significant digits shown in their text, so the value
    /// and the text always agree.
    pub fn computed(value: Value, position: usize) -> Self {
        match value {
            Value::Float(x) => {
                let (rounded, text) = round_real(x);
                Self {
                    value: Value::Float(rounded),
                    text,
                    position,
                }
            }
            other => Self {
                text: other.to_literal(),
                value: other,
                position,
            },
        }
    }

    pub fn type_error(&self, expected: &'static str) -> ExprError {
        ExprError::TypeError {
            token: self.text.clone(),
            position: self.position,
            expected,
        }
    }

    /// The operand as an integer; floats and raw values are rejected.
    pub fn integer(&self) -> Result<i64> {
        self.value
            .as_int()
            .ok_or_else(|| self.type_error("must be integer"))
    }

    /// The operand as a float; raw values are rejected.
    pub fn number(&self) -> Result<f64> {
        self.value
            .as_float()
            .ok_or_else(|| self.type_error("must be number"))
    }
}

/// LIFO stack of operands, created fresh for every evaluation.
#[derive(Debug, Clone, Default)]
pub struct ValueStack {
    items: Vec<Operand>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(INITIAL_VALUE_CAPACITY),
        }
    }

    pub fn push(&mut self, operand: Operand) -> Result<()> {
        if self.items.len() >= MAX_STACK_DEPTH {
            return Err(ExprError::CapacityExceeded("value stack"));
        }
        self.items.push(operand);
        Ok(())
    }

    /// Pops the top operand on behalf of `token`.
    ///
    /// An empty stack means `token` was given fewer operands than it needs.
    pub fn pop(&mut self, token: &Token) -> Result<Operand> {
        self.items.pop().ok_or_else(|| {
            let details = match token.kind {
                TokenKind::Identifier => format!("function '{}' is missing an argument", token.text),
                _ => format!("operator '{}' is missing an operand", token.text),
            };
            ExprError::MalformedExpression {
                position: Some(token.position),
                details,
            }
        })
    }

    pub fn pop_integer(&mut self, token: &Token) -> Result<i64> {
        self.pop(token)?.integer()
    }

    pub fn pop_number(&mut self, token: &Token) -> Result<f64> {
        self.pop(token)?.number()
    }

    pub fn peek(&self) -> Option<&Operand> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consumes the stack, returning its single value.
    pub fn into_result(mut self) -> Result<Value> {
        if self.items.len() != 1 {
            return Err(ExprError::MalformedExpression {
                position: None,
                details: format!("expected exactly one result, found {}", self.items.len()),
            });
        }
        self.items
            .pop()
            .map(|operand| operand.value)
            .ok_or_else(|| ExprError::Other("value stack emptied unexpectedly".to_string()))
    }
}
