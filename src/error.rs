//! Error types and handling for the exp-rpn crate.
//!
//! This module defines the error type used throughout the crate for expression
//! conversion and execution. Every variant that can be tied to the source text carries
//! the byte offset of the offending token so callers can point at the exact substring.

use core::fmt;
use core::result;

/// Result type used throughout the crate.
///
/// This is a convenience type alias that uses the `ExprError` type for the error variant.
pub type Result<T> = result::Result<T, ExprError>;

/// Error type for expression conversion and evaluation.
///
/// All errors are terminal for the evaluation that produced them: there are no partial
/// results and no retries.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// Error reported for illegal input.
    ///
    /// Raised when the lexer produced an illegal token (the message is the lexer's
    /// diagnostic), when an operator symbol is not present in the operator table, or
    /// when a structural token ends up where an operand was expected.
    Syntax { position: usize, message: String },

    /// Error for unmatched parentheses in an expression.
    ///
    /// Covers both a `)` (or `,`) without an opening parenthesis and a `(` that is
    /// never closed. `found` is the text of the token that could not be matched.
    UnmatchedParenthesis { position: usize, found: String },

    /// An operand had the wrong kind for the operator or function applied to it.
    ///
    /// `token` is the literal text of the offending operand and `expected` describes
    /// what was required, e.g. "must be integer".
    TypeError {
        /// Literal text of the offending operand
        token: String,
        /// Source position of the offending operand
        position: usize,
        /// What the operand should have been
        expected: &'static str,
    },

    /// A function was called that is not registered in the evaluation context.
    ///
    /// Function names are matched case-insensitively; `name` is reported as written.
    UnknownFunction { name: String, position: usize },

    /// The operands supplied do not fit the operators used.
    ///
    /// Raised when an operator or function finds too few operands on the stack, or
    /// when the evaluation finishes with anything other than exactly one value.
    /// `position` is `None` for the latter case.
    MalformedExpression {
        /// Position of the operator that ran short, if any
        position: Option<usize>,
        /// Human readable description of what went wrong
        details: String,
    },

    /// Integer division or remainder by zero.
    DivideByZero { position: usize },

    /// Error when capacity is exceeded for a fixed-size container.
    ///
    /// The string names the container: one of the registry tables or an evaluation
    /// stack.
    CapacityExceeded(&'static str),

    /// A registry key was longer than the fixed-size key buffer.
    StringTooLong,

    /// General-purpose error for any other error conditions.
    Other(String),
}

impl ExprError {
    /// Source position the error points at, if it has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            ExprError::Syntax { position, .. }
            | ExprError::UnmatchedParenthesis { position, .. }
            | ExprError::TypeError { position, .. }
            | ExprError::UnknownFunction { position, .. }
            | ExprError::DivideByZero { position } => Some(*position),
            ExprError::MalformedExpression { position, .. } => *position,
            ExprError::CapacityExceeded(_) | ExprError::StringTooLong | ExprError::Other(_) => {
                None
            }
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Syntax { position, message } => {
                write!(f, "Syntax error at position {}: {}", position, message)
            }
            ExprError::UnmatchedParenthesis { position, found } => {
                write!(
                    f,
                    "Unmatched parenthesis at position {}: found '{}'",
                    position, found
                )
            }
            ExprError::TypeError {
                token,
                position,
                expected,
            } => {
                write!(
                    f,
                    "Type error at position {}: token '{}' {}",
                    position, token, expected
                )
            }
            ExprError::UnknownFunction { name, position } => {
                write!(f, "Unknown function '{}' at position {}", name, position)
            }
            ExprError::MalformedExpression { position, details } => match position {
                Some(position) => {
                    write!(f, "Malformed expression at position {}: {}", position, details)
                }
                None => write!(f, "Malformed expression: {}", details),
            },
            ExprError::DivideByZero { position } => {
                write!(f, "Division by zero at position {}", position)
            }
            ExprError::CapacityExceeded(container_type) => {
                write!(f, "Capacity exceeded for {}", container_type)
            }
            ExprError::StringTooLong => write!(f, "String too long for heapless buffer"),
            ExprError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ExprError {}
