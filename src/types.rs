//! Type definitions for the expression converter and executor.
//!
//! This module contains the core data structures shared by every pipeline stage: the
//! token produced by the lexer, the runtime value pushed on the evaluation stack, and
//! the fixed-capacity key types used by the operator and function tables.

use core::fmt;
use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::{ExprError, Result};

/// Number of significant digits kept for computed floating-point results.
pub const SIGNIFICANT_DIGITS: usize = 5;

/// Maximum length, in bytes, of an operator symbol in the operator table.
pub const MAX_OPERATOR_LEN: usize = 4;

/// Maximum length, in bytes, of a function name in the function table.
pub const MAX_FUNCTION_NAME_LEN: usize = 32;

/// Key type of the operator table.
pub type OperatorSymbol = heapless::String<MAX_OPERATOR_LEN>;

/// Key type of the function table. Always stored lowercase.
pub type FunctionName = heapless::String<MAX_FUNCTION_NAME_LEN>;

/// Classifies the kind of token produced during lexical analysis.
///
/// `Integer` and `Float` are the two kinds of number literal. `Illegal` tokens carry a
/// diagnostic message in place of literal text.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TokenKind {
    /// An integer literal such as `42`.
    Integer,

    /// A floating point literal such as `2.5`, `.5` or `1e3`.
    Float,

    /// A quoted literal such as `"abc"`; evaluates to a raw value.
    Str,

    /// A name; used as a function call.
    Identifier,

    /// An operator symbol such as `+`, `<<` or `!`.
    Operator,

    /// An opening parenthesis.
    Open,

    /// A closing parenthesis.
    Close,

    /// The argument separator `,`.
    Separator,

    /// End of the expression.
    End,

    /// Invalid input; the token text is the diagnostic message.
    Illegal,
}

/// A token produced by the lexer and consumed by the converter and executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the token in the source text.
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Builds an illegal token carrying `message`.
    pub fn illegal(message: impl Into<String>, position: usize) -> Self {
        Self::new(TokenKind::Illegal, message, position)
    }
}

/// A runtime value on the evaluation stack and the result of an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    /// A literal that is not a number, kept exactly as written.
    Raw(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            Value::Raw(_) => None,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Value::Int(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Canonical literal text of a computed value.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Float(x) => format_real(*x),
            Value::Raw(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

/// Formats a float with `SIGNIFICANT_DIGITS` significant digits in `%g` style.
///
/// Scientific notation is used when the decimal exponent is below -4 or not smaller
/// than the number of digits shown; trailing zeros are never printed.
///
/// ```
/// use exp_rpn::types::format_real;
///
/// assert_eq!(format_real(0.1 + 0.2), "0.3");
/// assert_eq!(format_real(12345.678), "12346");
/// assert_eq!(format_real(123456.0), "1.2346e+05");
/// assert_eq!(format_real(0.00001234), "1.234e-05");
/// ```
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let mut digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }
    let nd = digits.len() as i32;
    let dp = exponent + 1;

    let mut eprec = SIGNIFICANT_DIGITS as i32;
    if eprec > nd && nd >= dp {
        eprec = nd;
    }

    let mut out = String::with_capacity(digits.len() + 8);
    if value < 0.0 {
        out.push('-');
    }
    if exponent < -4 || exponent >= eprec {
        out.push_str(&digits[..1]);
        if nd > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('e');
        out.push(if exponent < 0 { '-' } else { '+' });
        let _ = write!(out, "{:02}", exponent.abs());
    } else if dp <= 0 {
        out.push_str("0.");
        for _ in 0..-dp {
            out.push('0');
        }
        out.push_str(&digits);
    } else if dp >= nd {
        out.push_str(&digits);
        for _ in 0..(dp - nd) {
            out.push('0');
        }
    } else {
        let (int_part, frac_part) = digits.split_at(dp as usize);
        out.push_str(int_part);
        out.push('.');
        out.push_str(frac_part);
    }
    out
}

/// Rounds `value` to the precision shown by [`format_real`], returning both.
pub fn round_real(value: f64) -> (f64, String) {
    let text = format_real(value);
    if !value.is_finite() {
        return (value, text);
    }
    let rounded = text.parse().unwrap_or(value);
    (rounded, text)
}

/// Conversion of `&str` into an operator table key.
pub trait TryIntoOperatorSymbol {
    fn try_into_operator_symbol(&self) -> Result<OperatorSymbol>;
}

impl TryIntoOperatorSymbol for str {
    fn try_into_operator_symbol(&self) -> Result<OperatorSymbol> {
        let mut symbol = OperatorSymbol::new();
        symbol
            .push_str(self)
            .map_err(|_| ExprError::StringTooLong)?;
        Ok(symbol)
    }
}

/// Conversion of `&str` into a function table key. Names are lowercased.
pub trait TryIntoFunctionName {
    fn try_into_function_name(&self) -> Result<FunctionName>;
}

impl TryIntoFunctionName for str {
    fn try_into_function_name(&self) -> Result<FunctionName> {
        let mut name = FunctionName::new();
        for c in self.chars().flat_map(char::to_lowercase) {
            name.push(c).map_err(|_| ExprError::StringTooLong)?;
        }
        Ok(name)
    }
}
