#![doc = r#"
# exp-rpn

An embeddable infix expression evaluator built on the shunting-yard algorithm.

## Overview

exp-rpn converts infix expressions such as `2 + 3 * 5` into postfix (reverse Polish)
order and executes the postfix form on a value stack. Operators and functions live in
pluggable tables: the defaults cover integer and float arithmetic, bitwise and logical
operators, comparisons and the `max`/`min` functions, and any of them can be replaced,
removed or extended at runtime.

Key features:
- Integer and float values with automatic promotion; non-numeric literals are kept raw
- Operator precedence and associativity taken from the operator table
- Function calls with comma-separated arguments, matched case-insensitively
- Errors that carry the byte offset of the offending token
- Lazy conversion: postfix tokens are produced on demand
- Optional threaded pipeline (`pipeline` feature) with lexer, converter and executor on
  separate threads

## Quick Start

```rust
use exp_rpn::engine::interp;
use exp_rpn::types::Value;

assert_eq!(interp("2 + 3 * 5", None).unwrap(), Value::Int(17));
assert_eq!(interp("(2 + 3) * 0", None).unwrap(), Value::Int(0));
assert_eq!(interp("max(4, 9) - 2", None).unwrap(), Value::Int(7));
```

## Inspecting the postfix form

```rust
use exp_rpn::engine::{Evaluator, format_postfix};

let evaluator = Evaluator::new();
let postfix = evaluator.to_postfix("2 + 3 * 5").unwrap();
assert_eq!(format_postfix(&postfix), "2 3 5 * +");
assert_eq!(evaluator.execute(postfix).unwrap().to_string(), "17");
```

## Custom operators and functions

```rust
use exp_rpn::context::{EvalContext, OperatorSpec};
use exp_rpn::engine::Evaluator;
use exp_rpn::types::Value;

let mut ctx = EvalContext::new();
ctx.register_function("abs", |stack, token| {
    let n = stack.pop_integer(token)?;
    Ok(Value::Int(n.wrapping_abs()))
})
.unwrap();
// Turn `^` into exponentiation
ctx.register_operator(
    "^",
    OperatorSpec::binary(35, |stack, token| {
        let exp = stack.pop_integer(token)?;
        let base = stack.pop_integer(token)?;
        Ok(Value::Int(base.wrapping_pow(exp as u32)))
    })
    .right_associative(),
)
.unwrap();

let evaluator = Evaluator::with_context(ctx);
assert_eq!(evaluator.eval("abs(1 - 2 ^ 3 ^ 2)").unwrap(), Value::Int(511));
```

## Error handling

```rust
use exp_rpn::engine::interp;
use exp_rpn::error::ExprError;

match interp("foo(1, 2)", None) {
    Err(ExprError::UnknownFunction { name, position }) => {
        assert_eq!(name, "foo");
        assert_eq!(position, 0);
    }
    other => panic!("Unexpected result: {:?}", other),
}
```

## Default operators

From highest to lowest precedence; all binary operators group from the left.

| Precedence | Operators                                        | Operands      |
|------------|--------------------------------------------------|---------------|
| 40         | unary `!`                                        | integer       |
| 30         | `<<` `>>`                                        | integer       |
| 20         | `*` `/`                                          | number        |
| 20         | `%` `&` `&&`                                     | integer       |
| 10         | `+` `-`                                          | number        |
| 10         | `\|` `^` `\|\|` `<` `>` `<=` `>=`                | integer       |
| 10         | `==` `!=`                                        | any (by text) |

## Feature Flags

- `pipeline` (default): enables [`Evaluator::eval_pipelined`](engine::Evaluator) and the
  [`eval::pipeline`] module, built on `crossbeam` channels.
"#]

pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod types;

pub use context::{EvalContext, OperatorSpec};
pub use engine::{Evaluator, format_postfix, interp};
pub use error::ExprError;
pub use types::{Token, TokenKind, Value};

pub mod constants {
    /// Tolerance used when comparing float results in tests.
    pub const TEST_PRECISION: f64 = 1e-9;
}

/// Checks that an evaluation result is a float approximately equal to an expected
/// value. Supports an optional epsilon.
#[macro_export]
macro_rules! assert_float_result {
    // Case 1: assert_float_result!(result, expected) -> use default epsilon
    ($result:expr, $expected:expr $(,)?) => {
        $crate::assert_float_result!($result, $expected, $crate::constants::TEST_PRECISION)
    };
    // Case 2: assert_float_result!(result, expected, epsilon)
    ($result:expr, $expected:expr, $epsilon:expr $(,)?) => {{
        let expected: f64 = $expected;
        let eps: f64 = $epsilon;
        match $result {
            Ok($crate::types::Value::Float(actual)) => {
                if actual.is_nan() && expected.is_nan() {
                    // NaN == NaN for our purposes
                } else if actual.is_infinite()
                    && expected.is_infinite()
                    && actual.signum() == expected.signum()
                {
                    // Same-signed infinities are equal
                } else {
                    assert!(
                        (actual - expected).abs() < eps,
                        "assertion failed: `(left ≈ right)` (left: `{}`, right: `{}`, epsilon: `{}`)",
                        actual,
                        expected,
                        eps
                    );
                }
            }
            other => panic!("Expected float result {}, got {:?}", expected, other),
        }
    }};
}
