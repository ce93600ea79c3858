//! Property-based tests against an independent evaluator
//!
//! Random integer expressions are evaluated both by the library and by a small
//! recursive-descent evaluator with the same precedence table, and the results must
//! agree.

use exp_rpn::engine::{Evaluator, format_postfix};
use exp_rpn::error::ExprError;
use exp_rpn::types::Value;
use proptest::prelude::*;

/// Binary operators by precedence level, lowest first.
const LEVELS: [&[&str]; 3] = [
    &["+", "-", "|", "^", "||", "<", ">", "<=", ">=", "==", "!="],
    &["*", "/", "%", "&", "&&"],
    &["<<", ">>"],
];

/// Recursive-descent evaluator over pre-split tokens.
struct Reference<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
}

impl<'a> Reference<'a> {
    fn eval(expression: &'a str) -> Option<i64> {
        let mut parser = Reference {
            tokens: expression.split_whitespace().collect(),
            pos: 0,
        };
        let value = parser.binary(0)?;
        (parser.pos == parser.tokens.len()).then_some(value)
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn binary(&mut self, level: usize) -> Option<i64> {
        if level == LEVELS.len() {
            return self.prefix();
        }
        let mut left = self.binary(level + 1)?;
        while let Some(op) = self.peek().filter(|op| LEVELS[level].contains(op)) {
            self.pos += 1;
            let right = self.binary(level + 1)?;
            left = apply(op, left, right)?;
        }
        Some(left)
    }

    fn prefix(&mut self) -> Option<i64> {
        match self.peek()? {
            "!" => {
                self.pos += 1;
                Some((self.prefix()? == 0) as i64)
            }
            "(" => {
                self.pos += 1;
                let value = self.binary(0)?;
                (self.peek()? == ")").then_some(())?;
                self.pos += 1;
                Some(value)
            }
            literal => {
                self.pos += 1;
                literal.parse().ok()
            }
        }
    }
}

/// `None` for division or remainder by zero.
fn apply(op: &str, l: i64, r: i64) -> Option<i64> {
    let truth = |b: bool| b as i64;
    Some(match op {
        "+" => l.wrapping_add(r),
        "-" => l.wrapping_sub(r),
        "*" => l.wrapping_mul(r),
        "/" => l.checked_div(r).or_else(|| (r != 0).then_some(i64::MIN))?,
        "%" => l.checked_rem(r).or_else(|| (r != 0).then_some(0))?,
        "&" => l & r,
        "|" => l | r,
        "^" => l ^ r,
        "<<" => {
            if r >= 64 {
                0
            } else {
                l << r
            }
        }
        ">>" => {
            if r >= 64 {
                if l < 0 { -1 } else { 0 }
            } else {
                l >> r
            }
        }
        "&&" => truth(l != 0 && r != 0),
        "||" => truth(l != 0 || r != 0),
        "<" => truth(l < r),
        ">" => truth(l > r),
        "<=" => truth(l <= r),
        ">=" => truth(l >= r),
        "==" => truth(l == r),
        "!=" => truth(l != r),
        _ => return None,
    })
}

fn operator_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(LEVELS.concat())
}

/// Integer expressions with spaces around every token. Shift counts are masked to
/// `0..8` so they are never rejected.
fn expression_strategy() -> impl Strategy<Value = String> {
    let leaf = (0i64..1000).prop_map(|n| n.to_string());
    leaf.prop_recursive(4, 32, 2, |inner| {
        prop_oneof![
            (inner.clone(), operator_strategy(), inner.clone()).prop_map(|(l, op, r)| {
                match op {
                    "<<" | ">>" => format!("{} {} ( ( {} ) & 7 )", l, op, r),
                    _ => format!("{} {} {}", l, op, r),
                }
            }),
            inner.clone().prop_map(|e| format!("( {} )", e)),
            inner.prop_map(|e| format!("! {}", e)),
        ]
    })
}

proptest! {
    #[test]
    fn prop_agrees_with_reference_evaluator(expression in expression_strategy()) {
        let evaluator = Evaluator::new();
        match Reference::eval(&expression) {
            Some(expected) => {
                prop_assert_eq!(evaluator.eval(&expression), Ok(Value::Int(expected)));
            }
            None => {
                let is_divide_by_zero = matches!(
                    evaluator.eval(&expression),
                    Err(ExprError::DivideByZero { .. })
                );
                prop_assert!(is_divide_by_zero);
            }
        }
    }

    #[test]
    fn prop_postfix_round_trip(expression in expression_strategy()) {
        let evaluator = Evaluator::new();
        let postfix = evaluator.to_postfix(&expression).unwrap();
        let text = format_postfix(&postfix);
        prop_assert!(!text.contains('(') && !text.contains(')'));
        prop_assert_eq!(evaluator.execute(postfix), evaluator.eval(&expression));
    }

    #[cfg(feature = "pipeline")]
    #[test]
    fn prop_pipeline_agrees_with_sequential(expression in expression_strategy()) {
        let evaluator = Evaluator::new();
        prop_assert_eq!(evaluator.eval_pipelined(&expression), evaluator.eval(&expression));
    }
}
