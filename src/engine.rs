//! Expression evaluation front end.
//!
//! [`Evaluator`] ties the lexer, the converter and the executor together behind a
//! shared, read-only [`EvalContext`]. It is cheap to clone and safe to use from many
//! threads at once: every evaluation gets its own operator stack and value stack.

use std::sync::{Arc, OnceLock};

use log::debug;

use crate::context::EvalContext;
use crate::error::Result;
use crate::eval::executor::execute;
use crate::eval::shunting_yard::{ShuntingYard, to_postfix};
use crate::lexer::Lexer;
use crate::types::{Token, Value};

/// Evaluates infix expressions against an operator and function registry.
///
/// # Examples
///
/// ```
/// use exp_rpn::engine::Evaluator;
/// use exp_rpn::types::Value;
///
/// let evaluator = Evaluator::new();
/// assert_eq!(evaluator.eval("1 + 2 * 3").unwrap(), Value::Int(7));
/// assert_eq!(evaluator.eval("max(4, 9) - 2").unwrap(), Value::Int(7));
/// assert_eq!(evaluator.eval("2.0 / 4").unwrap(), Value::Float(0.5));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Evaluator {
    context: Arc<EvalContext>,
}

impl Evaluator {
    /// Creates an evaluator with the default operators and functions.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(ctx: EvalContext) -> Self {
        Self {
            context: Arc::new(ctx),
        }
    }

    pub fn context(&self) -> &EvalContext {
        &self.context
    }

    /// Converts and executes `expression`, returning its value.
    ///
    /// Conversion and execution are interleaved: the first error from either stage
    /// ends the evaluation.
    ///
    /// # Errors
    ///
    /// Besides syntax and evaluation errors, input that nests deeper than
    /// [`MAX_OPERATOR_DEPTH`](crate::eval::shunting_yard::MAX_OPERATOR_DEPTH) open
    /// operators or parentheses, or that holds more than
    /// [`MAX_STACK_DEPTH`](crate::eval::stack_ops::MAX_STACK_DEPTH) pending operands,
    /// fails with [`ExprError::CapacityExceeded`](crate::error::ExprError::CapacityExceeded).
    /// Both limits are 1000 entries.
    pub fn eval(&self, expression: &str) -> Result<Value> {
        debug!("evaluating '{}'", expression);
        let postfix = ShuntingYard::new(Lexer::new(expression), &self.context.operators);
        let result = execute(&self.context, postfix);
        if let Err(err) = &result {
            debug!("evaluation of '{}' failed: {}", expression, err);
        }
        result
    }

    /// Converts `expression` to postfix tokens without executing it.
    pub fn to_postfix(&self, expression: &str) -> Result<Vec<Token>> {
        to_postfix(Lexer::new(expression), &self.context.operators)
    }

    /// Executes tokens that are already in postfix order.
    pub fn execute<I>(&self, postfix: I) -> Result<Value>
    where
        I: IntoIterator<Item = Token>,
    {
        execute(&self.context, postfix.into_iter().map(Ok))
    }

    /// Same as [`Evaluator::eval`], with the lexer, converter and executor running on
    /// separate threads.
    #[cfg(feature = "pipeline")]
    pub fn eval_pipelined(&self, expression: &str) -> Result<Value> {
        debug!("evaluating '{}' in pipeline", expression);
        crate::eval::pipeline::eval_pipelined(&self.context, expression)
    }
}

impl From<Arc<EvalContext>> for Evaluator {
    fn from(context: Arc<EvalContext>) -> Self {
        Self { context }
    }
}

/// Renders postfix tokens separated by single spaces.
///
/// ```
/// use exp_rpn::engine::{Evaluator, format_postfix};
///
/// let postfix = Evaluator::new().to_postfix("(1 + 2) * max(3, 4)").unwrap();
/// assert_eq!(format_postfix(&postfix), "1 2 + 3 4 max *");
/// ```
pub fn format_postfix(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| token.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn default_evaluator() -> &'static Evaluator {
    static DEFAULT: OnceLock<Evaluator> = OnceLock::new();
    DEFAULT.get_or_init(Evaluator::new)
}

/// Interprets a string as an expression, evaluates it, and returns the result.
///
/// # Parameters
///
/// * `expression`: The expression to evaluate
/// * `ctx`: An optional evaluation context; the default operators and functions are
///   used when `None`
///
/// # Returns
///
/// * `Ok(value)`: The result of evaluating the expression
/// * `Err(error)`: An error describing what went wrong during conversion or execution
///
/// # Examples
///
/// ```
/// use exp_rpn::engine::interp;
/// use exp_rpn::error::ExprError;
/// use exp_rpn::types::Value;
///
/// assert_eq!(interp("10 % 3 + 1", None).unwrap(), Value::Int(2));
///
/// match interp("(1 + 2", None) {
///     Err(ExprError::UnmatchedParenthesis { position, .. }) => assert_eq!(position, 0),
///     other => panic!("Unexpected result: {:?}", other),
/// }
/// ```
pub fn interp(expression: &str, ctx: Option<Arc<EvalContext>>) -> Result<Value> {
    match ctx {
        Some(ctx) => Evaluator::from(ctx).eval(expression),
        None => default_evaluator().eval(expression),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExprError;
    use crate::types::TokenKind;

    #[test]
    fn test_eval_basic_expressions() {
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.eval("2 + 3 * 5"), Ok(Value::Int(17)));
        assert_eq!(evaluator.eval("(2 + 3) * 0"), Ok(Value::Int(0)));
        assert_eq!(evaluator.eval("10 - 2 - 3"), Ok(Value::Int(5)));
        assert_eq!(evaluator.eval("!0 + 1"), Ok(Value::Int(2)));
    }

    #[test]
    fn test_to_postfix_and_execute() {
        let evaluator = Evaluator::new();
        let postfix = evaluator.to_postfix("2 + 3 * 5").unwrap();
        assert_eq!(format_postfix(&postfix), "2 3 5 * +");
        assert!(postfix.iter().all(|t| t.kind != TokenKind::Open));
        assert_eq!(evaluator.execute(postfix), Ok(Value::Int(17)));
    }

    #[test]
    fn test_to_postfix_reports_illegal_input() {
        let evaluator = Evaluator::new();
        assert!(matches!(
            evaluator.to_postfix("1 + #"),
            Err(ExprError::Syntax { position: 4, .. })
        ));
    }

    #[test]
    fn test_interp_with_custom_context() {
        let mut ctx = EvalContext::new();
        ctx.register_function("answer", |_, _| Ok(Value::Int(42)))
            .unwrap();
        let ctx = Arc::new(ctx);
        assert_eq!(interp("answer() + 0", Some(ctx.clone())), Ok(Value::Int(42)));
        assert!(matches!(
            interp("answer()", None),
            Err(ExprError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn test_clones_share_context() {
        let evaluator = Evaluator::new();
        let clone = evaluator.clone();
        assert!(std::ptr::eq(evaluator.context(), clone.context()));
    }
}
