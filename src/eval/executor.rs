//! Postfix execution.
//!
//! The executor walks a postfix token stream once, pushing operands and applying
//! operators and functions from an [`EvalContext`]. The stream is consumed lazily and
//! execution stops at the first error, dropping the rest of the stream unread.

use log::trace;

use crate::context::EvalContext;
use crate::error::{ExprError, Result};
use crate::eval::stack_ops::{Operand, ValueStack};
use crate::types::{Token, TokenKind, Value};

/// Executes postfix tokens against one context.
///
/// Each executor owns a fresh value stack; the context is only read.
pub struct PostfixExecutor<'c> {
    ctx: &'c EvalContext,
    stack: ValueStack,
}

impl<'c> PostfixExecutor<'c> {
    pub fn new(ctx: &'c EvalContext) -> Self {
        Self {
            ctx,
            stack: ValueStack::new(),
        }
    }

    /// Executes a single postfix token.
    pub fn step(&mut self, token: Token) -> Result<()> {
        trace!("execute {:?} '{}'", token.kind, token.text);
        match token.kind {
            TokenKind::Integer | TokenKind::Float | TokenKind::Str => {
                self.stack.push(Operand::from_token(&token)?)
            }
            TokenKind::Operator => {
                let spec = self
                    .ctx
                    .operator(&token.text)
                    .ok_or_else(|| ExprError::Syntax {
                        position: token.position,
                        message: format!("unknown operator '{}'", token.text),
                    })?;
                if self.stack.len() < spec.arity {
                    return Err(ExprError::MalformedExpression {
                        position: Some(token.position),
                        details: format!(
                            "operator '{}' needs {} operand(s), found {}",
                            token.text,
                            spec.arity,
                            self.stack.len()
                        ),
                    });
                }
                let value = (spec.apply)(&mut self.stack, &token)?;
                self.stack.push(Operand::computed(value, token.position))
            }
            TokenKind::Identifier => {
                let spec =
                    self.ctx
                        .function(&token.text)
                        .ok_or_else(|| ExprError::UnknownFunction {
                            name: token.text.clone(),
                            position: token.position,
                        })?;
                let value = (spec.apply)(&mut self.stack, &token)?;
                self.stack.push(Operand::computed(value, token.position))
            }
            TokenKind::Illegal => Err(ExprError::Syntax {
                position: token.position,
                message: token.text,
            }),
            // Nothing follows the end of the expression
            TokenKind::End => Ok(()),
            TokenKind::Open | TokenKind::Close | TokenKind::Separator => Err(ExprError::Syntax {
                position: token.position,
                message: format!("unexpected '{}' in postfix expression", token.text),
            }),
        }
    }

    /// Finishes execution, returning the single remaining value.
    pub fn finish(self) -> Result<Value> {
        self.stack.into_result()
    }
}

/// Executes a postfix stream to a single value.
///
/// The stream is an iterator of results so a converter can be plugged in directly; the
/// first `Err` it yields is returned as is.
pub fn execute<I>(ctx: &EvalContext, postfix: I) -> Result<Value>
where
    I: IntoIterator<Item = Result<Token>>,
{
    let mut executor = PostfixExecutor::new(ctx);
    for item in postfix {
        executor.step(item?)?;
    }
    executor.finish()
}
