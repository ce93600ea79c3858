//! Threaded evaluation pipeline.
//!
//! The lexer, the converter and the executor each run on their own thread, connected
//! by bounded channels. The executor runs on the calling thread; the other two stages
//! are scoped threads, so borrowed input and context need no `'static` bound.
//!
//! Cancellation is driven by dropping receivers: when the executor stops early it
//! drops its receiver, the converter's next send fails and it stops in turn, and the
//! lexer follows the same way.

use crossbeam::channel::bounded;
use log::trace;

use crate::context::EvalContext;
use crate::error::{ExprError, Result};
use crate::eval::executor::execute;
use crate::eval::shunting_yard::ShuntingYard;
use crate::lexer::Lexer;
use crate::types::{Token, Value};

/// Capacity of each channel between two stages.
pub const PIPELINE_CAPACITY: usize = 16;

/// Evaluates `expression` with each stage on its own thread.
///
/// Produces the same result as a sequential evaluation.
pub fn eval_pipelined(ctx: &EvalContext, expression: &str) -> Result<Value> {
    let (token_tx, token_rx) = bounded::<Token>(PIPELINE_CAPACITY);
    let (postfix_tx, postfix_rx) = bounded::<Result<Token>>(PIPELINE_CAPACITY);

    std::thread::scope(|scope| {
        let lexer = scope.spawn(move || {
            for token in Lexer::new(expression) {
                if token_tx.send(token).is_err() {
                    trace!("lexer stage cancelled");
                    break;
                }
            }
        });

        let converter = scope.spawn(move || {
            for item in ShuntingYard::new(token_rx, &ctx.operators) {
                if postfix_tx.send(item).is_err() {
                    trace!("converter stage cancelled");
                    break;
                }
            }
        });

        // Consumes the receiver, so it is dropped as soon as execution stops
        let result = execute(ctx, postfix_rx);

        if lexer.join().is_err() || converter.join().is_err() {
            return Err(ExprError::Other("pipeline stage panicked".to_string()));
        }
        result
    })
}
