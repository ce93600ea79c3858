//! Infix to postfix conversion.
//!
//! [`ShuntingYard`] wraps a token stream and yields the same expression in postfix
//! order. It is lazy: a token is only pulled from the input when the output queue is
//! empty, so it can sit between two threads of a pipeline as easily as it can be
//! collected into a vector.
//!
//! Function calls are emitted as a single identifier token after their arguments, e.g.
//! `max(1, 2)` becomes `1 2 max`. Parentheses and separators never appear in the
//! output.

use std::collections::VecDeque;

use log::trace;

use crate::context::OperatorTable;
use crate::error::{ExprError, Result};
use crate::types::{Token, TokenKind};

/// Maximum depth of the operator stack (prevents unbounded nesting)
pub const MAX_OPERATOR_DEPTH: usize = 1000;

/// Streaming infix to postfix converter.
///
/// Yields `Ok(token)` for each postfix token and at most one `Err`, after which the
/// iterator is exhausted. An illegal input token is forwarded unchanged and also ends
/// the stream; the executor turns it into a syntax error.
pub struct ShuntingYard<'t, I> {
    tokens: I,
    operators: &'t OperatorTable,
    stack: Vec<Token>,
    output: VecDeque<Result<Token>>,
    done: bool,
}

impl<'t, I> ShuntingYard<'t, I>
where
    I: Iterator<Item = Token>,
{
    pub fn new<T>(tokens: T, operators: &'t OperatorTable) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            tokens: tokens.into_iter(),
            operators,
            stack: Vec::new(),
            output: VecDeque::new(),
            done: false,
        }
    }

    fn emit(&mut self, token: Token) {
        trace!("postfix <- {:?} '{}'", token.kind, token.text);
        self.output.push_back(Ok(token));
    }

    fn push_marker(&mut self, token: Token) -> Result<()> {
        if self.stack.len() >= MAX_OPERATOR_DEPTH {
            return Err(ExprError::CapacityExceeded("operator stack"));
        }
        self.stack.push(token);
        Ok(())
    }

    /// Pops operators into the output until an open parenthesis is on top.
    ///
    /// Returns the parenthesis, or `None` if the stack ran out first.
    fn unwind_to_open(&mut self) -> Option<Token> {
        while let Some(top) = self.stack.pop() {
            if top.kind == TokenKind::Open {
                return Some(top);
            }
            self.emit(top);
        }
        None
    }

    fn process(&mut self, token: Token) -> Result<()> {
        match token.kind {
            TokenKind::Integer | TokenKind::Float | TokenKind::Str => self.emit(token),
            TokenKind::Identifier | TokenKind::Open => self.push_marker(token)?,
            TokenKind::Operator => self.process_operator(token)?,
            TokenKind::Separator => {
                let open = self.unwind_to_open().ok_or_else(|| unmatched(&token))?;
                // The argument list is still open
                self.stack.push(open);
            }
            TokenKind::Close => {
                self.unwind_to_open().ok_or_else(|| unmatched(&token))?;
                if self
                    .stack
                    .last()
                    .is_some_and(|top| top.kind == TokenKind::Identifier)
                {
                    if let Some(function) = self.stack.pop() {
                        self.emit(function);
                    }
                }
            }
            TokenKind::End => self.finish()?,
            TokenKind::Illegal => {
                self.output.push_back(Ok(token));
                self.stop();
            }
        }
        Ok(())
    }

    fn process_operator(&mut self, token: Token) -> Result<()> {
        let operators = self.operators;
        let incoming = operators
            .get(&token.text)
            .ok_or_else(|| unknown_operator(&token))?;

        // A prefix operator has no left operand, so nothing stacked can bind to it yet
        if incoming.arity == 1 {
            return self.push_marker(token);
        }

        loop {
            let pop = match self.stack.last() {
                Some(top) if top.kind == TokenKind::Operator => {
                    let stacked = operators.get(&top.text).ok_or_else(|| unknown_operator(top))?;
                    stacked.precedence > incoming.precedence
                        || (stacked.precedence == incoming.precedence
                            && incoming.left_associative)
                }
                // Function markers and open parentheses stop the scan
                _ => false,
            };
            if !pop {
                break;
            }
            if let Some(top) = self.stack.pop() {
                self.emit(top);
            }
        }
        self.push_marker(token)
    }

    /// Drains the operator stack at the end of the input.
    fn finish(&mut self) -> Result<()> {
        if let Some(open) = self
            .stack
            .iter()
            .rev()
            .find(|marker| marker.kind == TokenKind::Open)
        {
            return Err(unmatched(open));
        }
        while let Some(top) = self.stack.pop() {
            self.emit(top);
        }
        self.done = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.done = true;
        self.stack.clear();
    }
}

fn unmatched(token: &Token) -> ExprError {
    ExprError::UnmatchedParenthesis {
        position: token.position,
        found: token.text.clone(),
    }
}

fn unknown_operator(token: &Token) -> ExprError {
    ExprError::Syntax {
        position: token.position,
        message: format!("unknown operator '{}'", token.text),
    }
}

impl<I> Iterator for ShuntingYard<'_, I>
where
    I: Iterator<Item = Token>,
{
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.output.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            let step = match self.tokens.next() {
                Some(token) => self.process(token),
                // Input without an End token is finished the same way
                None => self.finish(),
            };
            if let Err(err) = step {
                trace!("conversion failed: {}", err);
                self.stop();
                self.output.push_back(Err(err));
            }
        }
    }
}

/// Converts a whole token stream, stopping at the first error.
///
/// Unlike the iterator, an illegal input token is reported here as
/// [`ExprError::Syntax`] instead of being passed through.
pub fn to_postfix<I>(tokens: I, operators: &OperatorTable) -> Result<Vec<Token>>
where
    I: IntoIterator<Item = Token>,
{
    ShuntingYard::new(tokens, operators)
        .map(|item| {
            item.and_then(|token| match token.kind {
                TokenKind::Illegal => Err(ExprError::Syntax {
                    position: token.position,
                    message: token.text,
                }),
                _ => Ok(token),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EvalContext, OperatorSpec};
    use crate::lexer::Lexer;
    use crate::types::Value;

    fn postfix(input: &str) -> Result<String> {
        let ctx = EvalContext::new();
        let tokens = to_postfix(Lexer::new(input), &ctx.operators)?;
        Ok(tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" "))
    }

    #[test]
    fn test_precedence_ordering() {
        assert_eq!(postfix("1 + 2 * 3").unwrap(), "1 2 3 * +");
        assert_eq!(postfix("(1 + 2) * 3").unwrap(), "1 2 + 3 *");
        assert_eq!(postfix("1 << 2 * 3").unwrap(), "1 2 << 3 *");
        assert_eq!(postfix("!1 + 2").unwrap(), "1 ! 2 +");
    }

    #[test]
    fn test_left_associative_chains() {
        assert_eq!(postfix("10 - 2 - 3").unwrap(), "10 2 - 3 -");
        assert_eq!(postfix("8 / 4 / 2").unwrap(), "8 4 / 2 /");
    }

    #[test]
    fn test_prefix_operators_nest() {
        assert_eq!(postfix("!!0").unwrap(), "0 ! !");
    }

    #[test]
    fn test_low_precedence_prefix_operator_after_binary() {
        let mut ctx = EvalContext::new();
        ctx.register_operator("~", OperatorSpec::unary(5, |stack, token| {
            let n = stack.pop_integer(token)?;
            Ok(Value::Int(!n))
        }))
        .unwrap();
        let convert = |input: &str| {
            to_postfix(Lexer::new(input), &ctx.operators).map(|tokens| {
                tokens
                    .iter()
                    .map(|t| t.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
        };
        assert_eq!(convert("2 * ~3").unwrap(), "2 3 ~ *");
        assert_eq!(convert("1 + ~2").unwrap(), "1 2 ~ +");
        // The prefix operator still binds looser than what follows it
        assert_eq!(convert("~1 + 2").unwrap(), "1 2 + ~");
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(postfix("max(1, 2)").unwrap(), "1 2 max");
        assert_eq!(postfix("max(1 + 2, min(3, 4)) * 2").unwrap(), "1 2 + 3 4 min max 2 *");
        // A bare name is still emitted at the end of input
        assert_eq!(postfix("max").unwrap(), "max");
    }

    #[test]
    fn test_unmatched_parentheses() {
        assert_eq!(
            postfix("(1 + 2"),
            Err(ExprError::UnmatchedParenthesis {
                position: 0,
                found: "(".to_string()
            })
        );
        assert_eq!(
            postfix("1 + 2)"),
            Err(ExprError::UnmatchedParenthesis {
                position: 5,
                found: ")".to_string()
            })
        );
        assert_eq!(
            postfix("1, 2"),
            Err(ExprError::UnmatchedParenthesis {
                position: 1,
                found: ",".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_operator() {
        assert_eq!(
            postfix("1 ~ 2"),
            Err(ExprError::Syntax {
                position: 2,
                message: "unknown operator '~'".to_string()
            })
        );
    }

    #[test]
    fn test_illegal_token_is_forwarded_then_stream_ends() {
        let ctx = EvalContext::new();
        let items: Vec<Result<Token>> =
            ShuntingYard::new(Lexer::new("1 + $ 2"), &ctx.operators).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().map(|t| t.text.as_str()), Ok("1"));
        let illegal = items[1].as_ref().unwrap();
        assert_eq!(illegal.kind, TokenKind::Illegal);
        assert_eq!(illegal.position, 4);

        assert!(matches!(
            postfix("1 + $ 2"),
            Err(ExprError::Syntax { position: 4, .. })
        ));
    }

    #[test]
    fn test_iterator_is_fused_after_error() {
        let ctx = EvalContext::new();
        let mut converter = ShuntingYard::new(Lexer::new(") 1 2"), &ctx.operators);
        assert!(matches!(
            converter.next(),
            Some(Err(ExprError::UnmatchedParenthesis { .. }))
        ));
        assert!(converter.next().is_none());
        assert!(converter.next().is_none());
    }

    #[test]
    fn test_nesting_limit() {
        let ctx = EvalContext::new();
        let input = "(".repeat(MAX_OPERATOR_DEPTH + 1);
        assert_eq!(
            to_postfix(Lexer::new(&input), &ctx.operators),
            Err(ExprError::CapacityExceeded("operator stack"))
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(postfix("").unwrap(), "");
    }
}
