use core::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::error::{ExprError, Result};
use crate::eval::stack_ops::ValueStack;
use crate::types::{
    FunctionName, OperatorSymbol, Token, TryIntoFunctionName, TryIntoOperatorSymbol, Value,
};

/// Maximum number of operators in one operator table.
pub const MAX_OPERATORS: usize = 32;

/// Maximum number of functions in one function table.
pub const MAX_FUNCTIONS: usize = 32;

/// Implementation of an operator or function.
///
/// The callable pops the operands it needs from the stack and returns the result; the
/// executor pushes the result. The token is the operator or function call being
/// applied, for error reporting.
pub type ApplyFn = Arc<dyn Fn(&mut ValueStack, &Token) -> Result<Value> + Send + Sync>;

/// Precedence, associativity and semantics of one operator.
#[derive(Clone)]
pub struct OperatorSpec {
    /// Higher binds tighter.
    pub precedence: u8,
    /// Whether chains of equal precedence group from the left.
    pub left_associative: bool,
    /// Number of operands `apply` pops.
    pub arity: usize,
    pub apply: ApplyFn,
}

impl OperatorSpec {
    /// A left-associative operator taking two operands.
    pub fn binary<F>(precedence: u8, apply: F) -> Self
    where
        F: Fn(&mut ValueStack, &Token) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            precedence,
            left_associative: true,
            arity: 2,
            apply: Arc::new(apply),
        }
    }

    /// A prefix operator taking one operand.
    ///
    /// Prefix operators are right-associative so that `!!x` nests.
    pub fn unary<F>(precedence: u8, apply: F) -> Self
    where
        F: Fn(&mut ValueStack, &Token) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            precedence,
            left_associative: false,
            arity: 1,
            apply: Arc::new(apply),
        }
    }

    /// Makes the operator group from the right, e.g. for exponentiation.
    pub fn right_associative(mut self) -> Self {
        self.left_associative = false;
        self
    }
}

impl fmt::Debug for OperatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorSpec")
            .field("precedence", &self.precedence)
            .field("left_associative", &self.left_associative)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A function callable as `name(args...)`.
#[derive(Clone)]
pub struct FunctionSpec {
    pub name: FunctionName,
    pub apply: ApplyFn,
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Operator symbol to operator mapping.
#[derive(Clone, Debug, Default)]
pub struct OperatorTable {
    entries: heapless::FnvIndexMap<OperatorSymbol, OperatorSpec, MAX_OPERATORS>,
}

impl OperatorTable {
    pub fn get(&self, symbol: &str) -> Option<&OperatorSpec> {
        let key = symbol.try_into_operator_symbol().ok()?;
        self.entries.get(&key)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase function name to function mapping.
#[derive(Clone, Debug, Default)]
pub struct FunctionTable {
    entries: heapless::FnvIndexMap<FunctionName, FunctionSpec, MAX_FUNCTIONS>,
}

impl FunctionTable {
    /// Looks up a function; `name` is matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        let key = name.try_into_function_name().ok()?;
        self.entries.get(&key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Evaluation context for expressions.
///
/// This is the configuration object that holds the operator and function tables. It
/// is built once, then handed to an [`Evaluator`](crate::engine::Evaluator), after
/// which it is read-only and may be shared between threads.
///
/// # Examples
///
/// ```
/// use exp_rpn::context::{EvalContext, OperatorSpec};
/// use exp_rpn::engine::Evaluator;
/// use exp_rpn::types::Value;
///
/// let mut ctx = EvalContext::new();
///
/// // Register a custom function
/// ctx.register_function("double", |stack, token| {
///     let n = stack.pop_integer(token)?;
///     Ok(Value::Int(n * 2))
/// })
/// .unwrap();
///
/// // And a right-associative power operator
/// ctx.register_operator(
///     "**",
///     OperatorSpec::binary(35, |stack, token| {
///         let exp = stack.pop_integer(token)?;
///         let base = stack.pop_integer(token)?;
///         Ok(Value::Int(base.pow(exp as u32)))
///     })
///     .right_associative(),
/// )
/// .unwrap();
///
/// let evaluator = Evaluator::with_context(ctx);
/// assert_eq!(evaluator.eval("double(2 ** 3 ** 2)").unwrap(), Value::Int(1024));
/// ```
#[derive(Clone, Debug)]
pub struct EvalContext {
    pub operators: OperatorTable,
    pub functions: FunctionTable,
}

impl EvalContext {
    /// Creates a context with the default operators and functions registered.
    pub fn new() -> Self {
        let mut ctx = Self::empty();
        // The defaults fit well within MAX_OPERATORS and MAX_FUNCTIONS, and every
        // symbol and name is shorter than its key type, so this cannot fail
        let registered = crate::functions::register_defaults(&mut ctx);
        debug_assert!(registered.is_ok(), "default registration failed: {:?}", registered);
        if let Err(err) = registered {
            warn!("failed to register default operators: {}", err);
        }
        ctx
    }

    /// Creates a context with no operators and no functions.
    pub fn empty() -> Self {
        Self {
            operators: OperatorTable::default(),
            functions: FunctionTable::default(),
        }
    }

    /// Registers an operator, replacing any existing operator with the same symbol.
    ///
    /// The lexer only produces the symbols listed in [`crate::lexer`]; registering a
    /// symbol it never emits has no effect on evaluation.
    pub fn register_operator(&mut self, symbol: &str, spec: OperatorSpec) -> Result<()> {
        let key = symbol.try_into_operator_symbol()?;
        if let Some(existing) = self.operators.entries.get_mut(&key) {
            debug!("operator '{}' replaced", symbol);
            *existing = spec;
            return Ok(());
        }
        self.operators
            .entries
            .insert(key, spec)
            .map_err(|_| ExprError::CapacityExceeded("operators"))?;
        Ok(())
    }

    /// Registers a function under the lowercase form of `name`, replacing any existing
    /// function with that name.
    pub fn register_function<F>(&mut self, name: &str, apply: F) -> Result<()>
    where
        F: Fn(&mut ValueStack, &Token) -> Result<Value> + Send + Sync + 'static,
    {
        let key = name.try_into_function_name()?;
        let function = FunctionSpec {
            name: key.clone(),
            apply: Arc::new(apply),
        };
        if let Some(existing) = self.functions.entries.get_mut(&key) {
            debug!("function '{}' replaced", name);
            *existing = function;
            return Ok(());
        }
        self.functions
            .entries
            .insert(key, function)
            .map_err(|_| ExprError::CapacityExceeded("functions"))?;
        Ok(())
    }

    /// Removes an operator, returning whether it was present.
    pub fn unregister_operator(&mut self, symbol: &str) -> bool {
        match symbol.try_into_operator_symbol() {
            Ok(key) => self.operators.entries.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    /// Removes a function, returning whether it was present.
    pub fn unregister_function(&mut self, name: &str) -> bool {
        match name.try_into_function_name() {
            Ok(key) => self.functions.entries.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn operator(&self, symbol: &str) -> Option<&OperatorSpec> {
        self.operators.get(symbol)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }
}

impl Default for EvalContext {
    /// Same as [`EvalContext::new`]: the default tables are registered.
    fn default() -> Self {
        EvalContext::new()
    }
}
