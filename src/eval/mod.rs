//! Expression evaluation module for exp-rpn
//!
//! This module contains the two stages that follow the lexer: conversion of the infix
//! token stream to postfix order, and execution of the postfix stream on a value
//! stack. With the `pipeline` feature the three stages can also run on separate
//! threads connected by bounded channels.

pub mod executor;
#[cfg(feature = "pipeline")]
pub mod pipeline;
pub mod shunting_yard;
pub mod stack_ops;

pub use executor::{PostfixExecutor, execute};
pub use shunting_yard::{ShuntingYard, to_postfix};
pub use stack_ops::{Operand, ValueStack};
