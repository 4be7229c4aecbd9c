//! Grammar-restricted parser and evaluator for the program texts returned by
//! the fitting engine.
//!
//! Only the fixed function vocabulary, numeric literals and feature
//! references are admitted; nothing in a program text is ever executed as
//! code.

pub mod ast;
pub mod display;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{AstNode, SerialNode};
pub use display::{render, DisplayFormat};
pub use evaluator::{evaluate, Program};
pub use functions::{Function, FunctionRegistry, PROTECTED_DIVISION_SENTINEL};
