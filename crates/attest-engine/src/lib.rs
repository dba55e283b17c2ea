#![forbid(unsafe_code)]

//! Formula frontend and evaluation engine.
//!
//! Formulas are a spreadsheet-style Boolean dialect: comparison, arithmetic,
//! string concatenation, `AND`/`OR`/`NOT`, `IN`, function calls, and
//! backtick-quoted column names. [`parse_formula`] produces an [`Ast`];
//! [`eval::Evaluator`] executes it column-wise against an
//! [`attest_model::Dataset`].
//!
//! The evaluator is a closed interpreter: the only callable surface is the
//! registered function set in [`functions`], nesting depth is capped, and
//! nothing reaches the filesystem, network, or host environment.

pub mod ast;
pub mod error;
pub mod eval;
pub mod fields;
pub mod functions;
pub mod parser;

pub use ast::{Ast, BinaryOp, Expr, Span, UnaryOp};
pub use error::{EngineError, EvalError, LexError, ParseError};
pub use eval::{DataWarning, EvalOutput, Evaluator, PredicateOutput, ValueColumn};
pub use parser::{lex, parse_formula, Token, TokenKind};
