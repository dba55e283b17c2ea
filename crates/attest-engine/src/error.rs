use thiserror::Error;

use crate::ast::Span;

/// Malformed token: unterminated literal, stray character, or a formula past
/// the token limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {span}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn add_offset(mut self, offset: usize) -> Self {
        self.span = self.span.add_offset(offset);
        self
    }
}

/// Grammar violation, citing the offending token's source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {span}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    pub fn add_offset(mut self, offset: usize) -> Self {
        self.span = self.span.add_offset(offset);
        self
    }
}

/// Fatal evaluation failure for a whole formula (as opposed to per-position
/// failures, which become missing values).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },
    #[error("{name} expects {min} to {max} arguments, got {got}")]
    ArgCount {
        name: String,
        min: usize,
        max: usize,
        got: usize,
    },
    #[error("formula nesting exceeds the {limit}-level limit")]
    NestingTooDeep { limit: usize },
    #[error("{name}: {message}")]
    InvalidArgument { name: String, message: String },
}

/// Any failure the formula frontend or evaluator can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
