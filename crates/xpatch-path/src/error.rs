//! Parse and evaluation errors.

use thiserror::Error;

/// A syntax error with the byte offset where it was detected.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind} at offset {position}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: usize,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unclosed string literal")]
    UnclosedString,
    #[error("invalid number")]
    InvalidNumber,
    #[error("expected a location step")]
    ExpectedStep,
    #[error("unknown axis '{0}'")]
    UnknownAxis(String),
    #[error("unknown function '{0}()'")]
    UnknownFunction(String),
    #[error("{function}() takes {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: String,
        found: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("expression evaluates to a {found}, not a node-set")]
    NotANodeSet { found: &'static str },

    #[error("{function}() expects a node-set argument, got a {found}")]
    ExpectedNodeSet {
        function: &'static str,
        found: &'static str,
    },
}
