//! Error types for parsing, expression evaluation and value conversion.

use thiserror::Error;

use crate::value::Value;

/// A structural error in a `.dlg` source, tagged with the 1-based line
/// number it was detected on.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("decision option outside a decision block")]
    StrayOption,
    #[error("`#EndDecision` without a matching `#StartDecision`")]
    UnmatchedEndDecision,
    #[error("decision blocks cannot nest")]
    NestedDecision,
    #[error("decision block has no options")]
    EmptyDecision,
    #[error("`{0}` without an open `if`")]
    UnmatchedConditional(String),
    #[error("`#EndNode` with an unterminated {0} block")]
    UnterminatedBlock(&'static str),
    #[error("node `{0}` is missing its `#EndNode`")]
    UnterminatedNode(String),
}

/// Failure while evaluating a conditional expression. Callers generally
/// treat this as the expression being false, after logging it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unmatched parenthesis in `{0}`")]
    UnmatchedParenthesis(String),
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),
}

/// Failure reading a variable out of the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("variable `{0}` is not defined")]
    Missing(String),
    #[error("cannot read {value:?} as {target}")]
    Conversion { value: Value, target: &'static str },
}
