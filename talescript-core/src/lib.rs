//! Core of the talescript dialogue language: node structures, the `.dlg`
//! parser, the boolean expression evaluator and the typed variable store.
//!
//! The engine side (traversal, presentation, saves) lives in `willow-core`;
//! this crate knows nothing about it and can be used standalone.

pub mod error;
pub mod expr;
pub mod node;
pub mod parser;
pub mod value;

pub use error::{EvalError, ParseError, ParseErrorKind, ValueError};
pub use node::{Conditional, ConditionalBlock, Decision, DecisionBlock, NodeData};
pub use parser::{NodeParser, ScanOutcome};
pub use value::{Value, VariableStore};
