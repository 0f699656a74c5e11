//! Parsed node structures.
//!
//! A node is the addressable unit of a script: a named run of content lines
//! plus the decision and conditional blocks found inside it. Blocks are
//! stored as half-open line ranges `[start_line, end_line)` into the node's
//! line list, so the traversal side never re-parses anything.

use serde::{Deserialize, Serialize};

use crate::expr;
use crate::value::VariableStore;

/// One parsed node, produced by [`NodeParser`](crate::parser::NodeParser).
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub name: String,
    /// Stem of the script file this node was found in.
    pub source: String,
    /// Content lines in order, comment-stripped and trimmed. Structural
    /// markers (`#Node:`, `var`, block delimiters) are not included.
    pub lines: Vec<String>,
    pub decisions: Vec<DecisionBlock>,
    pub conditionals: Vec<ConditionalBlock>,
}

impl NodeData {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            lines: Vec::new(),
            decisions: Vec::new(),
            conditionals: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The decision block that starts exactly at `line`, if any.
    pub fn decision_at(&self, line: usize) -> Option<&DecisionBlock> {
        self.decisions.iter().find(|d| d.start_line == line)
    }

    /// The conditional block that starts exactly at `line`, if any.
    /// Nested blocks are stored flat, so start lines are unique.
    pub fn conditional_at(&self, line: usize) -> Option<&ConditionalBlock> {
        self.conditionals.iter().find(|c| c.start_line == line)
    }
}

/// A `#StartDecision` .. `#EndDecision` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionBlock {
    /// First line of the first option.
    pub start_line: usize,
    /// First line past the block.
    pub end_line: usize,
    pub options: Vec<Decision>,
}

impl DecisionBlock {
    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }
}

/// A single `-label` option and the lines that run when it is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub label: String,
    /// First line of the option body (the line after the `-` marker's
    /// position; the marker itself is not a content line).
    pub start_line: usize,
    /// First line past the option body.
    pub end_line: usize,
}

/// An `if` .. `endif` block with optional `else if` and `else` branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBlock {
    /// First line of the `if` branch body.
    pub start_line: usize,
    /// First line past the whole block.
    pub end_line: usize,
    pub if_branch: Conditional,
    pub else_if_branches: Vec<Conditional>,
    /// `else` carries an empty expression and is taken unconditionally.
    pub else_branch: Option<Conditional>,
}

impl ConditionalBlock {
    /// Picks the branch to run. Branches are tested in source order and the
    /// first true one wins; `else` wins if nothing else did.
    pub fn resolve(&self, vars: &VariableStore) -> Option<&Conditional> {
        if self.if_branch.evaluate(vars) {
            return Some(&self.if_branch);
        }
        for branch in &self.else_if_branches {
            if branch.evaluate(vars) {
                return Some(branch);
            }
        }
        self.else_branch.as_ref()
    }
}

/// One branch of a conditional block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    /// Raw expression text between the parentheses. Empty for `else` and
    /// for malformed markers, and an empty expression is always false.
    pub expr: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl Conditional {
    /// Evaluates the branch expression. Evaluation failures are logged and
    /// read as false so a bad expression skips its branch instead of
    /// stopping the story.
    pub fn evaluate(&self, vars: &VariableStore) -> bool {
        match expr::evaluate(&self.expr, vars) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("conditional `{}` failed to evaluate: {}", self.expr, e);
                false
            }
        }
    }
}
