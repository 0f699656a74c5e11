//! Line-oriented scanner for `.dlg` sources.
//!
//! Scripts are never parsed whole: the engine asks for one node by name and
//! the parser walks the file line by line until it has extracted that node.
//! `var` declarations are collected from the entire file along the way, so a
//! file can declare state without the target node ever being inside it.
//!
//! Inside the target node the parser runs a small stack machine: decision
//! and conditional markers open blocks, their end markers close them, and
//! everything else becomes a content line. Block boundaries are recorded as
//! half-open ranges over the content line list.

use regex::Regex;

use crate::error::{ParseError, ParseErrorKind};
use crate::node::{Conditional, ConditionalBlock, Decision, DecisionBlock, NodeData};
use crate::value::Value;

/// Result of scanning one source for one node.
#[derive(Debug)]
pub struct ScanOutcome {
    /// The target node, if this source contained it.
    pub node: Option<NodeData>,
    /// Every `var` declaration in the source, in order of appearance.
    pub vars: Vec<(String, Value)>,
}

/// Extracts a single named node from `.dlg` text.
pub struct NodeParser<'a> {
    target: &'a str,
    source_tag: &'a str,
}

impl<'a> NodeParser<'a> {
    /// `source_tag` is recorded on the node (and in save files) to say where
    /// it came from; the manager passes the file stem.
    pub fn new(target: &'a str, source_tag: &'a str) -> Self {
        Self { target, source_tag }
    }

    pub fn scan(&self, source: &str) -> Result<ScanOutcome, ParseError> {
        let var_line = Regex::new(r"^var\s+(\w+)\s*=\s*(.+)$").unwrap();

        let mut vars: Vec<(String, Value)> = Vec::new();
        let mut scan: Option<NodeScan> = None;
        let mut line_no = 0;

        for (idx, raw) in source.lines().enumerate() {
            line_no = idx + 1;
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            // var lines apply wherever they appear, inside a node or not,
            // and never become content.
            if let Some(caps) = var_line.captures(line) {
                vars.push((caps[1].to_string(), Value::parse_literal(&caps[2])));
                continue;
            }

            if let Some(name) = line.strip_prefix("#Node:") {
                if let Some(open) = &scan {
                    return Err(ParseError::new(
                        line_no,
                        ParseErrorKind::UnterminatedNode(open.node.name.clone()),
                    ));
                }
                if name.trim() == self.target {
                    scan = Some(NodeScan::new(self.target, self.source_tag));
                }
                continue;
            }

            if line == "#EndNode" {
                if let Some(done) = scan.take() {
                    let node = done.finish(line_no)?;
                    return Ok(ScanOutcome {
                        node: Some(node),
                        vars,
                    });
                }
                continue;
            }

            if let Some(open) = scan.as_mut() {
                open.step(line, line_no)?;
            }
        }

        if let Some(open) = scan {
            return Err(ParseError::new(
                line_no,
                ParseErrorKind::UnterminatedNode(open.node.name.clone()),
            ));
        }

        Ok(ScanOutcome { node: None, vars })
    }
}

/// In-progress extraction of the target node.
struct NodeScan {
    node: NodeData,
    open_decision: Option<DecisionBlock>,
    open_conditionals: Vec<OpenConditional>,
}

struct OpenConditional {
    block: ConditionalBlock,
    branch: OpenBranch,
}

/// Which branch of the innermost open conditional is receiving lines.
enum OpenBranch {
    If,
    ElseIf,
    Else,
}

impl NodeScan {
    fn new(name: &str, source_tag: &str) -> Self {
        Self {
            node: NodeData::new(name, source_tag),
            open_decision: None,
            open_conditionals: Vec::new(),
        }
    }

    fn step(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        if line.starts_with("#StartDecision") {
            return self.start_decision(line_no);
        }
        if line.starts_with("#EndDecision") {
            return self.end_decision(line_no);
        }
        if line.starts_with('-') {
            return self.add_option(line, line_no);
        }
        if is_marker(line, "else if") {
            return self.add_else_if(line, line_no);
        }
        if is_marker(line, "else") {
            return self.add_else(line_no);
        }
        if is_marker(line, "endif") {
            return self.end_conditional(line_no);
        }
        if is_marker(line, "if") {
            self.start_conditional(line);
            return Ok(());
        }

        self.node.lines.push(line.to_string());
        Ok(())
    }

    fn start_decision(&mut self, line_no: usize) -> Result<(), ParseError> {
        if self.open_decision.is_some() {
            return Err(ParseError::new(line_no, ParseErrorKind::NestedDecision));
        }
        let at = self.node.lines.len();
        self.open_decision = Some(DecisionBlock {
            start_line: at,
            end_line: at,
            options: Vec::new(),
        });
        Ok(())
    }

    fn add_option(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        let at = self.node.lines.len();
        let Some(block) = self.open_decision.as_mut() else {
            return Err(ParseError::new(line_no, ParseErrorKind::StrayOption));
        };
        if let Some(prev) = block.options.last_mut() {
            prev.end_line = at;
        }
        block.options.push(Decision {
            label: line[1..].to_string(),
            start_line: at,
            end_line: at,
        });
        Ok(())
    }

    fn end_decision(&mut self, line_no: usize) -> Result<(), ParseError> {
        let at = self.node.lines.len();
        let Some(mut block) = self.open_decision.take() else {
            return Err(ParseError::new(
                line_no,
                ParseErrorKind::UnmatchedEndDecision,
            ));
        };
        let Some(last) = block.options.last_mut() else {
            return Err(ParseError::new(line_no, ParseErrorKind::EmptyDecision));
        };
        last.end_line = at;
        block.end_line = at;
        self.node.decisions.push(block);
        Ok(())
    }

    fn start_conditional(&mut self, line: &str) {
        let at = self.node.lines.len();
        self.open_conditionals.push(OpenConditional {
            block: ConditionalBlock {
                start_line: at,
                end_line: at,
                if_branch: Conditional {
                    expr: extract_expr(line),
                    start_line: at,
                    end_line: at,
                },
                else_if_branches: Vec::new(),
                else_branch: None,
            },
            branch: OpenBranch::If,
        });
    }

    fn add_else_if(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        let at = self.node.lines.len();
        let Some(open) = self.open_conditionals.last_mut() else {
            return Err(ParseError::new(
                line_no,
                ParseErrorKind::UnmatchedConditional("else if".to_string()),
            ));
        };
        open.close_branch(at);
        open.block.else_if_branches.push(Conditional {
            expr: extract_expr(line),
            start_line: at,
            end_line: at,
        });
        open.branch = OpenBranch::ElseIf;
        Ok(())
    }

    fn add_else(&mut self, line_no: usize) -> Result<(), ParseError> {
        let at = self.node.lines.len();
        let Some(open) = self.open_conditionals.last_mut() else {
            return Err(ParseError::new(
                line_no,
                ParseErrorKind::UnmatchedConditional("else".to_string()),
            ));
        };
        open.close_branch(at);
        open.block.else_branch = Some(Conditional {
            expr: String::new(),
            start_line: at,
            end_line: at,
        });
        open.branch = OpenBranch::Else;
        Ok(())
    }

    fn end_conditional(&mut self, line_no: usize) -> Result<(), ParseError> {
        let at = self.node.lines.len();
        let Some(mut open) = self.open_conditionals.pop() else {
            return Err(ParseError::new(
                line_no,
                ParseErrorKind::UnmatchedConditional("endif".to_string()),
            ));
        };
        open.close_branch(at);
        open.block.end_line = at;
        self.node.conditionals.push(open.block);
        Ok(())
    }

    fn finish(self, line_no: usize) -> Result<NodeData, ParseError> {
        if self.open_decision.is_some() {
            return Err(ParseError::new(
                line_no,
                ParseErrorKind::UnterminatedBlock("decision"),
            ));
        }
        if !self.open_conditionals.is_empty() {
            return Err(ParseError::new(
                line_no,
                ParseErrorKind::UnterminatedBlock("conditional"),
            ));
        }
        Ok(self.node)
    }
}

impl OpenConditional {
    /// Seals the branch currently receiving lines at `at` (exclusive).
    fn close_branch(&mut self, at: usize) {
        match self.branch {
            OpenBranch::If => self.block.if_branch.end_line = at,
            OpenBranch::ElseIf => {
                if let Some(last) = self.block.else_if_branches.last_mut() {
                    last.end_line = at;
                }
            }
            OpenBranch::Else => {
                if let Some(branch) = self.block.else_branch.as_mut() {
                    branch.end_line = at;
                }
            }
        }
    }
}

/// Cuts a `//` comment off, ignoring `//` inside double quotes.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_string = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_string = !in_string,
            b'/' if !in_string && i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                return &line[..i];
            }
            _ => {}
        }
        i += 1;
    }
    line
}

/// True when `line` is the given keyword marker: the keyword alone, or the
/// keyword followed by whitespace or `(`. Guards against dialogue that
/// merely starts with the same letters.
fn is_marker(line: &str, keyword: &str) -> bool {
    match line.strip_prefix(keyword) {
        Some("") => true,
        Some(rest) => rest.starts_with([' ', '\t', '(']),
        None => false,
    }
}

/// Pulls the expression out of a marker's balanced parentheses. Returns an
/// empty expression (always false) when the parentheses are missing or
/// never close.
fn extract_expr(line: &str) -> String {
    let Some(open) = line.find('(') else {
        return String::new();
    };
    let mut depth = 0usize;
    for (i, ch) in line[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return line[open + 1..open + i].trim().to_string();
                }
            }
            _ => {}
        }
    }
    String::new()
}
