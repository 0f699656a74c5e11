//! Boolean expression evaluation for conditional branches.
//!
//! The grammar is deliberately small and precedence-free: variables are
//! substituted as text, parentheses are reduced innermost-first, `&&` binds
//! the whole remaining text (every part must hold), then `||` (any part),
//! then a leading `!`, then a single comparison, then truthiness of whatever
//! is left. Mixing `&&` and `||` at one level therefore reads left to right
//! with no precedence; scripts that care use parentheses.

use regex::Regex;

use crate::error::EvalError;
use crate::value::VariableStore;

/// Comparison operators in match priority. Two-character operators come
/// first so `>=` is never misread as `>`.
const COMPARISONS: [&str; 6] = [">=", "<=", "==", "!=", ">", "<"];

/// Evaluates a branch expression against the store. An empty expression is
/// false, so a malformed `if` marker quietly skips its branch.
pub fn evaluate(expr: &str, vars: &VariableStore) -> Result<bool, EvalError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Ok(false);
    }
    let substituted = substitute(expr, vars);
    eval_text(&substituted)
}

/// Replaces every `\w+` word that names a known variable with its literal
/// text. Unknown words stay as they are, which lets bare `true`, numbers and
/// misspelled names fall through to the later stages.
fn substitute(expr: &str, vars: &VariableStore) -> String {
    let word = Regex::new(r"\b(\w+)\b").unwrap();
    word.replace_all(expr, |caps: &regex::Captures| {
        match vars.raw(&caps[1]) {
            Some(value) => value.as_expr_text(),
            None => caps[1].to_string(),
        }
    })
    .into_owned()
}

fn eval_text(text: &str) -> Result<bool, EvalError> {
    let mut text = text.trim().to_string();

    // Innermost parentheses first: the last `(` is always innermost, and the
    // first `)` after it closes it. A `(` with no closer is malformed.
    while let Some(open) = text.rfind('(') {
        let close = match text[open..].find(')') {
            Some(off) => open + off,
            None => return Err(EvalError::UnmatchedParenthesis(text)),
        };
        let inner = eval_text(&text[open + 1..close])?;
        let replacement = if inner { "true" } else { "false" };
        text.replace_range(open..=close, replacement);
    }

    if text.contains("&&") {
        for part in text.split("&&") {
            if !eval_text(part)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    if text.contains("||") {
        for part in text.split("||") {
            if eval_text(part)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix('!') {
        return Ok(!eval_text(rest)?);
    }

    for op in COMPARISONS {
        if trimmed.contains(op) {
            return compare(trimmed, op);
        }
    }

    Ok(truthy(trimmed))
}

/// Applies a single comparison. Both sides are tried as numbers first, then
/// as booleans for equality, then compared as ordinal strings.
fn compare(text: &str, op: &str) -> Result<bool, EvalError> {
    let parts: Vec<&str> = text.split(op).collect();
    if parts.len() != 2 {
        log::debug!("malformed comparison `{}`", text);
        return Ok(false);
    }
    let left = parts[0].trim().trim_matches('"');
    let right = parts[1].trim().trim_matches('"');

    if let (Ok(l), Ok(r)) = (left.parse::<f64>(), right.parse::<f64>()) {
        return numeric(op, l, r);
    }

    if op == "==" || op == "!=" {
        let bools = (
            left.to_ascii_lowercase().parse::<bool>(),
            right.to_ascii_lowercase().parse::<bool>(),
        );
        if let (Ok(l), Ok(r)) = bools {
            return Ok(if op == "==" { l == r } else { l != r });
        }
    }

    match op {
        "==" => Ok(left == right),
        "!=" => Ok(left != right),
        ">" => Ok(left > right),
        "<" => Ok(left < right),
        ">=" => Ok(left >= right),
        "<=" => Ok(left <= right),
        _ => Err(EvalError::UnsupportedOperator(op.to_string())),
    }
}

fn numeric(op: &str, l: f64, r: f64) -> Result<bool, EvalError> {
    match op {
        ">=" => Ok(l >= r),
        "<=" => Ok(l <= r),
        "==" => Ok(l == r),
        "!=" => Ok(l != r),
        ">" => Ok(l > r),
        "<" => Ok(l < r),
        _ => Err(EvalError::UnsupportedOperator(op.to_string())),
    }
}

/// Truthiness of a bare term: booleans read as themselves, numbers as
/// nonzero, anything else as non-empty after stripping quotes.
fn truthy(text: &str) -> bool {
    if let Ok(b) = text.to_ascii_lowercase().parse::<bool>() {
        return b;
    }
    if let Ok(n) = text.parse::<f64>() {
        return n != 0.0;
    }
    !text.trim_matches('"').is_empty()
}
