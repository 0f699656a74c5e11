//! Script values and the variable store.
//!
//! Talescript is stringly typed at the source level: a `var` declaration or a
//! command argument is just text, and [`Value::parse_literal`] decides what it
//! becomes. Conversions between the three runtime types are deliberately
//! permissive, matching how expressions coerce values.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// A runtime value held by the [`VariableStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// Parses a literal as it appears on the right side of a `var` line.
    ///
    /// Quoted text becomes a string with the quotes removed, `true`/`false`
    /// (any case) become booleans, integers become numbers and everything
    /// else is kept as a bare string.
    pub fn parse_literal(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            return Value::Str(trimmed.trim_matches('"').to_string());
        }
        if let Ok(b) = trimmed.to_ascii_lowercase().parse::<bool>() {
            return Value::Bool(b);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int(n);
        }
        Value::Str(trimmed.to_string())
    }

    /// The literal text this value substitutes into an expression.
    /// Strings are re-quoted so the comparison layer can tell them apart
    /// from identifiers that were never defined.
    pub fn as_expr_text(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Str(s) => format!("\"{}\"", s),
        }
    }
}

/// Display form, used for `{name}` interpolation in dialogue text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl TryFrom<&Value> for bool {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(*b),
            Value::Int(n) => Ok(*n != 0),
            Value::Str(s) => s
                .trim()
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| ValueError::Conversion {
                    value: value.clone(),
                    target: "bool",
                }),
        }
    }
}

impl TryFrom<&Value> for i64 {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Int(n) => Ok(*n),
            Value::Str(s) => s.trim().parse().map_err(|_| ValueError::Conversion {
                value: value.clone(),
                target: "i64",
            }),
        }
    }
}

impl TryFrom<&Value> for String {
    type Error = ValueError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Ok(value.to_string())
    }
}

/// Named script variables, shared by the parser (which writes `var` lines
/// into it) and the expression evaluator (which reads from it).
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    vars: HashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a variable. Later `var` lines win, which is what
    /// lets one script file predeclare defaults and another override them.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Typed read. Fails if the variable is missing or cannot be coerced.
    pub fn get<T>(&self, name: &str) -> Result<T, ValueError>
    where
        for<'v> T: TryFrom<&'v Value, Error = ValueError>,
    {
        let value = self
            .vars
            .get(name)
            .ok_or_else(|| ValueError::Missing(name.to_string()))?;
        T::try_from(value)
    }

    /// Like [`get`](Self::get) but logs coercion failures instead of
    /// returning them. A missing variable is silent, a present variable of
    /// the wrong shape is worth a warning.
    pub fn try_get<T>(&self, name: &str) -> Option<T>
    where
        for<'v> T: TryFrom<&'v Value, Error = ValueError>,
    {
        let value = self.vars.get(name)?;
        match T::try_from(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("variable read failed: {}", e);
                None
            }
        }
    }

    /// The stored value without conversion.
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Bulk insert, used when applying `var` lines from a scanned file and
    /// when restoring a save.
    pub fn load_all<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (name, value) in pairs {
            self.vars.insert(name, value);
        }
    }

    /// All variables sorted by name, for serialization. Sorting keeps save
    /// files byte-stable for identical state.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        let mut pairs: Vec<(String, Value)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}
