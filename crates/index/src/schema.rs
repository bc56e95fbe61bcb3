//! Predicate schema declarations
//!
//! One declaration per line, in the graph-schema style:
//!
//! ```text
//! # comments and blank lines are ignored
//! xid:  string @index(hash) .
//! name: string @index(exact, hash) @upsert .
//! age:  int .
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::{Error, Result, Value};

/// Declared value type of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    /// Accepts any value
    Default,
    /// UTF-8 string
    String,
    /// 64-bit integer
    Int,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// Edge to another entity
    Uid,
}

impl ValueType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(ValueType::Default),
            "string" => Some(ValueType::String),
            "int" => Some(ValueType::Int),
            "float" => Some(ValueType::Float),
            "bool" => Some(ValueType::Bool),
            "uid" => Some(ValueType::Uid),
            _ => None,
        }
    }

    /// Schema keyword for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Default => "default",
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Uid => "uid",
        }
    }

    /// Whether `value` may be stored under this type
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueType::Default, _)
                | (ValueType::String, Value::String(_))
                | (ValueType::Int, Value::Int(_))
                | (ValueType::Float, Value::Float(_))
                | (ValueType::Bool, Value::Bool(_))
                | (ValueType::Uid, Value::Uid(_))
        )
    }

    /// Convert an untyped literal into a value of this type
    pub fn convert_literal(&self, literal: &str) -> Option<Value> {
        match self {
            ValueType::Default | ValueType::String => Some(Value::String(literal.to_string())),
            ValueType::Int => literal.trim().parse().ok().map(Value::Int),
            ValueType::Float => literal.trim().parse().ok().map(Value::Float),
            ValueType::Bool => match literal.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ValueType::Uid => None,
        }
    }
}

/// Index tokenizer
///
/// Both tokenizers serve equality lookups; they differ only in intent
/// (`exact` would also back ordering in a range-capable index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tokenizer {
    /// Hashed equality index
    Hash,
    /// Exact-value index
    Exact,
}

impl Tokenizer {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "hash" => Some(Tokenizer::Hash),
            "exact" => Some(Tokenizer::Exact),
            _ => None,
        }
    }
}

/// Declaration of a single predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateSchema {
    /// Predicate name
    pub name: String,
    /// Declared value type
    pub value_type: ValueType,
    /// Index tokenizers; empty means not indexed
    pub tokenizers: Vec<Tokenizer>,
    /// `@upsert`: index tokens take part in conflict detection even when
    /// only upsert predicates are checked
    pub upsert: bool,
}

impl PredicateSchema {
    /// Undeclared predicates behave as `name: default .`
    pub fn default_for(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: ValueType::Default,
            tokenizers: Vec::new(),
            upsert: false,
        }
    }

    /// Whether equality lookups are supported
    pub fn is_indexed(&self) -> bool {
        !self.tokenizers.is_empty()
    }

    /// Fail with `SchemaViolation` if `value` does not fit the declared type
    pub fn check(&self, value: &Value) -> Result<()> {
        if self.value_type.accepts(value) {
            Ok(())
        } else {
            Err(Error::SchemaViolation(format!(
                "predicate {} is declared {}, got {}",
                self.name,
                self.value_type.as_str(),
                value.type_name()
            )))
        }
    }
}

/// Set of predicate declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    predicates: BTreeMap<String, PredicateSchema>,
}

impl Schema {
    /// Empty schema: every predicate is `default`, nothing is indexed
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse schema text
    pub fn parse(text: &str) -> Result<Self> {
        let mut schema = Schema::new();
        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let decl = parse_line(line)
                .map_err(|msg| Error::InvalidInput(format!("schema line {}: {}", line_no + 1, msg)))?;
            schema.predicates.insert(decl.name.clone(), decl);
        }
        Ok(schema)
    }

    /// Add or replace a declaration
    pub fn declare(&mut self, decl: PredicateSchema) {
        self.predicates.insert(decl.name.clone(), decl);
    }

    /// Overlay `other`; its declarations win
    pub fn merge(&mut self, other: Schema) {
        self.predicates.extend(other.predicates);
    }

    /// Declaration of `name`, if any
    pub fn get(&self, name: &str) -> Option<&PredicateSchema> {
        self.predicates.get(name)
    }

    /// Declaration of `name`, or the implicit default
    pub fn resolve(&self, name: &str) -> PredicateSchema {
        self.get(name)
            .cloned()
            .unwrap_or_else(|| PredicateSchema::default_for(name))
    }

    /// Whether `name` is declared with an index
    pub fn is_indexed(&self, name: &str) -> bool {
        self.get(name).map(|p| p.is_indexed()).unwrap_or(false)
    }

    /// Names of indexed predicates
    pub fn indexed_predicates(&self) -> impl Iterator<Item = &str> {
        self.predicates
            .values()
            .filter(|p| p.is_indexed())
            .map(|p| p.name.as_str())
    }

    /// All declarations, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &PredicateSchema> {
        self.predicates.values()
    }

    /// Number of declarations
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

fn parse_line(line: &str) -> std::result::Result<PredicateSchema, String> {
    let body = line
        .strip_suffix('.')
        .ok_or_else(|| "declaration must end with '.'".to_string())?
        .trim();
    let (name, rest) = body
        .split_once(':')
        .ok_or_else(|| "expected 'name: type'".to_string())?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || "_.-~".contains(c)) {
        return Err(format!("invalid predicate name {:?}", name));
    }

    let rest = rest.trim();
    let (type_word, mut directives) = match rest.find(|c: char| c.is_whitespace() || c == '@') {
        Some(i) => (&rest[..i], rest[i..].trim_start()),
        None => (rest, ""),
    };
    let value_type =
        ValueType::parse(type_word).ok_or_else(|| format!("unknown type {:?}", type_word))?;

    let mut decl = PredicateSchema {
        name: name.to_string(),
        value_type,
        tokenizers: Vec::new(),
        upsert: false,
    };

    while !directives.is_empty() {
        let after_at = directives
            .strip_prefix('@')
            .ok_or_else(|| format!("unexpected {:?}", directives))?;
        let end = after_at
            .find(|c: char| !c.is_alphanumeric())
            .unwrap_or(after_at.len());
        let directive = &after_at[..end];
        let mut remaining = after_at[end..].trim_start();

        match directive {
            "index" => {
                let args = remaining
                    .strip_prefix('(')
                    .ok_or_else(|| "@index requires tokenizers".to_string())?;
                let close = args
                    .find(')')
                    .ok_or_else(|| "unterminated @index(".to_string())?;
                for tok in args[..close].split(',').map(str::trim) {
                    let tokenizer =
                        Tokenizer::parse(tok).ok_or_else(|| format!("unknown tokenizer {:?}", tok))?;
                    if !decl.tokenizers.contains(&tokenizer) {
                        decl.tokenizers.push(tokenizer);
                    }
                }
                decl.tokenizers.sort();
                remaining = args[close + 1..].trim_start();
            }
            "upsert" => decl.upsert = true,
            other => return Err(format!("unknown directive @{}", other)),
        }
        directives = remaining;
    }

    if decl.upsert && !decl.is_indexed() {
        return Err("@upsert requires @index".to_string());
    }
    if decl.value_type == ValueType::Uid && decl.is_indexed() {
        return Err("uid predicates cannot be indexed".to_string());
    }
    Ok(decl)
}
