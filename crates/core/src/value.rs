//! Value types for Tessera
//!
//! This module defines the canonical Value type stored against predicates.
//!
//! ## Contract
//!
//! - No implicit type coercions
//! - IEEE-754 float equality semantics
//! - Bytes and String are distinct types
//! - `Uid` is an edge to another entity, distinct from `Int`

use crate::types::Uid;
use serde::{Deserialize, Serialize};

/// Canonical Tessera Value type
///
/// ## The Six Types
///
/// 1. `Bool` - Boolean true or false
/// 2. `Int` - 64-bit signed integer
/// 3. `Float` - 64-bit IEEE-754 floating point
/// 4. `String` - UTF-8 encoded string
/// 5. `Bytes` - Arbitrary binary data (distinct from String)
/// 6. `Uid` - Reference to another entity
///
/// ## Equality Rules
///
/// - Different types are NEVER equal (no type coercion)
/// - `Int(1)` != `Float(1.0)`
/// - `Int(1)` != `Uid(Uid(1))`
/// - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Boolean true or false
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit IEEE-754 floating point
    Float(f64),

    /// UTF-8 encoded string
    String(String),

    /// Arbitrary binary data
    /// NOT equivalent to String - distinct type
    Bytes(Vec<u8>),

    /// Edge to another entity
    Uid(Uid),
}

impl Value {
    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Uid(_) => "uid",
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as bytes slice
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get as an entity reference
    pub fn as_uid(&self) -> Option<Uid> {
        match self {
            Value::Uid(u) => Some(*u),
            _ => None,
        }
    }

    /// Canonical index token for this value.
    ///
    /// Two values share a token exactly when an equality lookup must match
    /// both. Tokens are prefixed with the type so `Int(1)` and `String("1")`
    /// never collide. NaN has no token and is never indexed.
    pub fn index_token(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(format!("b:{}", b)),
            Value::Int(i) => Some(format!("i:{}", i)),
            Value::Float(f) if f.is_nan() => None,
            // -0.0 == 0.0, so both map to the same token
            Value::Float(f) if *f == 0.0 => Some("f:0".to_string()),
            Value::Float(f) => Some(format!("f:{}", f)),
            Value::String(s) => Some(format!("s:{}", s)),
            Value::Bytes(b) => {
                let mut token = String::with_capacity(2 + b.len() * 2);
                token.push_str("x:");
                for byte in b {
                    token.push_str(&format!("{:02x}", byte));
                }
                Some(token)
            }
            Value::Uid(u) => Some(format!("u:{}", u)),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Uid(u) => write!(f, "<{}>", u),
        }
    }
}

// ============================================================================
// Custom PartialEq Implementation (IEEE-754 semantics, no type coercion)
// ============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Uid(a), Value::Uid(b)) => a == b,

            // Different types: NEVER equal
            _ => false,
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Uid> for Value {
    fn from(u: Uid) -> Self {
        Value::Uid(u)
    }
}
