
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value carried by an [`Attr`].
///
/// Serialized untagged so a JSON sink writes the plain value
/// (`"no": 3`, not `"no": {"Int": 3}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Bool(bool),
  Int(i64),
  Uint(u64),
  Float(f64),
  String(String),
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Bool(b) => write!(f, "{}", b),
      Value::Int(i) => write!(f, "{}", i),
      Value::Uint(u) => write!(f, "{}", u),
      Value::Float(v) => write!(f, "{}", v),
      Value::String(s) => f.write_str(s),
    }
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::String(v.to_string())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::String(v)
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Float(v)
  }
}

impl From<f32> for Value {
  fn from(v: f32) -> Self {
    Value::Float(v as f64)
  }
}

macro_rules! value_from_signed {
  ($($t:ty),*) => {
    $(impl From<$t> for Value {
      fn from(v: $t) -> Self {
        Value::Int(v as i64)
      }
    })*
  };
}

macro_rules! value_from_unsigned {
  ($($t:ty),*) => {
    $(impl From<$t> for Value {
      fn from(v: $t) -> Self {
        Value::Uint(v as u64)
      }
    })*
  };
}

value_from_signed!(i8, i16, i32, i64, isize);
value_from_unsigned!(u8, u16, u32, u64, usize);

/// A single key/value pair attached to a record or to a handler's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attr {
  pub key: String,
  pub value: Value,
}

impl Attr {
  pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
    }
  }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Attr {
  fn from((key, value): (K, V)) -> Self {
    Attr::new(key, value)
  }
}

impl fmt::Display for Attr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}", self.key, self.value)
  }
}
