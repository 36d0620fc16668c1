
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::attr::Attr;
use crate::level::LogLevel;

/// Inline storage for call-time attributes; most records carry only a few.
pub type Attrs = SmallVec<[Attr; 4]>;

/// A leveled, timestamped log record.
///
/// Handlers treat the record as an opaque payload: buffering keeps it
/// unchanged and replays it as-is to the real sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  /// When the record was emitted, not when it was delivered.
  pub time: DateTime<Utc>,
  pub level: LogLevel,
  pub message: String,
  /// Attributes supplied at the call site. Sinks nest them under every
  /// group of the handler that receives the record.
  pub attrs: Attrs,
}

impl Record {
  pub fn new(time: DateTime<Utc>, level: LogLevel, message: impl Into<String>) -> Self {
    Self {
      time,
      level,
      message: message.into(),
      attrs: SmallVec::new(),
    }
  }

  /// Creates a record stamped with the current time.
  pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
    Self::new(Utc::now(), level, message)
  }

  pub fn with_attr(mut self, attr: impl Into<Attr>) -> Self {
    self.attrs.push(attr.into());
    self
  }

  pub fn with_attrs<I>(mut self, attrs: I) -> Self
  where
    I: IntoIterator,
    I::Item: Into<Attr>,
  {
    self.attrs.extend(attrs.into_iter().map(Into::into));
    self
  }

  pub fn attr(&self, key: &str) -> Option<&Attr> {
    self.attrs.iter().find(|a| a.key == key)
  }
}
