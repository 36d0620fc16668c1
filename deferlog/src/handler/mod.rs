
use std::sync::Arc;

use crate::attr::Attr;
use crate::level::LogLevel;
use crate::record::Record;

/// Separator a sink places between group names and attribute keys.
pub const GROUP_SEPARATOR: &str = ".";

/// Failure reported by a sink for one record.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
  #[error("write failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("encoding failed: {0}")]
  Encode(#[from] serde_json::Error),

  #[error("channel is full")]
  ChannelFull,

  #[error("receiver disconnected")]
  Disconnected,

  #[error("{0}")]
  Other(String),
}

/// Core trait for log sinks.
///
/// A handler decides whether a level is enabled, consumes records, and
/// derives equivalent handlers scoped to extra context. Derivation never
/// mutates the receiver: it returns a new handler and leaves `self` usable.
///
/// Real sinks compose context in derivation order. For
/// `h.with_attrs(a).with_group("g").with_attrs(b)`, keys in `a` stay at the
/// top level while keys in `b` and the record's own attributes become `g.*`.
/// [`crate::buffer_handler::BufferHandler`] is the exception: it places all
/// of its context under its innermost group.
pub trait Handler: Send + Sync + 'static {
  /// Reports whether records at `level` would be kept.
  fn enabled(&self, level: LogLevel) -> bool;

  /// Consumes one record.
  fn handle(&self, record: &Record) -> Result<(), HandlerError>;

  /// Returns a handler that adds `attrs` to every record.
  fn with_attrs(self: Arc<Self>, attrs: &[Attr]) -> Arc<dyn Handler>;

  /// Returns a handler that nests later attributes under `name`.
  /// An empty name returns an equivalent handler.
  fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler>;
}

/// A handler that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardHandler;

impl Handler for DiscardHandler {
  fn enabled(&self, _level: LogLevel) -> bool {
    false
  }

  fn handle(&self, _record: &Record) -> Result<(), HandlerError> {
    Ok(())
  }

  fn with_attrs(self: Arc<Self>, _attrs: &[Attr]) -> Arc<dyn Handler> {
    self
  }

  fn with_group(self: Arc<Self>, _name: &str) -> Arc<dyn Handler> {
    self
  }
}

/// Joins `groups` and `key` with [`GROUP_SEPARATOR`].
pub fn qualify(groups: &[String], key: &str) -> String {
  if groups.is_empty() {
    return key.to_string();
  }
  let mut out = groups.join(GROUP_SEPARATOR);
  out.push_str(GROUP_SEPARATOR);
  out.push_str(key);
  out
}
