
use std::fmt;
use std::sync::Arc;

use crate::attr::Attr;
use crate::handler::{Handler, HandlerError};
use crate::level::LogLevel;
use crate::record::Record;

/// Front-end that turns leveled calls into [`Record`]s for a [`Handler`].
///
/// Cloning is cheap; derived loggers share the handler tree of their parent.
#[derive(Clone)]
pub struct Logger {
  handler: Arc<dyn Handler>,
}

impl Logger {
  pub fn new(handler: Arc<dyn Handler>) -> Self {
    Self { handler }
  }

  pub fn handler(&self) -> &Arc<dyn Handler> {
    &self.handler
  }

  #[inline]
  pub fn enabled(&self, level: LogLevel) -> bool {
    self.handler.enabled(level)
  }

  /// Emits one record stamped with the current time.
  ///
  /// Disabled levels are skipped before a record is built. Errors come from
  /// the handler's `handle` and are returned unchanged.
  pub fn log(&self, level: LogLevel, message: &str, attrs: &[Attr]) -> Result<(), HandlerError> {
    if !self.enabled(level) {
      return Ok(());
    }
    let record = Record::now(level, message).with_attrs(attrs.iter().cloned());
    self.handler.handle(&record)
  }

  // Convenience methods drop handler errors; use `log` to observe them.

  pub fn trace(&self, message: &str, attrs: &[Attr]) {
    let _ = self.log(LogLevel::Trace, message, attrs);
  }

  pub fn debug(&self, message: &str, attrs: &[Attr]) {
    let _ = self.log(LogLevel::Debug, message, attrs);
  }

  pub fn info(&self, message: &str, attrs: &[Attr]) {
    let _ = self.log(LogLevel::Info, message, attrs);
  }

  pub fn warn(&self, message: &str, attrs: &[Attr]) {
    let _ = self.log(LogLevel::Warn, message, attrs);
  }

  pub fn error(&self, message: &str, attrs: &[Attr]) {
    let _ = self.log(LogLevel::Error, message, attrs);
  }

  /// Returns a logger whose records all carry `attrs`.
  pub fn with(&self, attrs: &[Attr]) -> Logger {
    Logger::new(Arc::clone(&self.handler).with_attrs(attrs))
  }

  /// Returns a logger that nests attributes under `name`.
  pub fn with_group(&self, name: &str) -> Logger {
    Logger::new(Arc::clone(&self.handler).with_group(name))
  }
}

impl fmt::Debug for Logger {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Logger").finish_non_exhaustive()
  }
}
