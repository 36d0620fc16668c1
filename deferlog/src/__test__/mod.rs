//! Shared helpers for handler tests, plus end-to-end scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::attr::Attr;
use crate::buffer_handler::BufferHandler;
use crate::handler::{Handler, HandlerError};
use crate::level::LogLevel;
use crate::record::Record;
use crate::writer_handler::{Format, WriterHandler};

/// Text sink without timestamps that keeps every level.
pub(crate) fn text_sink() -> Arc<WriterHandler<Vec<u8>>> {
  Arc::new(
    WriterHandler::memory(Format::Text)
      .without_time()
      .with_level(LogLevel::Trace),
  )
}

/// Attaches `real` and fails the test if any buffered record was rejected.
pub(crate) fn attach(handler: &BufferHandler, real: Arc<dyn Handler>) {
  if let Err(e) = handler.set_real_handler(real) {
    panic!("setting real handler: {}", e);
  }
}

pub(crate) fn expect_level(line: &str, level: LogLevel) {
  let expected = format!("level={}", level);
  assert!(
    line.contains(&expected),
    "expected level {}, line is {}",
    level,
    line
  );
}

fn maybe_quote(key: &str, value: &str) -> String {
  if value.chars().any(char::is_whitespace) {
    format!("{}={:?}", key, value)
  } else {
    format!("{}={}", key, value)
  }
}

pub(crate) fn expect_msg(line: &str, msg: &str) {
  let expected = maybe_quote("msg", msg);
  assert!(
    line.contains(&expected),
    "expected msg {}, line is {}",
    msg,
    line
  );
}

pub(crate) fn expect_attr(line: &str, key: &str, value: &str) {
  let expected = format!(" {}", maybe_quote(key, value));
  assert!(
    line.contains(&expected),
    "expected attribute {}, line is {}",
    expected.trim(),
    line
  );
}

pub(crate) fn expect_no_attr(line: &str, key: &str, value: &str) {
  let unexpected = format!(" {}", maybe_quote(key, value));
  assert!(
    !line.contains(&unexpected),
    "unexpected attribute {}, line is {}",
    unexpected.trim(),
    line
  );
}

/// Sink that rejects records whose message is in `reject` and counts the rest.
pub(crate) struct FailingHandler {
  reject: Vec<String>,
  accepted: Arc<AtomicUsize>,
}

impl FailingHandler {
  pub(crate) fn new(reject: &[&str]) -> Arc<Self> {
    Arc::new(Self {
      reject: reject.iter().map(|s| s.to_string()).collect(),
      accepted: Arc::new(AtomicUsize::new(0)),
    })
  }

  pub(crate) fn accepted(&self) -> usize {
    self.accepted.load(Ordering::SeqCst)
  }
}

impl Handler for FailingHandler {
  fn enabled(&self, _level: LogLevel) -> bool {
    true
  }

  fn handle(&self, record: &Record) -> Result<(), HandlerError> {
    if self.reject.contains(&record.message) {
      return Err(HandlerError::Other(format!("rejected {}", record.message)));
    }
    self.accepted.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  fn with_attrs(self: Arc<Self>, _attrs: &[Attr]) -> Arc<dyn Handler> {
    self
  }

  fn with_group(self: Arc<Self>, _name: &str) -> Arc<dyn Handler> {
    self
  }
}

#[cfg(test)]
mod scenarios {
  use super::*;
  use crate::logger::Logger;

  #[test]
  fn test_suppressed_debug_then_buffered_info() {
    let handler = BufferHandler::new(LogLevel::Info).into_shared();
    let log = Logger::new(handler.clone());

    log.debug("x", &[]);
    log.info("y", &[]);

    let real = text_sink();
    attach(&handler, real.clone());
    let lines = real.lines();

    assert_eq!(lines.len(), 1);
    expect_level(&lines[0], LogLevel::Info);
    expect_msg(&lines[0], "y");
  }

  #[test]
  fn test_bounded_keeps_newest_records() {
    let handler = BufferHandler::bounded(LogLevel::Debug, 3).into_shared();
    let log = Logger::new(handler.clone());

    for i in 0..5 {
      log.info("msg", &[Attr::new("no", i)]);
    }

    let real = text_sink();
    attach(&handler, real.clone());
    let lines = real.lines();

    assert_eq!(lines.len(), 3);
    for (i, line) in lines.iter().enumerate() {
      expect_level(line, LogLevel::Info);
      expect_msg(line, "msg");
      expect_attr(line, "no", &(i + 2).to_string());
    }
  }

  #[test]
  fn test_attrs_then_group_then_warn() {
    let handler = BufferHandler::new(LogLevel::Debug).into_shared();
    let log = Logger::new(handler.clone());

    log
      .with(&[Attr::new("common", "attr")])
      .with_group("g1")
      .warn("m", &[Attr::new("k", "v")]);

    let real = text_sink();
    attach(&handler, real.clone());
    let lines = real.lines();

    assert_eq!(lines.len(), 1);
    expect_msg(&lines[0], "m");
    expect_level(&lines[0], LogLevel::Warn);
    // Groups are opened before context attributes are added.
    expect_attr(&lines[0], "g1.common", "attr");
    expect_no_attr(&lines[0], "common", "attr");
    expect_attr(&lines[0], "g1.k", "v");
  }

  #[test]
  fn test_group_then_attrs_is_qualified() {
    let handler = BufferHandler::new(LogLevel::Debug).into_shared();
    let log = Logger::new(handler.clone());

    log
      .with_group("g1")
      .with(&[Attr::new("common", "attr")])
      .warn("m", &[]);

    let real = text_sink();
    attach(&handler, real.clone());
    let lines = real.lines();

    assert_eq!(lines.len(), 1);
    expect_attr(&lines[0], "g1.common", "attr");
  }
}
