
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::attr::Attr;
use crate::handler::{qualify, Handler, HandlerError};
use crate::level::LogLevel;
use crate::record::Record;

/// A real sink that hands records to another thread over a channel.
///
/// Each record is sent flattened: context attributes first, then the record's
/// own, with keys qualified by their groups (`g1.key`). Sending never blocks;
/// a full or disconnected channel is reported as an error for that record.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
  sender: Sender<Record>,
  level: LogLevel,
  groups: Vec<String>,
  /// Context attributes, keys already qualified
  attrs: Vec<Attr>,
}

impl ChannelHandler {
  pub fn new(sender: Sender<Record>) -> Self {
    Self {
      sender,
      level: LogLevel::Trace,
      groups: Vec::new(),
      attrs: Vec::new(),
    }
  }

  /// Creates a handler and the receiving end of a channel holding at most
  /// `capacity` records.
  pub fn bounded(capacity: usize) -> (Self, Receiver<Record>) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    (Self::new(sender), receiver)
  }

  pub fn unbounded() -> (Self, Receiver<Record>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (Self::new(sender), receiver)
  }

  /// Sets the minimum level (default `Trace`).
  pub fn with_level(mut self, level: LogLevel) -> Self {
    self.level = level;
    self
  }

  fn flatten(&self, record: &Record) -> Record {
    let mut flat = Record::new(record.time, record.level, record.message.clone());
    flat.attrs.extend(self.attrs.iter().cloned());
    flat.attrs.extend(
      record
        .attrs
        .iter()
        .map(|attr| Attr::new(qualify(&self.groups, &attr.key), attr.value.clone())),
    );
    flat
  }
}

impl Handler for ChannelHandler {
  fn enabled(&self, level: LogLevel) -> bool {
    level >= self.level
  }

  fn handle(&self, record: &Record) -> Result<(), HandlerError> {
    match self.sender.try_send(self.flatten(record)) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(_)) => Err(HandlerError::ChannelFull),
      Err(TrySendError::Disconnected(_)) => Err(HandlerError::Disconnected),
    }
  }

  fn with_attrs(self: Arc<Self>, attrs: &[Attr]) -> Arc<dyn Handler> {
    if attrs.is_empty() {
      return self;
    }
    let mut derived = (*self).clone();
    derived.attrs.extend(
      attrs
        .iter()
        .map(|attr| Attr::new(qualify(&self.groups, &attr.key), attr.value.clone())),
    );
    Arc::new(derived)
  }

  fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
    if name.is_empty() {
      return self;
    }
    let mut derived = (*self).clone();
    derived.groups.push(name.to_string());
    Arc::new(derived)
  }
}
