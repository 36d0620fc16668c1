//! # Buffer Handler
//!
//! A [`Handler`] that keeps records in memory until the real sink is known,
//! then replays them in their original order and becomes a pass-through.
//!
//! Typical uses:
//! - the real sink's configuration is only known later (CLI flags, config files)
//! - the sink is remote and not ready to accept records yet
//! - records should only be emitted when some condition is met, e.g. a panic
//!
//! ## Handler trees
//!
//! Every handler derived from a root through [`Handler::with_attrs`] or
//! [`Handler::with_group`] shares the root's buffer and real-sink slot. Each
//! derived handler owns its context: the group names and the attributes added
//! on the way from the root. A buffered record captures that context, and the
//! replay rebuilds the same scope on the real sink, groups first, then
//! attributes.
//!
//! Handlers derived after a real sink was attached skip the tree entirely and
//! forward straight to a scoped view of that sink.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use deferlog::attr::Attr;
//! use deferlog::buffer_handler::BufferHandler;
//! use deferlog::level::LogLevel;
//! use deferlog::logger::Logger;
//! use deferlog::writer_handler::{Format, WriterHandler};
//!
//! let buffered = BufferHandler::bounded(LogLevel::Info, 256).into_shared();
//! let log = Logger::new(buffered.clone());
//!
//! log.info("starting", &[Attr::new("port", 8080)]);
//! log.debug("dropped, below threshold", &[]);
//!
//! // Later, once configuration is loaded:
//! let real = Arc::new(WriterHandler::stderr(Format::Text));
//! buffered.set_real_handler(real).expect("replay buffered records");
//!
//! log.info("forwarded directly", &[]);
//! ```


use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::attr::Attr;
use crate::buffer::RingBuffer;
use crate::handler::{Handler, HandlerError};
use crate::level::LogLevel;
use crate::record::Record;

/// Immutable context of a handler: the group names and attributes added on
/// the way from the tree root to it.
///
/// Deriving copies a sequence into a new `Arc`, so a context captured by a
/// buffered record never changes afterwards.
#[derive(Debug, Clone, Default)]
struct Context {
  /// Outer to inner
  groups: Arc<Vec<String>>,
  attrs: Arc<Vec<Attr>>,
}

impl Context {
  fn with_attrs(&self, attrs: &[Attr]) -> Self {
    let mut extended = Vec::clone(&self.attrs);
    extended.extend_from_slice(attrs);
    Self {
      groups: Arc::clone(&self.groups),
      attrs: Arc::new(extended),
    }
  }

  fn with_group(&self, name: &str) -> Self {
    let mut groups = Vec::clone(&self.groups);
    groups.push(name.to_string());
    Self {
      groups: Arc::new(groups),
      attrs: Arc::clone(&self.attrs),
    }
  }

  /// Derives the view of `sink` that this context describes.
  ///
  /// Every group is opened before any attribute is added, so all of this
  /// context's attributes end up under its innermost group.
  fn scope(&self, sink: &Arc<dyn Handler>) -> Arc<dyn Handler> {
    let grouped = self
      .groups
      .iter()
      .fold(Arc::clone(sink), |scoped, name| scoped.with_group(name));
    if self.attrs.is_empty() {
      grouped
    } else {
      grouped.with_attrs(&self.attrs)
    }
  }
}

/// A record waiting for the real sink, with the context it was logged under.
#[derive(Debug, Clone)]
struct BufferedRecord {
  record: Record,
  context: Context,
}

/// State shared by every node of one handler tree.
struct TreeState {
  level: LogLevel,
  buffer: RingBuffer<BufferedRecord>,
  /// The buffering path of `handle` holds the read side across its check
  /// and `add`. The final replay pass holds the write side until the sink is
  /// published, so no record is added after it.
  real: RwLock<Option<Arc<dyn Handler>>>,
}

thread_local! {
  /// Address of the tree whose final replay pass runs on this thread.
  static FINAL_PASS: Cell<usize> = const { Cell::new(0) };
}

impl TreeState {
  fn addr(&self) -> usize {
    self as *const Self as usize
  }

  /// True on the thread replaying this tree under the write lock. A sink
  /// that logs back into the tree from there must not touch the lock.
  fn in_final_pass(&self) -> bool {
    FINAL_PASS.with(|tree| tree.get() == self.addr())
  }

  fn real_sink(&self) -> Option<Arc<dyn Handler>> {
    if self.in_final_pass() {
      return None;
    }
    self
      .real
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

/// Marks the current thread as running a tree's final replay pass.
struct FinalPass {
  previous: usize,
}

impl FinalPass {
  fn enter(tree: &TreeState) -> Self {
    let previous = FINAL_PASS.with(|current| current.replace(tree.addr()));
    Self { previous }
  }
}

impl Drop for FinalPass {
  fn drop(&mut self) {
    FINAL_PASS.with(|current| current.set(self.previous));
  }
}

/// Running totals of one attach.
#[derive(Default)]
struct Replay {
  replayed: usize,
  failures: Vec<ReplayFailure>,
}

impl Replay {
  fn run(&mut self, batch: Vec<BufferedRecord>, real: &Arc<dyn Handler>) {
    for buffered in batch {
      let scoped = buffered.context.scope(real);
      if let Err(error) = scoped.handle(&buffered.record) {
        self.failures.push(ReplayFailure {
          index: self.replayed,
          error,
        });
      }
      self.replayed += 1;
    }
  }
}

/// A [`Handler`] that buffers records until [`BufferHandler::set_real_handler`]
/// provides the real sink.
///
/// Handlers derived from it while the tree buffers are `BufferHandler`s
/// sharing the tree. Handlers derived after the real sink is attached are the
/// real sink's own scoped handlers, with no link back to the tree.
///
/// A buffering handler scopes the real sink by opening all of its groups and
/// then adding all of its attributes. For `h.with_attrs(a).with_group("g")`,
/// `a` is therefore written as `g.*`. Handlers derived after attachment
/// follow the real sink's own rules instead, so only group-then-attribute
/// chains print identically on both sides of the attach.
pub struct BufferHandler {
  tree: Arc<TreeState>,
  context: Context,
}

/// One record that the real sink rejected during replay.
#[derive(Debug, thiserror::Error)]
#[error("record #{index}: {error}")]
pub struct ReplayFailure {
  /// Position of the record in the replay, oldest first
  pub index: usize,
  #[source]
  pub error: HandlerError,
}

/// Aggregate of every replay failure of one [`BufferHandler::set_real_handler`] call.
///
/// The real sink is attached even when this is returned.
#[derive(Debug, thiserror::Error)]
#[error("{failed} of {replayed} buffered records failed to replay", failed = .failures.len())]
pub struct FlushError {
  replayed: usize,
  failures: Vec<ReplayFailure>,
}

impl FlushError {
  /// Number of records handed to the real sink, failed ones included.
  pub fn replayed(&self) -> usize {
    self.replayed
  }

  pub fn failures(&self) -> &[ReplayFailure] {
    &self.failures
  }

  pub fn into_failures(self) -> Vec<ReplayFailure> {
    self.failures
  }
}

impl BufferHandler {
  /// Creates a root handler with an unbound buffer.
  ///
  /// Records below `level` are dropped until a real sink is attached; after
  /// that, the real sink's own level check applies.
  pub fn new(level: LogLevel) -> Self {
    Self::bounded(level, 0)
  }

  /// Creates a root handler that buffers at most `max_records` records,
  /// dropping the oldest first. Zero means unbound.
  pub fn bounded(level: LogLevel, max_records: usize) -> Self {
    Self {
      tree: Arc::new(TreeState {
        level,
        buffer: RingBuffer::new(max_records),
        real: RwLock::new(None),
      }),
      context: Context::default(),
    }
  }

  pub fn into_shared(self) -> Arc<Self> {
    Arc::new(self)
  }

  /// Minimum level kept while buffering.
  pub fn level(&self) -> LogLevel {
    self.tree.level
  }

  /// Reports whether a real sink is attached to this handler's tree.
  pub fn is_forwarding(&self) -> bool {
    self.tree.real_sink().is_some()
  }

  /// Number of records waiting in the shared buffer.
  pub fn buffered_len(&self) -> usize {
    self.tree.buffer.len()
  }

  /// Removes all buffered records of the whole tree.
  pub fn discard(&self) {
    self.tree.buffer.clear();
  }

  /// Builds a child handler.
  ///
  /// While the tree buffers, the child joins it with `extend`ed context. Once
  /// a real sink is attached, the child is the scoped real sink derived
  /// further by `scoped`.
  fn derive<S, E>(&self, scoped: S, extend: E) -> Arc<dyn Handler>
  where
    S: FnOnce(Arc<dyn Handler>) -> Arc<dyn Handler>,
    E: FnOnce(&Context) -> Context,
  {
    match self.tree.real_sink() {
      Some(real) => scoped(self.context.scope(&real)),
      None => Arc::new(BufferHandler {
        tree: Arc::clone(&self.tree),
        context: extend(&self.context),
      }),
    }
  }

  /// Attaches the real sink.
  ///
  /// Every buffered record is replayed in insertion order, each through a view
  /// of `real` scoped to the context it was logged under. Failures do not stop
  /// the replay; they are collected and returned together afterwards. The
  /// buffer ends up empty and `real` is published for the whole tree either
  /// way, so from then on handlers of this tree forward directly.
  ///
  /// The first pass runs without blocking producers. Records they add
  /// meanwhile are replayed in a second pass, during which `handle` calls
  /// from other threads wait for publication. Attaching therefore finishes
  /// even while producers keep logging, and no record is lost or reordered.
  pub fn set_real_handler(&self, real: Arc<dyn Handler>) -> Result<(), FlushError> {
    let tree = &self.tree;
    let mut replay = Replay::default();
    replay.run(tree.buffer.take_all(), &real);

    {
      let mut slot = tree.real.write().unwrap_or_else(PoisonError::into_inner);
      let _pass = FinalPass::enter(tree);
      // Only records logged by `real` itself can arrive now.
      loop {
        let batch = tree.buffer.take_all();
        if batch.is_empty() {
          break;
        }
        replay.run(batch, &real);
      }
      *slot = Some(Arc::clone(&real));
    }

    let Replay { replayed, failures } = replay;
    tracing::debug!(
      replayed,
      failed = failures.len(),
      "real handler attached"
    );

    if failures.is_empty() {
      return Ok(());
    }
    tracing::warn!(
      replayed,
      failed = failures.len(),
      first_error = %failures[0].error,
      "some buffered records failed to replay"
    );
    Err(FlushError { replayed, failures })
  }

  /// Stores `record` unless it is below the tree's level.
  fn keep(&self, record: &Record) {
    if record.level >= self.tree.level {
      self.tree.buffer.add(BufferedRecord {
        record: record.clone(),
        context: self.context.clone(),
      });
    }
  }
}

impl Handler for BufferHandler {
  fn enabled(&self, level: LogLevel) -> bool {
    match self.tree.real_sink() {
      Some(real) => real.enabled(level),
      None => level >= self.tree.level,
    }
  }

  fn handle(&self, record: &Record) -> Result<(), HandlerError> {
    if self.tree.in_final_pass() {
      self.keep(record);
      return Ok(());
    }

    let slot = self.tree.real.read().unwrap_or_else(PoisonError::into_inner);
    if let Some(real) = slot.as_ref() {
      let real = Arc::clone(real);
      drop(slot);
      return self.context.scope(&real).handle(record);
    }

    self.keep(record);
    Ok(())
  }

  fn with_attrs(self: Arc<Self>, attrs: &[Attr]) -> Arc<dyn Handler> {
    if attrs.is_empty() {
      return self;
    }
    self.derive(
      |sink| sink.with_attrs(attrs),
      |context| context.with_attrs(attrs),
    )
  }

  fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
    if name.is_empty() {
      return self;
    }
    self.derive(
      |sink| sink.with_group(name),
      |context| context.with_group(name),
    )
  }
}

impl fmt::Debug for BufferHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BufferHandler")
      .field("level", &self.tree.level)
      .field("buffered", &self.tree.buffer.len())
      .field("capacity", &self.tree.buffer.capacity())
      .field("forwarding", &self.is_forwarding())
      .field("groups", &self.context.groups)
      .field("attrs", &self.context.attrs.len())
      .finish()
  }
}
