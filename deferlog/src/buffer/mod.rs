
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Preallocation for unbound buffers, so small buffers never reallocate.
const UNBOUND_INITIAL_CAPACITY: usize = 16;

/// A ring buffer that stores items in insertion order.
///
/// A bound buffer holds at most `capacity` items: once full, adding a new item
/// overwrites the oldest one. An unbound buffer grows without limit.
///
/// All operations go through one internal mutex, so a buffer can be shared
/// between threads behind an `Arc`. Iteration works on a snapshot copied
/// under the lock, never on the live storage.
///
/// # Type Parameters
/// * `T` - The type of the items stored in the buffer.
#[derive(Debug)]
pub struct RingBuffer<T> {
  inner: Mutex<Inner<T>>,
}

#[derive(Debug)]
struct Inner<T> {
  /// Live items. When bound and full, `store[start]` is the oldest.
  store: Vec<T>,
  /// Maximum number of items, `None` when unbound
  capacity: Option<usize>,
  /// Index of the oldest item; always 0 until a bound buffer wraps
  start: usize,
}

impl<T> Inner<T> {
  fn fresh_store(capacity: Option<usize>) -> Vec<T> {
    Vec::with_capacity(capacity.unwrap_or(UNBOUND_INITIAL_CAPACITY))
  }

  /// Moves every live item out in oldest-to-newest order.
  fn take_ordered(&mut self) -> Vec<T> {
    let fresh = Self::fresh_store(self.capacity);
    let mut items = std::mem::replace(&mut self.store, fresh);
    items.rotate_left(self.start);
    self.start = 0;
    items
  }
}

impl<T> RingBuffer<T> {
  /// Creates a new empty ring buffer.
  ///
  /// # Arguments
  /// * `max_elements` - Maximum number of items to keep. Zero makes the
  ///   buffer unbound.
  ///
  /// # Example
  /// ```rust
  /// use deferlog::buffer::RingBuffer;
  ///
  /// let bound: RingBuffer<i32> = RingBuffer::new(10);
  /// assert_eq!(bound.capacity(), Some(10));
  ///
  /// let unbound: RingBuffer<i32> = RingBuffer::new(0);
  /// assert_eq!(unbound.capacity(), None);
  /// ```
  pub fn new(max_elements: usize) -> Self {
    let capacity = (max_elements > 0).then_some(max_elements);
    Self {
      inner: Mutex::new(Inner {
        store: Inner::fresh_store(capacity),
        capacity,
        start: 0,
      }),
    }
  }

  /// Creates a buffer with no upper limit on the number of items.
  pub fn unbound() -> Self {
    Self::new(0)
  }

  fn lock(&self) -> MutexGuard<'_, Inner<T>> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Adds a new item to the buffer.
  ///
  /// If the buffer is bound and already full, the oldest item is overwritten.
  ///
  /// # Example
  /// ```rust
  /// use deferlog::buffer::RingBuffer;
  ///
  /// let buffer = RingBuffer::new(2);
  /// buffer.add(1);
  /// buffer.add(2);
  /// buffer.add(3); // overwrites 1
  /// assert_eq!(buffer.values().collect::<Vec<_>>(), vec![2, 3]);
  /// ```
  pub fn add(&self, item: T) {
    let mut inner = self.lock();
    match inner.capacity {
      Some(cap) if inner.store.len() == cap => {
        let start = inner.start;
        inner.store[start] = item;
        inner.start = (start + 1) % cap;
      },
      _ => inner.store.push(item),
    }
  }

  /// Removes and returns all items, oldest first.
  ///
  /// Snapshot and clear happen under one lock acquisition, so every item is
  /// either returned here or was added after this call.
  pub fn take_all(&self) -> Vec<T> {
    self.lock().take_ordered()
  }

  /// Removes all items. Capacity is preserved.
  pub fn clear(&self) {
    let mut inner = self.lock();
    inner.store.clear();
    inner.start = 0;
  }

  /// Returns the number of items currently in the buffer.
  pub fn len(&self) -> usize {
    self.lock().store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().store.is_empty()
  }

  /// Returns `true` when a bound buffer holds `capacity` items.
  /// An unbound buffer is never full.
  pub fn is_full(&self) -> bool {
    let inner = self.lock();
    inner.capacity == Some(inner.store.len())
  }

  /// Maximum number of items, or `None` for an unbound buffer.
  pub fn capacity(&self) -> Option<usize> {
    self.lock().capacity
  }
}

impl<T: Clone> RingBuffer<T> {
  /// Copies the live items, oldest first, while holding the lock.
  pub fn snapshot(&self) -> Vec<T> {
    let inner = self.lock();
    let (newer, older) = inner.store.split_at(inner.start);
    let mut items = Vec::with_capacity(inner.store.len());
    items.extend_from_slice(older);
    items.extend_from_slice(newer);
    items
  }

  /// Iterates `(index, item)` pairs, oldest first.
  ///
  /// The iterator walks a snapshot taken at call time, so later mutation of
  /// the buffer does not affect it. Clone the iterator to walk it again.
  pub fn all(&self) -> impl Iterator<Item = (usize, T)> + Clone {
    self.snapshot().into_iter().enumerate()
  }

  /// Iterates items, oldest first. See [`RingBuffer::all`].
  pub fn values(&self) -> impl Iterator<Item = T> + Clone {
    self.snapshot().into_iter()
  }

  /// Calls `f` on every item in insertion order.
  pub fn for_each<F>(&self, f: F)
  where
    F: FnMut(T),
  {
    self.values().for_each(f);
  }

  /// Calls `f` on every item in insertion order, stopping at the first error.
  ///
  /// The lock is not held while `f` runs, so `f` may use the buffer itself.
  pub fn try_for_each<E, F>(&self, f: F) -> Result<(), E>
  where
    F: FnMut(T) -> Result<(), E>,
  {
    self.values().try_for_each(f)
  }
}

impl<T> Default for RingBuffer<T> {
  fn default() -> Self {
    Self::unbound()
  }
}
