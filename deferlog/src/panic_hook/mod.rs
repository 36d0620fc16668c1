
use std::panic;
use std::sync::Arc;

use crate::buffer_handler::BufferHandler;
use crate::handler::Handler;

pub struct PanicHook {}

impl PanicHook {
  /// Installs a panic hook that flushes `handler` to `fallback`.
  ///
  /// If no real sink was attached by the time a panic happens, buffered
  /// records are replayed to `fallback`, which then stays attached. The
  /// previously installed hook runs afterwards.
  pub fn install(handler: Arc<BufferHandler>, fallback: Arc<dyn Handler>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
      if !handler.is_forwarding() {
        let pending = handler.buffered_len();
        if let Err(e) = handler.set_real_handler(Arc::clone(&fallback)) {
          eprintln!("[Panic] flushing {} buffered records: {}", pending, e);
        }
      }
      previous(info);
    }));
  }
}
