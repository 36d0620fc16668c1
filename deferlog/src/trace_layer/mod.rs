
use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event as TracingEvent, Metadata, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

use crate::attr::{Attr, Value};
use crate::handler::Handler;
use crate::level::LogLevel;
use crate::record::Record;

/// A `tracing` layer that turns events into [`Record`]s for a [`Handler`].
///
/// Installing it in front of a [`crate::buffer_handler::BufferHandler`] lets
/// the usual `tracing::info!` macros be buffered until the real sink is ready.
#[derive(Clone)]
pub struct HandlerLayer {
  handler: Arc<dyn Handler>,
}

impl HandlerLayer {
  pub fn new(handler: Arc<dyn Handler>) -> Self {
    Self { handler }
  }
}

impl fmt::Debug for HandlerLayer {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandlerLayer").finish_non_exhaustive()
  }
}

impl<S> Layer<S> for HandlerLayer
where
  S: Subscriber + for<'a> LookupSpan<'a>,
{
  // The handler's level can change once a real sink is attached, so the
  // answer is never cached per callsite.
  fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
    Interest::sometimes()
  }

  fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
    self.handler.enabled(LogLevel::from(metadata.level()))
  }

  fn on_event(&self, event: &TracingEvent<'_>, _ctx: Context<'_, S>) {
    let level = LogLevel::from(event.metadata().level());

    let mut visitor = RecordVisitor::default();
    event.record(&mut visitor);

    let record = Record::now(level, visitor.message.unwrap_or_default()).with_attrs(visitor.attrs);

    // A layer has no way to report failures to the caller of `info!`.
    let _ = self.handler.handle(&record);
  }
}

/// Collects the `message` field and every other field as an attribute.
#[derive(Default)]
struct RecordVisitor {
  message: Option<String>,
  attrs: Vec<Attr>,
}

impl RecordVisitor {
  fn push(&mut self, field: &Field, value: Value) {
    if field.name() == "message" {
      self.message = Some(value.to_string());
    } else {
      self.attrs.push(Attr::new(field.name(), value));
    }
  }
}

impl Visit for RecordVisitor {
  fn record_i64(&mut self, field: &Field, value: i64) {
    self.push(field, Value::Int(value));
  }

  fn record_u64(&mut self, field: &Field, value: u64) {
    self.push(field, Value::Uint(value));
  }

  fn record_f64(&mut self, field: &Field, value: f64) {
    self.push(field, Value::Float(value));
  }

  fn record_bool(&mut self, field: &Field, value: bool) {
    self.push(field, Value::Bool(value));
  }

  fn record_str(&mut self, field: &Field, value: &str) {
    self.push(field, Value::String(value.to_string()));
  }

  fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
    self.push(field, Value::String(format!("{:?}", value)));
  }
}
