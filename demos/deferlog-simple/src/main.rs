use std::sync::Arc;
use std::{env, thread, time::Duration};

use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, Registry};

use deferlog::{
  config::BufferConfig,
  panic_hook::PanicHook,
  trace_layer::HandlerLayer,
  writer_handler::{Format, WriterHandler},
  Attr, Logger,
};

fn main() {
  // Records are held in memory until we know where output should go.
  let config = BufferConfig {
    max_records: 1_000,
    ..BufferConfig::default()
  };
  let buffered = config.build().into_shared();

  // A crash before the sink is chosen still prints what was buffered.
  PanicHook::install(
    buffered.clone(),
    Arc::new(WriterHandler::stderr(Format::Text)),
  );

  // `tracing` macros and the `Logger` API feed the same buffer.
  let subscriber = Registry::default().with(HandlerLayer::new(buffered.clone()));
  if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
    eprintln!("installing subscriber: {}", e);
  }

  let log = Logger::new(buffered.clone()).with(&[Attr::new("app", "deferlog-simple")]);
  log.info("starting", &[Attr::new("pid", std::process::id())]);
  debug!("dropped while buffering at INFO");

  let format = parse_format();
  info!(format = ?format, "output format chosen");
  simulate_startup(&log);

  println!("{} records buffered, attaching stdout", buffered.buffered_len());

  let real = Arc::new(WriterHandler::stdout(format).with_level(config.level));
  if let Err(e) = buffered.set_real_handler(real) {
    eprintln!("replaying buffered records: {}", e);
  }

  // From here on everything goes straight to stdout.
  simulate_concurrent_work(&log);
  info!("finished");
}

fn parse_format() -> Format {
  match env::args().nth(1).as_deref() {
    Some("--json") => Format::Json,
    _ => Format::Text,
  }
}

fn simulate_startup(log: &Logger) {
  let db = log.with_group("db");
  for attempt in 1..=3 {
    if attempt < 3 {
      db.warn("connection refused", &[Attr::new("attempt", attempt)]);
    } else {
      db.info("connected", &[Attr::new("attempt", attempt)]);
    }
    thread::sleep(Duration::from_millis(10));
  }
}

fn simulate_concurrent_work(log: &Logger) {
  let handles: Vec<_> = (0..3)
    .map(|worker_id| {
      let log = log.with_group("worker").with(&[Attr::new("id", worker_id)]);
      thread::spawn(move || {
        for task in 0..5 {
          log.info("task done", &[Attr::new("task", task)]);
          if task == 4 {
            warn!(worker_id, "worker idle");
          }
          thread::sleep(Duration::from_millis(5));
        }
      })
    })
    .collect();

  for handle in handles {
    let _ = handle.join();
  }
}
