pub mod attr;
pub mod buffer;
pub mod buffer_handler;
pub mod channel_handler;
pub mod config;
pub mod handler;
pub mod level;
pub mod logger;
pub mod panic_hook;
pub mod record;
pub mod trace_layer;
pub mod writer_handler;
#[cfg(test)]
mod __test__;

pub use attr::{Attr, Value};
pub use buffer_handler::{BufferHandler, FlushError};
pub use handler::{Handler, HandlerError};
pub use level::LogLevel;
pub use logger::Logger;
pub use record::Record;
