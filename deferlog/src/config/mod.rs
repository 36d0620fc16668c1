mod __test__;

use serde::{Deserialize, Serialize};

use crate::buffer_handler::BufferHandler;
use crate::level::LogLevel;

/// Settings for a root [`BufferHandler`].
///
/// ```rust
/// use deferlog::config::BufferConfig;
/// use deferlog::level::LogLevel;
///
/// let config = BufferConfig::from_json(r#"{"level": "DEBUG", "max_records": 512}"#).unwrap();
/// assert_eq!(config.level, LogLevel::Debug);
/// let handler = config.build();
/// assert_eq!(handler.buffered_len(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
  /// Minimum level kept while buffering
  pub level: LogLevel,
  /// Maximum buffered records; 0 keeps everything
  pub max_records: usize,
}

impl Default for BufferConfig {
  fn default() -> Self {
    Self {
      level: LogLevel::Info,
      max_records: 0,
    }
  }
}

impl BufferConfig {
  pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(json)
  }

  pub fn build(&self) -> BufferHandler {
    BufferHandler::bounded(self.level, self.max_records)
  }
}
