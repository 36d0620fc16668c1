#[cfg(test)]
mod __test__ {

  use crate::level::{LogLevel, ParseLevelError};

  #[test]
  fn test_level_ordering() {
    assert!(LogLevel::Trace < LogLevel::Debug);
    assert!(LogLevel::Debug < LogLevel::Info);
    assert!(LogLevel::Info < LogLevel::Warn);
    assert!(LogLevel::Warn < LogLevel::Error);
  }

  #[test]
  fn test_level_default_is_info() {
    assert_eq!(LogLevel::default(), LogLevel::Info);
  }

  #[test]
  fn test_level_display() {
    assert_eq!(LogLevel::Info.to_string(), "INFO");
    assert_eq!(LogLevel::Warn.as_str(), "WARN");
  }

  #[test]
  fn test_level_parse() {
    assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
    assert_eq!(" ERROR ".parse::<LogLevel>(), Ok(LogLevel::Error));
    assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
    assert_eq!(
      "loud".parse::<LogLevel>(),
      Err(ParseLevelError("loud".to_string()))
    );
  }

  #[test]
  fn test_level_serde() {
    let json = serde_json::to_string(&LogLevel::Warn).unwrap();
    assert_eq!(json, "\"WARN\"");

    let level: LogLevel = serde_json::from_str("\"TRACE\"").unwrap();
    assert_eq!(level, LogLevel::Trace);
  }

  #[test]
  fn test_from_tracing_level() {
    assert_eq!(LogLevel::from(tracing::Level::INFO), LogLevel::Info);
    assert_eq!(LogLevel::from(&tracing::Level::ERROR), LogLevel::Error);
  }
}
