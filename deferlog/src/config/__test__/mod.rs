#[cfg(test)]
mod __test__ {
  use crate::config::BufferConfig;
  use crate::level::LogLevel;
  use crate::logger::Logger;

  #[test]
  fn test_default_config() {
    let config = BufferConfig::default();
    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.max_records, 0);
  }

  #[test]
  fn test_partial_json_uses_defaults() {
    let config = BufferConfig::from_json(r#"{"max_records": 3}"#).unwrap();
    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.max_records, 3);

    let config = BufferConfig::from_json("{}").unwrap();
    assert_eq!(config, BufferConfig::default());
  }

  #[test]
  fn test_invalid_level_is_rejected() {
    assert!(BufferConfig::from_json(r#"{"level": "LOUD"}"#).is_err());
  }

  #[test]
  fn test_build_applies_settings() {
    let config = BufferConfig {
      level: LogLevel::Warn,
      max_records: 2,
    };
    let handler = config.build().into_shared();
    let log = Logger::new(handler.clone());

    log.info("dropped", &[]);
    for _ in 0..5 {
      log.error("kept", &[]);
    }

    assert_eq!(handler.level(), LogLevel::Warn);
    assert_eq!(handler.buffered_len(), 2);
  }

  #[test]
  fn test_serializes_back() {
    let config = BufferConfig {
      level: LogLevel::Debug,
      max_records: 10,
    };
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(json, r#"{"level":"DEBUG","max_records":10}"#);
  }
}
