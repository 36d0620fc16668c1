
use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::io::{self, Stderr, Stdout, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::attr::{Attr, Value};
use crate::handler::{qualify, Handler, HandlerError};
use crate::level::LogLevel;
use crate::record::Record;

/// Line format written by [`WriterHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
  /// `time=… level=INFO msg="hello world" user=alice req.id=7`
  #[default]
  Text,
  /// One JSON object per line; groups become nested objects.
  Json,
}

/// Attribute added through `with_attrs`, with the groups open at that time.
#[derive(Debug, Clone)]
struct Preset {
  groups: Vec<String>,
  attr: Attr,
}

/// A real sink that formats records as lines and writes them to `W`.
///
/// Derived handlers share the writer, so lines from a whole handler tree
/// never interleave mid-line.
pub struct WriterHandler<W: Write + Send + 'static> {
  out: Arc<Mutex<W>>,
  format: Format,
  level: LogLevel,
  show_time: bool,
  groups: Vec<String>,
  presets: Vec<Preset>,
}

impl<W: Write + Send + 'static> Clone for WriterHandler<W> {
  fn clone(&self) -> Self {
    Self {
      out: Arc::clone(&self.out),
      format: self.format,
      level: self.level,
      show_time: self.show_time,
      groups: self.groups.clone(),
      presets: self.presets.clone(),
    }
  }
}

impl<W: Write + Send + 'static> WriterHandler<W> {
  pub fn new(writer: W, format: Format) -> Self {
    Self {
      out: Arc::new(Mutex::new(writer)),
      format,
      level: LogLevel::Info,
      show_time: true,
      groups: Vec::new(),
      presets: Vec::new(),
    }
  }

  /// Sets the minimum level (default `Info`).
  pub fn with_level(mut self, level: LogLevel) -> Self {
    self.level = level;
    self
  }

  /// Omits the timestamp, which keeps output stable for comparisons.
  pub fn without_time(mut self) -> Self {
    self.show_time = false;
    self
  }

  pub fn format(&self) -> Format {
    self.format
  }

  fn render_text(&self, record: &Record) -> String {
    let mut line = String::with_capacity(128);
    if self.show_time {
      let _ = write!(
        line,
        "time={} ",
        record.time.to_rfc3339_opts(SecondsFormat::Millis, true)
      );
    }
    let _ = write!(line, "level={} msg=", record.level);
    push_text_value(&mut line, &record.message);

    let presets = self.presets.iter().map(|p| (p.groups.as_slice(), &p.attr));
    let attrs = record.attrs.iter().map(|a| (self.groups.as_slice(), a));
    for (groups, attr) in presets.chain(attrs) {
      let _ = write!(line, " {}=", qualify(groups, &attr.key));
      push_text_value(&mut line, &attr.value.to_string());
    }
    line.push('\n');
    line
  }

  fn render_json(&self, record: &Record) -> Result<String, HandlerError> {
    let mut root = Map::new();
    if self.show_time {
      root.insert(
        "time".to_string(),
        JsonValue::String(record.time.to_rfc3339_opts(SecondsFormat::Millis, true)),
      );
    }
    root.insert(
      "level".to_string(),
      JsonValue::String(record.level.as_str().to_string()),
    );
    root.insert("msg".to_string(), JsonValue::String(record.message.clone()));

    for preset in &self.presets {
      insert_nested(&mut root, &preset.groups, &preset.attr);
    }
    for attr in &record.attrs {
      insert_nested(&mut root, &self.groups, attr);
    }

    let mut line = serde_json::to_string(&JsonValue::Object(root))?;
    line.push('\n');
    Ok(line)
  }
}

impl WriterHandler<Stdout> {
  pub fn stdout(format: Format) -> Self {
    Self::new(io::stdout(), format)
  }
}

impl WriterHandler<Stderr> {
  pub fn stderr(format: Format) -> Self {
    Self::new(io::stderr(), format)
  }
}

impl WriterHandler<File> {
  /// Opens `path` for appending, creating it and its parent directories.
  pub fn file(path: impl AsRef<Path>, format: Format) -> io::Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Self::new(file, format))
  }
}

impl WriterHandler<Vec<u8>> {
  /// In-memory sink.
  pub fn memory(format: Format) -> Self {
    Self::new(Vec::new(), format)
  }

  /// Everything written so far, lossily decoded as UTF-8.
  pub fn contents(&self) -> String {
    let out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&out).into_owned()
  }

  /// Non-empty lines written so far.
  pub fn lines(&self) -> Vec<String> {
    self
      .contents()
      .lines()
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect()
  }
}

impl<W: Write + Send + 'static> Handler for WriterHandler<W> {
  fn enabled(&self, level: LogLevel) -> bool {
    level >= self.level
  }

  fn handle(&self, record: &Record) -> Result<(), HandlerError> {
    let line = match self.format {
      Format::Text => self.render_text(record),
      Format::Json => self.render_json(record)?,
    };

    let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
    out.write_all(line.as_bytes())?;
    Ok(())
  }

  fn with_attrs(self: Arc<Self>, attrs: &[Attr]) -> Arc<dyn Handler> {
    if attrs.is_empty() {
      return self;
    }
    let mut derived = (*self).clone();
    derived.presets.extend(attrs.iter().map(|attr| Preset {
      groups: self.groups.clone(),
      attr: attr.clone(),
    }));
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

fn needs_quoting(s: &str) -> bool {
  s.is_empty()
    || s
      .chars()
      .any(|c| c.is_whitespace() || c.is_control() || c == '=' || c == '"')
}

fn push_text_value(line: &mut String, value: &str) {
  if needs_quoting(value) {
    let _ = write!(line, "{:?}", value);
  } else {
    line.push_str(value);
  }
}

fn json_value(value: &Value) -> JsonValue {
  match value {
    Value::Bool(b) => JsonValue::Bool(*b),
    Value::Int(i) => JsonValue::from(*i),
    Value::Uint(u) => JsonValue::from(*u),
    Value::Float(f) => serde_json::Number::from_f64(*f)
      .map(JsonValue::Number)
      .unwrap_or(JsonValue::Null),
    Value::String(s) => JsonValue::String(s.clone()),
  }
}

/// First key of the form `key#1`, `key#2`, ... not present in `map`.
fn free_key(map: &Map<String, JsonValue>, key: &str) -> String {
  (1..)
    .map(|n| format!("{}#{}", key, n))
    .find(|candidate| !map.contains_key(candidate))
    .unwrap_or_else(|| key.to_string())
}

/// Inserts `attr` under the object path named by `groups`.
///
/// A group and an attribute never replace each other: when a group name
/// matches an attribute key at the same level, the attribute moves to
/// `key#1` (or the next free suffix) and the group keeps the plain name.
/// Two attributes with the same key keep the last value.
fn insert_nested(root: &mut Map<String, JsonValue>, groups: &[String], attr: &Attr) {
  let mut map = root;
  for group in groups {
    if map.get(group).is_some_and(|existing| !existing.is_object()) {
      if let Some(displaced) = map.remove(group) {
        let key = free_key(map, group);
        map.insert(key, displaced);
      }
    }
    let entry = map
      .entry(group.clone())
      .or_insert_with(|| JsonValue::Object(Map::new()));
    map = match entry {
      JsonValue::Object(inner) => inner,
      _ => return,
    };
  }

  let key = if map.get(&attr.key).is_some_and(JsonValue::is_object) {
    free_key(map, &attr.key)
  } else {
    attr.key.clone()
  };
  map.insert(key, json_value(&attr.value));
}
