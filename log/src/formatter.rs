//! Record formatters.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::level::Level;

/// Structured fields attached to a record.
pub type Fields = serde_json::Map<String, Value>;

/// Serializes any struct or map into [`Fields`].
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Err(Error::NotAnObject("null")),
        Value::Bool(_) => Err(Error::NotAnObject("bool")),
        Value::Number(_) => Err(Error::NotAnObject("number")),
        Value::String(_) => Err(Error::NotAnObject("string")),
        Value::Array(_) => Err(Error::NotAnObject("array")),
    }
}

/// Turns one log call into one self-contained record.
///
/// A record is appended to `buf` and must end with a newline, so records
/// can be concatenated into a single buffered block.
pub trait Formatter: Send + Sync {
    fn format(&self, buf: &mut Vec<u8>, level: Level, message: &str, fields: &Fields);
}

const RED: &str = "\x1b[31;1m";
const YELLOW: &str = "\x1b[33;1m";
const BLUE: &str = "\x1b[34;1m";
const WHITE: &str = "\x1b[37;1m";
const CYAN: &str = "\x1b[36;1m";
const RESET: &str = "\x1b[0m";

/// Human readable line: `LEVEL message key=value ...`.
///
/// With color enabled the level name is wrapped in ANSI escapes; fatal
/// records are red as a whole.
#[derive(Debug, Clone, Copy)]
pub struct TextFormatter {
    pub color: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self { color: true }
    }
}

impl TextFormatter {
    /// A formatter without ANSI colors, for files and pipes.
    pub fn plain() -> Self {
        Self { color: false }
    }

    fn color_of(level: Level) -> &'static str {
        match level {
            Level::Fatal | Level::Error => RED,
            Level::Warning => YELLOW,
            Level::Info => BLUE,
            Level::Debug => WHITE,
            Level::Verbose => CYAN,
        }
    }
}

impl Formatter for TextFormatter {
    fn format(&self, buf: &mut Vec<u8>, level: Level, message: &str, fields: &Fields) {
        let name = level.as_str().to_ascii_uppercase();
        if self.color {
            buf.extend_from_slice(Self::color_of(level).as_bytes());
            buf.extend_from_slice(name.as_bytes());
            if level != Level::Fatal {
                buf.extend_from_slice(RESET.as_bytes());
            }
        } else {
            buf.extend_from_slice(name.as_bytes());
        }
        buf.push(b' ');
        buf.extend_from_slice(message.as_bytes());
        for (key, value) in fields {
            buf.push(b' ');
            buf.extend_from_slice(key.as_bytes());
            buf.push(b'=');
            match value {
                Value::String(s) => buf.extend_from_slice(s.as_bytes()),
                other => buf.extend_from_slice(other.to_string().as_bytes()),
            }
        }
        if self.color && level == Level::Fatal {
            buf.extend_from_slice(RESET.as_bytes());
        }
        buf.push(b'\n');
    }
}

/// One JSON object per line with `time`, `level`, `message` and the fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Formats a record stamped with `now`.
    pub fn format_at(
        &self,
        buf: &mut Vec<u8>,
        now: DateTime<Utc>,
        level: Level,
        message: &str,
        fields: &Fields,
    ) {
        let mut record = fields.clone();
        record.insert(
            "time".into(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert("level".into(), Value::String(level.as_str().into()));
        record.insert("message".into(), Value::String(message.into()));
        if serde_json::to_writer(&mut *buf, &record).is_ok() {
            buf.push(b'\n');
        }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, buf: &mut Vec<u8>, level: Level, message: &str, fields: &Fields) {
        self.format_at(buf, Utc::now(), level, message, fields);
    }
}
