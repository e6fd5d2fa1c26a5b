//! Elastic bulk API formatter.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::formatter::{Fields, Formatter};
use crate::level::Level;

/// Date suffix appended to the index name, one index per day.
const INDEX_DATE_FORMAT: &str = "%Y.%m.%d";

/// Formats each record as one bulk `index` action plus its document.
///
/// The output of consecutive records can be concatenated and posted to
/// the `_bulk` endpoint as is:
///
/// ```text
/// {"index":{"_id":"…","_index":"logs-2024.03.09","_type":"log"}}
/// {"@timestamp":"2024-03-09T12:30:00Z","level":"info","message":"…"}
/// ```
#[derive(Debug, Clone)]
pub struct ElasticBulkFormatter {
    /// Index name prefix; the record date is appended.
    pub index: String,
    /// Document type. Left out of the action when empty.
    pub doc_type: String,
    fields: Fields,
}

impl ElasticBulkFormatter {
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            fields: Fields::new(),
        }
    }

    /// Returns a formatter adding `fields` to every document.
    pub fn with_fields(&self, fields: Fields) -> Self {
        let mut f = self.clone();
        f.fields.extend(fields);
        f
    }

    /// Formats a record stamped with `now` and identified by `id`.
    pub fn format_with(
        &self,
        buf: &mut Vec<u8>,
        now: DateTime<Utc>,
        id: Uuid,
        level: Level,
        message: &str,
        fields: &Fields,
    ) {
        let mut action = json!({
            "_index": format!("{}{}", self.index, now.format(INDEX_DATE_FORMAT)),
            "_id": id.to_string(),
        });
        if !self.doc_type.is_empty() {
            action["_type"] = Value::String(self.doc_type.clone());
        }

        let mut doc = self.fields.clone();
        doc.extend(fields.clone());
        doc.insert(
            "@timestamp".into(),
            Value::String(now.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );
        doc.insert("level".into(), Value::String(level.as_str().into()));
        doc.insert("message".into(), Value::String(message.into()));

        let mut record = Vec::with_capacity(256);
        let encoded = serde_json::to_writer(&mut record, &json!({ "index": action }))
            .and_then(|_| {
                record.push(b'\n');
                serde_json::to_writer(&mut record, &doc)
            });
        if encoded.is_ok() {
            buf.extend_from_slice(&record);
            buf.push(b'\n');
        }
    }
}

impl Formatter for ElasticBulkFormatter {
    fn format(&self, buf: &mut Vec<u8>, level: Level, message: &str, fields: &Fields) {
        self.format_with(buf, Utc::now(), Uuid::new_v4(), level, message, fields);
    }
}
