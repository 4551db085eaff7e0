//! Rendering of log records into the bytes written to the console and file sinks.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};

use crate::{
    config::WritePolicy,
    entry::{ErrorEntry, LogEntry, Record, RequestEntry},
    LoggerError,
};

/// Separator appended after each JSON record in the log file.
const FILE_JSON_SEPARATOR: &[u8] = b",\n";

/// Renders records either as JSON or as plain text lines, according to a [`WritePolicy`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct EntryFormatter {
    json: bool,
    beautify_json: bool,
}

impl From<&WritePolicy> for EntryFormatter {
    fn from(policy: &WritePolicy) -> Self {
        Self {
            json: policy.json,
            beautify_json: policy.beautify_json,
        }
    }
}

impl EntryFormatter {
    /// Bytes written to the console for a record, terminated by a newline.
    pub(crate) fn console(&self, record: Record<'_>) -> Result<Vec<u8>, LoggerError> {
        let mut buffer = if self.json {
            self.json_bytes(record)?
        } else {
            plain_text(record).into_bytes()
        };
        buffer.push(b'\n');
        Ok(buffer)
    }

    /// Bytes appended to the log file for a record.
    ///
    /// JSON records are followed by a `,` separator, plain text records by a newline.
    pub(crate) fn file(&self, record: Record<'_>) -> Result<Vec<u8>, LoggerError> {
        if self.json {
            let mut buffer = self.json_bytes(record)?;
            buffer.extend_from_slice(FILE_JSON_SEPARATOR);
            Ok(buffer)
        } else {
            let mut buffer = plain_text(record).into_bytes();
            buffer.push(b'\n');
            Ok(buffer)
        }
    }

    fn json_bytes(&self, record: Record<'_>) -> Result<Vec<u8>, LoggerError> {
        if self.beautify_json {
            serialize_record(record, PrettyFormatter::new())
        } else {
            serialize_record(record, CompactFormatter)
        }
    }
}

fn serialize_record<F: Formatter>(
    record: Record<'_>,
    formatter: F,
) -> Result<Vec<u8>, LoggerError> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);

    match record {
        Record::Log(entry) => entry.serialize(&mut serializer)?,
        Record::Error(entry) => entry.serialize(&mut serializer)?,
        Record::Request(entry) => entry.serialize(&mut serializer)?,
    }

    Ok(buffer)
}

/// Single-line (for errors with causes, multi-line) human readable form of a record.
pub(crate) fn plain_text(record: Record<'_>) -> String {
    match record {
        Record::Log(entry) => log_line(entry),
        Record::Error(entry) => error_line(entry),
        Record::Request(entry) => request_line(entry),
    }
}

/// Example: "2026-10-19T09:00:00.000000000Z INFO: Server started"
fn log_line(entry: &LogEntry) -> String {
    format!("{} {}: {}", entry.timestamp, entry.level, entry.message)
}

/// Example: "2026-10-19T09:00:00.000000000Z ERROR [1792400000000000]: Connection refused"
fn error_line(entry: &ErrorEntry) -> String {
    let mut line = format!(
        "{} {} [{}]: {}",
        entry.timestamp, entry.level, entry.error_key, entry.message
    );
    if let Some(stack) = &entry.error_stack {
        line.push('\n');
        line.push_str(stack);
    }
    line
}

/// Example: "2026-10-19T09:00:00.000000000Z REQUEST: GET /health HTTP/1.1 127.0.0.1 (IPv4) curl/8.0
/// params=null headers=null body=null"
fn request_line(entry: &RequestEntry) -> String {
    fn or_dash(value: Option<&str>) -> &str {
        value.unwrap_or("-")
    }

    let mut line = format!(
        "{} {}: {} {} HTTP/{} {} ({}) {}",
        entry.timestamp,
        entry.record_type,
        or_dash(entry.method.as_deref()),
        or_dash(entry.url.as_deref()),
        or_dash(entry.http_version.as_deref()),
        or_dash(entry.client_ip.as_deref()),
        or_dash(entry.ip_family.as_deref()),
        or_dash(entry.user_agent.as_deref()),
    );

    // `serde_json::Value` always serializes successfully, and writing to a `String` is
    // infallible.
    let params = serde_json::to_string(&entry.params).unwrap_or_default();
    let headers = serde_json::to_string(&entry.headers).unwrap_or_default();
    let body = serde_json::to_string(&entry.body).unwrap_or_default();
    let _ = write!(line, " params={params} headers={headers} body={body}");

    line
}
