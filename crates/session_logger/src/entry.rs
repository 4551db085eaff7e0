//! Log records produced by the logging calls.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::Serialize;
use serde_json::{Map, Value};
use time::format_description::well_known::Iso8601;

/// Describes the type of a log record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogType {
    /// Verbose diagnostics.
    Debug,

    /// Informational messages.
    Info,

    /// General purpose messages.
    Log,

    /// Warnings.
    Warn,

    /// Reported errors, carrying an error key.
    Error,

    /// Captured HTTP requests.
    Request,
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Log => "LOG",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Request => "REQUEST",
        };
        write!(f, "{repr}")
    }
}

/// Current UTC time in ISO 8601 format.
pub(crate) fn utc_timestamp() -> String {
    let now = time::UtcDateTime::now();
    now.format(&Iso8601::DEFAULT)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// A leveled message (`DEBUG`, `INFO`, `LOG` or `WARN`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Time the entry was created, in UTC.
    pub timestamp: String,

    /// Level of the entry.
    pub level: LogType,

    /// The logged message.
    pub message: String,
}

impl LogEntry {
    pub(crate) fn new(level: LogType, message: impl Into<String>) -> Self {
        Self {
            timestamp: utc_timestamp(),
            level,
            message: message.into(),
        }
    }
}

/// A reported error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    /// Time the error was reported, in UTC.
    pub timestamp: String,

    /// Always [`LogType::Error`].
    pub level: LogType,

    /// Key correlating the console and file renderings of this error.
    pub error_key: u64,

    /// The error message.
    pub message: String,

    /// The chain of underlying causes, one per line, if the error has any.
    pub error_stack: Option<String>,
}

impl ErrorEntry {
    pub(crate) fn new(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(format!("Caused by: {cause}"));
            source = cause.source();
        }

        Self {
            timestamp: utc_timestamp(),
            level: LogType::Error,
            error_key: next_error_key(),
            message: error.to_string(),
            error_stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }
}

/// A captured HTTP request.
///
/// Fields that could not be extracted from the request are `null` in the rendered output.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEntry {
    /// Time the request was logged, in UTC.
    pub timestamp: String,

    /// Always [`LogType::Request`].
    #[serde(rename = "type")]
    pub record_type: LogType,

    /// HTTP method.
    pub method: Option<String>,

    /// Request URL.
    pub url: Option<String>,

    /// Remote address of the client.
    pub client_ip: Option<String>,

    /// Address family of the client (`IPv4` or `IPv6`).
    pub ip_family: Option<String>,

    /// Value of the `user-agent` header.
    pub user_agent: Option<String>,

    /// HTTP version (e.g. `1.1`).
    pub http_version: Option<String>,

    /// Route parameters.
    pub params: Option<Value>,

    /// Request headers, with hidden headers removed.
    pub headers: Option<Map<String, Value>>,

    /// Request body, with hidden fields removed.
    pub body: Option<Value>,
}

/// Any record that can be rendered by the [`EntryFormatter`][crate::formatter::EntryFormatter].
#[derive(Clone, Copy, Debug)]
pub(crate) enum Record<'a> {
    Log(&'a LogEntry),
    Error(&'a ErrorEntry),
    Request(&'a RequestEntry),
}

static LAST_ERROR_KEY: AtomicU64 = AtomicU64::new(0);

/// Generates a key for a reported error.
///
/// Keys are derived from the wall clock in microseconds and are strictly increasing within the
/// process, so two errors reported within the same tick still get distinct keys.
pub(crate) fn next_error_key() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or_default();

    let mut last = LAST_ERROR_KEY.load(Ordering::Relaxed);
    loop {
        let next = now.max(last.saturating_add(1));
        match LAST_ERROR_KEY.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}
