//! Capture of inbound HTTP requests.
//!
//! The HTTP framework integration extracts a [`CapturedRequest`] from its own request type and
//! passes it to a [`RequestLogger`], which redacts the configured fields, emits a
//! [`RequestEntry`] and hands control back to the request pipeline.

use std::{net::SocketAddr, sync::Arc};

use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

use crate::{
    config::RequestLogOptions,
    entry::{utc_timestamp, LogType, RequestEntry},
    Logger, LoggerError,
};

const USER_AGENT: &str = "user-agent";

/// Connection details of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SocketInfo {
    /// Remote address of the client.
    pub remote_address: Option<String>,

    /// Address family of the remote address (`IPv4` or `IPv6`).
    pub remote_family: Option<String>,
}

impl From<SocketAddr> for SocketInfo {
    fn from(address: SocketAddr) -> Self {
        let family = match address {
            SocketAddr::V4(_) => "IPv4",
            SocketAddr::V6(_) => "IPv6",
        };
        Self {
            remote_address: Some(address.ip().to_string()),
            remote_family: Some(family.to_string()),
        }
    }
}

/// The fields of an inbound request that are logged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CapturedRequest {
    /// HTTP method.
    pub method: Option<String>,

    /// Request URL (path and query).
    pub url: Option<String>,

    /// HTTP version, without the `HTTP/` prefix.
    pub http_version: Option<String>,

    /// Request headers.
    pub headers: Option<Map<String, Value>>,

    /// Connection details.
    pub socket: SocketInfo,

    /// Parsed request body.
    pub body: Option<Value>,

    /// Route parameters.
    pub params: Option<Value>,
}

impl CapturedRequest {
    /// Value of the `user-agent` header, matched case-insensitively.
    pub fn user_agent(&self) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(USER_AGENT))
            .and_then(|(_, value)| value.as_str())
    }

    /// Removes the specified top-level keys from the body, if it is a JSON object.
    fn hide_body_fields(&mut self, fields: &[String]) {
        if fields.is_empty() {
            return;
        }
        let hidden: FxHashSet<&str> = fields.iter().map(String::as_str).collect();
        if let Some(body) = self.body.as_mut().and_then(Value::as_object_mut) {
            body.retain(|key, _| !hidden.contains(key.as_str()));
        }
    }

    /// Removes the specified headers, comparing names case-insensitively.
    fn hide_headers(&mut self, names: &[String]) {
        if names.is_empty() {
            return;
        }
        let hidden: FxHashSet<String> =
            names.iter().map(|name| name.to_ascii_lowercase()).collect();
        if let Some(headers) = self.headers.as_mut() {
            headers.retain(|name, _| !hidden.contains(&name.to_ascii_lowercase()));
        }
    }

    /// Applies the redaction configured in `options` and converts the request into an entry.
    ///
    /// Empty strings are treated as missing and rendered as `null`.
    pub(crate) fn into_entry(mut self, options: &RequestLogOptions) -> RequestEntry {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|value| !value.is_empty())
        }

        self.hide_body_fields(&options.hide_body_fields);
        self.hide_headers(&options.hide_headers);

        let user_agent = self.user_agent().map(ToOwned::to_owned);

        RequestEntry {
            timestamp: utc_timestamp(),
            record_type: LogType::Request,
            method: non_empty(self.method),
            url: non_empty(self.url),
            client_ip: non_empty(self.socket.remote_address),
            ip_family: non_empty(self.socket.remote_family),
            user_agent: non_empty(user_agent),
            http_version: non_empty(self.http_version),
            params: self.params,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Request logging step of a request-handling pipeline, created by
/// [`Logger::request_adapter()`].
///
/// Logging never blocks request handling: the continuation is always invoked, receiving the
/// logging failure as its argument when the failure policy propagates errors.
///
/// ```
/// use session_logger::{CapturedRequest, Logger, LoggerOptions, RequestLogOptions};
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::new();
/// logger
///     .initialize(LoggerOptions::default().logs_dir(dir.path()).write_to_console(false))
///     .unwrap();
///
/// let adapter =
///     logger.request_adapter(RequestLogOptions::default().hide_headers(["authorization"]));
/// let request = CapturedRequest {
///     method: Some("GET".to_string()),
///     url: Some("/health".to_string()),
///     ..CapturedRequest::default()
/// };
///
/// let status = adapter.handle(request, |error| match error {
///     None => 200,
///     Some(_) => 500,
/// });
/// assert_eq!(status, 200);
/// ```
#[derive(Clone, Debug)]
pub struct RequestLogger {
    logger: Logger,
    options: Arc<RequestLogOptions>,
}

impl RequestLogger {
    pub(crate) fn new(logger: Logger, options: RequestLogOptions) -> Self {
        Self {
            logger,
            options: Arc::new(options),
        }
    }

    /// The per-call options applied by this adapter.
    pub fn options(&self) -> &RequestLogOptions {
        &self.options
    }

    /// Logs `request`, then invokes `next` with the logging failure, if any was propagated.
    pub fn handle<N, R>(&self, request: CapturedRequest, next: N) -> R
    where
        N: FnOnce(Option<LoggerError>) -> R,
    {
        match self.logger.log_request(request, self.options()) {
            Ok(()) => next(None),
            Err(error) => next(Some(error)),
        }
    }
}
