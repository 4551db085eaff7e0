//! Options accepted by the logger, and the resolved session configuration derived from them.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::LoggerError;

/// Base name of the active log file, when none is configured.
pub const DEFAULT_LOG_NAME: &str = "simple-logger.logs";

/// Name of the log directory (relative to the current working directory), when none is
/// configured.
pub const DEFAULT_LOGS_DIR_NAME: &str = "logs";

/// Interval between two rotations, when none is configured (24 hours).
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_millis(86_400_000);

/// Maximum age of a log file before it is pruned, when none is configured (7 days).
pub const DEFAULT_REMOVE_TIME: Duration = Duration::from_millis(604_800_000);

/// Options passed to [`Logger::initialize()`][crate::Logger::initialize].
///
/// Every field is optional. A field left as `None` keeps the value that was previously
/// configured, or the default if the logger was never configured.
///
/// The serialized names match the external option names (`cycleTime`, `removeTime`, `logsDir`,
/// `logName`, `writeToFile`, `writeToConsole`, `json`, `beautifyJson`, `throwOnSyncFailure`), so
/// the options may be loaded from any `serde` source:
///
/// ```
/// let options: session_logger::LoggerOptions =
///     serde_json::from_str(r#"{ "logsDir": "/tmp/app-logs", "cycleTime": 3600000 }"#).unwrap();
/// assert_eq!(options.cycle_time, Some(3_600_000));
/// assert_eq!(options.write_to_file, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct LoggerOptions {
    /// Rotation interval, in milliseconds.
    pub cycle_time: Option<u64>,

    /// Retention window, in milliseconds.
    pub remove_time: Option<u64>,

    /// Directory holding the active and archived log files.
    pub logs_dir: Option<PathBuf>,

    /// File name of the active log file.
    pub log_name: Option<String>,

    /// Whether entries are appended to the active log file.
    pub write_to_file: Option<bool>,

    /// Whether entries are written to the console.
    pub write_to_console: Option<bool>,

    /// Whether entries are rendered as JSON (`true`) or as plain text lines (`false`).
    #[serde(alias = "structured")]
    pub json: Option<bool>,

    /// Whether JSON output is pretty-printed (`true`) or compact (`false`).
    pub beautify_json: Option<bool>,

    /// Whether sink failures in logging calls are returned to the caller (`true`), or only
    /// reported to the console (`false`).
    #[serde(alias = "handleSyncErrors")]
    pub throw_on_sync_failure: Option<bool>,
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl LoggerOptions {
    /// Sets the rotation interval.
    pub fn cycle_time(mut self, cycle_time: Duration) -> Self {
        self.cycle_time = Some(duration_millis(cycle_time));
        self
    }

    /// Sets the retention window.
    pub fn remove_time(mut self, remove_time: Duration) -> Self {
        self.remove_time = Some(duration_millis(remove_time));
        self
    }

    /// Sets the log directory.
    pub fn logs_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = Some(logs_dir.into());
        self
    }

    /// Sets the file name of the active log file.
    pub fn log_name(mut self, log_name: impl Into<String>) -> Self {
        self.log_name = Some(log_name.into());
        self
    }

    /// Enables or disables the file sink.
    pub fn write_to_file(mut self, enabled: bool) -> Self {
        self.write_to_file = Some(enabled);
        self
    }

    /// Enables or disables the console sink.
    pub fn write_to_console(mut self, enabled: bool) -> Self {
        self.write_to_console = Some(enabled);
        self
    }

    /// Selects JSON (`true`) or plain text (`false`) rendering.
    pub fn json(mut self, enabled: bool) -> Self {
        self.json = Some(enabled);
        self
    }

    /// Selects pretty-printed (`true`) or compact (`false`) JSON.
    pub fn beautify_json(mut self, enabled: bool) -> Self {
        self.beautify_json = Some(enabled);
        self
    }

    /// Selects whether sink failures are returned to callers.
    pub fn throw_on_sync_failure(mut self, enabled: bool) -> Self {
        self.throw_on_sync_failure = Some(enabled);
        self
    }

    /// Applies the supplied options on top of `base`, leaving fields that were not supplied
    /// untouched, and validates the result.
    pub(crate) fn resolve(self, base: &SessionConfig) -> Result<SessionConfig, LoggerError> {
        let resolved = SessionConfig {
            logs_dir: self.logs_dir.unwrap_or_else(|| base.logs_dir.clone()),
            log_name: self.log_name.unwrap_or_else(|| base.log_name.clone()),
            cycle_time: self
                .cycle_time
                .map_or(base.cycle_time, Duration::from_millis),
            remove_time: self
                .remove_time
                .map_or(base.remove_time, Duration::from_millis),
            write_to_file: self.write_to_file.unwrap_or(base.write_to_file),
            write_to_console: self.write_to_console.unwrap_or(base.write_to_console),
            json: self.json.unwrap_or(base.json),
            beautify_json: self.beautify_json.unwrap_or(base.beautify_json),
            throw_on_sync_failure: self
                .throw_on_sync_failure
                .unwrap_or(base.throw_on_sync_failure),
        };

        resolved.validate()?;
        Ok(resolved)
    }
}

/// Fully resolved configuration of a logging session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Directory holding the active and archived log files.
    pub logs_dir: PathBuf,

    /// File name of the active log file.
    pub log_name: String,

    /// Rotation interval.
    pub cycle_time: Duration,

    /// Retention window.
    pub remove_time: Duration,

    /// Whether entries are appended to the active log file.
    pub write_to_file: bool,

    /// Whether entries are written to the console.
    pub write_to_console: bool,

    /// Whether entries are rendered as JSON.
    pub json: bool,

    /// Whether JSON output is pretty-printed.
    pub beautify_json: bool,

    /// Whether sink failures in logging calls are returned to the caller.
    pub throw_on_sync_failure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let logs_dir = std::env::current_dir()
            .map(|cwd| cwd.join(DEFAULT_LOGS_DIR_NAME))
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOGS_DIR_NAME));

        Self {
            logs_dir,
            log_name: DEFAULT_LOG_NAME.to_string(),
            cycle_time: DEFAULT_CYCLE_TIME,
            remove_time: DEFAULT_REMOVE_TIME,
            write_to_file: true,
            write_to_console: true,
            json: true,
            beautify_json: true,
            throw_on_sync_failure: true,
        }
    }
}

impl SessionConfig {
    /// Path of the active log file.
    pub fn active_file_path(&self) -> PathBuf {
        self.logs_dir.join(&self.log_name)
    }

    /// The write policy applied to logging calls that have no per-call overrides.
    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            write_to_file: self.write_to_file,
            write_to_console: self.write_to_console,
            json: self.json,
            beautify_json: self.beautify_json,
            throw_on_sync_failure: self.throw_on_sync_failure,
        }
    }

    fn validate(&self) -> Result<(), LoggerError> {
        if !self.write_to_file && !self.write_to_console {
            return Err(LoggerError::NoSinksEnabled);
        }

        if self.cycle_time.is_zero() {
            return Err(LoggerError::Configuration(
                "`cycle_time` must be greater than zero".to_string(),
            ));
        }

        if self.log_name.is_empty()
            || self.log_name.contains(std::path::is_separator)
            || self.log_name == "."
            || self.log_name == ".."
        {
            return Err(LoggerError::Configuration(format!(
                "`log_name` must be a plain file name, got `{}`",
                self.log_name
            )));
        }

        Ok(())
    }
}

/// Sinks, format and failure policy applied to a single logging call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    /// Whether the entry is appended to the active log file.
    pub write_to_file: bool,

    /// Whether the entry is written to the console.
    pub write_to_console: bool,

    /// Whether the entry is rendered as JSON.
    pub json: bool,

    /// Whether JSON output is pretty-printed.
    pub beautify_json: bool,

    /// Whether a sink failure is returned to the caller.
    pub throw_on_sync_failure: bool,
}

/// Per-call options of the request logging adapter.
///
/// Fields left as `None` fall back to the session configuration for that call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RequestLogOptions {
    /// Overrides the file sink toggle.
    pub write_to_file: Option<bool>,

    /// Overrides the console sink toggle.
    pub write_to_console: Option<bool>,

    /// Top-level keys removed from the request body before it is logged.
    pub hide_body_fields: Vec<String>,

    /// Header names removed from the request headers before they are logged.
    pub hide_headers: Vec<String>,

    /// Overrides JSON rendering.
    #[serde(alias = "structured")]
    pub json: Option<bool>,

    /// Overrides the failure policy.
    #[serde(alias = "handleSyncErrors")]
    pub throw_on_sync_failure: Option<bool>,
}

impl RequestLogOptions {
    /// Overrides the file sink toggle.
    pub fn write_to_file(mut self, enabled: bool) -> Self {
        self.write_to_file = Some(enabled);
        self
    }

    /// Overrides the console sink toggle.
    pub fn write_to_console(mut self, enabled: bool) -> Self {
        self.write_to_console = Some(enabled);
        self
    }

    /// Adds body fields to hide.
    pub fn hide_body_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hide_body_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds headers to hide.
    pub fn hide_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hide_headers.extend(headers.into_iter().map(Into::into));
        self
    }

    /// Overrides JSON rendering.
    pub fn json(mut self, enabled: bool) -> Self {
        self.json = Some(enabled);
        self
    }

    /// Overrides the failure policy.
    pub fn throw_on_sync_failure(mut self, enabled: bool) -> Self {
        self.throw_on_sync_failure = Some(enabled);
        self
    }

    pub(crate) fn policy(&self, session: &SessionConfig) -> WritePolicy {
        WritePolicy {
            write_to_file: self.write_to_file.unwrap_or(session.write_to_file),
            write_to_console: self.write_to_console.unwrap_or(session.write_to_console),
            json: self.json.unwrap_or(session.json),
            beautify_json: session.beautify_json,
            throw_on_sync_failure: self
                .throw_on_sync_failure
                .unwrap_or(session.throw_on_sync_failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_options_keep_base_values() {
        let base = SessionConfig {
            log_name: "previous.log".to_string(),
            json: false,
            ..SessionConfig::default()
        };

        let resolved = LoggerOptions::default()
            .cycle_time(Duration::from_secs(60))
            .resolve(&base)
            .expect("valid configuration");

        assert_eq!(resolved.cycle_time, Duration::from_secs(60));
        assert_eq!(resolved.log_name, "previous.log");
        assert!(!resolved.json);
        assert_eq!(resolved.remove_time, DEFAULT_REMOVE_TIME);
        assert!(resolved.write_to_file);
    }

    #[test]
    fn both_sinks_disabled_is_rejected() {
        let result = LoggerOptions::default()
            .write_to_file(false)
            .write_to_console(false)
            .resolve(&SessionConfig::default());

        assert!(matches!(result, Err(LoggerError::NoSinksEnabled)));
    }

    #[test]
    fn log_name_with_separator_is_rejected() {
        let result = LoggerOptions::default()
            .log_name("nested/app.log")
            .resolve(&SessionConfig::default());

        assert!(matches!(result, Err(LoggerError::Configuration(_))));
    }

    #[test]
    fn zero_cycle_time_is_rejected() {
        let result = LoggerOptions::default()
            .cycle_time(Duration::ZERO)
            .resolve(&SessionConfig::default());

        assert!(matches!(result, Err(LoggerError::Configuration(_))));
    }

    #[test]
    fn options_deserialize_from_external_names() {
        let options: LoggerOptions = serde_json::from_str(
            r#"{
                "cycleTime": 1000,
                "removeTime": 1,
                "logName": "app.log",
                "writeToConsole": false,
                "handleSyncErrors": false
            }"#,
        )
        .expect("options deserialize");

        assert_eq!(options.cycle_time, Some(1000));
        assert_eq!(options.remove_time, Some(1));
        assert_eq!(options.log_name.as_deref(), Some("app.log"));
        assert_eq!(options.write_to_console, Some(false));
        assert_eq!(options.throw_on_sync_failure, Some(false));
        assert_eq!(options.logs_dir, None);
    }

    #[test]
    fn request_options_override_session_policy() {
        let session = SessionConfig::default();
        let policy = RequestLogOptions::default()
            .write_to_console(false)
            .json(false)
            .policy(&session);

        assert!(policy.write_to_file);
        assert!(!policy.write_to_console);
        assert!(!policy.json);
        assert!(policy.throw_on_sync_failure);
    }
}
