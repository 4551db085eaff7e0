//! `session_logger` is a process-embedded logger writing to the console and to a rotating log
//! file.
//!
//! It offers:
//! - A [`Logger`] handle with leveled logging calls (`debug`, `info`, `log`, `warn`), error
//!   reporting returning an error key, and explicit session lifecycle (initialization, teardown).
//! - Time-based rotation of the active log file into `<log name>.<date>.<time>` archives, and
//!   age-based pruning of old files on every rotation.
//! - JSON or plain text rendering, with a configurable failure policy deciding whether sink
//!   failures are returned to callers or only reported to the console.
//! - A [`RequestLogger`] adapter for HTTP request pipelines, with header and body field
//!   redaction.
//! - A [`SessionLoggerLayer`] routing [`tracing`] events into the logger.
//!
//! Applications typically use one logger per process, available through [`global()`], but any
//! number of independent [`Logger`] instances may be created.

mod config;
mod console;
mod entry;
mod error;
mod file;
mod formatter;
#[cfg(feature = "tracing-layer")]
mod layer;
mod logger;
mod request;
mod retention;
mod rotation;

use std::sync::LazyLock;

#[cfg(feature = "tracing-layer")]
pub use self::layer::SessionLoggerLayer;
pub use self::{
    config::{
        LoggerOptions, RequestLogOptions, SessionConfig, WritePolicy, DEFAULT_CYCLE_TIME,
        DEFAULT_LOGS_DIR_NAME, DEFAULT_LOG_NAME, DEFAULT_REMOVE_TIME,
    },
    console::ConsoleSink,
    entry::{ErrorEntry, LogEntry, LogType, RequestEntry},
    error::{FsOperation, LoggerError},
    logger::Logger,
    request::{CapturedRequest, RequestLogger, SocketInfo},
};

static GLOBAL: LazyLock<Logger> = LazyLock::new(Logger::new);

/// The process-wide logger.
///
/// It starts uninitialized, like any [`Logger`]; call [`Logger::initialize()`] once at startup.
pub fn global() -> &'static Logger {
    &GLOBAL
}
