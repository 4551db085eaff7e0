//! The logger handle and its session lifecycle.

use std::{path::PathBuf, sync::Arc};

use parking_lot::RwLock;

use crate::{
    config::{LoggerOptions, RequestLogOptions, SessionConfig, WritePolicy},
    console::ConsoleSink,
    entry::{ErrorEntry, LogEntry, LogType, Record},
    file::ActiveFile,
    formatter::EntryFormatter,
    request::{CapturedRequest, RequestLogger},
    rotation::{RotationScheduler, RotationTask},
    LoggerError,
};

/// Handle to a logging session.
///
/// A logger starts uninitialized. [`Logger::initialize()`] starts a session: it creates the log
/// directory and the active file, and starts the rotation scheduler. Every other operation fails
/// with [`LoggerError::NotInitialized`] until then. Handles are cheap to clone and all clones share
/// the same session.
///
/// # Example
///
/// ```
/// use session_logger::{Logger, LoggerOptions};
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::new();
/// logger
///     .initialize(
///         LoggerOptions::default()
///             .logs_dir(dir.path())
///             .write_to_console(false),
///     )
///     .unwrap();
///
/// logger.info(["service started"]).unwrap();
///
/// let error = std::io::Error::other("upstream unavailable");
/// let key = logger.error(&error, false).unwrap();
///
/// let content = std::fs::read_to_string(logger.active_file_path().unwrap()).unwrap();
/// assert!(content.contains("service started"));
/// assert!(content.contains(&key.to_string()));
/// ```
#[derive(Clone, Debug)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

#[derive(Debug)]
struct LoggerInner {
    console: Arc<ConsoleSink>,
    state: RwLock<State>,
}

#[derive(Debug)]
struct State {
    /// Most recently applied configuration. Options omitted from the next initialization keep
    /// these values.
    config: SessionConfig,
    session: Option<Session>,
}

#[derive(Debug)]
struct Session {
    config: SessionConfig,
    active: Arc<ActiveFile>,
    scheduler: RotationScheduler,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates an uninitialized logger writing console output to standard output and standard
    /// error.
    pub fn new() -> Self {
        Self::with_console(ConsoleSink::default())
    }

    /// Creates an uninitialized logger with the specified console sink.
    pub fn with_console(console: ConsoleSink) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                console: Arc::new(console),
                state: RwLock::new(State {
                    config: SessionConfig::default(),
                    session: None,
                }),
            }),
        }
    }

    /// Starts the logging session.
    ///
    /// Only the options that are set are applied; the others keep their previously configured
    /// or default values. On success, the log directory and the active file exist and the
    /// rotation scheduler is running.
    ///
    /// # Errors
    ///
    /// - [`LoggerError::AlreadyInitialized`] if a session is already running.
    /// - [`LoggerError::NoSinksEnabled`] if both the file and the console sinks are disabled.
    /// - [`LoggerError::Configuration`] for other invalid options.
    /// - [`LoggerError::Filesystem`] if the directory or the active file cannot be created. The
    ///   logger stays uninitialized in that case.
    pub fn initialize(&self, options: LoggerOptions) -> Result<(), LoggerError> {
        let mut state = self.inner.state.write();
        if state.session.is_some() {
            return Err(LoggerError::AlreadyInitialized);
        }

        let config = options.resolve(&state.config)?;
        let session = self.start_session(config.clone()).inspect_err(|error| {
            self.inner.console.report(error);
        })?;

        tracing::debug!(
            logs_dir = %config.logs_dir.display(),
            log_name = %config.log_name,
            "session logger initialized"
        );
        state.config = config;
        state.session = Some(session);

        Ok(())
    }

    fn start_session(&self, config: SessionConfig) -> Result<Session, LoggerError> {
        let active = Arc::new(ActiveFile::new(&config.logs_dir, &config.log_name));
        active.ensure_directory()?;
        active.open()?;

        let scheduler =
            RotationScheduler::start(self.rotation_task(&active, &config), config.cycle_time)?;

        Ok(Session {
            config,
            active,
            scheduler,
        })
    }

    fn rotation_task(&self, active: &Arc<ActiveFile>, config: &SessionConfig) -> RotationTask {
        RotationTask {
            active: Arc::clone(active),
            retention: config.remove_time,
            console: Arc::clone(&self.inner.console),
        }
    }

    /// Whether a session is running.
    pub fn is_initialized(&self) -> bool {
        self.inner.state.read().session.is_some()
    }

    /// Configuration of the running session.
    pub fn config(&self) -> Option<SessionConfig> {
        self.inner
            .state
            .read()
            .session
            .as_ref()
            .map(|session| session.config.clone())
    }

    /// Path of the active log file of the running session.
    pub fn active_file_path(&self) -> Option<PathBuf> {
        self.inner
            .state
            .read()
            .session
            .as_ref()
            .map(|session| session.config.active_file_path())
    }

    /// Logs each message at `DEBUG` level.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::NotInitialized`] if no session is running, or the sink failure if
    /// the session propagates sink failures.
    pub fn debug<I, M>(&self, messages: I) -> Result<(), LoggerError>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.log_messages(LogType::Debug, messages)
    }

    /// Logs each message at `INFO` level.
    ///
    /// # Errors
    ///
    /// See [`Logger::debug()`].
    pub fn info<I, M>(&self, messages: I) -> Result<(), LoggerError>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.log_messages(LogType::Info, messages)
    }

    /// Logs each message at `LOG` level.
    ///
    /// # Errors
    ///
    /// See [`Logger::debug()`].
    pub fn log<I, M>(&self, messages: I) -> Result<(), LoggerError>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.log_messages(LogType::Log, messages)
    }

    /// Logs each message at `WARN` level.
    ///
    /// # Errors
    ///
    /// See [`Logger::debug()`].
    pub fn warn<I, M>(&self, messages: I) -> Result<(), LoggerError>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.log_messages(LogType::Warn, messages)
    }

    fn log_messages<I, M>(&self, level: LogType, messages: I) -> Result<(), LoggerError>
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        let state = self.inner.state.read();
        let session = state.session.as_ref().ok_or(LoggerError::NotInitialized)?;
        let policy = session.config.write_policy();

        // Stops at the first failing message.
        let result = messages.into_iter().try_for_each(|message| {
            let entry = LogEntry::new(level, message);
            self.emit(&session.active, Record::Log(&entry), &policy)
        });

        self.settle(result, &policy, ())
    }

    /// Reports an error and returns its key.
    ///
    /// The same key appears in the console and file renderings of the error. If `exit` is set,
    /// the process terminates with status `1` once the error has been written.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::NotInitialized`] if no session is running, or the sink failure if
    /// the session propagates sink failures. When sink failures are swallowed, the key is
    /// returned even if writing failed.
    pub fn error(
        &self,
        error: &(dyn std::error::Error + 'static),
        exit: bool,
    ) -> Result<u64, LoggerError> {
        let key = {
            let state = self.inner.state.read();
            let session = state.session.as_ref().ok_or(LoggerError::NotInitialized)?;
            let policy = session.config.write_policy();

            let entry = ErrorEntry::new(error);
            let result = self.emit(&session.active, Record::Error(&entry), &policy);
            self.settle(result, &policy, ())?;
            entry.error_key
        };

        if exit {
            tracing::error!(error_key = key, "exiting after reported error");
            std::process::exit(1);
        }

        Ok(key)
    }

    /// Logs a captured request, applying the per-call `options` on top of the session
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::NotInitialized`] if no session is running, or the sink failure if
    /// the effective policy propagates sink failures.
    pub fn log_request(
        &self,
        request: CapturedRequest,
        options: &RequestLogOptions,
    ) -> Result<(), LoggerError> {
        let state = self.inner.state.read();
        let session = state.session.as_ref().ok_or(LoggerError::NotInitialized)?;
        let policy = options.policy(&session.config);

        let entry = request.into_entry(options);
        let result = self.emit(&session.active, Record::Request(&entry), &policy);

        self.settle(result, &policy, ())
    }

    /// Creates a request logging step applying `options` to every request it handles.
    pub fn request_adapter(&self, options: RequestLogOptions) -> RequestLogger {
        RequestLogger::new(self.clone(), options)
    }

    /// Deletes every file in the log directory, then the directory itself.
    ///
    /// The session keeps running: the next write recreates the directory and the active file.
    /// Returns `false` if the deletion failed and the failure was swallowed.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::NotInitialized`] if no session is running, or the filesystem
    /// failure if the session propagates sink failures. The directory may be partially cleaned
    /// on failure.
    pub fn prune_logs(&self) -> Result<bool, LoggerError> {
        let state = self.inner.state.read();
        let session = state.session.as_ref().ok_or(LoggerError::NotInitialized)?;
        let policy = session.config.write_policy();

        let result = session.active.remove_all().map(|()| true);
        if result.is_ok() {
            tracing::info!(
                logs_dir = %session.active.directory().display(),
                "removed log directory"
            );
        }

        self.settle(result, &policy, false)
    }

    /// Performs a rotation immediately, as the scheduler does on each tick.
    ///
    /// Returns the path of the archive file, or `None` if the active file could not be renamed.
    /// Failures are reported to the console, not returned.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::NotInitialized`] if no session is running.
    pub fn rotate_now(&self) -> Result<Option<PathBuf>, LoggerError> {
        let state = self.inner.state.read();
        let session = state.session.as_ref().ok_or(LoggerError::NotInitialized)?;

        Ok(self
            .rotation_task(&session.active, &session.config)
            .tick()
            .archive)
    }

    /// Ends the session: stops the rotation scheduler and returns the logger to the
    /// uninitialized state. Log files are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::NotInitialized`] if no session is running.
    pub fn shutdown(&self) -> Result<(), LoggerError> {
        let session = self
            .inner
            .state
            .write()
            .session
            .take()
            .ok_or(LoggerError::NotInitialized)?;

        let Session { mut scheduler, .. } = session;
        scheduler.stop();
        tracing::debug!("session logger shut down");

        Ok(())
    }

    /// Writes a record to the sinks enabled by `policy`.
    ///
    /// Every enabled sink is attempted, even if an earlier one failed. The first failure is
    /// returned; a failure of the second sink is reported to the console.
    fn emit(
        &self,
        active: &ActiveFile,
        record: Record<'_>,
        policy: &WritePolicy,
    ) -> Result<(), LoggerError> {
        let formatter = EntryFormatter::from(policy);

        let console_result = if policy.write_to_console {
            formatter.console(record).and_then(|bytes| {
                self.inner
                    .console
                    .write(&bytes)
                    .map_err(LoggerError::Console)
            })
        } else {
            Ok(())
        };

        let file_result = if policy.write_to_file {
            formatter
                .file(record)
                .and_then(|bytes| active.append(&bytes))
        } else {
            Ok(())
        };

        match (console_result, file_result) {
            (Err(first), Err(second)) => {
                self.inner.console.report(&second);
                Err(first)
            }
            (Err(error), Ok(())) | (Ok(()), Err(error)) => Err(error),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    /// Applies the failure policy: a failure is either returned, or reported to the console and
    /// replaced by `fallback`.
    fn settle<T>(
        &self,
        result: Result<T, LoggerError>,
        policy: &WritePolicy,
        fallback: T,
    ) -> Result<T, LoggerError> {
        match result {
            Ok(value) => Ok(value),
            Err(error) if policy.throw_on_sync_failure => Err(error),
            Err(error) => {
                self.inner.console.report(&error);
                Ok(fallback)
            }
        }
    }
}
