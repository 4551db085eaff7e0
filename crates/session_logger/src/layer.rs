//! Provides a [`tracing_subscriber::Layer`] ([`SessionLoggerLayer`]) routing `tracing` events
//! into a [`Logger`].

use std::fmt::{self, Write as _};

use tracing::{
    field::{Field, Visit},
    Event, Level, Metadata, Subscriber,
};
use tracing_subscriber::{
    layer::Context,
    registry::{LookupSpan, SpanRef},
    Layer,
};

use crate::{Logger, LoggerError};

const MESSAGE: &str = "message";

/// A [`tracing_subscriber::Layer`] writing `tracing` events through a [`Logger`].
///
/// Levels map as follows: `TRACE` and `DEBUG` to `DEBUG`, `INFO` to `INFO`, `WARN` to `WARN`,
/// and `ERROR` events are reported as errors, each receiving an error key. Events are dropped
/// while the logger is not initialized, and events emitted by this crate are always skipped.
///
/// ```
/// use session_logger::{Logger, LoggerOptions, SessionLoggerLayer};
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let dir = tempfile::tempdir().unwrap();
/// let logger = Logger::new();
/// logger
///     .initialize(LoggerOptions::default().logs_dir(dir.path()).write_to_console(false))
///     .unwrap();
///
/// let subscriber = tracing_subscriber::registry().with(SessionLoggerLayer::new(logger.clone()));
/// tracing::subscriber::with_default(subscriber, || {
///     tracing::info!(user_id = 7, "user signed in");
/// });
///
/// let content = std::fs::read_to_string(logger.active_file_path().unwrap()).unwrap();
/// assert!(content.contains("user signed in user_id=7"));
/// ```
#[derive(Clone, Debug)]
pub struct SessionLoggerLayer {
    logger: Logger,
}

impl SessionLoggerLayer {
    /// Creates a new [`SessionLoggerLayer`] writing through `logger`.
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    fn is_own_event(metadata: &Metadata<'_>) -> bool {
        metadata.target().starts_with(env!("CARGO_CRATE_NAME"))
    }

    /// Format the message for an event.
    ///
    /// Examples: "[FN_WITHOUT_COLON - EVENT] Message key=value", "Message key=value"
    fn event_message<S>(
        span: Option<&SpanRef<'_, S>>,
        event: &Event<'_>,
        visitor: EventVisitor,
    ) -> String
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        // Use the `message` field if set, or the `target` from metadata otherwise.
        let mut message = visitor
            .message
            .unwrap_or_else(|| event.metadata().target().to_string());

        for (key, value) in visitor.fields {
            let _ = write!(message, " {key}={value}");
        }

        if let Some(span) = span {
            format!("[{} - EVENT] {message}", span.metadata().name().to_uppercase())
        } else {
            message
        }
    }
}

/// Error reported for `ERROR` level events.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct EventError(String);

impl<S> Layer<S> for SessionLoggerLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if Self::is_own_event(event.metadata()) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let span = ctx.lookup_current();
        let message = Self::event_message(span.as_ref(), event, visitor);

        let result: Result<(), LoggerError> = match *event.metadata().level() {
            Level::ERROR => self.logger.error(&EventError(message), false).map(|_| ()),
            Level::WARN => self.logger.warn([message]),
            Level::INFO => self.logger.info([message]),
            _ => self.logger.debug([message]),
        };

        // Nothing to report to: sink failures already follow the session's failure policy, and
        // events before initialization are dropped.
        let _ = result;
    }
}

/// Captures the message and the other fields of an event.
#[derive(Debug, Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE {
            self.message = Some(value.to_string()); // `record_str()` is preferred for `message`
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            MESSAGE => {
                if self.message.is_none() {
                    self.message = Some(format!("{value:?}"));
                }
            }
            // Skip fields which are already handled
            name if name.starts_with("log.") => (),
            name => self.fields.push((name.trim_start_matches("r#"), format!("{value:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::LoggerOptions;

    fn logger(dir: &std::path::Path) -> Logger {
        let logger = Logger::new();
        logger
            .initialize(
                LoggerOptions::default()
                    .logs_dir(dir)
                    .write_to_console(false)
                    .json(false),
            )
            .expect("initialization succeeds");
        logger
    }

    #[test]
    fn events_are_written_with_mapped_levels() {
        let dir = tempfile::tempdir().expect("temp dir");
        let logger = logger(dir.path());
        let subscriber =
            tracing_subscriber::registry().with(SessionLoggerLayer::new(logger.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::trace!("fine grained");
            tracing::info!(attempt = 2, "connecting");
            tracing::warn!("slow response");
            let span = tracing::info_span!("handshake");
            let _guard = span.enter();
            tracing::error!("handshake failed");
        });

        let path = logger.active_file_path().expect("session running");
        let content = fs::read_to_string(path).expect("active file readable");
        assert!(content.contains(" DEBUG: fine grained"));
        assert!(content.contains(" INFO: connecting attempt=2"));
        assert!(content.contains(" WARN: slow response"));
        assert!(content.contains("]: [HANDSHAKE - EVENT] handshake failed"));
    }

    #[test]
    fn events_before_initialization_are_dropped() {
        let logger = Logger::new();
        let subscriber =
            tracing_subscriber::registry().with(SessionLoggerLayer::new(logger.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("nobody listening");
        });

        assert!(!logger.is_initialized());
    }

    #[test]
    fn own_events_are_skipped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let logger = logger(dir.path());
        let subscriber =
            tracing_subscriber::registry().with(SessionLoggerLayer::new(logger.clone()));

        tracing::subscriber::with_default(subscriber, || {
            logger.rotate_now().expect("session running");
        });

        let path = logger.active_file_path().expect("session running");
        let content = fs::read_to_string(path).expect("active file readable");
        assert!(!content.contains("rotated log file"));
    }
}
