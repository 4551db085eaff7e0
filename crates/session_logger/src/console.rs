//! The console sink.

use std::{
    error::Error as _,
    fmt::{self, Write as _},
    io::Write,
};

use tracing_subscriber::fmt::{writer::BoxMakeWriter, MakeWriter};

use crate::LoggerError;

/// Destination of console output.
///
/// Log records are written to the output writer, reported failures to the error writer. Both
/// default to the process' standard output and standard error, and may be replaced by any
/// [`MakeWriter`], e.g. to capture console output in tests.
pub struct ConsoleSink {
    output: BoxMakeWriter,
    errors: BoxMakeWriter,
}

impl fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleSink").finish_non_exhaustive()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(std::io::stdout, std::io::stderr)
    }
}

impl ConsoleSink {
    /// Creates a console sink with the specified output and error writers.
    pub fn new<O, E>(output: O, errors: E) -> Self
    where
        O: for<'a> MakeWriter<'a> + Send + Sync + 'static,
        E: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        Self {
            output: BoxMakeWriter::new(output),
            errors: BoxMakeWriter::new(errors),
        }
    }

    /// Writes a rendered record.
    ///
    /// Should be done by a single `write_all` call to avoid interleaving of records written from
    /// multiple threads.
    pub(crate) fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.output.make_writer().write_all(bytes)
    }

    /// Reports a failure that is not returned to any caller.
    ///
    /// The message is followed by the underlying causes that its text does not already include.
    pub(crate) fn report(&self, error: &LoggerError) {
        tracing::error!(error = %error, "session logger failure");

        let mut report = format!("{error}\n");
        let mut source = error.source();
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !report.contains(&cause_text) {
                let _ = writeln!(report, "    caused by: {cause_text}");
            }
            source = cause.source();
        }

        let _ = self.errors.make_writer().write_all(report.as_bytes());
    }

    /// Writes an informational notice from the logger itself (rotation, pruning).
    pub(crate) fn notice(&self, message: &str) {
        let _ = self
            .output
            .make_writer()
            .write_all(format!("{message}\n").as_bytes());
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    /// In-memory writer shared between the console sink and the test.
    #[derive(Clone, Debug, Default)]
    pub(crate) struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

    impl CapturedOutput {
        pub(crate) fn contents(&self) -> String {
            let buffer = self.0.lock().expect("capture buffer lock poisoned");
            String::from_utf8_lossy(&buffer).into_owned()
        }
    }

    impl io::Write for CapturedOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0
                .lock()
                .expect("capture buffer lock poisoned")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Console sink writing records to `output` and failure reports to `errors`.
    pub(crate) fn captured_console(
        output: &CapturedOutput,
        errors: &CapturedOutput,
    ) -> super::ConsoleSink {
        let output = output.clone();
        let errors = errors.clone();
        super::ConsoleSink::new(move || output.clone(), move || errors.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::{test_util::*, *};
    use crate::error::FsOperation;

    #[derive(Debug, thiserror::Error)]
    #[error("disk quota exceeded")]
    struct QuotaExceeded(#[source] DeviceOffline);

    #[derive(Debug, thiserror::Error)]
    #[error("device offline")]
    struct DeviceOffline;

    #[test]
    fn report_prints_each_cause_once() {
        let output = CapturedOutput::default();
        let errors = CapturedOutput::default();
        let console = captured_console(&output, &errors);

        let error = LoggerError::RotationFailure(Box::new(LoggerError::filesystem(
            FsOperation::Rename,
            "/var/log/app.log",
            std::io::Error::other(QuotaExceeded(DeviceOffline)),
        )));
        console.report(&error);

        let reported = errors.contents();
        assert!(reported.starts_with(
            "Log rotation failed: Failed to rename `/var/log/app.log`: disk quota exceeded\n"
        ));
        assert_eq!(reported.matches("Failed to rename").count(), 1);
        assert_eq!(reported.matches("disk quota exceeded").count(), 1);
        assert!(reported.contains("    caused by: device offline\n"));
        assert!(output.contents().is_empty());
    }

    #[test]
    fn records_go_to_output_writer() {
        let output = CapturedOutput::default();
        let errors = CapturedOutput::default();
        let console = captured_console(&output, &errors);

        console.write(b"record\n").expect("write succeeds");

        assert_eq!(output.contents(), "record\n");
        assert!(errors.contents().is_empty());
    }
}
