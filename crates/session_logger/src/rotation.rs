//! Time-based rotation of the active log file.

use std::{
    path::PathBuf,
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use time::{macros::format_description, OffsetDateTime};

use crate::{
    console::ConsoleSink,
    file::ActiveFile,
    retention::{self, PruneOutcome},
    LoggerError,
};

/// Suffix appended to the active file name when it is archived, from the local date and time.
///
/// Example: "20261019.093015"
pub(crate) fn rotation_suffix() -> String {
    // Obtaining the local offset fails on some platforms in multithreaded processes.
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(format_description!(
        "[year][month][day].[hour][minute][second]"
    ))
    .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// The work performed on every rotation tick.
#[derive(Clone, Debug)]
pub(crate) struct RotationTask {
    pub(crate) active: Arc<ActiveFile>,
    pub(crate) retention: Duration,
    pub(crate) console: Arc<ConsoleSink>,
}

/// Result of one rotation tick.
#[derive(Debug, Default)]
pub(crate) struct RotationOutcome {
    /// Path of the archive file, if the active file was renamed.
    pub(crate) archive: Option<PathBuf>,

    pub(crate) pruned: PruneOutcome,
}

impl RotationTask {
    /// Archives the active file, opens a fresh one and prunes old files.
    ///
    /// Failures are reported to the console and never returned. The active file is reopened
    /// even if archiving it failed, so the canonical path is always writable after a tick.
    pub(crate) fn tick(&self) -> RotationOutcome {
        let suffix = rotation_suffix();

        let archive = match self.active.archive(&suffix) {
            Ok(archive) => {
                tracing::info!(archive = %archive.display(), "rotated log file");
                Some(archive)
            }
            Err(error) => {
                self.console
                    .report(&LoggerError::RotationFailure(Box::new(error)));
                None
            }
        };

        if let Err(error) = self.active.open() {
            self.console
                .report(&LoggerError::RotationFailure(Box::new(error)));
        }

        let pruned = retention::prune_and_report(&self.active, self.retention, &self.console);

        RotationOutcome { archive, pruned }
    }
}

/// Background worker running a [`RotationTask`] at a fixed interval until stopped.
#[derive(Debug)]
pub(crate) struct RotationScheduler {
    stop: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl RotationScheduler {
    pub(crate) fn start(task: RotationTask, interval: Duration) -> Result<Self, LoggerError> {
        let (stop, stopped) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("session-logger-rotation".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        task.tick();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(LoggerError::Scheduler)?;

        Ok(Self {
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    /// Stops the worker and waits for an in-progress tick to finish.
    pub(crate) fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                tracing::error!("session logger rotation worker panicked");
            }
        }
    }
}

impl Drop for RotationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
