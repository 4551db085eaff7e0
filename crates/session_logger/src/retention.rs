//! Age-based pruning of the log directory.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use crate::{console::ConsoleSink, error::FsOperation, file::ActiveFile, LoggerError};

/// Result of one pruning sweep.
#[derive(Debug, Default)]
pub(crate) struct PruneOutcome {
    pub(crate) removed: Vec<PathBuf>,
    pub(crate) failures: Vec<LoggerError>,
}

/// Deletes files in the log directory that are older than `retention`.
///
/// Each file is handled independently: a failure to stat or delete one file is recorded in the
/// outcome and the sweep continues with the remaining files. The active file and anything that
/// is not a regular file are left alone. A file exactly `retention` old is kept.
pub(crate) fn prune_by_age(
    active: &ActiveFile,
    retention: Duration,
    now: SystemTime,
) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();

    let entries = match fs::read_dir(active.directory()) {
        Ok(entries) => entries,
        Err(error) => {
            outcome.failures.push(LoggerError::filesystem(
                FsOperation::ReadDirectory,
                active.directory(),
                error,
            ));
            return outcome;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(error) => {
                outcome.failures.push(LoggerError::filesystem(
                    FsOperation::ReadDirectory,
                    active.directory(),
                    error,
                ));
                continue;
            }
        };

        if path == active.path() {
            continue;
        }

        match file_age(&path, now) {
            Ok(Some(age)) if age > retention => match fs::remove_file(&path) {
                Ok(()) => outcome.removed.push(path),
                Err(error) => outcome.failures.push(LoggerError::filesystem(
                    FsOperation::RemoveFile,
                    &path,
                    error,
                )),
            },
            Ok(_) => (),
            Err(error) => outcome.failures.push(error),
        }
    }

    outcome
}

/// Runs [`prune_by_age()`] and reports its outcome to the console.
pub(crate) fn prune_and_report(
    active: &ActiveFile,
    retention: Duration,
    console: &ConsoleSink,
) -> PruneOutcome {
    let outcome = prune_by_age(active, retention, SystemTime::now());

    for failure in &outcome.failures {
        console.report(failure);
    }
    if !outcome.removed.is_empty() {
        tracing::info!(removed = outcome.removed.len(), "pruned old log files");
        console.notice(&format!(
            "{}: Old logs pruned successfully ({} removed)",
            crate::entry::utc_timestamp(),
            outcome.removed.len()
        ));
    }

    outcome
}

/// Age of a regular file, based on its creation time.
///
/// Platforms that do not record creation times fall back to the modification time. Returns
/// `None` for entries that are not regular files.
fn file_age(path: &Path, now: SystemTime) -> Result<Option<Duration>, LoggerError> {
    let metadata = fs::metadata(path)
        .map_err(|error| LoggerError::filesystem(FsOperation::Stat, path, error))?;

    if !metadata.is_file() {
        return Ok(None);
    }

    let created = metadata
        .created()
        .or_else(|_| metadata.modified())
        .map_err(|error| LoggerError::filesystem(FsOperation::Stat, path, error))?;

    Ok(Some(now.duration_since(created).unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_old_files_and_keeps_recent_ones() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path(), "app.log");
        let archive = temp.path().join("app.log.20261012.090000");
        fs::write(&archive, b"archived").expect("archive written");

        // Nothing is a day old yet.
        let outcome = prune_by_age(&active, Duration::from_secs(86_400), SystemTime::now());
        assert!(outcome.removed.is_empty());
        assert!(archive.exists());

        // Evaluated two days later, the archive is past retention.
        let later = SystemTime::now() + Duration::from_secs(2 * 86_400);
        let outcome = prune_by_age(&active, Duration::from_secs(86_400), later);
        assert_eq!(outcome.removed, vec![archive.clone()]);
        assert!(outcome.failures.is_empty());
        assert!(!archive.exists());
    }

    #[test]
    fn never_removes_active_file_or_directories() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path(), "app.log");
        active.append(b"live\n").expect("append succeeds");
        fs::create_dir(temp.path().join("nested")).expect("nested dir created");

        let later = SystemTime::now() + Duration::from_secs(3600);
        let outcome = prune_by_age(&active, Duration::from_millis(1), later);

        assert!(outcome.removed.is_empty());
        assert!(outcome.failures.is_empty());
        assert!(active.path().exists());
        assert!(temp.path().join("nested").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn failing_entry_does_not_stop_the_sweep() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path(), "app.log");
        let dangling = temp.path().join("a.link");
        std::os::unix::fs::symlink(temp.path().join("gone"), &dangling).expect("symlink created");
        let expired = temp.path().join("z.old");
        fs::write(&expired, b"old").expect("expired file written");

        let later = SystemTime::now() + Duration::from_secs(2 * 86_400);
        let outcome = prune_by_age(&active, Duration::from_secs(86_400), later);

        assert_eq!(outcome.removed, vec![expired.clone()]);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures.first(),
            Some(LoggerError::Filesystem {
                operation: FsOperation::Stat,
                ..
            })
        ));
        assert!(!expired.exists());
    }

    #[test]
    fn missing_directory_is_reported_not_panicking() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path().join("absent"), "app.log");

        let outcome = prune_by_age(&active, Duration::from_millis(1), SystemTime::now());

        assert!(outcome.removed.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(
            outcome.failures.first().and_then(LoggerError::io_kind),
            Some(std::io::ErrorKind::NotFound)
        );
    }
}
