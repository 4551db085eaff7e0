//! Directory and active file management.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use crate::{entry::utc_timestamp, error::FsOperation, LoggerError};

/// The log directory and the active log file within it.
///
/// The file is never held open: every append opens the file by path, so that a rename performed
/// by the rotation leaves the next write landing in a fresh file at the canonical path.
#[derive(Debug)]
pub(crate) struct ActiveFile {
    directory: PathBuf,
    path: PathBuf,
    directory_exists: AtomicBool,
}

impl ActiveFile {
    pub(crate) fn new(directory: impl Into<PathBuf>, file_name: &str) -> Self {
        let directory = directory.into();
        let path = directory.join(file_name);
        Self {
            directory,
            path,
            directory_exists: AtomicBool::new(false),
        }
    }

    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the log directory if it does not exist yet.
    pub(crate) fn ensure_directory(&self) -> Result<(), LoggerError> {
        fs::create_dir_all(&self.directory).map_err(|error| {
            LoggerError::filesystem(FsOperation::CreateDirectory, &self.directory, error)
        })?;
        self.directory_exists.store(true, Ordering::Release);
        Ok(())
    }

    /// Appends a session marker to the active file, creating the file if needed.
    pub(crate) fn open(&self) -> Result<(), LoggerError> {
        let marker = format!(
            "\n*** New Logging Session Started (UTC time): {} ***\n",
            utc_timestamp()
        );
        self.append(marker.as_bytes())
    }

    /// Appends `bytes` to the active file with a single write.
    ///
    /// The directory is created again first if it was removed since the last write.
    pub(crate) fn append(&self, bytes: &[u8]) -> Result<(), LoggerError> {
        if !self.directory_exists.load(Ordering::Acquire) || !self.directory.is_dir() {
            self.ensure_directory()?;
        }

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(bytes))
            .map_err(|error| LoggerError::filesystem(FsOperation::Append, &self.path, error))
    }

    /// Renames the active file to `<file name>.<suffix>`, returning the archive path.
    pub(crate) fn archive(&self, suffix: &str) -> Result<PathBuf, LoggerError> {
        let mut archive_name = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default();
        archive_name.push(".");
        archive_name.push(suffix);
        let archive_path = self.directory.join(archive_name);

        fs::rename(&self.path, &archive_path)
            .map_err(|error| LoggerError::filesystem(FsOperation::Rename, &self.path, error))?;

        Ok(archive_path)
    }

    /// Deletes every entry of the log directory, then the directory itself.
    ///
    /// Stops at the first failure, possibly leaving the directory partially cleaned.
    pub(crate) fn remove_all(&self) -> Result<(), LoggerError> {
        let entries = fs::read_dir(&self.directory).map_err(|error| {
            LoggerError::filesystem(FsOperation::ReadDirectory, &self.directory, error)
        })?;

        for entry in entries {
            let entry = entry.map_err(|error| {
                LoggerError::filesystem(FsOperation::ReadDirectory, &self.directory, error)
            })?;
            let path = entry.path();
            fs::remove_file(&path)
                .map_err(|error| LoggerError::filesystem(FsOperation::RemoveFile, &path, error))?;
        }

        fs::remove_dir(&self.directory).map_err(|error| {
            LoggerError::filesystem(FsOperation::RemoveDirectory, &self.directory, error)
        })?;
        self.directory_exists.store(false, Ordering::Release);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_file_with_session_marker() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path().join("logs"), "app.log");

        active.ensure_directory().expect("directory created");
        active.open().expect("active file opened");

        let content = fs::read_to_string(active.path()).expect("active file readable");
        assert!(content.contains("*** New Logging Session Started (UTC time): "));
    }

    #[test]
    fn ensure_directory_is_idempotent() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path().join("logs"), "app.log");

        active.ensure_directory().expect("first call");
        active.ensure_directory().expect("second call");
        assert!(active.directory().is_dir());
    }

    #[test]
    fn ensure_directory_fails_when_path_is_a_file() {
        let temp = tempfile::tempdir().expect("temp dir");
        let collision = temp.path().join("logs");
        fs::write(&collision, b"not a directory").expect("file written");

        let active = ActiveFile::new(&collision, "app.log");
        let error = active.ensure_directory().expect_err("path collision");
        assert!(matches!(
            error,
            LoggerError::Filesystem {
                operation: FsOperation::CreateDirectory,
                ..
            }
        ));
    }

    #[test]
    fn append_recreates_removed_directory() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path().join("logs"), "app.log");
        active.ensure_directory().expect("directory created");

        fs::remove_dir(active.directory()).expect("directory removed externally");
        active.append(b"still here\n").expect("append succeeds");

        let content = fs::read_to_string(active.path()).expect("active file readable");
        assert_eq!(content, "still here\n");
    }

    #[test]
    fn archive_moves_active_file_aside() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path(), "app.log");
        active.append(b"old content\n").expect("append succeeds");

        let archive = active.archive("20261019.090000").expect("rename succeeds");

        assert_eq!(
            archive.file_name().and_then(|name| name.to_str()),
            Some("app.log.20261019.090000")
        );
        assert!(!active.path().exists());
        assert_eq!(
            fs::read_to_string(&archive).expect("archive readable"),
            "old content\n"
        );
    }

    #[test]
    fn remove_all_deletes_directory() {
        let temp = tempfile::tempdir().expect("temp dir");
        let active = ActiveFile::new(temp.path().join("logs"), "app.log");
        active.append(b"content\n").expect("append succeeds");
        fs::write(active.directory().join("app.log.1.2"), b"archived").expect("archive written");

        active.remove_all().expect("teardown succeeds");

        assert!(!active.directory().exists());
    }
}
