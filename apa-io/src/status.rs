use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{ApaIoError, Result};

const IN_PROGRESS: &str = "in_progress";
const DONE: &str = "done";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    NotStarted,
    InProgress,
    Done,
}

///
/// Persisted processing state of one sample's artifacts.
///
/// The marker lives next to the artifacts it guards. A missing file means
/// the sample was never processed; `in_progress` means a run is ongoing or
/// crashed; `done` means the artifacts are complete.
///
#[derive(Clone, Debug)]
pub struct StatusMarker {
    path: PathBuf,
}

impl StatusMarker {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        StatusMarker {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> Result<RunStatus> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RunStatus::NotStarted),
            Err(e) => return Err(e.into()),
        };

        match content.trim() {
            DONE => Ok(RunStatus::Done),
            // an empty marker is a run that died before writing its state
            IN_PROGRESS | "" => Ok(RunStatus::InProgress),
            other => Err(ApaIoError::InvalidStatus {
                path: self.path.display().to_string(),
                content: other.to_string(),
            }),
        }
    }

    ///
    /// Claim the sample for processing.
    ///
    /// Without `force` the marker is created exclusively, so of two runs
    /// starting on the same sample only one gets `true`. With `force` any
    /// existing state is overwritten.
    ///
    pub fn claim(&self, force: bool) -> Result<bool> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true);
        if force {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        match options.open(&self.path) {
            Ok(mut file) => {
                file.write_all(IN_PROGRESS.as_bytes())?;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::info!("{} already claimed, skipping", self.path.display());
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn mark_done(&self) -> Result<()> {
        std::fs::write(&self.path, DONE)?;
        Ok(())
    }

    /// Remove the marker, e.g. after a failed run so it can be retried.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let marker = StatusMarker::new(dir.path().join("m1/sample.RT.status"));

        assert_eq!(marker.status().unwrap(), RunStatus::NotStarted);
        assert!(marker.claim(false).unwrap());
        assert_eq!(marker.status().unwrap(), RunStatus::InProgress);

        // second claim without force loses
        assert!(!marker.claim(false).unwrap());

        marker.mark_done().unwrap();
        assert_eq!(marker.status().unwrap(), RunStatus::Done);
        assert!(!marker.claim(false).unwrap());

        assert!(marker.claim(true).unwrap());
        assert_eq!(marker.status().unwrap(), RunStatus::InProgress);

        marker.clear().unwrap();
        assert_eq!(marker.status().unwrap(), RunStatus::NotStarted);
        marker.clear().unwrap();
    }

    #[rstest]
    #[case("", RunStatus::InProgress)]
    #[case("done\n", RunStatus::Done)]
    #[case("in_progress", RunStatus::InProgress)]
    fn test_status_content(#[case] content: &str, #[case] expected: RunStatus) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.status");
        std::fs::write(&path, content).unwrap();

        assert_eq!(StatusMarker::new(&path).status().unwrap(), expected);
    }

    #[rstest]
    fn test_unknown_status_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.status");
        std::fs::write(&path, "halfway").unwrap();

        assert!(matches!(
            StatusMarker::new(&path).status(),
            Err(ApaIoError::InvalidStatus { .. })
        ));
    }
}
