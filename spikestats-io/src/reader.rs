//! Recording loaders.
//!

use crate::Result;
use csv::{ReaderBuilder, Trim};
use spikestats_algorithms::RecordingSource;
use spikestats_core::{BoxError, RawEventTable};
use std::path::{Path, PathBuf};

/// Reads a comma-separated event table with a header row.
///
/// Fields are trimmed. Rows may have differing field counts; normalization
/// reports those with their row number.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not valid CSV.
pub fn read_event_csv<P: AsRef<Path>>(path: P) -> Result<RawEventTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_path(path.as_ref())?;

    let mut table = RawEventTable::new(reader.headers()?.iter());
    for record in reader.records() {
        table.push_row(record?.iter());
    }

    log::debug!(
        "read {} event row(s) from {}",
        table.len(),
        path.as_ref().display()
    );
    Ok(table)
}

/// Recordings laid out as `<data_dir>/<recording>/<recording>.csv`.
#[derive(Debug, Clone)]
pub struct RecordingDirectory {
    data_dir: PathBuf,
}

impl RecordingDirectory {
    /// Creates a loader rooted at `data_dir`.
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of one recording's event file.
    #[must_use]
    pub fn recording_path(&self, recording: &str) -> PathBuf {
        self.data_dir
            .join(recording)
            .join(format!("{recording}.csv"))
    }

    /// Reads one recording's event table.
    ///
    /// # Errors
    /// Returns an error if the file is missing or is not valid CSV.
    pub fn read(&self, recording: &str) -> Result<RawEventTable> {
        read_event_csv(self.recording_path(recording))
    }
}

impl RecordingSource for RecordingDirectory {
    fn load(&self, recording: &str) -> std::result::Result<RawEventTable, BoxError> {
        self.read(recording).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_recording_path_convention() {
        let dir = RecordingDirectory::new("/data");
        assert_eq!(
            dir.recording_path("rat_04"),
            PathBuf::from("/data/rat_04/rat_04.csv")
        );
    }

    #[test]
    fn test_read_event_csv_keeps_extra_columns() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("events.csv");
        fs::write(
            &path,
            ",spike_cluster,time,condition,amplitude\n0, 3, 0.25,Baseline,41.2\n1,3,0.5,CNO,40.0\n",
        )
        .unwrap();

        let table = read_event_csv(&path).unwrap();
        assert_eq!(
            table.headers(),
            ["", "spike_cluster", "time", "condition", "amplitude"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][1], "3");
        assert_eq!(table.rows()[0][2], "0.25");
    }

    #[test]
    fn test_missing_recording_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let dir = RecordingDirectory::new(tmp.path());
        let err = dir.read("absent").unwrap_err();
        assert!(matches!(err, Error::Csv(_) | Error::Io(_)));
        assert!(dir.load("absent").is_err());
    }
}
