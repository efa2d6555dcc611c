//! Summary table persistence.

use crate::{Error, Result};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use spikestats_algorithms::{CombinedRow, CombinedSummary, SummarySink};
use spikestats_core::{BoxError, ClusterId};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the persisted summary.
pub const SUMMARY_FILE_NAME: &str = "spike_stats.csv";

/// Summary columns in file order.
pub const SUMMARY_COLUMNS: [&str; 4] = ["CV ISI", "Firing Rate", "recording", "cluster_id"];

/// Writes a combined summary as CSV. Undefined values become empty fields.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_summary_csv<P: AsRef<Path>>(path: P, summary: &CombinedSummary) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path.as_ref())?;
    writer.write_record(SUMMARY_COLUMNS)?;
    for row in summary.rows() {
        writer.write_record([
            format_value(row.cv_isi),
            format_value(row.firing_rate),
            row.recording.clone(),
            row.cluster_id.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a summary written by [`write_summary_csv`].
///
/// Columns are matched by name. Empty value fields read back as `NaN`.
///
/// # Errors
/// Returns [`Error::InvalidFormat`] for missing columns or unparsable fields.
pub fn read_summary_csv<P: AsRef<Path>>(path: P) -> Result<CombinedSummary> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path.as_ref())?;

    let headers = reader.headers()?.clone();
    let [cv_col, fr_col, rec_col, id_col] = SUMMARY_COLUMNS.map(|name| column(&headers, name));
    let (cv_col, fr_col, rec_col, id_col) = (cv_col?, fr_col?, rec_col?, id_col?);

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        let field = |col: usize| record.get(col).unwrap_or("");
        let cluster = field(id_col).parse::<u32>().map_err(|e| {
            Error::InvalidFormat(format!("line {line}: bad cluster_id `{}`: {e}", field(id_col)))
        })?;
        rows.push(CombinedRow {
            cv_isi: parse_value(field(cv_col), line)?,
            firing_rate: parse_value(field(fr_col), line)?,
            recording: field(rec_col).to_string(),
            cluster_id: ClusterId::new(cluster),
        });
    }
    Ok(CombinedSummary::from_rows(rows))
}

/// Persists the combined summary to `<temp_folder>/spike_stats.csv`.
#[derive(Debug, Clone)]
pub struct SummaryCsvWriter {
    temp_folder: PathBuf,
}

impl SummaryCsvWriter {
    /// Creates a writer targeting `temp_folder`.
    pub fn new<P: Into<PathBuf>>(temp_folder: P) -> Self {
        Self {
            temp_folder: temp_folder.into(),
        }
    }

    /// Output file path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.temp_folder.join(SUMMARY_FILE_NAME)
    }

    /// Writes the summary, creating the folder if needed.
    ///
    /// # Errors
    /// Returns an error if the folder or file cannot be written.
    pub fn write(&self, summary: &CombinedSummary) -> Result<()> {
        fs::create_dir_all(&self.temp_folder)?;
        let path = self.path();
        write_summary_csv(&path, summary)?;
        log::info!("wrote {} summary row(s) to {}", summary.len(), path.display());
        Ok(())
    }
}

impl SummarySink for SummaryCsvWriter {
    fn persist(&mut self, summary: &CombinedSummary) -> std::result::Result<(), BoxError> {
        self.write(summary).map_err(Into::into)
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn parse_value(field: &str, line: usize) -> Result<f64> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field
        .parse()
        .map_err(|e| Error::InvalidFormat(format!("line {line}: bad value `{field}`: {e}")))
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::InvalidFormat(format!("missing column `{name}`")))
}
