//! Tab-separated per-cycle statistics of reactive steps.
//!
//! One row is written and flushed per reactive step, so a crashed or interrupted run leaves a
//! complete record of every step that finished.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

pub const METROPOLIS_HEADER: [&str; 4] = ["# cycle", "candidates", "chosen_reaction", "outcome"];
pub const RATE_HEADER: [&str; 4] = ["# cycle", "candidates", "accepted", "attempted"];

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("Failed to open statistics file '{path}': {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to write statistics row: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to flush statistics file: {0}")]
    Flush(#[from] std::io::Error),
}

/// One Metropolis reactive step.
///
/// `chosen_reaction` and `outcome` are `none` for cycles without candidates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetropolisRecord<'a> {
    pub cycle: usize,
    pub candidates: usize,
    pub chosen_reaction: &'a str,
    pub outcome: &'a str,
}

/// One Rate reactive step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateRecord {
    pub cycle: usize,
    pub candidates: usize,
    pub accepted: usize,
    pub attempted: usize,
}

pub struct StatisticsWriter {
    writer: csv::Writer<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for StatisticsWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsWriter").finish_non_exhaustive()
    }
}

impl StatisticsWriter {
    pub fn from_writer(sink: Box<dyn Write + Send>) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(sink);
        Self { writer }
    }

    /// Opens a statistics file for a run.
    ///
    /// # Arguments
    ///
    /// * `path` - The statistics file.
    /// * `header` - The column names, written only when the file is created fresh.
    /// * `append` - Whether the run continues a previous one. Restarted runs append to the
    ///   existing file and skip the header.
    ///
    /// # Errors
    ///
    /// Returns [`StatisticsError::Open`] if the file cannot be opened, or a write error if the
    /// header cannot be written.
    pub fn open(path: &Path, header: &[&str], append: bool) -> Result<Self, StatisticsError> {
        let file = if append {
            OpenOptions::new().create(true).append(true).open(path)
        } else {
            File::create(path)
        }
        .map_err(|e| StatisticsError::Open {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut writer = Self::from_writer(Box::new(file));
        if !append {
            writer.write_header(header)?;
        }
        Ok(writer)
    }

    pub fn write_header(&mut self, header: &[&str]) -> Result<(), StatisticsError> {
        self.writer.write_record(header)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_metropolis(&mut self, record: &MetropolisRecord<'_>) -> Result<(), StatisticsError> {
        self.write_row(record)
    }

    pub fn write_rate(&mut self, record: &RateRecord) -> Result<(), StatisticsError> {
        self.write_row(record)
    }

    fn write_row<S: Serialize>(&mut self, row: &S) -> Result<(), StatisticsError> {
        self.writer.serialize(row)?;
        self.writer.flush()?;
        Ok(())
    }
}
