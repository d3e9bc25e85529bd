// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Append-only CSV result sink.
//!
//! Rows are written and flushed one at a time, so a run that aborts halfway
//! leaves every completed iteration on disk. Existing content is never
//! truncated; several runs can accumulate into one file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LoadlineError, LoadlineResult};
use crate::types::BenchmarkResult;

/// Fixed CSV header line.
pub const CSV_HEADER: &str = "Num,Size,Layers,Push,Pull\n";

/// When the header line is written.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// Once per run, even when appending to a file that already has one.
    #[default]
    Always,
    /// Only when the file was empty at open time.
    IfNew,
}

/// CSV writer over any byte sink.
pub struct ResultSink<W: Write> {
    writer: W,
    path: PathBuf,
    was_empty: bool,
    rows_written: u64,
}

impl ResultSink<File> {
    /// Open `path` for appending, creating it if absent.
    pub fn open(path: impl AsRef<Path>) -> LoadlineResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LoadlineError::OutputOpen {
                path: path.to_path_buf(),
                source: e,
            })?;

        let was_empty = file
            .metadata()
            .map_err(|e| LoadlineError::OutputOpen {
                path: path.to_path_buf(),
                source: e,
            })?
            .len()
            == 0;

        tracing::debug!(path = %path.display(), was_empty, "Opened result file");

        Ok(Self {
            writer: file,
            path: path.to_path_buf(),
            was_empty,
            rows_written: 0,
        })
    }

    /// Flush, sync to disk, and close the file.
    pub fn close(self) -> LoadlineResult<()> {
        let path = self.path.clone();
        let file = self.finish()?;
        file.sync_all()
            .map_err(|e| LoadlineError::OutputWrite { path, source: e })
    }
}

impl<W: Write> ResultSink<W> {
    /// Wrap an arbitrary writer. `label` stands in for the path in errors.
    pub fn from_writer(writer: W, label: impl Into<PathBuf>, was_empty: bool) -> Self {
        Self {
            writer,
            path: label.into(),
            was_empty,
            rows_written: 0,
        }
    }

    /// Write the header line unconditionally.
    pub fn write_header(&mut self) -> LoadlineResult<()> {
        self.write_line(CSV_HEADER)
    }

    /// Write the header if `policy` calls for it. Returns whether it was written.
    pub fn apply_header_policy(&mut self, policy: HeaderPolicy) -> LoadlineResult<bool> {
        let write = match policy {
            HeaderPolicy::Always => true,
            HeaderPolicy::IfNew => self.was_empty,
        };
        if write {
            self.write_header()?;
        }
        Ok(write)
    }

    /// Append one result row and flush it.
    pub fn write_result(&mut self, result: &BenchmarkResult) -> LoadlineResult<()> {
        self.write_line(&result.to_csv_row())?;
        self.rows_written += 1;
        Ok(())
    }

    /// Number of result rows written through this handle.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> LoadlineResult<W> {
        self.writer.flush().map_err(|e| LoadlineError::OutputWrite {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(self.writer)
    }

    fn write_line(&mut self, line: &str) -> LoadlineResult<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| LoadlineError::OutputWrite {
                path: self.path.clone(),
                source: e,
            })
    }
}
