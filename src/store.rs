//! # Trace Store
//!
//! One append-only JSONL file per target under the output directory. The
//! count of deserializable records in a file is the authoritative progress
//! counter, so an interrupted batch resumes without any separate index.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::trace::RunRecord;

pub const RECORD_EXTENSION: &str = "jsonl";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Strip the scheme and any `www.` prefix so one target maps to one stable
/// file name regardless of how the list spelled it.
pub fn sanitize_target(target: &str) -> String {
    let stripped = target
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    stripped.trim_start_matches("www.").to_string()
}

/// Output file path for a target.
pub fn record_path(out_dir: &Path, target: &str) -> PathBuf {
    out_dir.join(format!("{}.{RECORD_EXTENSION}", sanitize_target(target)))
}

/// Count the records already persisted for `target`. A missing file counts
/// as zero; a trailing line that fails to deserialize (torn write from a
/// crashed process) stops the count there.
pub fn count_records(out_dir: &Path, target: &str) -> Result<usize, StoreError> {
    let path = record_path(out_dir, target);
    if !path.exists() {
        return Ok(0);
    }

    let reader = BufReader::new(File::open(&path)?);
    let mut count = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RunRecord>(&line) {
            Ok(_) => count += 1,
            Err(err) => {
                debug!(
                    "stopping record count at undecodable line in {}: {err}",
                    path.display()
                );
                break;
            }
        }
    }
    Ok(count)
}

/// Read back every record persisted for `target`.
pub fn read_records(out_dir: &Path, target: &str) -> Result<Vec<RunRecord>, StoreError> {
    let path = record_path(out_dir, target);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let reader = BufReader::new(File::open(&path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RunRecord>(&line) {
            Ok(record) => records.push(record),
            Err(_) => break,
        }
    }
    Ok(records)
}

/// Append-only writer for one target's record file.
pub struct TargetStore {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl TargetStore {
    /// Open the target's file for appending, creating it if absent.
    pub fn open(out_dir: &Path, target: &str) -> Result<Self, StoreError> {
        std::fs::create_dir_all(out_dir)?;
        let path = record_path(out_dir, target);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to disk immediately, so every
    /// persisted run survives a later crash.
    pub fn append(&mut self, record: &RunRecord) -> Result<(), StoreError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Trace;

    fn record(target: &str) -> RunRecord {
        RunRecord {
            trace: Trace::Samples(vec![10, 20, 30]),
            target: target.to_string(),
        }
    }

    #[test]
    fn sanitizes_scheme_and_www() {
        assert_eq!(sanitize_target("https://www.example.com"), "example.com");
        assert_eq!(sanitize_target("http://example.com"), "example.com");
        assert_eq!(sanitize_target("example.com"), "example.com");
    }

    #[test]
    fn append_then_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = "https://example.com";

        let mut store = TargetStore::open(dir.path(), target).expect("open");
        store.append(&record(target)).expect("append");
        store.append(&record(target)).expect("append");
        drop(store);

        assert_eq!(count_records(dir.path(), target).expect("count"), 2);
        let records = read_records(dir.path(), target).expect("read");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].target, target);
    }

    #[test]
    fn missing_file_counts_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(count_records(dir.path(), "nowhere.net").expect("count"), 0);
    }

    #[test]
    fn torn_trailing_line_stops_the_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = "example.com";

        let mut store = TargetStore::open(dir.path(), target).expect("open");
        store.append(&record(target)).expect("append");
        drop(store);

        let path = record_path(dir.path(), target);
        let mut file = OpenOptions::new().append(true).open(&path).expect("open");
        file.write_all(b"{\"trace\":{\"kind\":\"Samples\",\"da")
            .expect("torn write");
        drop(file);

        assert_eq!(count_records(dir.path(), target).expect("count"), 1);
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = "example.com";

        let mut store = TargetStore::open(dir.path(), target).expect("open");
        store.append(&record(target)).expect("append");
        drop(store);

        let mut store = TargetStore::open(dir.path(), target).expect("reopen");
        store.append(&record(target)).expect("append");
        drop(store);

        assert_eq!(count_records(dir.path(), target).expect("count"), 2);
    }
}
