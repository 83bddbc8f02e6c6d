//! Fire-and-forget delivery of trial results.
//!
//! A session hands each completed trial's [`ResultRecord`] to a sink and
//! moves on. Delivery is best effort: a sink must never block the session or
//! surface a failure to it, so `submit` returns nothing and write errors are
//! logged and dropped.

use pairex_core::ResultRecord;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

pub trait ResultSink {
    fn submit(&self, record: &ResultRecord);
}

impl<S: ResultSink + ?Sized> ResultSink for &S {
    fn submit(&self, record: &ResultRecord) {
        (**self).submit(record);
    }
}

impl<S: ResultSink + ?Sized> ResultSink for Arc<S> {
    fn submit(&self, record: &ResultRecord) {
        (**self).submit(record);
    }
}

/// In-memory sink for tests and post-session inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ResultRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ResultRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultSink for MemorySink {
    fn submit(&self, record: &ResultRecord) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record.clone()),
            Err(poisoned) => poisoned.into_inner().push(record.clone()),
        }
    }
}

/// Appends one JSON object per record to a local file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonLinesSink {
    fn submit(&self, record: &ResultRecord) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                warn!(sequence = record.sequence, error = %e, "failed to encode result, dropping");
                return;
            }
        };
        let mut file = match self.file.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(file, "{line}") {
            warn!(
                sequence = record.sequence,
                path = %self.path.display(),
                error = %e,
                "failed to write result, dropping"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairex_core::{Condition, Modality, ResultPayload};

    fn record(sequence: usize) -> ResultRecord {
        ResultRecord {
            participant_id: 7,
            condition: Condition::Male,
            sequence,
            block: None,
            payload: ResultPayload::Single {
                modality: Modality::Image,
                left: "all_images/male_face01_2.png".into(),
                right: "all_images/male_face01_1.png".into(),
                prompt: "Who do you think is taller?".into(),
                prompt_index: 4,
                key: '2',
                reaction_time_ms: 640,
            },
        }
    }

    #[test]
    fn memory_sink_keeps_submission_order() {
        let sink = MemorySink::new();
        sink.submit(&record(0));
        sink.submit(&record(1));
        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, 0);
        assert_eq!(records[1].sequence, 1);
    }

    #[test]
    fn jsonl_sink_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let sink = JsonLinesSink::open(&path).unwrap();
        sink.submit(&record(0));
        sink.submit(&record(1));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ResultRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, record(0));
    }
}
