//! Run directories: one fresh, timestamped directory per batch.
//!
//! The timestamp is passed in by the caller, so nothing here reads the
//! clock except [`timestamp_now`].

use crate::defaults;
use crate::error::{EntcorrectError, Result};
use crate::pipeline::CorrectionRecord;
use crate::transcript::{format_rows, write_atomic};
use chrono::{DateTime, Local};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Format a run directory name.
pub fn timestamp(at: DateTime<Local>) -> String {
    at.format(defaults::RUN_DIR_FORMAT).to_string()
}

pub fn timestamp_now() -> String {
    timestamp(Local::now())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    path: PathBuf,
}

impl RunDirectory {
    /// Create `<root>/<stamp>`. A stamp already taken by an earlier run gets
    /// a numeric suffix so no run ever writes into another's directory.
    pub fn create(root: &Path, stamp: &str) -> Result<Self> {
        fs::create_dir_all(root)?;
        let mut path = root.join(stamp);
        let mut suffix = 0u32;
        loop {
            match fs::create_dir(&path) {
                Ok(()) => break,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    suffix += 1;
                    path = root.join(format!("{stamp}_{suffix}"));
                }
                Err(e) => return Err(e.into()),
            }
        }
        log::debug!("created run directory {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn hyp_path(&self) -> PathBuf {
        self.path.join(defaults::HYP_FILENAME)
    }

    pub fn report_path(&self) -> PathBuf {
        self.path.join(defaults::REPORT_FILENAME)
    }

    /// Write the decision report, then the corrected transcript.
    ///
    /// Both files appear atomically; `hyp` is written last, so its presence
    /// marks a complete run.
    pub fn write(&self, records: &[CorrectionRecord]) -> Result<PathBuf> {
        let mut report = String::new();
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| EntcorrectError::Other(format!("Failed to encode report: {e}")))?;
            report.push_str(&line);
            report.push('\n');
        }
        write_atomic(&self.report_path(), &report)?;

        let hyp = format_rows(
            records
                .iter()
                .map(|r| (r.id.as_str(), r.corrected.as_str())),
        );
        let hyp_path = self.hyp_path();
        write_atomic(&hyp_path, &hyp)?;
        Ok(hyp_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Decision, Detection, Span};
    use chrono::TimeZone;

    fn record(id: &str, original: &str, corrected: &str) -> CorrectionRecord {
        CorrectionRecord {
            id: id.to_string(),
            original: original.to_string(),
            corrected: corrected.to_string(),
            decisions: Vec::new(),
        }
    }

    #[test]
    fn timestamp_uses_run_dir_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(timestamp(at), "2024_03_09__07_05_01");
    }

    #[test]
    fn create_makes_fresh_directory_under_root() {
        let root = tempfile::tempdir().unwrap();
        let run = RunDirectory::create(&root.path().join("dump"), "2024_01_01__00_00_00").unwrap();
        assert!(run.path().is_dir());
        assert!(run.path().ends_with("dump/2024_01_01__00_00_00"));
    }

    #[test]
    fn create_never_reuses_a_directory() {
        let root = tempfile::tempdir().unwrap();
        let first = RunDirectory::create(root.path(), "stamp").unwrap();
        let second = RunDirectory::create(root.path(), "stamp").unwrap();
        assert_ne!(first, second);
        assert!(second.path().ends_with("stamp_1"));
    }

    #[test]
    fn write_produces_hyp_and_report() {
        let root = tempfile::tempdir().unwrap();
        let run = RunDirectory::create(root.path(), "stamp").unwrap();

        let text = "我 要去 北jing 出差";
        let start = text.find("北jing").unwrap();
        let detection =
            Detection::from_text(text, Span::new(start, start + "北jing".len()), "GPE").unwrap();
        let mut first = record("u1", text, "我 要去 北京 出差");
        first.decisions.push(Decision::accept(&detection, "北京"));
        let records = vec![first, record("u2", "没有", "没有")];

        let hyp_path = run.write(&records).unwrap();
        let hyp = fs::read_to_string(hyp_path).unwrap();
        assert_eq!(hyp, "u1 我 要去 北京 出差\nu2 没有\n");

        let report = fs::read_to_string(run.report_path()).unwrap();
        let lines: Vec<serde_json::Value> = report
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["decisions"][0]["replacement"], "北京");
        assert_eq!(lines[0]["decisions"][0]["reason"], "accepted");
        assert_eq!(lines[1]["decisions"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn write_leaves_no_temporary_files() {
        let root = tempfile::tempdir().unwrap();
        let run = RunDirectory::create(root.path(), "stamp").unwrap();
        run.write(&[record("u1", "a", "a")]).unwrap();
        let mut names: Vec<_> = fs::read_dir(run.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["decisions.jsonl", "hyp"]);
    }
}
