//! On-disk layout of one benchmark run.
//!
//! ```text
//! logs/{run}/
//!     vagrant.log  wifi-connect.log  info.log
//!     download-results.txt  upload-results.txt
//!     downloads/{ts}.json   uploads/{ts}.json
//! ```
//!
//! A session is created once and then only written into; nothing here
//! removes or renames files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::throughput::report::{self, Tally};
use crate::throughput::{iperf, Direction};

/// Timestamp layout shared by session directories and raw report files.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session directory already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("not a session directory: {}", .0.display())]
    NotASession(PathBuf),

    #[error("failed to create {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Setup logs captured before the benchmark loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLog {
    Vagrant,
    WifiConnect,
    Info,
}

impl SessionLog {
    pub fn file_name(self) -> &'static str {
        match self {
            SessionLog::Vagrant => "vagrant.log",
            SessionLog::WifiConnect => "wifi-connect.log",
            SessionLog::Info => "info.log",
        }
    }
}

/// Writer for one session directory.
#[derive(Debug, Clone)]
pub struct RunLogger {
    root: PathBuf,
    session_id: String,
}

impl RunLogger {
    /// Create `{base_dir}/{timestamp}` with its `downloads` and `uploads`
    /// subdirectories. `base_dir` is created if missing; the session
    /// directory itself must be new.
    pub fn ensure_session(base_dir: &Path, started: DateTime<Utc>) -> Result<Self, SessionError> {
        fs::create_dir_all(base_dir).map_err(|source| SessionError::Create {
            path: base_dir.to_path_buf(),
            source,
        })?;

        let session_id = format_timestamp(started);
        let root = base_dir.join(&session_id);

        fs::create_dir(&root).map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                SessionError::AlreadyExists(root.clone())
            } else {
                SessionError::Create {
                    path: root.clone(),
                    source,
                }
            }
        })?;

        for direction in Direction::ALL {
            let dir = root.join(direction.report_dir());
            fs::create_dir(&dir).map_err(|source| SessionError::Create { path: dir, source })?;
        }

        info!(session = %session_id, root = %root.display(), "created run session");
        Ok(Self { root, session_id })
    }

    /// Attach to a session that already exists on disk.
    pub fn open(root: &Path) -> Result<Self, SessionError> {
        let complete = Direction::ALL
            .iter()
            .all(|d| root.join(d.report_dir()).is_dir());
        if !complete {
            return Err(SessionError::NotASession(root.to_path_buf()));
        }

        let session_id = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SessionError::NotASession(root.to_path_buf()))?;

        Ok(Self {
            root: root.to_path_buf(),
            session_id,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn log_path(&self, log: SessionLog) -> PathBuf {
        self.root.join(log.file_name())
    }

    pub fn summary_path(&self, direction: Direction) -> PathBuf {
        self.root.join(direction.summary_file())
    }

    /// Store the full report of one iteration as
    /// `{direction dir}/{completed}.json`.
    ///
    /// Opened in append mode: two reports completing in the same second end
    /// up concatenated in one file instead of one replacing the other.
    pub fn write_raw_report(
        &self,
        direction: Direction,
        completed: DateTime<Utc>,
        raw: &str,
    ) -> std::io::Result<PathBuf> {
        let path = self
            .root
            .join(direction.report_dir())
            .join(format!("{}.json", format_timestamp(completed)));

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(raw.as_bytes())?;

        debug!(path = %path.display(), bytes = raw.len(), "wrote raw report");
        Ok(path)
    }

    /// Replace the direction's summary file with `mbps`.
    ///
    /// The file only ever holds the latest measurement; downstream tooling
    /// reads it as a single value.
    pub fn append_summary(&self, direction: Direction, mbps: f64) -> std::io::Result<()> {
        let path = self.summary_path(direction);
        fs::write(&path, report::format_summary_value(mbps))?;
        debug!(path = %path.display(), mbps, "updated summary");
        Ok(())
    }

    /// Raw report files for `direction`, oldest first.
    pub fn raw_reports(&self, direction: Direction) -> std::io::Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(self.root.join(direction.report_dir()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Re-read every raw report of this session into per-direction tallies.
    /// Files that no longer parse count as failures.
    pub fn summarize(&self) -> std::io::Result<SessionSummary> {
        let mut summary = SessionSummary {
            session_id: self.session_id.clone(),
            download: Tally::default(),
            upload: Tally::default(),
        };

        for direction in Direction::ALL {
            let tally = match direction {
                Direction::Download => &mut summary.download,
                Direction::Upload => &mut summary.upload,
            };
            for path in self.raw_reports(direction)? {
                let bytes = fs::read(&path)?;
                match iperf::parse_report(&bytes, direction) {
                    Ok(result) => tally.record_pass(result.mbps()),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unreadable report");
                        tally.record_failure();
                    }
                }
            }
        }

        Ok(summary)
    }
}

/// Tallies recomputed from a finished session's raw reports.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub download: Tally,
    pub upload: Tally,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 6, 1, 12, 30, secs).unwrap()
    }

    #[test]
    fn test_ensure_session_creates_tree() {
        let base = tempfile::tempdir().unwrap();
        let logs = base.path().join("logs");
        let logger = RunLogger::ensure_session(&logs, at(5)).unwrap();

        assert_eq!(logger.session_id(), "2017-06-01-12-30-05");
        assert_eq!(logger.root(), logs.join("2017-06-01-12-30-05"));
        assert!(logger.root().join("downloads").is_dir());
        assert!(logger.root().join("uploads").is_dir());
        assert_eq!(
            logger.log_path(SessionLog::WifiConnect),
            logger.root().join("wifi-connect.log")
        );
    }

    #[test]
    fn test_ensure_session_refuses_existing_directory() {
        let base = tempfile::tempdir().unwrap();
        RunLogger::ensure_session(base.path(), at(0)).unwrap();
        match RunLogger::ensure_session(base.path(), at(0)) {
            Err(SessionError::AlreadyExists(path)) => {
                assert_eq!(path, base.path().join("2017-06-01-12-30-00"))
            }
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_reports_named_by_completion_time() {
        let base = tempfile::tempdir().unwrap();
        let logger = RunLogger::ensure_session(base.path(), at(0)).unwrap();

        let first = logger
            .write_raw_report(Direction::Download, at(10), "{\"a\":1}")
            .unwrap();
        let second = logger
            .write_raw_report(Direction::Download, at(11), "{\"a\":2}")
            .unwrap();
        logger
            .write_raw_report(Direction::Upload, at(12), "{\"b\":1}")
            .unwrap();

        assert_eq!(
            first,
            logger.root().join("downloads").join("2017-06-01-12-30-10.json")
        );
        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "{\"a\":1}");
        assert_eq!(
            logger.raw_reports(Direction::Download).unwrap(),
            vec![first, second]
        );
        assert_eq!(logger.raw_reports(Direction::Upload).unwrap().len(), 1);
    }

    #[test]
    fn test_same_second_reports_are_not_overwritten() {
        let base = tempfile::tempdir().unwrap();
        let logger = RunLogger::ensure_session(base.path(), at(0)).unwrap();

        let a = logger.write_raw_report(Direction::Upload, at(3), "one").unwrap();
        let b = logger.write_raw_report(Direction::Upload, at(3), "two").unwrap();

        assert_eq!(a, b);
        assert_eq!(fs::read_to_string(&a).unwrap(), "onetwo");
    }

    #[test]
    fn test_append_summary_overwrites() {
        let base = tempfile::tempdir().unwrap();
        let logger = RunLogger::ensure_session(base.path(), at(0)).unwrap();

        logger.append_summary(Direction::Upload, 50.0).unwrap();
        logger.append_summary(Direction::Upload, 73.2).unwrap();

        let text = fs::read_to_string(logger.root().join("upload-results.txt")).unwrap();
        assert_eq!(text, "73.2");
        assert!(!logger.summary_path(Direction::Download).exists());
    }

    #[test]
    fn test_summarize_rereads_raw_reports() {
        let base = tempfile::tempdir().unwrap();
        let logger = RunLogger::ensure_session(base.path(), at(0)).unwrap();

        let report = |bits: f64| {
            format!(
                r#"{{"end": {{"sum_sent": {{"bits_per_second": {b}}}, "sum_received": {{"bits_per_second": {b}}}}}}}"#,
                b = bits
            )
        };
        logger
            .write_raw_report(Direction::Download, at(1), &report(40_000_000.0))
            .unwrap();
        logger
            .write_raw_report(Direction::Download, at(2), &report(60_000_000.0))
            .unwrap();
        logger
            .write_raw_report(Direction::Upload, at(3), "truncated {")
            .unwrap();

        let summary = logger.summarize().unwrap();
        assert_eq!(summary.session_id, "2017-06-01-12-30-00");
        assert_eq!(summary.download.passed, 2);
        assert_eq!(summary.download.mean_mbps, Some(50.0));
        assert_eq!(summary.upload.passed, 0);
        assert_eq!(summary.upload.failed, 1);
    }

    #[test]
    fn test_open_existing_session() {
        let base = tempfile::tempdir().unwrap();
        let created = RunLogger::ensure_session(base.path(), at(7)).unwrap();

        let opened = RunLogger::open(created.root()).unwrap();
        assert_eq!(opened.session_id(), created.session_id());

        assert!(matches!(
            RunLogger::open(base.path()),
            Err(SessionError::NotASession(_))
        ));
    }
}
