//! Throughput test results: direction, parsed iteration outcome, and the
//! per-test error taxonomy.

pub mod iperf;
pub mod report;

use serde::Serialize;
use thiserror::Error;

/// Which way traffic flows through the adapter under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Download,
    Upload,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Download, Direction::Upload];

    /// Key under the report's `end` section that holds this direction's totals.
    pub fn metric_key(self) -> &'static str {
        match self {
            Direction::Download => "sum_received",
            Direction::Upload => "sum_sent",
        }
    }

    /// Session subdirectory for raw reports.
    pub fn report_dir(self) -> &'static str {
        match self {
            Direction::Download => "downloads",
            Direction::Upload => "uploads",
        }
    }

    /// Session file holding the latest Mbps value.
    pub fn summary_file(self) -> &'static str {
        match self {
            Direction::Download => "download-results.txt",
            Direction::Upload => "upload-results.txt",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Direction::Download => "download",
            Direction::Upload => "upload",
        })
    }
}

/// Outcome of one successful benchmark invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationResult {
    pub direction: Direction,
    pub bits_per_second: f64,
    /// The report exactly as the guest printed it.
    pub raw: String,
}

impl IterationResult {
    /// Decimal megabits per second (10^6, not 2^20).
    pub fn mbps(&self) -> f64 {
        self.bits_per_second / 1_000_000.0
    }
}

/// Why a single download or upload test produced no measurement.
#[derive(Debug, Error)]
pub enum TestError {
    #[error("failed to launch guest command: {0}")]
    Launch(#[source] std::io::Error),

    #[error("guest command exited with status {status}: {stderr}")]
    GuestCommand { status: i32, stderr: String },

    #[error("malformed report: {0}")]
    MalformedReport(String),

    /// The report parsed but carried a non-null `error` field.
    #[error("{0}")]
    Reported(String),

    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_routing() {
        assert_eq!(Direction::Download.metric_key(), "sum_received");
        assert_eq!(Direction::Upload.metric_key(), "sum_sent");
        assert_eq!(Direction::Download.report_dir(), "downloads");
        assert_eq!(Direction::Upload.report_dir(), "uploads");
        assert_eq!(Direction::Download.summary_file(), "download-results.txt");
        assert_eq!(Direction::Upload.summary_file(), "upload-results.txt");
    }

    #[test]
    fn test_mbps_is_decimal_mega() {
        let result = IterationResult {
            direction: Direction::Download,
            bits_per_second: 94_500_000.0,
            raw: String::new(),
        };
        assert_eq!(result.mbps(), 94.5);
    }

    #[test]
    fn test_reported_error_displays_payload_verbatim() {
        let err = TestError::Reported("unable to connect to server".to_string());
        assert_eq!(err.to_string(), "unable to connect to server");
    }
}
