//! Throughput result formatting for the operator and the summary files.

use serde::Serialize;

use super::Direction;

/// The per-iteration line printed after a successful test.
pub fn format_mbps(mbps: f64) -> String {
    format!("{:.6} Mbps", mbps)
}

/// Text stored in a summary file: shortest round-trip decimal, always with a
/// fractional part (`94.5`, `100.0`). Very small or large values switch to
/// exponent form with a signed, two-digit-minimum exponent (`1e-05`,
/// `1.5e+16`); NaN is written `nan`.
pub fn format_summary_value(mbps: f64) -> String {
    if mbps.is_nan() {
        return "nan".to_string();
    }
    let text = format!("{:?}", mbps);
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{}e{}{:0>2}", mantissa, sign, digits)
}

/// Running aggregate of one direction's outcomes across a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub mean_mbps: Option<f64>,
    pub min_mbps: Option<f64>,
    pub max_mbps: Option<f64>,
}

impl Tally {
    pub fn record_pass(&mut self, mbps: f64) {
        let n = self.passed as f64;
        self.mean_mbps = Some(match self.mean_mbps {
            Some(mean) => (mean * n + mbps) / (n + 1.0),
            None => mbps,
        });
        self.min_mbps = Some(self.min_mbps.map_or(mbps, |m| m.min(mbps)));
        self.max_mbps = Some(self.max_mbps.map_or(mbps, |m| m.max(mbps)));
        self.passed += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn attempts(&self) -> usize {
        self.passed + self.failed
    }
}

/// Format a tally as a one-line human-readable summary.
pub fn format_tally(direction: Direction, tally: &Tally) -> String {
    let mut line = format!(
        "{:<8} {}/{} passed",
        direction,
        tally.passed,
        tally.attempts()
    );

    if let (Some(mean), Some(min), Some(max)) = (tally.mean_mbps, tally.min_mbps, tally.max_mbps) {
        line.push_str(&format!(
            ", mean {:.2} Mbps (min {:.2}, max {:.2})",
            mean, min, max
        ));
    }

    line
}
