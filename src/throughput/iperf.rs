//! iperf3 JSON report parsing.

use serde::Deserialize;
use serde_json::Value;

use super::{Direction, IterationResult, TestError};

/// The `end` section of an iperf3 `-J` report (subset of fields we care about).
#[derive(Debug, Deserialize)]
pub struct Iperf3End {
    pub sum_sent: Option<Iperf3Sum>,
    pub sum_received: Option<Iperf3Sum>,
}

#[derive(Debug, Deserialize)]
pub struct Iperf3Sum {
    pub bits_per_second: f64,
}

impl Iperf3End {
    fn sum_for(&self, direction: Direction) -> Option<&Iperf3Sum> {
        match direction {
            Direction::Download => self.sum_received.as_ref(),
            Direction::Upload => self.sum_sent.as_ref(),
        }
    }
}

/// Parse a guest's iperf3 output into the measurement for `direction`.
///
/// An `error` field is checked before anything else, so a failed test that
/// also lacks an `end` section surfaces the tool's own message.
pub fn parse_report(stdout: &[u8], direction: Direction) -> Result<IterationResult, TestError> {
    let raw = std::str::from_utf8(stdout)
        .map_err(|e| TestError::MalformedReport(format!("report is not UTF-8: {}", e)))?;

    let doc: Value = serde_json::from_str(raw)
        .map_err(|e| TestError::MalformedReport(format!("invalid JSON: {}", e)))?;

    if !doc.is_object() {
        return Err(TestError::MalformedReport(
            "report is not a JSON object".to_string(),
        ));
    }

    match doc.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(msg)) => return Err(TestError::Reported(msg.clone())),
        Some(other) => return Err(TestError::Reported(other.to_string())),
    }

    let end = doc
        .get("end")
        .ok_or_else(|| TestError::MalformedReport("missing `end` section".to_string()))?;
    let end: Iperf3End = serde_json::from_value(end.clone())
        .map_err(|e| TestError::MalformedReport(format!("bad `end` section: {}", e)))?;

    let sum = end.sum_for(direction).ok_or_else(|| {
        TestError::MalformedReport(format!("missing `end.{}`", direction.metric_key()))
    })?;

    Ok(IterationResult {
        direction,
        bits_per_second: sum.bits_per_second,
        raw: raw.to_string(),
    })
}
