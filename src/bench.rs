//! The benchmark loop: download then upload, once per iteration, with every
//! failure contained to the test that produced it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::guest::GuestCommandRunner;
use crate::session::RunLogger;
use crate::throughput::report::{self, Tally};
use crate::throughput::{iperf, Direction, IterationResult, TestError};

/// Printed when the guest command exits nonzero; by far the most common
/// cause is the USB adapter not showing up inside the VM.
pub const NIC_HINT: &str = "Unexpected error occurred (probably NIC not detected in VM)";

type Clock<'a> = Box<dyn Fn() -> DateTime<Utc> + Send + Sync + 'a>;

/// Per-direction outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopReport {
    pub iterations: usize,
    pub download: Tally,
    pub upload: Tally,
}

impl LoopReport {
    pub fn tally(&self, direction: Direction) -> &Tally {
        match direction {
            Direction::Download => &self.download,
            Direction::Upload => &self.upload,
        }
    }

    fn tally_mut(&mut self, direction: Direction) -> &mut Tally {
        match direction {
            Direction::Download => &mut self.download,
            Direction::Upload => &mut self.upload,
        }
    }
}

pub struct BenchmarkLoop<'a, R: GuestCommandRunner + ?Sized> {
    runner: &'a R,
    logger: &'a RunLogger,
    clock: Clock<'a>,
}

impl<'a, R: GuestCommandRunner + ?Sized> BenchmarkLoop<'a, R> {
    pub fn new(runner: &'a R, logger: &'a RunLogger) -> Self {
        Self {
            runner,
            logger,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the clock used to name raw report files.
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'a) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Run iterations `1..iteration_count`, i.e. one fewer than the bound.
    ///
    /// Never fails: each test's error is reported and the loop moves on.
    pub async fn run(&self, iteration_count: usize, download_cmd: &str, upload_cmd: &str) -> LoopReport {
        let width = iteration_count.to_string().len();
        let mut summary = LoopReport::default();

        info!(
            iteration_count,
            session = %self.logger.session_id(),
            "starting benchmark loop"
        );

        for x in 1..iteration_count {
            for (direction, command) in [
                (Direction::Download, download_cmd),
                (Direction::Upload, upload_cmd),
            ] {
                println!("{:>width$} | {} test", x, direction, width = width);

                match self.run_test(command, direction).await {
                    Ok(result) => {
                        let mbps = result.mbps();
                        println!("{}", report::format_mbps(mbps));
                        summary.tally_mut(direction).record_pass(mbps);
                    }
                    Err(err) => {
                        self.surface(x, direction, &err);
                        summary.tally_mut(direction).record_failure();
                    }
                }
            }
            summary.iterations += 1;
        }

        info!(
            iterations = summary.iterations,
            download_passed = summary.download.passed,
            upload_passed = summary.upload.passed,
            "benchmark loop finished"
        );
        summary
    }

    /// One guest invocation, parsed and persisted.
    pub async fn run_test(&self, command: &str, direction: Direction) -> Result<IterationResult, TestError> {
        let output = self.runner.run(command).await.map_err(TestError::Launch)?;

        if !output.success() {
            return Err(TestError::GuestCommand {
                status: output.status,
                stderr: output.stderr_lossy(),
            });
        }

        let result = iperf::parse_report(&output.stdout, direction)?;

        let completed = (self.clock)();
        self.logger
            .write_raw_report(direction, completed, &result.raw)?;
        self.logger.append_summary(direction, result.mbps())?;

        Ok(result)
    }

    fn surface(&self, iteration: usize, direction: Direction, err: &TestError) {
        match err {
            TestError::GuestCommand { status, stderr } => {
                warn!(iteration, %direction, status, %stderr, "guest command failed");
                println!("{}", NIC_HINT);
            }
            TestError::Reported(msg) => {
                warn!(iteration, %direction, error = %msg, "benchmark reported an error");
                println!("{}", msg);
            }
            TestError::MalformedReport(_) => {
                warn!(iteration, %direction, error = %err, "could not parse benchmark report");
                println!("{}", err);
            }
            TestError::Launch(_) | TestError::Io(_) => {
                error!(iteration, %direction, error = %err, "test aborted");
                println!("{}", err);
            }
        }
    }
}
