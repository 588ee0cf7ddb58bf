//! Running benchmark commands inside the guest VM.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

use crate::shell;

/// In-guest download benchmark, run through `vagrant ssh`.
pub const DOWNLOAD_TEST_COMMAND: &str = "vagrant ssh -- /vbin/wifi-download-test.sh";
/// In-guest upload benchmark, run through `vagrant ssh`.
pub const UPLOAD_TEST_COMMAND: &str = "vagrant ssh -- /vbin/wifi-upload-test.sh";

/// Fully buffered result of one guest command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Process exit code; `-1` when the process was killed by a signal.
    pub status: i32,
}

impl GuestOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Executes one command line against the guest and reports what happened.
///
/// A nonzero exit status is a normal return value, not an error; `Err` means
/// the command could not be launched at all. No retries.
#[async_trait]
pub trait GuestCommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> std::io::Result<GuestOutput>;
}

/// Runs commands on the host with the Vagrant project directory as cwd, so
/// `vagrant ssh -- ...` reaches the project's guest.
#[derive(Debug, Clone)]
pub struct VagrantSshRunner {
    project_dir: PathBuf,
}

impl VagrantSshRunner {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

#[async_trait]
impl GuestCommandRunner for VagrantSshRunner {
    async fn run(&self, command: &str) -> std::io::Result<GuestOutput> {
        let argv = shell::split_words(command)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let (program, args) = argv.split_first().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line")
        })?;

        debug!(%command, cwd = %self.project_dir.display(), "running guest command");

        let output = tokio::process::Command::new(program)
            .args(args)
            .current_dir(&self.project_dir)
            .stdin(Stdio::null())
            .output()
            .await?;

        let status = output.status.code().unwrap_or(-1);
        debug!(%command, status, stdout_bytes = output.stdout.len(), "guest command finished");

        Ok(GuestOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            status,
        })
    }
}
