//! Host-side `vagrant` and `VBoxManage` calls.
//!
//! Argument vectors are fixed; the guest image and its provisioning scripts
//! depend on them exactly as written here.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use super::SetupError;

/// Name given to the VirtualBox USB device filter.
pub const USB_FILTER_NAME: &str = "USB WiFI NIC";

/// Runs host commands from inside a Vagrant project directory.
#[derive(Debug, Clone)]
pub struct VagrantProject {
    dir: PathBuf,
}

impl VagrantProject {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn command(&self, argv: &[&str]) -> Command {
        let mut cmd = Command::new(argv[0]);
        cmd.args(&argv[1..]).current_dir(&self.dir);
        cmd
    }

    /// `vagrant snapshot list`; a nonzero exit is fatal.
    pub async fn snapshot_list(&self) -> Result<String, SetupError> {
        let argv = ["vagrant", "snapshot", "list"];
        let output = self
            .command(&argv)
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|source| SetupError::Command {
                command: argv.join(" "),
                source,
            })?;

        if !output.status.success() {
            return Err(SetupError::CommandFailed {
                command: argv.join(" "),
                status: output.status.code().unwrap_or(-1),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub async fn halt(&self) -> Result<(), SetupError> {
        self.call(&["vagrant", "halt", "--force"]).await
    }

    pub async fn restore_snapshot(&self, machine: &str, snapshot: &str) -> Result<(), SetupError> {
        self.call(&["VBoxManage", "snapshot", machine, "restore", snapshot])
            .await
    }

    /// Turn on the USB controller and xHCI (USB 3) support.
    pub async fn enable_usb(&self, machine: &str) -> Result<(), SetupError> {
        self.call(&["VBoxManage", "modifyvm", machine, "--usb", "on"])
            .await?;
        self.call(&["VBoxManage", "modifyvm", machine, "--usbxhci", "on"])
            .await
    }

    /// Register a filter so the adapter is captured by the VM on boot.
    pub async fn add_usb_filter(
        &self,
        machine: &str,
        vendor_id: &str,
        product_id: &str,
    ) -> Result<(), SetupError> {
        self.call(&[
            "VBoxManage",
            "usbfilter",
            "add",
            "0",
            "--name",
            USB_FILTER_NAME,
            "--target",
            machine,
            "--vendorid",
            vendor_id,
            "--productid",
            product_id,
        ])
        .await
    }

    pub async fn up(&self, log: &Path) -> Result<(), SetupError> {
        self.call_logged(&["vagrant", "up"], log).await
    }

    pub async fn wifi_connect(&self, log: &Path) -> Result<(), SetupError> {
        self.call_logged(&["vagrant", "ssh", "--", "/vbin/wifi-connect"], log)
            .await
    }

    pub async fn info(&self, log: &Path) -> Result<(), SetupError> {
        self.call_logged(&["vagrant", "ssh", "--", "/vbin/info"], log)
            .await
    }

    /// Run with inherited stdio. Only a launch failure is an error; a
    /// nonzero exit is logged and tolerated.
    async fn call(&self, argv: &[&str]) -> Result<(), SetupError> {
        debug!(command = %argv.join(" "), "running host command");
        let status = self
            .command(argv)
            .status()
            .await
            .map_err(|source| SetupError::Command {
                command: argv.join(" "),
                source,
            })?;

        if !status.success() {
            warn!(command = %argv.join(" "), ?status, "host command exited nonzero");
        }
        Ok(())
    }

    /// Like [`call`](Self::call) with stdout and stderr both sent to `log`.
    async fn call_logged(&self, argv: &[&str], log: &Path) -> Result<(), SetupError> {
        let log_err = |source| SetupError::Log {
            path: log.to_path_buf(),
            source,
        };
        let file = File::create(log).map_err(log_err)?;
        let file_err = file.try_clone().map_err(log_err)?;

        info!(command = %argv.join(" "), log = %log.display(), "running host command");
        let status = self
            .command(argv)
            .stdout(Stdio::from(file))
            .stderr(Stdio::from(file_err))
            .status()
            .await
            .map_err(|source| SetupError::Command {
                command: argv.join(" "),
                source,
            })?;

        if !status.success() {
            warn!(command = %argv.join(" "), ?status, log = %log.display(), "host command exited nonzero");
        }
        Ok(())
    }
}

/// Whether `listing` (output of `vagrant snapshot list`) names `snapshot`.
pub fn has_snapshot(listing: &str, snapshot: &str) -> bool {
    !snapshot.is_empty() && listing.lines().any(|l| l.trim_start().starts_with(snapshot))
}
