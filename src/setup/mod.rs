//! One-time environment preparation before the benchmark loop: pick the
//! adapter, restore the VM, pass the adapter through, boot, and connect.

pub mod usb;
pub mod vm;

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, MachineConfig};
use crate::session::{RunLogger, SessionError, SessionLog};
use usb::{UsbDevice, UsbIds};
use vm::VagrantProject;

/// Anything that stops the run before the first iteration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid device selection: {0}")]
    InvalidSelection(String),

    #[error("no USB devices found")]
    NoDevices,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Snapshot not found: {name}")]
    SnapshotNotFound { name: String },

    #[error("failed to run `{command}`: {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("failed to open log {}: {source}", path.display())]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Inputs to [`SetupContext::prepare`].
#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub project_dir: PathBuf,
    pub machine_conf: PathBuf,
    pub logs_dir: PathBuf,
    /// 1-based device index; `None` prompts on stdin.
    pub device: Option<usize>,
}

/// Everything the loop needs from setup, built once and passed explicitly.
#[derive(Debug, Clone)]
pub struct SetupContext {
    pub device: UsbDevice,
    pub ids: UsbIds,
    pub machine: MachineConfig,
    pub project_dir: PathBuf,
    pub logger: RunLogger,
}

impl SetupContext {
    pub async fn prepare(options: SetupOptions) -> Result<Self, SetupError> {
        let devices = usb::list_devices().await?;
        if devices.is_empty() {
            return Err(SetupError::NoDevices);
        }
        let choice = match options.device {
            Some(choice) => choice,
            None => usb::prompt_selection(&devices, &mut std::io::stdin().lock())?,
        };
        let (device, ids) = usb::select_device(&devices, choice)?;
        info!(device = %device.line, vendor = %ids.vendor_id, product = %ids.product_id, "selected adapter");

        let machine = MachineConfig::load(&options.machine_conf)?;
        let machine_name = machine.machine_name()?.to_string();
        let snapshot_name = machine.snapshot_name()?.to_string();

        let project = VagrantProject::new(&options.project_dir);

        let snapshots = project.snapshot_list().await?;
        if !vm::has_snapshot(&snapshots, &snapshot_name) {
            return Err(SetupError::SnapshotNotFound {
                name: snapshot_name,
            });
        }

        project.halt().await?;
        project.restore_snapshot(&machine_name, &snapshot_name).await?;
        project.enable_usb(&machine_name).await?;
        project
            .add_usb_filter(&machine_name, &ids.vendor_id, &ids.product_id)
            .await?;

        let logger = RunLogger::ensure_session(&options.logs_dir, Utc::now())?;

        project.up(&logger.log_path(SessionLog::Vagrant)).await?;
        project
            .wifi_connect(&logger.log_path(SessionLog::WifiConnect))
            .await?;
        project.info(&logger.log_path(SessionLog::Info)).await?;

        info!(session = %logger.session_id(), machine = %machine_name, "environment ready");

        Ok(Self {
            device,
            ids,
            machine,
            project_dir: options.project_dir,
            logger,
        })
    }
}
