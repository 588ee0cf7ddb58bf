//! USB device listing (`lsusb`) and operator selection.

use std::io::{BufRead, Write};
use std::sync::OnceLock;

use regex::Regex;

use tokio::process::Command;

use super::SetupError;

/// One line of `lsusb` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    pub line: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbIds {
    pub vendor_id: String,
    pub product_id: String,
}

impl UsbDevice {
    /// The first `vvvv:pppp` pair on the line.
    pub fn ids(&self) -> Option<UsbIds> {
        let caps = id_pattern()?.captures(&self.line)?;
        Some(UsbIds {
            vendor_id: caps[1].to_string(),
            product_id: caps[2].to_string(),
        })
    }
}

fn id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"([a-zA-Z0-9]{4}):([a-zA-Z0-9]{4})").ok())
        .as_ref()
}

pub fn parse_listing(stdout: &str) -> Vec<UsbDevice> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| UsbDevice {
            line: l.to_string(),
        })
        .collect()
}

/// Run `lsusb` and return every device it reports.
pub async fn list_devices() -> Result<Vec<UsbDevice>, SetupError> {
    let output = Command::new("lsusb")
        .output()
        .await
        .map_err(|source| SetupError::Command {
            command: "lsusb".to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(SetupError::CommandFailed {
            command: "lsusb".to_string(),
            status: output.status.code().unwrap_or(-1),
        });
    }

    Ok(parse_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Pick the device at 1-based `choice`.
pub fn select_device(devices: &[UsbDevice], choice: usize) -> Result<(UsbDevice, UsbIds), SetupError> {
    let device = choice
        .checked_sub(1)
        .and_then(|i| devices.get(i))
        .ok_or_else(|| {
            SetupError::InvalidSelection(format!(
                "{} is not between 1 and {}",
                choice,
                devices.len()
            ))
        })?;

    let ids = device.ids().ok_or_else(|| {
        SetupError::InvalidSelection(format!("no vendor:product id in '{}'", device.line))
    })?;

    Ok((device.clone(), ids))
}

/// Print the numbered device list.
pub fn print_devices(devices: &[UsbDevice]) {
    for (index, device) in devices.iter().enumerate() {
        println!("{:2} | {}", index + 1, device.line);
    }
}

/// Show the device list and read a 1-based choice from `input`.
pub fn prompt_selection(devices: &[UsbDevice], input: &mut impl BufRead) -> Result<usize, SetupError> {
    print_devices(devices);
    print!("\nSelect a device: ");
    std::io::stdout()
        .flush()
        .map_err(|e| SetupError::InvalidSelection(e.to_string()))?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|e| SetupError::InvalidSelection(e.to_string()))?;

    answer
        .trim()
        .parse()
        .map_err(|_| SetupError::InvalidSelection(format!("'{}' is not a number", answer.trim())))
}
