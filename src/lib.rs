//! wifi-bench -- repeatable USB Wi-Fi adapter throughput benchmarks.
//!
//! The adapter is passed through to a Vagrant/VirtualBox guest restored from
//! a clean snapshot, then iperf3 download and upload tests run inside the
//! guest over and over. Every report is archived under a timestamped session
//! directory.

pub mod bench;
pub mod config;
pub mod guest;
pub mod session;
pub mod setup;
pub mod shell;
pub mod throughput;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().try_init().map_err(|e| anyhow::anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}
