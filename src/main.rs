use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use wifi_bench::bench::BenchmarkLoop;
use wifi_bench::config::{BenchConfig, CONFIG_ENV};
use wifi_bench::guest::{VagrantSshRunner, DOWNLOAD_TEST_COMMAND, UPLOAD_TEST_COMMAND};
use wifi_bench::session::RunLogger;
use wifi_bench::setup::{usb, SetupContext, SetupOptions};
use wifi_bench::throughput::report::format_tally;
use wifi_bench::throughput::Direction;

#[derive(Parser)]
#[command(
    name = "wifi-bench",
    about = "USB Wi-Fi adapter throughput benchmark inside a Vagrant guest",
    version,
    long_about = None
)]
struct Cli {
    /// Settings file (TOML); falls back to ./wifi-bench.toml, then defaults
    #[arg(long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore the VM, attach the adapter, and run the download/upload loop
    Run {
        /// 1-based index into the USB device list (skips the prompt)
        #[arg(long)]
        device: Option<usize>,

        /// Loop bound; the loop body runs one fewer time than this
        #[arg(long)]
        iterations: Option<usize>,

        /// Vagrant project directory
        #[arg(long)]
        target_dir: Option<PathBuf>,

        /// Parent directory for session logs
        #[arg(long)]
        logs_dir: Option<PathBuf>,
    },

    /// List USB devices with their vendor:product ids
    Devices,

    /// Recompute per-direction results from a finished session directory
    Report {
        /// Path to logs/<session>
        session: PathBuf,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = BenchConfig::load_or_default(cli.config.as_deref());
    let mut settings = loaded.config;
    wifi_bench::init_tracing(&settings.logging)?;

    for skipped in &loaded.skipped {
        warn!(
            path = %skipped.path.display(),
            error = %skipped.error,
            "settings file could not be loaded, falling back"
        );
    }
    match &loaded.source {
        Some(path) => debug!(path = %path.display(), "loaded settings"),
        None => debug!("using default settings"),
    }

    match cli.command {
        Commands::Run {
            device,
            iterations,
            target_dir,
            logs_dir,
        } => {
            if let Some(dir) = target_dir {
                settings.vm.target_dir = dir;
            }
            if let Some(dir) = logs_dir {
                settings.run.logs_dir = dir;
            }
            let iterations = iterations.unwrap_or(settings.run.iterations);

            let ctx = SetupContext::prepare(SetupOptions {
                project_dir: settings.vm.target_dir.clone(),
                machine_conf: settings.machine_conf_path(),
                logs_dir: settings.run.logs_dir.clone(),
                device,
            })
            .await
            .context("setup failed")?;

            let runner = VagrantSshRunner::new(&ctx.project_dir);
            let report = BenchmarkLoop::new(&runner, &ctx.logger)
                .run(iterations, DOWNLOAD_TEST_COMMAND, UPLOAD_TEST_COMMAND)
                .await;

            println!("\nSession {}", ctx.logger.root().display());
            for direction in Direction::ALL {
                println!("{}", format_tally(direction, report.tally(direction)));
            }
        }
        Commands::Devices => {
            let devices = usb::list_devices().await?;
            if devices.is_empty() {
                println!("No USB devices found.");
            }
            for (index, device) in devices.iter().enumerate() {
                let ids = device
                    .ids()
                    .map(|ids| format!("{}:{}", ids.vendor_id, ids.product_id))
                    .unwrap_or_else(|| "----:----".to_string());
                println!("{:2} | {} | {}", index + 1, ids, device.line);
            }
        }
        Commands::Report { session, json } => {
            let logger = RunLogger::open(&session)?;
            let summary = logger
                .summarize()
                .with_context(|| format!("failed to read reports in {}", session.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Session {}", summary.session_id);
                println!("{}", format_tally(Direction::Download, &summary.download));
                println!("{}", format_tally(Direction::Upload, &summary.upload));
            }
        }
    }

    Ok(())
}
