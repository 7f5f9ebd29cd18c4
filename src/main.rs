//! droidflash - guided custom Android OS installation
//!
//! This is the maintainer/diagnostic CLI entry point: it validates device
//! definition documents, prints step plans, and probes connected devices.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use droidflash_app::{FlashSession, Settings};
use droidflash_core::{scan_documents, DeviceConfig};
use droidflash_tooling::ToolRunner;

/// droidflash - guided custom Android OS installation
#[derive(Parser, Debug)]
#[command(name = "droidflash")]
#[command(about = "Walks you through installing a custom Android OS", long_about = None)]
struct Args {
    /// Directory holding the device definition documents
    #[arg(long, value_name = "DIR")]
    configs: Option<PathBuf>,

    /// Directory holding the bundled adb/fastboot/heimdall binaries
    #[arg(long, value_name = "DIR")]
    binaries: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Validate every bundled device definition document
    Validate,

    /// List the devices covered by the bundled definitions
    Devices,

    /// Print the step plan for a device code
    Plan {
        /// Vendor device code, e.g. "sargo"
        device_code: String,
    },

    /// Detect a connected device over USB
    Detect,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    droidflash_core::logging::init()?;

    let args = Args::parse();
    let settings = Settings::load();
    let configs_dir = normalize(args.configs.unwrap_or(settings.configs_dir));
    let binaries_dir = normalize(args.binaries.unwrap_or(settings.binaries_dir));

    match args.command {
        CliCommand::Validate => validate(&configs_dir),
        CliCommand::Devices => list_devices(&configs_dir),
        CliCommand::Plan { device_code } => plan(&device_code, &configs_dir),
        CliCommand::Detect => detect(&binaries_dir, &configs_dir).await,
    }
}

/// Resolve symlinks and relative components; keeps the path usable on
/// Windows where the default canonical form is a verbatim path
fn normalize(path: PathBuf) -> PathBuf {
    dunce::canonicalize(&path).unwrap_or(path)
}

fn validate(configs_dir: &Path) -> color_eyre::Result<()> {
    let documents = scan_documents(configs_dir);
    if documents.is_empty() {
        eprintln!("No device definitions found in {}", configs_dir.display());
        std::process::exit(1);
    }

    let mut failures = 0usize;
    for path in &documents {
        match DeviceConfig::from_file(path) {
            Ok(config) => println!("OK    {} ({})", path.display(), config.device_code()),
            Err(e) => {
                failures += 1;
                println!("FAIL  {}: {e}", path.display());
            }
        }
    }

    println!("{} documents checked, {} invalid", documents.len(), failures);
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn list_devices(configs_dir: &Path) -> color_eyre::Result<()> {
    for path in scan_documents(configs_dir) {
        match DeviceConfig::from_file(&path) {
            Ok(config) => {
                let codes = config.metadata.supported_device_codes.join(", ");
                println!(
                    "{:<12} {} (maintained by {}) [{}]",
                    config.device_code(),
                    config.metadata.device_name,
                    config.metadata.maintainer,
                    codes
                );
            }
            Err(e) => eprintln!("Skipping {}: {e}", path.display()),
        }
    }
    Ok(())
}

fn plan(device_code: &str, configs_dir: &Path) -> color_eyre::Result<()> {
    let mut session = FlashSession::new();
    if !session.load_config(device_code, configs_dir) {
        eprintln!("No device definition found for '{device_code}'");
        std::process::exit(1);
    }

    if let Some(config) = &session.config {
        println!(
            "{} ({}), maintained by {}",
            config.metadata.device_name,
            config.device_code(),
            config.metadata.maintainer
        );
        if config.is_ab() {
            println!("Partitioning: a/b (seamless)");
        }
        if let Some(requirements) = &config.requirements {
            if let Some(android) = &requirements.android {
                println!("Required Android version: {android}");
            }
            if let Some(firmware) = &requirements.firmware {
                println!("Required firmware: {firmware}");
            }
        }
        if let Some(notes) = &config.metadata.notes {
            println!("Notes: {notes}");
        }
    }

    println!();
    for (index, step) in session.pending_steps().iter().enumerate() {
        match step.command {
            Some(command) => println!(
                "{:2}. [{}] {}  (runs {})",
                index + 1,
                step.title,
                step.content,
                command
            ),
            None => println!("{:2}. [{}] {}", index + 1, step.title, step.content),
        }
    }
    Ok(())
}

async fn detect(binaries_dir: &Path, configs_dir: &Path) -> color_eyre::Result<()> {
    let assets_dir = configs_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| configs_dir.to_path_buf());
    let runner = ToolRunner::detached(binaries_dir.to_path_buf(), assets_dir);

    match runner.search_device().await {
        Some(device_code) => {
            println!("Detected device: {device_code}");
            match droidflash_core::load_config(&device_code, configs_dir) {
                Some(config) => println!(
                    "Definition found: {} ({})",
                    config.metadata.device_name,
                    config.device_code()
                ),
                None => println!("No definition available for this device"),
            }
            if runner.is_ab_device().await {
                println!("Partitioning: a/b (seamless)");
            } else {
                println!("Partitioning: classic");
            }
            Ok(())
        }
        None => {
            eprintln!("No device found. Connect it via USB, enable USB debugging and try again.");
            std::process::exit(1);
        }
    }
}
