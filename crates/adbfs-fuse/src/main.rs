//! adbmount - Mount an Android device's file tree as a FUSE filesystem.
//!
//! Usage: adbmount <mountpoint>
//!
//! Assumes a standard Android development setup with `adb` in the path and
//! the device connected and authorized. Unmount with `fusermount -u` (or
//! Ctrl+C in the foreground process).

use adbfs_fuse::{AdbFS, MountConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "adbmount")]
#[command(about = "Mount an Android device over adb as a FUSE filesystem")]
#[command(version)]
struct Cli {
    /// Mountpoint for the filesystem
    mount: PathBuf,

    /// Device serial number (adb -s); defaults to adb's default device
    #[arg(short, long, env = "ANDROID_SERIAL")]
    serial: Option<String>,

    /// Broadcast a media-index rescan after successful mutations
    #[arg(long)]
    rescan: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Allow other users to access the mount
    #[arg(long)]
    allow_other: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    if !cli.mount.exists() {
        anyhow::bail!("Mountpoint does not exist: {}", cli.mount.display());
    }

    let config = MountConfig::new()
        .rescan(cli.rescan)
        .serial(cli.serial.clone());

    let fs = AdbFS::new(config).context("Failed to initialize filesystem")?;

    // One cheap command up front: starts the adb server if needed and
    // tells the user early when no device answers.
    match fs.device().shell("ls /") {
        Ok(lines) if lines.is_empty() => {
            warn!("device produced no output; is it connected and authorized?");
        }
        Ok(_) => info!("device responding"),
        Err(e) => warn!(error = %e, "device probe failed"),
    }

    mount_and_wait(&cli, fs)
}

/// Mount the filesystem and wait for Ctrl+C.
fn mount_and_wait(cli: &Cli, fs: AdbFS) -> Result<()> {
    let mut options = vec![
        fuser::MountOption::FSName("adbfs".to_string()),
        fuser::MountOption::Subtype("adbfs".to_string()),
        fuser::MountOption::AutoUnmount,
        fuser::MountOption::RW,
    ];
    if cli.allow_other {
        options.push(fuser::MountOption::AllowOther);
    }

    // Set up channel for signal handling
    let (tx, rx) = mpsc::channel::<()>();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .context("Failed to set signal handler")?;

    info!("Mounting filesystem (press Ctrl+C to unmount)");

    let session = fuser::spawn_mount2(fs, &cli.mount, &options).map_err(|e| {
        error!(error = %e, "Mount failed");
        anyhow::anyhow!("Failed to mount filesystem: {}", e)
    })?;

    info!("Filesystem mounted at {}", cli.mount.display());

    match rx.recv() {
        Ok(()) => info!("Received interrupt signal, unmounting..."),
        Err(_) => warn!("Signal channel closed unexpectedly"),
    }

    // Dropping the session unmounts; dropping the filesystem removes the
    // mirror directory.
    drop(session);
    info!("Filesystem unmounted");
    Ok(())
}
