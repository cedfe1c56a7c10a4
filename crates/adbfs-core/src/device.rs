//! The adb command channel.
//!
//! Every interaction with the remote device is one fresh command execution
//! that either yields an ordered sequence of output lines or fails. The
//! executor is an injected [`CommandRunner`] so the protocol, cache and
//! session logic can be exercised against a scripted fake (see
//! [`crate::testing`]) without a connected device.
//!
//! Each call blocks the calling thread for the full round trip. There is no
//! asynchronous variant and no cancellation.

use crate::error::AdbResult;
use crate::escape::escape_path;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, trace};

/// An opaque command executor: run one command line, return its output
/// split into lines, or fail with an I/O error.
///
/// Implementations must preserve the order of the lines. An empty vector is
/// a valid result and is how an unreachable device manifests.
pub trait CommandRunner: Send + Sync {
    /// Executes `command` through the local shell and drains its stdout.
    fn run(&self, command: &str) -> std::io::Result<Vec<String>>;
}

/// The real executor: spawns `sh -c <command>` and collects stdout lines.
#[derive(Debug, Default)]
pub struct HostShell;

impl CommandRunner for HostShell {
    fn run(&self, command: &str) -> std::io::Result<Vec<String>> {
        trace!(command, "exec");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout not captured"))?;
        let lines = BufReader::new(stdout)
            .lines()
            .collect::<Result<Vec<_>, _>>()?;

        // The exit status carries no usable signal: adb reports most remote
        // failures as diagnostic output lines with status 0.
        let _ = child.wait()?;
        Ok(lines)
    }
}

/// Command builder for one Android device, bound to a [`CommandRunner`].
///
/// Builds the exact command lines of the adb tool set: `adb shell`,
/// `adb push`/`adb pull`, and the media-scanner broadcasts. An optional
/// serial number selects one device among several (`adb -s SERIAL ...`).
#[derive(Clone)]
pub struct AdbDevice {
    runner: Arc<dyn CommandRunner>,
    serial: Option<String>,
}

impl AdbDevice {
    /// Creates a device channel over the given executor.
    pub fn new(runner: Arc<dyn CommandRunner>, serial: Option<String>) -> Self {
        Self { runner, serial }
    }

    /// Creates a device channel that shells out to the real `adb` binary.
    pub fn host(serial: Option<String>) -> Self {
        Self::new(Arc::new(HostShell), serial)
    }

    fn adb_prefix(&self) -> String {
        match &self.serial {
            Some(serial) => format!("adb -s {serial} "),
            None => "adb ".to_string(),
        }
    }

    /// Runs a command on the device via `adb shell "..."`.
    pub fn shell(&self, command: &str) -> AdbResult<Vec<String>> {
        let line = format!("{}shell \"{command}\"", self.adb_prefix());
        Ok(self.runner.run(&line)?)
    }

    /// Runs a command on the device with stderr folded into the output.
    ///
    /// The listing protocol mixes data lines and diagnostics; for attribute
    /// queries the diagnostics arrive on stderr and must be captured so the
    /// validity heuristic can classify them.
    pub fn shell_with_stderr(&self, command: &str) -> AdbResult<Vec<String>> {
        let line = format!("{}shell \"{command}\" 2>&1", self.adb_prefix());
        Ok(self.runner.run(&line)?)
    }

    /// Copies a remote file into a local mirror file (`adb pull`).
    pub fn pull(&self, remote: &str, local: &Path) -> AdbResult<Vec<String>> {
        let line = format!(
            "{}pull '{}' '{}'",
            self.adb_prefix(),
            escape_path(remote),
            escape_path(&local.to_string_lossy()),
        );
        debug!(remote, "pull");
        Ok(self.runner.run(&line)?)
    }

    /// Copies a local mirror file onto the device (`adb push`).
    pub fn push(&self, local: &Path, remote: &str) -> AdbResult<Vec<String>> {
        let line = format!(
            "{}push '{}' '{}'",
            self.adb_prefix(),
            escape_path(&local.to_string_lossy()),
            escape_path(remote),
        );
        debug!(remote, "push");
        Ok(self.runner.run(&line)?)
    }

    /// Flushes device-side write buffers after a push.
    pub fn sync(&self) -> AdbResult<Vec<String>> {
        self.shell("sync")
    }

    /// Asks the device to rescan one file for media-index changes.
    pub fn rescan_file(&self, remote: &str) -> AdbResult<Vec<String>> {
        self.shell(&format!(
            "am broadcast -a android.intent.action.MEDIA_SCANNER_SCAN_FILE -d 'file://{}'",
            escape_path(remote)
        ))
    }

    /// Asks the device to drop a removed directory from its media index.
    pub fn rescan_dir_removed(&self, remote: &str) -> AdbResult<Vec<String>> {
        self.shell(&format!(
            "am broadcast -a android.intent.action.MEDIA_UNMOUNTED -d 'file://{}'",
            escape_path(remote)
        ))
    }
}

impl std::fmt::Debug for AdbDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdbDevice")
            .field("serial", &self.serial)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn test_shell_command_shape() {
        let runner = Arc::new(ScriptedRunner::new());
        let device = AdbDevice::new(runner.clone(), None);
        device.shell("ls -l -a '/sdcard'").unwrap();
        assert_eq!(runner.commands(), vec!["adb shell \"ls -l -a '/sdcard'\""]);
    }

    #[test]
    fn test_shell_with_stderr_appends_redirect() {
        let runner = Arc::new(ScriptedRunner::new());
        let device = AdbDevice::new(runner.clone(), None);
        device.shell_with_stderr("ls -l -a -d '/x'").unwrap();
        assert_eq!(runner.commands(), vec!["adb shell \"ls -l -a -d '/x'\" 2>&1"]);
    }

    #[test]
    fn test_serial_selects_device() {
        let runner = Arc::new(ScriptedRunner::new());
        let device = AdbDevice::new(runner.clone(), Some("emulator-5554".to_string()));
        device.shell("sync").unwrap();
        assert_eq!(runner.commands(), vec!["adb -s emulator-5554 shell \"sync\""]);
    }

    #[test]
    fn test_pull_and_push_quote_paths() {
        let runner = Arc::new(ScriptedRunner::new());
        let device = AdbDevice::new(runner.clone(), None);
        device
            .pull("/sdcard/a file", Path::new("/tmp/mirror/a"))
            .unwrap();
        device
            .push(Path::new("/tmp/mirror/a"), "/sdcard/a file")
            .unwrap();
        let cmds = runner.commands();
        assert_eq!(cmds[0], "adb pull '/sdcard/a file' '/tmp/mirror/a'");
        assert_eq!(cmds[1], "adb push '/tmp/mirror/a' '/sdcard/a file'");
    }

    #[test]
    fn test_rescan_broadcasts() {
        let runner = Arc::new(ScriptedRunner::new());
        let device = AdbDevice::new(runner.clone(), None);
        device.rescan_file("/sdcard/x.mp3").unwrap();
        device.rescan_dir_removed("/sdcard/gone").unwrap();
        let cmds = runner.commands();
        assert!(cmds[0].contains("MEDIA_SCANNER_SCAN_FILE"));
        assert!(cmds[0].contains("file:///sdcard/x.mp3"));
        assert!(cmds[1].contains("MEDIA_UNMOUNTED"));
    }
}
