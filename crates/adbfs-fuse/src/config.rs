//! Mount configuration.

/// Configuration options for the adbfs mount.
#[derive(Debug, Clone, Default)]
pub struct MountConfig {
    /// Broadcast a media-index rescan to the device after successful
    /// mutations (file pushes, renames, removals). Off by default: the
    /// broadcast costs an extra round trip per mutation.
    pub rescan: bool,

    /// Device serial number for `adb -s`, selecting one device among
    /// several. `None` uses adb's default device.
    pub serial: Option<String>,
}

impl MountConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the media rescan broadcast.
    #[must_use]
    pub fn rescan(mut self, rescan: bool) -> Self {
        self.rescan = rescan;
        self
    }

    /// Selects a device by serial number.
    #[must_use]
    pub fn serial(mut self, serial: Option<String>) -> Self {
        self.serial = serial;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MountConfig::default();
        assert!(!config.rescan);
        assert!(config.serial.is_none());
    }

    #[test]
    fn test_builder() {
        let config = MountConfig::new()
            .rescan(true)
            .serial(Some("emulator-5554".to_string()));
        assert!(config.rescan);
        assert_eq!(config.serial.as_deref(), Some("emulator-5554"));
    }
}
