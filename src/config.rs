//! Flat key-value configuration for capture sessions.
//!
//! The capture agent is configured through a flat property set, typically
//! loaded from a properties file or handed over by a scheduling service.
//! [`CaptureConfig`] wraps that map with typed accessors; the resolver in
//! [`crate::device`] interprets the per-device keys.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Key holding the comma-separated list of friendly device names.
pub const DEVICE_NAMES_KEY: &str = "capture.device.names";

/// Key prefix for per-device properties (`capture.device.<name>.<property>`).
pub const DEVICE_PREFIX: &str = "capture.device";

/// Key holding the start-transition wait in whole seconds.
pub const START_WAIT_KEY: &str = "capture.start.wait";

/// Key enabling audio level monitoring for the session.
pub const MONITORING_ENABLED_KEY: &str = "capture.monitoring.enabled";

/// Key holding the output root directory for recorded files.
pub const OUTPUT_DIR_KEY: &str = "capture.output.dir";

/// Default start-transition wait when `capture.start.wait` is absent.
pub const DEFAULT_START_WAIT: Duration = Duration::from_secs(15);

/// A flat key-value property set describing a capture or monitoring session.
///
/// # Example
///
/// ```
/// use media_capture::CaptureConfig;
///
/// let config = CaptureConfig::new()
///     .with("capture.device.names", "cam1,mic1")
///     .with("capture.device.cam1.source", "/dev/video0")
///     .with("capture.device.cam1.dest", "cam1.mov")
///     .with("capture.device.mic1.source", "hw:0")
///     .with("capture.device.mic1.dest", "mic1.wav");
///
/// assert_eq!(config.device_property("cam1", "source"), Some("/dev/video0"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    properties: HashMap<String, String>,
}

impl CaptureConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, returning the configuration for chaining.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets a property in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Returns the raw value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Returns a per-device property (`capture.device.<name>.<property>`).
    pub fn device_property(&self, device: &str, property: &str) -> Option<&str> {
        self.get(&format!("{DEVICE_PREFIX}.{device}.{property}"))
    }

    /// Returns the raw device-name list value, if configured.
    pub fn device_names_raw(&self) -> Option<&str> {
        self.get(DEVICE_NAMES_KEY)
    }

    /// Returns how long `start()` waits for the playing transition.
    ///
    /// Parsed from `capture.start.wait` in whole seconds; unparsable or
    /// absent values fall back to the 15 second default.
    pub fn start_wait(&self) -> Duration {
        self.get(START_WAIT_KEY)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_START_WAIT)
    }

    /// Returns whether audio level monitoring is enabled for the session.
    ///
    /// Level messages are only forwarded to a registered listener when this
    /// is set to `true`.
    pub fn monitoring_enabled(&self) -> bool {
        self.get(MONITORING_ENABLED_KEY)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Returns the output root directory for recorded files.
    ///
    /// Defaults to the current directory when `capture.output.dir` is absent.
    pub fn output_dir(&self) -> PathBuf {
        self.get(OUTPUT_DIR_KEY)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl FromIterator<(String, String)> for CaptureConfig {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            properties: iter.into_iter().collect(),
        }
    }
}
