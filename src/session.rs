//! Capture session descriptions.

use std::path::PathBuf;
use std::time::Duration;

use crate::config::CaptureConfig;

/// The two session variants.
///
/// Both share one lifecycle implementation; the kind only decides whether
/// missing output files are tolerated, whether the failure callback fires on
/// a failed start, and the graph's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// Record every resolved device to its output file.
    Capture,
    /// Watch devices for audio levels without writing anything.
    ConfidenceMonitor,
}

impl SessionKind {
    /// Whether this kind tolerates devices without an output file.
    pub fn is_monitor_only(&self) -> bool {
        matches!(self, Self::ConfidenceMonitor)
    }

    /// Display name given to the graph container.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::ConfidenceMonitor => "confidence-monitor",
        }
    }
}

/// An immutable capture or monitoring request.
///
/// Constructed once from a configuration snapshot and stateless thereafter.
/// The running pipeline's lifetime is strictly nested inside one
/// `start`..`stop` cycle on a [`CapturePipeline`]; the session itself can be
/// reused for another cycle.
///
/// [`CapturePipeline`]: crate::CapturePipeline
///
/// # Example
///
/// ```
/// use media_capture::{CaptureConfig, CaptureSession};
/// use std::time::Duration;
///
/// let config = CaptureConfig::new()
///     .with("capture.device.names", "mic1")
///     .with("capture.device.mic1.source", "hw:0")
///     .with("capture.device.mic1.dest", "mic1.wav")
///     .with("capture.start.wait", "10");
///
/// let session = CaptureSession::capture(config);
/// assert_eq!(session.start_wait(), Duration::from_secs(10));
/// assert!(!session.kind().is_monitor_only());
/// ```
#[derive(Debug, Clone)]
pub struct CaptureSession {
    kind: SessionKind,
    config: CaptureConfig,
    output_dir: PathBuf,
    start_wait: Duration,
    monitoring_enabled: bool,
}

impl CaptureSession {
    /// Creates a capture session from a configuration snapshot.
    pub fn capture(config: CaptureConfig) -> Self {
        Self::new(SessionKind::Capture, config)
    }

    /// Creates a confidence-monitoring session from a configuration snapshot.
    pub fn monitor(config: CaptureConfig) -> Self {
        Self::new(SessionKind::ConfidenceMonitor, config)
    }

    fn new(kind: SessionKind, config: CaptureConfig) -> Self {
        let output_dir = config.output_dir();
        let start_wait = config.start_wait();
        let monitoring_enabled = config.monitoring_enabled();

        Self {
            kind,
            config,
            output_dir,
            start_wait,
            monitoring_enabled,
        }
    }

    /// Returns the session variant.
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Returns the configuration snapshot.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Returns the output root directory for recorded files.
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    /// Returns how long `start()` waits for the playing transition.
    pub fn start_wait(&self) -> Duration {
        self.start_wait
    }

    /// Returns whether level messages are forwarded to a registered
    /// listener.
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_kind_monitor_only() {
        assert!(!SessionKind::Capture.is_monitor_only());
        assert!(SessionKind::ConfidenceMonitor.is_monitor_only());
    }

    #[test]
    fn test_session_snapshots_config() {
        let config = CaptureConfig::new()
            .with("capture.start.wait", "30")
            .with("capture.monitoring.enabled", "true")
            .with("capture.output.dir", "/var/recordings");

        let session = CaptureSession::monitor(config);
        assert_eq!(session.start_wait(), Duration::from_secs(30));
        assert!(session.monitoring_enabled());
        assert_eq!(session.output_dir(), &PathBuf::from("/var/recordings"));
        assert_eq!(session.kind().display_name(), "confidence-monitor");
    }

    #[test]
    fn test_session_defaults() {
        let session = CaptureSession::capture(CaptureConfig::new());
        assert_eq!(session.start_wait(), Duration::from_secs(15));
        assert!(!session.monitoring_enabled());
    }
}
