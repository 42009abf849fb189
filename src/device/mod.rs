//! Device resolution: from flat configuration to concrete descriptors.
//!
//! The resolver turns the per-device configuration keys into
//! [`DeviceDescriptor`]s, classifying each device's access method and
//! pre-flighting its output file. Resolution failures are per-device: the
//! assembler catches and logs them, dropping the device rather than aborting
//! the session.

mod probe;

pub use probe::{DeviceProbe, StaticProbe, SysfsProbe};

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// Classification of a capture device's access method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerType {
    /// Pre-recorded media read from a regular file.
    FileSource,
    /// ALSA-style audio capture device (e.g. `hw:0`).
    Alsa,
    /// Video4Linux-style video capture device (e.g. `/dev/video0`).
    V4l2,
    /// FireWire DV camera.
    FirewireDv,
    /// Hardware-specific producer named by the configuration.
    Custom(String),
}

impl ProducerType {
    /// Whether this producer needs a configured source location.
    ///
    /// `Custom` producers identify their hardware by name alone; everything
    /// else reads from a device node or file.
    pub fn requires_source(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl From<&str> for ProducerType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Self::FileSource,
            "alsa" => Self::Alsa,
            "v4l2" | "v4l" => Self::V4l2,
            "dv" | "firewire" => Self::FirewireDv,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl FromStr for ProducerType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl std::fmt::Display for ProducerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileSource => write!(f, "file"),
            Self::Alsa => write!(f, "alsa"),
            Self::V4l2 => write!(f, "v4l2"),
            Self::FirewireDv => write!(f, "dv"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Optional per-device encoding and buffering properties.
///
/// All fields are optional; the backend applies its own defaults for absent
/// values. Unparsable numeric values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceProperties {
    /// Codec name for the encoded output.
    pub codec: Option<String>,
    /// Container format for the output file.
    pub container: Option<String>,
    /// Encoding bitrate in bits per second.
    pub bitrate: Option<u32>,
    /// Quantizer value for quality-based encoders.
    pub quantizer: Option<u32>,
    /// Maximum number of buffers queued in the device sub-graph.
    pub buffer_max_count: Option<u32>,
    /// Maximum bytes queued in the device sub-graph.
    pub buffer_max_bytes: Option<u32>,
    /// Maximum queued time in milliseconds.
    pub buffer_max_time_ms: Option<u64>,
    /// Capture framerate in frames per second.
    pub framerate: Option<u32>,
}

impl DeviceProperties {
    /// Reads the per-device properties for `device` from the configuration.
    pub fn from_config(config: &CaptureConfig, device: &str) -> Self {
        fn parse<T: FromStr>(value: Option<&str>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        Self {
            codec: config.device_property(device, "codec").map(String::from),
            container: config.device_property(device, "container").map(String::from),
            bitrate: parse(config.device_property(device, "bitrate")),
            quantizer: parse(config.device_property(device, "quantizer")),
            buffer_max_count: parse(config.device_property(device, "buffer.max.buffers")),
            buffer_max_bytes: parse(config.device_property(device, "buffer.max.bytes")),
            buffer_max_time_ms: parse(config.device_property(device, "buffer.max.time")),
            framerate: parse(config.device_property(device, "framerate")),
        }
    }
}

/// A fully resolved capture device.
///
/// Invariant: `output` is `None` only for monitor-only sessions; the
/// resolver refuses to produce a capture descriptor without an output file.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceDescriptor {
    /// Friendly name, unique within a session.
    pub friendly_name: String,
    /// Source location (device node, ALSA identifier, or file path).
    pub source: Option<String>,
    /// How the device is accessed.
    pub producer: ProducerType,
    /// Destination file, absent only for monitor-only sessions.
    pub output: Option<PathBuf>,
    /// Encoding and buffering properties.
    pub properties: DeviceProperties,
}

/// Parses the ordered device-name list from the configuration.
///
/// # Errors
///
/// Returns [`CaptureError::Configuration`] if the `capture.device.names` key
/// is absent, or if splitting it yields zero non-blank names.
pub fn device_names(config: &CaptureConfig) -> Result<Vec<String>, CaptureError> {
    let raw = config.device_names_raw().ok_or_else(|| {
        CaptureError::configuration(format!(
            "'{}' is not set",
            crate::config::DEVICE_NAMES_KEY
        ))
    })?;

    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect();

    if names.is_empty() {
        return Err(CaptureError::configuration(format!(
            "'{}' contains no device names",
            crate::config::DEVICE_NAMES_KEY
        )));
    }

    Ok(names)
}

/// Resolves one configured device into a [`DeviceDescriptor`].
///
/// Producer type determination order:
/// 1. an explicit `type` property wins;
/// 2. else a source pointing at a regular file classifies as
///    [`ProducerType::FileSource`];
/// 3. else the probe's vendor string is matched against the known signature
///    table.
///
/// For non-monitor sessions the destination file is eagerly created as a
/// pre-flight check, before any graph work is attempted.
///
/// # Errors
///
/// - [`CaptureError::UnrecognizedDevice`] if introspection matches nothing
/// - [`CaptureError::MissingSource`] if the producer needs a source and none
///   is configured
/// - [`CaptureError::Configuration`] if a capture device has no destination
/// - [`CaptureError::OutputFile`] if the destination cannot be created,
///   including when it already exists
pub fn resolve_device(
    name: &str,
    config: &CaptureConfig,
    output_dir: &Path,
    monitor_only: bool,
    probe: &dyn DeviceProbe,
) -> Result<DeviceDescriptor, CaptureError> {
    let source = config.device_property(name, "source").map(String::from);

    let producer = determine_producer(name, config, source.as_deref(), probe)?;

    if producer.requires_source() && source.is_none() {
        return Err(CaptureError::MissingSource {
            device: name.to_string(),
        });
    }

    let output = resolve_output(name, config, output_dir, monitor_only)?;

    let descriptor = DeviceDescriptor {
        friendly_name: name.to_string(),
        source,
        producer,
        output,
        properties: DeviceProperties::from_config(config, name),
    };

    tracing::debug!(
        device = name,
        producer = %descriptor.producer,
        output = ?descriptor.output,
        "resolved capture device"
    );

    Ok(descriptor)
}

fn determine_producer(
    name: &str,
    config: &CaptureConfig,
    source: Option<&str>,
    probe: &dyn DeviceProbe,
) -> Result<ProducerType, CaptureError> {
    if let Some(explicit) = config.device_property(name, "type") {
        // Unknown tokens become Custom producers, never a parse error.
        return Ok(ProducerType::from(explicit));
    }

    let Some(source) = source else {
        return Err(CaptureError::MissingSource {
            device: name.to_string(),
        });
    };

    if Path::new(source).is_file() {
        return Ok(ProducerType::FileSource);
    }

    let vendor = probe.vendor_string(source).unwrap_or_default();
    probe::classify_vendor(&vendor).ok_or_else(|| CaptureError::UnrecognizedDevice {
        device: name.to_string(),
        vendor,
    })
}

fn resolve_output(
    name: &str,
    config: &CaptureConfig,
    output_dir: &Path,
    monitor_only: bool,
) -> Result<Option<PathBuf>, CaptureError> {
    let dest = config.device_property(name, "dest");

    if monitor_only {
        // Monitoring tolerates missing outputs; nothing is written to disk.
        return Ok(dest.map(|d| output_dir.join(d)));
    }

    let dest = dest.ok_or_else(|| {
        CaptureError::configuration(format!("device '{name}' has no dest configured"))
    })?;

    let path = output_dir.join(dest);

    // Fail fast and cheaply: create the output file now, before any graph
    // work. An existing file is an error, not something to overwrite.
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| CaptureError::output_file(&path, e))?;

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> CaptureConfig {
        CaptureConfig::new()
            .with("capture.device.names", "cam1,mic1")
            .with("capture.device.cam1.source", "/dev/video0")
            .with("capture.device.cam1.dest", "cam1.mov")
            .with("capture.device.mic1.source", "hw:0")
            .with("capture.device.mic1.dest", "mic1.wav")
    }

    fn probe() -> StaticProbe {
        StaticProbe::new()
            .with_device("/dev/video0", "Epiphan VGA2USB #0")
            .with_device("hw:0", "USB Audio CODEC")
    }

    #[test]
    fn test_device_names_ordered() {
        let names = device_names(&base_config()).unwrap();
        assert_eq!(names, vec!["cam1", "mic1"]);
    }

    #[test]
    fn test_device_names_missing_key() {
        let err = device_names(&CaptureConfig::new()).unwrap_err();
        assert!(matches!(err, CaptureError::Configuration { .. }));
    }

    #[test]
    fn test_device_names_all_blank() {
        let config = CaptureConfig::new().with("capture.device.names", " , ,");
        let err = device_names(&config).unwrap_err();
        assert!(matches!(err, CaptureError::Configuration { .. }));
    }

    #[test]
    fn test_device_names_skips_blanks() {
        let config = CaptureConfig::new().with("capture.device.names", "cam1, ,mic1,");
        assert_eq!(device_names(&config).unwrap(), vec!["cam1", "mic1"]);
    }

    #[test]
    fn test_explicit_type_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = base_config().with("capture.device.cam1.type", "dv");

        // Probe knows this source as V4L2; the explicit property must win.
        let descriptor =
            resolve_device("cam1", &config, dir.path(), false, &probe()).unwrap();
        assert_eq!(descriptor.producer, ProducerType::FirewireDv);
    }

    #[test]
    fn test_regular_file_classifies_as_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("talk.mov");
        std::fs::write(&media, b"media").unwrap();

        let config = CaptureConfig::new()
            .with("capture.device.vod.source", media.display().to_string())
            .with("capture.device.vod.dest", "vod-copy.mov");

        let descriptor =
            resolve_device("vod", &config, dir.path(), false, &StaticProbe::new()).unwrap();
        assert_eq!(descriptor.producer, ProducerType::FileSource);
    }

    #[test]
    fn test_probe_classification() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor =
            resolve_device("mic1", &base_config(), dir.path(), false, &probe()).unwrap();
        assert_eq!(descriptor.producer, ProducerType::Alsa);

        let descriptor =
            resolve_device("cam1", &base_config(), dir.path(), false, &probe()).unwrap();
        assert_eq!(descriptor.producer, ProducerType::V4l2);
    }

    #[test]
    fn test_unrecognized_vendor() {
        let dir = tempfile::tempdir().unwrap();
        let unknown = StaticProbe::new().with_device("/dev/video0", "ACME FrameGrabber");

        let err = resolve_device("cam1", &base_config(), dir.path(), false, &unknown)
            .unwrap_err();
        assert!(matches!(err, CaptureError::UnrecognizedDevice { .. }));
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig::new()
            .with("capture.device.mic1.type", "alsa")
            .with("capture.device.mic1.dest", "mic1.wav");

        let err = resolve_device("mic1", &config, dir.path(), false, &StaticProbe::new())
            .unwrap_err();
        assert!(matches!(err, CaptureError::MissingSource { .. }));
    }

    #[test]
    fn test_custom_producer_tolerates_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig::new()
            .with("capture.device.board.type", "framegrabber")
            .with("capture.device.board.dest", "board.mov");

        let descriptor =
            resolve_device("board", &config, dir.path(), false, &StaticProbe::new()).unwrap();
        assert_eq!(
            descriptor.producer,
            ProducerType::Custom("framegrabber".to_string())
        );
        assert!(descriptor.source.is_none());
    }

    #[test]
    fn test_output_preflight_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor =
            resolve_device("mic1", &base_config(), dir.path(), false, &probe()).unwrap();

        let output = descriptor.output.unwrap();
        assert!(output.exists());
        assert_eq!(output.file_name().unwrap(), "mic1.wav");
    }

    #[test]
    fn test_output_preflight_rejects_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mic1.wav"), b"previous recording").unwrap();

        let err = resolve_device("mic1", &base_config(), dir.path(), false, &probe())
            .unwrap_err();
        assert!(matches!(err, CaptureError::OutputFile { .. }));
    }

    #[test]
    fn test_monitor_only_tolerates_missing_dest() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig::new().with("capture.device.mic1.source", "hw:0");

        let descriptor =
            resolve_device("mic1", &config, dir.path(), true, &probe()).unwrap();
        assert_eq!(descriptor.output, None);
    }

    #[test]
    fn test_monitor_only_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor =
            resolve_device("mic1", &base_config(), dir.path(), true, &probe()).unwrap();

        // Output path is carried, but pre-flight creation is skipped.
        assert!(!descriptor.output.unwrap().exists());
    }

    #[test]
    fn test_capture_requires_dest() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig::new().with("capture.device.mic1.source", "hw:0");

        let err = resolve_device("mic1", &config, dir.path(), false, &probe()).unwrap_err();
        assert!(matches!(err, CaptureError::Configuration { .. }));
    }

    #[test]
    fn test_properties_parsed() {
        let config = base_config()
            .with("capture.device.cam1.codec", "x264enc")
            .with("capture.device.cam1.container", "mpegtsmux")
            .with("capture.device.cam1.bitrate", "2000000")
            .with("capture.device.cam1.buffer.max.buffers", "200")
            .with("capture.device.cam1.framerate", "25");

        let props = DeviceProperties::from_config(&config, "cam1");
        assert_eq!(props.codec.as_deref(), Some("x264enc"));
        assert_eq!(props.container.as_deref(), Some("mpegtsmux"));
        assert_eq!(props.bitrate, Some(2_000_000));
        assert_eq!(props.buffer_max_count, Some(200));
        assert_eq!(props.framerate, Some(25));
        assert_eq!(props.quantizer, None);
    }

    #[test]
    fn test_properties_unparsable_treated_as_absent() {
        let config = base_config().with("capture.device.cam1.bitrate", "lots");
        let props = DeviceProperties::from_config(&config, "cam1");
        assert_eq!(props.bitrate, None);
    }

    #[test]
    fn test_producer_type_from_str() {
        assert_eq!("file".parse(), Ok(ProducerType::FileSource));
        assert_eq!("V4L2".parse(), Ok(ProducerType::V4l2));
        assert_eq!("alsa".parse(), Ok(ProducerType::Alsa));
        assert_eq!(
            "epiphan".parse(),
            Ok(ProducerType::Custom("epiphan".to_string()))
        );
    }
}
