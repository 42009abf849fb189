//! Best-effort hardware introspection.
//!
//! When a device has no explicit `type` property and its source is not a
//! regular file, the resolver asks a [`DeviceProbe`] for the hardware's
//! vendor string and matches it against a fixed, ordered signature table.
//! The substring matching is inherently fragile, so it lives behind this
//! narrow interface where alternative detection strategies can be swapped in
//! without touching lifecycle code.

use std::collections::HashMap;
use std::path::Path;

use crate::device::ProducerType;

/// Known vendor signatures, checked in order. First match wins.
///
/// The ordering is part of the compatibility contract: more specific
/// signatures (exact product lines) come before generic class matches.
const KNOWN_SIGNATURES: &[(&str, ProducerType)] = &[
    ("epiphan vga2usb", ProducerType::V4l2),
    ("hauppauge wintv", ProducerType::V4l2),
    ("bt878", ProducerType::V4l2),
    ("uvc", ProducerType::V4l2),
    ("usb video", ProducerType::V4l2),
    ("firewire", ProducerType::FirewireDv),
    ("dv cam", ProducerType::FirewireDv),
    ("usb audio", ProducerType::Alsa),
    ("alsa", ProducerType::Alsa),
];

/// Matches a vendor string against the known signature table.
///
/// Matching is case-insensitive substring containment, in table order.
pub(crate) fn classify_vendor(vendor: &str) -> Option<ProducerType> {
    let vendor = vendor.to_ascii_lowercase();
    KNOWN_SIGNATURES
        .iter()
        .find(|(signature, _)| vendor.contains(signature))
        .map(|(_, producer)| producer.clone())
}

/// Reports the vendor string a capture source advertises.
///
/// Implementations should return `None` when the source cannot be
/// introspected; the resolver treats that the same as an empty vendor
/// string and raises an unrecognized-device error.
pub trait DeviceProbe: Send + Sync {
    /// Returns the vendor string for the given source location, if readable.
    fn vendor_string(&self, source: &str) -> Option<String>;
}

/// Probes the kernel's advertised device names through sysfs and procfs.
///
/// Understands two source shapes:
/// - `/dev/videoN` - reads `/sys/class/video4linux/videoN/name`
/// - `hw:N` / `hw:N,M` - reads `/proc/asound/cardN/id`
///
/// Anything else returns `None`.
#[derive(Debug, Clone, Default)]
pub struct SysfsProbe;

impl SysfsProbe {
    /// Creates a sysfs-backed probe.
    pub fn new() -> Self {
        Self
    }

    fn read_trimmed(path: &Path) -> Option<String> {
        std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl DeviceProbe for SysfsProbe {
    fn vendor_string(&self, source: &str) -> Option<String> {
        if let Some(dev) = source.strip_prefix("/dev/") {
            if dev.starts_with("video") {
                let path = Path::new("/sys/class/video4linux").join(dev).join("name");
                return Self::read_trimmed(&path);
            }
        }

        if let Some(rest) = source.strip_prefix("hw:") {
            let card = rest.split(',').next()?.trim();
            let path = Path::new("/proc/asound")
                .join(format!("card{card}"))
                .join("id");
            return Self::read_trimmed(&path);
        }

        None
    }
}

/// A probe with fixed answers, for testing without hardware.
///
/// This allows exercising the full resolver and pipeline without requiring
/// actual capture devices, making it suitable for CI environments.
///
/// # Example
///
/// ```
/// use media_capture::{DeviceProbe, StaticProbe};
///
/// let probe = StaticProbe::new()
///     .with_device("/dev/video0", "Epiphan VGA2USB #0")
///     .with_device("hw:0", "USB Audio CODEC");
///
/// assert_eq!(
///     probe.vendor_string("/dev/video0").as_deref(),
///     Some("Epiphan VGA2USB #0")
/// );
/// assert_eq!(probe.vendor_string("/dev/video9"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    vendors: HashMap<String, String>,
}

impl StaticProbe {
    /// Creates a probe that knows no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vendor string for a source location.
    pub fn with_device(mut self, source: impl Into<String>, vendor: impl Into<String>) -> Self {
        self.vendors.insert(source.into(), vendor.into());
        self
    }
}

impl DeviceProbe for StaticProbe {
    fn vendor_string(&self, source: &str) -> Option<String> {
        self.vendors.get(source).cloned()
    }
}
