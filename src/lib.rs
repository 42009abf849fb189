//! # media-capture
//!
//! Multi-device media capture orchestration with bounded-time lifecycle and
//! audio level monitoring.
//!
//! `media-capture` turns a flat device configuration into a running capture
//! (or confidence-monitoring) pipeline on top of a pluggable media-graph
//! backend: per-device resolution with graceful degradation, bounded
//! startup and shutdown, and audio-level event routing to external
//! listeners.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use media_capture::graph::audio::AudioBackend;
//! use media_capture::{
//!     level_callback, CaptureConfig, CapturePipeline, CaptureSession, SysfsProbe,
//! };
//!
//! let config = CaptureConfig::new()
//!     .with("capture.device.names", "cam1,mic1")
//!     .with("capture.device.cam1.source", "/dev/video0")
//!     .with("capture.device.cam1.dest", "cam1.mov")
//!     .with("capture.device.mic1.source", "hw:0")
//!     .with("capture.device.mic1.dest", "mic1.wav")
//!     .with("capture.monitoring.enabled", "true");
//!
//! let mut pipeline = CapturePipeline::new(
//!     Arc::new(AudioBackend::new()),
//!     Arc::new(SysfsProbe::new()),
//! )
//! .with_level_callback(level_callback(|sample| {
//!     tracing::info!("{}: {:.1} dB", sample.device, sample.rms);
//! }));
//!
//! pipeline.start(&CaptureSession::capture(config)).await?;
//! // ... recording runs, level samples arrive on the callback ...
//! pipeline.stop(Duration::from_secs(30)).await;
//! ```
//!
//! ## Architecture
//!
//! The crate keeps a strict boundary between orchestration and media
//! processing:
//!
//! - **Device resolver**: Parses the configuration into descriptors,
//!   classifying unknown hardware by vendor-string introspection
//! - **Assembler**: Builds one graph branch per resolved device; individual
//!   device failures degrade the set instead of aborting the session
//! - **Controller**: Drives `create -> playing -> null` with bounded waits
//!   on both ends
//! - **Event router**: A background task consuming the graph's bus,
//!   handling end-of-stream concurrently with the caller and forwarding RMS
//!   level samples to a registered listener
//!
//! Backends implement the small [`graph::GraphBackend`] surface. The crate
//! ships [`graph::audio::AudioBackend`] for CPAL-based audio capture and
//! [`graph::mock::MockBackend`] for hardware-free testing.

#![warn(missing_docs)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod config;
mod device;
mod error;
mod event;
pub mod graph;
mod pipeline;
mod session;

pub use config::{
    CaptureConfig, DEFAULT_START_WAIT, DEVICE_NAMES_KEY, DEVICE_PREFIX, MONITORING_ENABLED_KEY,
    OUTPUT_DIR_KEY, START_WAIT_KEY,
};
pub use device::{
    device_names, resolve_device, DeviceDescriptor, DeviceProbe, DeviceProperties, ProducerType,
    StaticProbe, SysfsProbe,
};
pub use error::CaptureError;
pub use event::{failure_callback, level_callback, FailureCallback, LevelCallback, LevelSample};
pub use graph::{BusMessage, GraphBackend, GraphState, MediaGraph, Structure, Value};
pub use pipeline::{CapturePipeline, Pipeline};
pub use session::{CaptureSession, SessionKind};
