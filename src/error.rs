//! Error types for media-capture.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`CaptureError`]): Prevent a session from starting or
//!   tear down the whole pipeline
//! - **Observational events**: Bus errors and warnings surfaced through the
//!   event router are logged and never raised

use std::path::PathBuf;

/// Fatal errors raised while resolving devices or driving the pipeline
/// lifecycle.
///
/// Device-level variants (`MissingSource`, `UnrecognizedDevice`,
/// `OutputFile`) are caught at the assembler boundary and degrade the device
/// set; pipeline-level variants (`NativeLibrary`, `UnableToStart`) abort the
/// session and propagate to the caller with the pipeline handle already
/// cleared.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The device-name list is missing from the configuration, or splitting
    /// it yielded no usable names.
    #[error("invalid capture configuration: {reason}")]
    Configuration {
        /// What was wrong with the configuration.
        reason: String,
    },

    /// A producer type that requires a source location has none configured.
    #[error("device '{device}' has no source location configured")]
    MissingSource {
        /// Friendly name of the device.
        device: String,
    },

    /// Hardware introspection found no matching vendor signature.
    #[error("device '{device}' not recognized (vendor string: {vendor:?})")]
    UnrecognizedDevice {
        /// Friendly name of the device.
        device: String,
        /// The vendor string the probe reported.
        vendor: String,
    },

    /// The pre-flight creation of the destination output file failed,
    /// including the case where the file already exists.
    #[error("cannot create output file {path}: {source}")]
    OutputFile {
        /// Path of the output file that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The native media backend failed to initialize.
    ///
    /// Distinct from configuration errors: the remediation is installing the
    /// missing native dependency, not fixing the configuration.
    #[error("native media backend failed to initialize: {reason}")]
    NativeLibrary {
        /// Why the backend could not be initialized.
        reason: String,
    },

    /// The pipeline could not be created, or did not reach the playing state
    /// within the session's start-wait timeout.
    #[error("unable to start capture: {reason}")]
    UnableToStart {
        /// Why the pipeline failed to start.
        reason: String,
    },

    /// An error from the underlying media backend during graph operations.
    #[error("media backend error: {0}")]
    Backend(String),
}

impl CaptureError {
    /// Creates a configuration error with the given reason.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates an unable-to-start error with the given reason.
    pub fn unable_to_start(reason: impl Into<String>) -> Self {
        Self::UnableToStart {
            reason: reason.into(),
        }
    }

    /// Creates an output-file error for the given path.
    pub fn output_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
