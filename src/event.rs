//! Callback types for external session listeners.
//!
//! Two collaborators can observe a running session: an audio level monitor
//! receiving per-device RMS samples, and a failure handler notified when a
//! capture session fails to start. Both are optional - absence of a
//! registered listener is a no-op, never an error.

use std::sync::Arc;

/// One audio level sample extracted from the pipeline's event bus.
///
/// Samples are forwarded to the registered [`LevelCallback`] as they arrive,
/// concurrently with the calling thread. The RMS value is the first channel
/// of the emitting device, in dB relative to full scale.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSample {
    /// Friendly name of the device the sample came from.
    pub device: String,
    /// Wall-clock timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// First-channel RMS value in dB.
    pub rms: f64,
}

/// Callback type for receiving audio level samples.
///
/// Register via [`CapturePipeline::with_level_callback()`] to receive RMS
/// samples while monitoring is enabled for the session.
///
/// [`CapturePipeline::with_level_callback()`]: crate::CapturePipeline::with_level_callback
///
/// # Example
///
/// ```
/// use media_capture::{level_callback, LevelSample};
///
/// let callback = level_callback(|sample: LevelSample| {
///     println!("{}: {:.1} dB", sample.device, sample.rms);
/// });
/// ```
pub type LevelCallback = Arc<dyn Fn(LevelSample) + Send + Sync>;

/// Creates a [`LevelCallback`] from a closure.
pub fn level_callback<F>(f: F) -> LevelCallback
where
    F: Fn(LevelSample) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Callback type for capture start failures.
///
/// Notified exactly once when a *capture* (not monitor-only) session fails
/// to start, so upstream scheduling state can be reset. The argument is a
/// human-readable failure reason.
pub type FailureCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Creates a [`FailureCallback`] from a closure.
pub fn failure_callback<F>(f: F) -> FailureCallback
where
    F: Fn(&str) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_level_callback_helper() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = level_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(LevelSample {
            device: "mic1".to_string(),
            timestamp_ms: 0,
            rms: -20.0,
        });
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_failure_callback_helper() {
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = failure_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback("pipeline did not reach playing");
        assert!(called.load(Ordering::SeqCst));
    }
}
