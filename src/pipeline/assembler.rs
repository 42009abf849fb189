//! Builds a pipeline from a session's device configuration.

use crate::device::{self, DeviceProbe};
use crate::error::CaptureError;
use crate::graph::GraphBackend;
use crate::pipeline::Pipeline;
use crate::session::CaptureSession;

/// Resolves every configured device and assembles one branch per survivor
/// on a fresh graph.
///
/// Per-device failures - unresolvable devices, branches the backend cannot
/// build - are logged and degrade the device set; they are not fatal
/// individually. Two conditions yield `Ok(None)` rather than an error, as an
/// intentional "nothing to do" signal distinct from exceptional failure:
/// an unparsable device-name list, and zero usable branches after filtering.
///
/// # Errors
///
/// - [`CaptureError::NativeLibrary`] if the backend fails to initialize
/// - Whatever the backend raises when it cannot allocate a graph container
pub(crate) fn create(
    backend: &dyn GraphBackend,
    probe: &dyn DeviceProbe,
    session: &CaptureSession,
) -> Result<Option<Pipeline>, CaptureError> {
    backend.init()?;

    let names = match device::device_names(session.config()) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(error = %e, "cannot determine capture devices, nothing to do");
            return Ok(None);
        }
    };

    let mut graph = backend.create_graph(session.kind().display_name())?;
    let mut descriptors = Vec::with_capacity(names.len());

    for name in &names {
        let descriptor = match device::resolve_device(
            name,
            session.config(),
            session.output_dir(),
            session.kind().is_monitor_only(),
            probe,
        ) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!(device = %name, error = %e, "dropping unresolvable device");
                continue;
            }
        };

        match graph.add_branch(&descriptor) {
            Ok(()) => descriptors.push(descriptor),
            Err(e) => {
                tracing::warn!(device = %name, error = %e, "dropping device: branch build failed");
            }
        }
    }

    if descriptors.is_empty() {
        tracing::warn!("no usable capture devices after filtering, nothing to do");
        graph.release();
        return Ok(None);
    }

    tracing::info!(
        pipeline = graph.name(),
        devices = descriptors.len(),
        configured = names.len(),
        "assembled capture pipeline"
    );

    Ok(Some(Pipeline::new(graph, descriptors)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use crate::device::StaticProbe;
    use crate::graph::mock::MockBackend;

    fn config_for(dir: &std::path::Path) -> CaptureConfig {
        CaptureConfig::new()
            .with("capture.device.names", "cam1,mic1")
            .with("capture.device.cam1.source", "/dev/video0")
            .with("capture.device.cam1.dest", "cam1.mov")
            .with("capture.device.mic1.source", "hw:0")
            .with("capture.device.mic1.dest", "mic1.wav")
            .with("capture.output.dir", dir.display().to_string())
    }

    fn probe() -> StaticProbe {
        StaticProbe::new()
            .with_device("/dev/video0", "Epiphan VGA2USB #0")
            .with_device("hw:0", "USB Audio CODEC")
    }

    #[test]
    fn test_create_assembles_all_devices() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let session = CaptureSession::capture(config_for(dir.path()));

        let pipeline = create(&backend, &probe(), &session).unwrap().unwrap();
        assert_eq!(pipeline.descriptors().len(), 2);
        assert_eq!(pipeline.name(), "capture");
    }

    #[test]
    fn test_create_unparsable_names_is_none() {
        let backend = MockBackend::new();
        let session = CaptureSession::capture(CaptureConfig::new());

        assert!(create(&backend, &probe(), &session).unwrap().is_none());
    }

    #[test]
    fn test_create_degrades_on_single_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        // Probe only knows the microphone; the camera fails resolution.
        let partial = StaticProbe::new().with_device("hw:0", "USB Audio CODEC");
        let session = CaptureSession::capture(config_for(dir.path()));

        let pipeline = create(&backend, &partial, &session).unwrap().unwrap();
        assert_eq!(pipeline.descriptors().len(), 1);
        assert_eq!(pipeline.descriptors()[0].friendly_name, "mic1");
    }

    #[test]
    fn test_create_all_failed_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let session = CaptureSession::capture(config_for(dir.path()));

        let result = create(&backend, &StaticProbe::new(), &session).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_create_degrades_on_branch_build_failure() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new().rejecting_device("cam1");
        let session = CaptureSession::capture(config_for(dir.path()));

        let pipeline = create(&backend, &probe(), &session).unwrap().unwrap();
        assert_eq!(pipeline.descriptors().len(), 1);
        assert_eq!(backend.last_graph().unwrap().branch_names(), vec!["mic1"]);
    }

    #[test]
    fn test_create_backend_init_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new().failing_init();
        let session = CaptureSession::capture(config_for(dir.path()));

        let err = create(&backend, &probe(), &session).unwrap_err();
        assert!(matches!(err, CaptureError::NativeLibrary { .. }));
    }

    #[test]
    fn test_monitor_session_graph_name() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new();
        let session = CaptureSession::monitor(config_for(dir.path()));

        let pipeline = create(&backend, &probe(), &session).unwrap().unwrap();
        assert_eq!(pipeline.name(), "confidence-monitor");
    }
}
