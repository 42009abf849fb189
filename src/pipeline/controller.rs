//! Pipeline lifecycle controller.
//!
//! [`CapturePipeline`] owns the assembled graph through one
//! `create -> start -> running -> stop` cycle. `start` and `stop` are
//! bounded: `start` waits for the playing transition up to the session's
//! start-wait timeout, `stop` attempts a cooperative end-of-stream drain and
//! falls back to forcing the graph down when the shutdown timeout elapses.
//!
//! The pipeline handle is shared mutable state: the caller reaches it inside
//! `start`/`stop`, the event router reaches it from its own task when
//! end-of-stream arrives. Both go through one mutex-guarded teardown path,
//! so the race between `stop()` and a concurrent end-of-stream resolves to a
//! safe no-op for whichever side arrives second.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::device::DeviceProbe;
use crate::error::CaptureError;
use crate::event::{FailureCallback, LevelCallback};
use crate::graph::{GraphBackend, GraphState};
use crate::pipeline::router::EventRouter;
use crate::pipeline::{assembler, clear_pipeline, Pipeline};
use crate::session::{CaptureSession, SessionKind};

/// Outcome of waiting for the playing transition.
enum StartOutcome {
    /// The graph reached playing.
    Playing,
    /// A concurrent end-of-stream tore the pipeline down first.
    Cleared,
}

/// Controls the lifecycle of one capture or monitoring pipeline.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use media_capture::graph::audio::AudioBackend;
/// use media_capture::{CaptureConfig, CapturePipeline, CaptureSession, SysfsProbe};
///
/// # async fn run() -> Result<(), media_capture::CaptureError> {
/// let config = CaptureConfig::new()
///     .with("capture.device.names", "mic1")
///     .with("capture.device.mic1.source", "hw:0")
///     .with("capture.device.mic1.dest", "mic1.wav");
///
/// let mut pipeline = CapturePipeline::new(
///     Arc::new(AudioBackend::new()),
///     Arc::new(SysfsProbe::new()),
/// );
///
/// pipeline.start(&CaptureSession::capture(config)).await?;
/// // ... recording ...
/// pipeline.stop(Duration::from_secs(30)).await;
/// # Ok(())
/// # }
/// ```
pub struct CapturePipeline {
    backend: Arc<dyn GraphBackend>,
    probe: Arc<dyn DeviceProbe>,
    handle: Arc<Mutex<Option<Pipeline>>>,
    level_callback: Option<LevelCallback>,
    failure_callback: Option<FailureCallback>,
    /// Guards the failure callback against double notification within one
    /// start attempt.
    failure_notified: AtomicBool,
    router_task: Option<JoinHandle<()>>,
}

impl CapturePipeline {
    /// Creates a controller using the given backend and hardware probe.
    pub fn new(backend: Arc<dyn GraphBackend>, probe: Arc<dyn DeviceProbe>) -> Self {
        Self {
            backend,
            probe,
            handle: Arc::new(Mutex::new(None)),
            level_callback: None,
            failure_callback: None,
            failure_notified: AtomicBool::new(false),
            router_task: None,
        }
    }

    /// Registers a listener for per-device audio level samples.
    ///
    /// Samples are only forwarded while the session has monitoring enabled.
    #[must_use]
    pub fn with_level_callback(mut self, callback: LevelCallback) -> Self {
        self.level_callback = Some(callback);
        self
    }

    /// Registers a handler notified when a capture session fails to start.
    ///
    /// Monitor-only sessions never notify it.
    #[must_use]
    pub fn with_failure_callback(mut self, callback: FailureCallback) -> Self {
        self.failure_callback = Some(callback);
        self
    }

    /// Returns the last observed graph state, or `Null` when no pipeline is
    /// held.
    pub fn state(&self) -> GraphState {
        self.lock_handle()
            .as_ref()
            .map(Pipeline::state)
            .unwrap_or(GraphState::Null)
    }

    /// Returns `true` while the pipeline is in the playing state.
    pub fn is_running(&self) -> bool {
        self.state() == GraphState::Playing
    }

    /// Creates the pipeline for `session` and brings it to playing.
    ///
    /// Blocks the caller up to the session's start-wait timeout. On any
    /// failure the pipeline handle is already cleared and every OS device
    /// handle released before the error is returned - no partial pipeline
    /// survives a failed start.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::NativeLibrary`] if the backend cannot initialize
    /// - [`CaptureError::UnableToStart`] if no pipeline could be created, a
    ///   concurrent end-of-stream tore it down, or playing was not reached
    ///   within the start-wait timeout
    pub async fn start(&mut self, session: &CaptureSession) -> Result<(), CaptureError> {
        if self.lock_handle().is_some() {
            return Err(CaptureError::unable_to_start("session is already running"));
        }
        self.failure_notified.store(false, Ordering::SeqCst);

        let pipeline =
            match assembler::create(self.backend.as_ref(), self.probe.as_ref(), session) {
                Ok(Some(pipeline)) => pipeline,
                Ok(None) => {
                    return Err(self.fail_start(
                        session,
                        CaptureError::unable_to_start("no usable capture devices configured"),
                    ))
                }
                Err(e) => return Err(self.fail_start(session, e)),
            };

        match self.run_to_playing(session, pipeline).await {
            Ok(()) => {
                tracing::info!(
                    kind = session.kind().display_name(),
                    "capture pipeline playing"
                );
                Ok(())
            }
            Err(e) => Err(self.fail_start(session, e)),
        }
    }

    async fn run_to_playing(
        &mut self,
        session: &CaptureSession,
        mut pipeline: Pipeline,
    ) -> Result<(), CaptureError> {
        let bus = pipeline
            .take_bus()
            .ok_or_else(|| CaptureError::backend("graph bus already consumed"))?;
        let mut state_rx = pipeline.state_changes();

        *self.lock_handle() = Some(pipeline);

        // The router must be on the bus strictly before the playing request,
        // so an end-of-stream or error fired during the transition is not
        // missed.
        let router = EventRouter::new(
            Arc::clone(&self.handle),
            self.level_callback.clone(),
            session.monitoring_enabled(),
        );
        self.router_task = Some(tokio::spawn(router.run(bus)));

        if let Err(e) = self.request_playing() {
            clear_pipeline(&self.handle);
            return Err(CaptureError::unable_to_start(format!(
                "backend refused playing transition: {e}"
            )));
        }

        let wait = tokio::time::timeout(
            session.start_wait(),
            wait_for_playing(&mut state_rx, &self.handle),
        );
        match wait.await {
            Ok(StartOutcome::Playing) => Ok(()),
            Ok(StartOutcome::Cleared) => Err(CaptureError::unable_to_start(
                "pipeline reached end of stream before playing",
            )),
            Err(_) => {
                clear_pipeline(&self.handle);
                Err(CaptureError::unable_to_start(format!(
                    "pipeline did not reach playing within {:?}",
                    session.start_wait()
                )))
            }
        }
    }

    fn request_playing(&self) -> Result<(), CaptureError> {
        match self.lock_handle().as_mut() {
            Some(pipeline) => pipeline.request_state(GraphState::Playing),
            // A concurrent end-of-stream already tore the pipeline down.
            None => Err(CaptureError::backend("pipeline gone before playing request")),
        }
    }

    /// Stops the pipeline within `timeout`.
    ///
    /// Sends a cooperative end-of-stream to every branch and waits for the
    /// drain to reach paused or null. When the timeout elapses first, the
    /// graph is forced directly to null, trading buffered in-flight data for
    /// a bounded shutdown latency.
    ///
    /// Every exit path releases the underlying OS device handles and clears
    /// the pipeline handle. Calling `stop` with no pipeline held is a no-op,
    /// which makes a second `stop`, or one racing an end-of-stream, safe.
    pub async fn stop(&mut self, timeout: Duration) {
        let mut state_rx = {
            let mut guard = self.lock_handle();
            match guard.as_mut() {
                None => return,
                Some(pipeline) => {
                    pipeline.send_eos();
                    pipeline.state_changes()
                }
            }
        };

        let drained = tokio::time::timeout(timeout, wait_for_drained(&mut state_rx))
            .await
            .is_ok();
        if !drained {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "cooperative shutdown timed out, forcing pipeline down"
            );
        }

        clear_pipeline(&self.handle);

        if let Some(task) = self.router_task.take() {
            task.abort();
        }

        tracing::info!(forced = !drained, "capture pipeline stopped");
    }

    fn fail_start(&self, session: &CaptureSession, error: CaptureError) -> CaptureError {
        tracing::error!(
            kind = session.kind().display_name(),
            error = %error,
            "failed to start session"
        );

        if session.kind() == SessionKind::Capture {
            if let Some(callback) = &self.failure_callback {
                if !self.failure_notified.swap(true, Ordering::SeqCst) {
                    callback(&error.to_string());
                }
            }
        }

        error
    }

    fn lock_handle(&self) -> std::sync::MutexGuard<'_, Option<Pipeline>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        // Dropped without an explicit stop: still release device handles.
        clear_pipeline(&self.handle);
        if let Some(task) = self.router_task.take() {
            task.abort();
        }
    }
}

async fn wait_for_playing(
    state_rx: &mut watch::Receiver<GraphState>,
    handle: &Mutex<Option<Pipeline>>,
) -> StartOutcome {
    loop {
        let state = *state_rx.borrow_and_update();
        if state == GraphState::Playing {
            return StartOutcome::Playing;
        }
        let cleared = handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none();
        if state == GraphState::Null && cleared {
            return StartOutcome::Cleared;
        }
        if state_rx.changed().await.is_err() {
            return StartOutcome::Cleared;
        }
    }
}

async fn wait_for_drained(state_rx: &mut watch::Receiver<GraphState>) {
    loop {
        let state = *state_rx.borrow_and_update();
        if matches!(state, GraphState::Paused | GraphState::Null) {
            return;
        }
        if state_rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;
    use crate::device::StaticProbe;
    use crate::graph::mock::{EosBehavior, MockBackend, StartBehavior};

    fn probe() -> Arc<StaticProbe> {
        Arc::new(
            StaticProbe::new()
                .with_device("/dev/video0", "Epiphan VGA2USB #0")
                .with_device("hw:0", "USB Audio CODEC"),
        )
    }

    fn session(dir: &std::path::Path) -> CaptureSession {
        CaptureSession::capture(
            CaptureConfig::new()
                .with("capture.device.names", "mic1")
                .with("capture.device.mic1.source", "hw:0")
                .with("capture.device.mic1.dest", "mic1.wav")
                .with("capture.output.dir", dir.display().to_string())
                .with("capture.start.wait", "1"),
        )
    }

    #[tokio::test]
    async fn test_start_reaches_playing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new());
        let mut pipeline = CapturePipeline::new(backend.clone(), probe());

        pipeline.start(&session(dir.path())).await.unwrap();
        assert!(pipeline.is_running());

        pipeline.stop(Duration::from_secs(1)).await;
        assert_eq!(pipeline.state(), GraphState::Null);
    }

    #[tokio::test]
    async fn test_start_timeout_forces_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().with_start_behavior(StartBehavior::Never));
        let mut pipeline = CapturePipeline::new(backend.clone(), probe());

        let err = pipeline.start(&session(dir.path())).await.unwrap_err();
        assert!(matches!(err, CaptureError::UnableToStart { .. }));

        // No partial pipeline survives a failed start.
        assert_eq!(pipeline.state(), GraphState::Null);
        assert_eq!(backend.last_graph().unwrap().release_count(), 1);
    }

    #[tokio::test]
    async fn test_start_while_running_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new());
        let mut pipeline = CapturePipeline::new(backend, probe());

        pipeline.start(&session(dir.path())).await.unwrap();
        let err = pipeline.start(&session(dir.path())).await.unwrap_err();
        assert!(matches!(err, CaptureError::UnableToStart { .. }));

        pipeline.stop(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_stop_cooperative_requests_eos() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new());
        let mut pipeline = CapturePipeline::new(backend.clone(), probe());

        pipeline.start(&session(dir.path())).await.unwrap();
        pipeline.stop(Duration::from_secs(5)).await;

        let control = backend.last_graph().unwrap();
        assert!(control.eos_sent());
        assert_eq!(control.release_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_forced_on_ignored_eos() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new().with_eos_behavior(EosBehavior::Ignore));
        let mut pipeline = CapturePipeline::new(backend.clone(), probe());

        pipeline.start(&session(dir.path())).await.unwrap();
        pipeline.stop(Duration::from_millis(100)).await;

        assert_eq!(pipeline.state(), GraphState::Null);
        assert_eq!(backend.last_graph().unwrap().release_count(), 1);
    }

    #[tokio::test]
    async fn test_double_stop_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new());
        let mut pipeline = CapturePipeline::new(backend.clone(), probe());

        pipeline.start(&session(dir.path())).await.unwrap();
        pipeline.stop(Duration::from_secs(1)).await;

        let control = backend.last_graph().unwrap();
        let requests_after_first = control.requested_states();

        pipeline.stop(Duration::from_secs(1)).await;
        assert_eq!(control.requested_states(), requests_after_first);
        assert_eq!(control.release_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_callback_fires_for_capture_only() {
        use std::sync::atomic::AtomicUsize;

        let notified = Arc::new(AtomicUsize::new(0));
        let notified_clone = notified.clone();

        let backend = Arc::new(MockBackend::new().failing_init());
        let mut pipeline = CapturePipeline::new(backend.clone(), probe())
            .with_failure_callback(crate::event::failure_callback(move |_| {
                notified_clone.fetch_add(1, Ordering::SeqCst);
            }));

        let dir = tempfile::tempdir().unwrap();
        let err = pipeline.start(&session(dir.path())).await.unwrap_err();
        assert!(matches!(err, CaptureError::NativeLibrary { .. }));
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        // Monitor sessions never notify the failure handler.
        let monitor = CaptureSession::monitor(
            CaptureConfig::new().with("capture.device.names", "mic1"),
        );
        let _ = pipeline.start(&monitor).await.unwrap_err();
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }
}
