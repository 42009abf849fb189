//! Mock graph backend for testing without media hardware.
//!
//! [`MockBackend`] produces graphs whose transitions and bus traffic are
//! scripted by the test. This allows exercising the full lifecycle - create,
//! bounded start, cooperative and forced shutdown, event routing - without
//! any native media framework, making it suitable for CI environments.
//!
//! # Example
//!
//! ```
//! use media_capture::graph::mock::{MockBackend, StartBehavior};
//!
//! // A backend whose pipelines never reach playing, to exercise the
//! // start-wait timeout path.
//! let backend = MockBackend::new().with_start_behavior(StartBehavior::Never);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::device::DeviceDescriptor;
use crate::error::CaptureError;
use crate::graph::{
    BusMessage, GraphBackend, GraphState, MediaGraph, Structure, Value, LEVEL_ELEMENT_PREFIX,
};

/// How a mock graph answers a request for the playing state.
#[derive(Debug, Clone, Copy, Default)]
pub enum StartBehavior {
    /// Reach playing immediately.
    #[default]
    Immediate,
    /// Reach playing after a delay.
    Delayed(Duration),
    /// Stall in ready; the caller's start-wait must expire.
    Never,
}

/// How a mock graph answers a cooperative end-of-stream request.
#[derive(Debug, Clone, Copy, Default)]
pub enum EosBehavior {
    /// Drain immediately: post `EndOfStream` on the bus.
    #[default]
    Drain,
    /// Drain after a delay.
    DrainAfter(Duration),
    /// Ignore the request; the caller's shutdown timeout must expire.
    Ignore,
}

struct MockGraphInner {
    branches: Vec<DeviceDescriptor>,
    /// Every state transition requested, in order.
    requested: Vec<GraphState>,
    eos_sent: bool,
    release_count: u32,
    bus_tx: mpsc::UnboundedSender<BusMessage>,
    state_tx: watch::Sender<GraphState>,
}

impl MockGraphInner {
    fn set_state(&self, state: GraphState) {
        let _ = self.state_tx.send(state);
    }

    fn post(&self, message: BusMessage) {
        let _ = self.bus_tx.send(message);
    }
}

/// A scripted media graph produced by [`MockBackend`].
pub struct MockGraph {
    name: String,
    inner: Arc<Mutex<MockGraphInner>>,
    bus_rx: Option<mpsc::UnboundedReceiver<BusMessage>>,
    state_rx: watch::Receiver<GraphState>,
    start_behavior: StartBehavior,
    eos_behavior: EosBehavior,
    reject: HashSet<String>,
}

impl MediaGraph for MockGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_branch(&mut self, descriptor: &DeviceDescriptor) -> Result<(), CaptureError> {
        if self.reject.contains(&descriptor.friendly_name) {
            return Err(CaptureError::backend(format!(
                "mock backend rejects device '{}'",
                descriptor.friendly_name
            )));
        }
        self.inner
            .lock()
            .unwrap()
            .branches
            .push(descriptor.clone());
        Ok(())
    }

    fn branch_count(&self) -> usize {
        self.inner.lock().unwrap().branches.len()
    }

    fn request_state(&mut self, target: GraphState) -> Result<(), CaptureError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requested.push(target);

        match target {
            GraphState::Playing => match self.start_behavior {
                StartBehavior::Immediate => {
                    inner.set_state(GraphState::Ready);
                    inner.set_state(GraphState::Paused);
                    inner.set_state(GraphState::Playing);
                }
                StartBehavior::Delayed(delay) => {
                    inner.set_state(GraphState::Ready);
                    inner.set_state(GraphState::Paused);
                    let shared = Arc::clone(&self.inner);
                    std::thread::spawn(move || {
                        std::thread::sleep(delay);
                        shared.lock().unwrap().set_state(GraphState::Playing);
                    });
                }
                StartBehavior::Never => {
                    inner.set_state(GraphState::Ready);
                }
            },
            other => inner.set_state(other),
        }

        Ok(())
    }

    fn state(&self) -> GraphState {
        *self.state_rx.borrow()
    }

    fn state_changes(&self) -> watch::Receiver<GraphState> {
        self.state_rx.clone()
    }

    fn send_eos(&mut self) {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.eos_sent {
                return;
            }
            inner.eos_sent = true;
        }

        match self.eos_behavior {
            EosBehavior::Drain => {
                self.inner.lock().unwrap().post(BusMessage::EndOfStream);
            }
            EosBehavior::DrainAfter(delay) => {
                let shared = Arc::clone(&self.inner);
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    shared.lock().unwrap().post(BusMessage::EndOfStream);
                });
            }
            EosBehavior::Ignore => {}
        }
    }

    fn take_bus(&mut self) -> Option<mpsc::UnboundedReceiver<BusMessage>> {
        self.bus_rx.take()
    }

    fn release(&mut self) {
        self.inner.lock().unwrap().release_count += 1;
    }
}

/// Test-side handle to a graph created by a [`MockBackend`].
///
/// Lets the test post bus messages mid-session and assert on the
/// transitions the controller requested.
#[derive(Clone)]
pub struct MockGraphHandle {
    inner: Arc<Mutex<MockGraphInner>>,
}

impl MockGraphHandle {
    /// Posts a raw bus message.
    pub fn post(&self, message: BusMessage) {
        self.inner.lock().unwrap().post(message);
    }

    /// Posts an end-of-stream message.
    pub fn post_eos(&self) {
        self.post(BusMessage::EndOfStream);
    }

    /// Posts an element error.
    pub fn post_error(&self, source: impl Into<String>, message: impl Into<String>) {
        self.post(BusMessage::Error {
            source: source.into(),
            message: message.into(),
        });
    }

    /// Posts an element warning.
    pub fn post_warning(&self, source: impl Into<String>, message: impl Into<String>) {
        self.post(BusMessage::Warning {
            source: source.into(),
            message: message.into(),
        });
    }

    /// Posts a well-formed audio level message for the given device.
    pub fn post_level(&self, device: &str, rms: Vec<f64>) {
        self.post(BusMessage::Element {
            element: format!("{LEVEL_ELEMENT_PREFIX}{device}"),
            structure: Structure::new("level").with_field("rms", Value::F64List(rms)),
        });
    }

    /// Returns every state transition the controller requested, in order.
    pub fn requested_states(&self) -> Vec<GraphState> {
        self.inner.lock().unwrap().requested.clone()
    }

    /// Whether a cooperative end-of-stream request was received.
    pub fn eos_sent(&self) -> bool {
        self.inner.lock().unwrap().eos_sent
    }

    /// How many times the graph's OS handles were released.
    pub fn release_count(&self) -> u32 {
        self.inner.lock().unwrap().release_count
    }

    /// Friendly names of the branches attached to the graph.
    pub fn branch_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .branches
            .iter()
            .map(|d| d.friendly_name.clone())
            .collect()
    }
}

/// A graph backend whose behavior is scripted by the test.
#[derive(Default)]
pub struct MockBackend {
    start_behavior: StartBehavior,
    eos_behavior: EosBehavior,
    fail_init: bool,
    reject: HashSet<String>,
    created: Mutex<Vec<MockGraphHandle>>,
}

impl MockBackend {
    /// Creates a backend whose graphs start and drain immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how created graphs answer playing-state requests.
    #[must_use]
    pub fn with_start_behavior(mut self, behavior: StartBehavior) -> Self {
        self.start_behavior = behavior;
        self
    }

    /// Sets how created graphs answer end-of-stream requests.
    #[must_use]
    pub fn with_eos_behavior(mut self, behavior: EosBehavior) -> Self {
        self.eos_behavior = behavior;
        self
    }

    /// Makes `init` fail, simulating a missing native dependency.
    #[must_use]
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Makes branch builds fail for the given friendly device name.
    #[must_use]
    pub fn rejecting_device(mut self, name: impl Into<String>) -> Self {
        self.reject.insert(name.into());
        self
    }

    /// Returns a handle to the most recently created graph.
    pub fn last_graph(&self) -> Option<MockGraphHandle> {
        self.created.lock().unwrap().last().cloned()
    }

    /// Number of graphs created so far.
    pub fn graphs_created(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl GraphBackend for MockBackend {
    fn init(&self) -> Result<(), CaptureError> {
        if self.fail_init {
            return Err(CaptureError::NativeLibrary {
                reason: "mock backend configured to fail initialization".to_string(),
            });
        }
        Ok(())
    }

    fn create_graph(&self, name: &str) -> Result<Box<dyn MediaGraph>, CaptureError> {
        let (bus_tx, bus_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(GraphState::Null);

        let inner = Arc::new(Mutex::new(MockGraphInner {
            branches: Vec::new(),
            requested: Vec::new(),
            eos_sent: false,
            release_count: 0,
            bus_tx,
            state_tx,
        }));

        self.created.lock().unwrap().push(MockGraphHandle {
            inner: Arc::clone(&inner),
        });

        Ok(Box::new(MockGraph {
            name: name.to_string(),
            inner,
            bus_rx: Some(bus_rx),
            state_rx,
            start_behavior: self.start_behavior,
            eos_behavior: self.eos_behavior,
            reject: self.reject.clone(),
        }))
    }
}
