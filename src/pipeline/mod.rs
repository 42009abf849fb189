//! Pipeline assembly, lifecycle control, and event routing.

mod assembler;
mod controller;
mod router;

pub use controller::CapturePipeline;

use std::sync::Mutex;

use tokio::sync::{mpsc, watch};

use crate::device::DeviceDescriptor;
use crate::error::CaptureError;
use crate::graph::{BusMessage, GraphState, MediaGraph};

/// An assembled pipeline: the backend graph plus the descriptors whose
/// branches it carries.
///
/// Created by the assembler, owned behind the controller's shared handle,
/// and destroyed on `stop()` or end-of-stream - never outliving one
/// `create`..`stop` cycle.
pub struct Pipeline {
    graph: Box<dyn MediaGraph>,
    descriptors: Vec<DeviceDescriptor>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.graph.name())
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

impl Pipeline {
    pub(crate) fn new(graph: Box<dyn MediaGraph>, descriptors: Vec<DeviceDescriptor>) -> Self {
        Self { graph, descriptors }
    }

    /// Returns the graph's display name.
    pub fn name(&self) -> &str {
        self.graph.name()
    }

    /// Returns the devices captured by this pipeline.
    pub fn descriptors(&self) -> &[DeviceDescriptor] {
        &self.descriptors
    }

    /// Returns the last observed graph state.
    pub fn state(&self) -> GraphState {
        self.graph.state()
    }

    pub(crate) fn state_changes(&self) -> watch::Receiver<GraphState> {
        self.graph.state_changes()
    }

    pub(crate) fn take_bus(&mut self) -> Option<mpsc::UnboundedReceiver<BusMessage>> {
        self.graph.take_bus()
    }

    pub(crate) fn request_state(&mut self, target: GraphState) -> Result<(), CaptureError> {
        self.graph.request_state(target)
    }

    pub(crate) fn send_eos(&mut self) {
        self.graph.send_eos()
    }

    pub(crate) fn release(&mut self) {
        self.graph.release()
    }
}

/// Tears down whatever pipeline the shared handle holds: force the graph to
/// null, release its OS device handles, and clear the handle.
///
/// This is the single teardown path shared by `stop()`, the start-timeout
/// path, and the end-of-stream handler. It is idempotent: clearing an
/// already-empty handle is a no-op, never an error, which makes the race
/// between a caller's `stop()` and a concurrent end-of-stream safe.
///
/// Returns `true` if a pipeline was actually torn down.
pub(crate) fn clear_pipeline(handle: &Mutex<Option<Pipeline>>) -> bool {
    let taken = {
        let mut guard = handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.take()
    };

    match taken {
        Some(mut pipeline) => {
            if let Err(e) = pipeline.request_state(GraphState::Null) {
                tracing::warn!(error = %e, "backend refused null transition during teardown");
            }
            pipeline.release();
            true
        }
        None => false,
    }
}
