//! The boundary to the native media-graph backend.
//!
//! Everything below this module is the backend's business: element creation,
//! encoding, muxing. The orchestration layer only needs the small surface
//! defined here - build branches, request state transitions, watch the state,
//! and read the message bus.

pub mod audio;
pub mod mock;

use std::collections::HashMap;

use tokio::sync::{mpsc, watch};

use crate::device::DeviceDescriptor;
use crate::error::CaptureError;

/// Name prefix of the per-device level-monitoring element.
///
/// Level messages carry the emitting element's name; stripping this prefix
/// recovers the friendly device name. Backends must name their monitoring
/// elements `level-<friendly name>` for level routing to work.
pub const LEVEL_ELEMENT_PREFIX: &str = "level-";

/// States of a media graph.
///
/// The lifecycle is `Null -> Ready -> Paused -> Playing`, unwinding back to
/// `Null` on end-of-stream or shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphState {
    /// No resources allocated.
    #[default]
    Null,
    /// Resources allocated, devices opened.
    Ready,
    /// Data flow paused.
    Paused,
    /// Data flowing.
    Playing,
}

impl std::fmt::Display for GraphState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Ready => "ready",
            Self::Paused => "paused",
            Self::Playing => "playing",
        };
        write!(f, "{name}")
    }
}

/// A field value inside a structured bus message.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single double.
    F64(f64),
    /// A list of doubles, one per channel.
    F64List(Vec<f64>),
    /// A signed integer.
    I64(i64),
    /// A string.
    Str(String),
}

impl Value {
    /// Returns the value as a list of doubles, if it is one.
    pub fn as_f64_list(&self) -> Option<&[f64]> {
        match self {
            Self::F64List(values) => Some(values),
            _ => None,
        }
    }
}

/// A named structure carried by an element message.
///
/// Mirrors the native framework's loosely typed message payloads: a name
/// plus a field map. Consumers must treat missing or mistyped fields as
/// malformed input, not as errors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Structure {
    /// Structure name (e.g. `level`).
    pub name: String,
    fields: HashMap<String, Value>,
}

impl Structure {
    /// Creates an empty structure with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: HashMap::new(),
        }
    }

    /// Adds a field, returning the structure for chaining.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Messages posted on a graph's event bus.
///
/// The bus is read by the event router on its own task, concurrently with
/// the thread driving `start`/`stop`.
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// The whole graph finished producing data.
    EndOfStream,
    /// A fatal element error. Observational at this layer: logged, never
    /// raised.
    Error {
        /// Name of the element that errored.
        source: String,
        /// Error description.
        message: String,
    },
    /// A non-fatal element warning.
    Warning {
        /// Name of the element that warned.
        source: String,
        /// Warning description.
        message: String,
    },
    /// A structured message from an element (e.g. audio level reports).
    Element {
        /// Name of the emitting element.
        element: String,
        /// The message payload.
        structure: Structure,
    },
}

/// A media graph under construction or running.
///
/// One graph owns zero or more device branches exclusively. State
/// transitions are requested asynchronously; completion is observed through
/// [`state_changes`](MediaGraph::state_changes).
pub trait MediaGraph: Send {
    /// Returns the graph's display name.
    fn name(&self) -> &str;

    /// Builds one device branch and attaches it to the graph.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot express this descriptor;
    /// the assembler treats that as a per-device failure.
    fn add_branch(&mut self, descriptor: &DeviceDescriptor) -> Result<(), CaptureError>;

    /// Number of branches attached so far.
    fn branch_count(&self) -> usize;

    /// Requests an asynchronous transition to the target state.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend refuses the transition outright.
    fn request_state(&mut self, target: GraphState) -> Result<(), CaptureError>;

    /// Returns the last observed state.
    fn state(&self) -> GraphState;

    /// Returns a receiver observing every state change.
    fn state_changes(&self) -> watch::Receiver<GraphState>;

    /// Sends a cooperative end-of-stream request to every branch.
    fn send_eos(&mut self);

    /// Takes the bus receiver. Single consumer; returns `None` on second
    /// call.
    fn take_bus(&mut self) -> Option<mpsc::UnboundedReceiver<BusMessage>>;

    /// Releases all underlying OS device handles.
    ///
    /// Must be safe to call more than once and on a graph that never left
    /// `Null`.
    fn release(&mut self);
}

/// Factory for media graphs.
///
/// `init` is the native-library load point: a failure here means a missing
/// native dependency, not a configuration problem, and maps to
/// [`CaptureError::NativeLibrary`].
pub trait GraphBackend: Send + Sync {
    /// Initializes the native library backing this backend.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NativeLibrary`] when the backend cannot load.
    fn init(&self) -> Result<(), CaptureError>;

    /// Creates a fresh, empty graph with the given display name.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot allocate a graph container.
    fn create_graph(&self, name: &str) -> Result<Box<dyn MediaGraph>, CaptureError>;
}
