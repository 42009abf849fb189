//! Event router task.
//!
//! The router is the pipeline's only consumer of the graph's event bus. It
//! runs on its own task, concurrently with the thread driving
//! `start`/`stop`, and handles four message classes: end-of-stream forces
//! the pipeline down, errors and warnings are logged, and level messages are
//! forwarded to the registered listener. Nothing the router receives may
//! make it panic or raise.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use crate::event::{LevelCallback, LevelSample};
use crate::graph::{BusMessage, Structure, Value, LEVEL_ELEMENT_PREFIX};
use crate::pipeline::{clear_pipeline, Pipeline};

pub(crate) struct EventRouter {
    handle: Arc<Mutex<Option<Pipeline>>>,
    level_callback: Option<LevelCallback>,
    monitoring_enabled: bool,
}

impl EventRouter {
    pub(crate) fn new(
        handle: Arc<Mutex<Option<Pipeline>>>,
        level_callback: Option<LevelCallback>,
        monitoring_enabled: bool,
    ) -> Self {
        Self {
            handle,
            level_callback,
            monitoring_enabled,
        }
    }

    /// Consumes bus messages until the bus closes.
    pub(crate) async fn run(self, mut bus: mpsc::UnboundedReceiver<BusMessage>) {
        while let Some(message) = bus.recv().await {
            match message {
                BusMessage::EndOfStream => self.handle_eos(),
                BusMessage::Error { source, message } => {
                    tracing::error!(element = %source, "pipeline error: {message}");
                }
                BusMessage::Warning { source, message } => {
                    tracing::warn!(element = %source, "pipeline warning: {message}");
                }
                BusMessage::Element { element, structure } => {
                    self.handle_element(&element, &structure);
                }
            }
        }
    }

    /// End-of-stream is the only transition out of playing not initiated by
    /// `stop()`. It races with a concurrent `stop()`: whichever side takes
    /// the handle first tears the pipeline down, the other observes the
    /// empty handle and does nothing.
    fn handle_eos(&self) {
        if clear_pipeline(&self.handle) {
            tracing::info!("end of stream, pipeline shut down");
        }
    }

    /// Forwards a level sample to the registered listener.
    ///
    /// Malformed payloads - wrong structure name, missing or mistyped `rms`
    /// field, element name without the monitoring prefix - are silently
    /// dropped.
    fn handle_element(&self, element: &str, structure: &Structure) {
        if structure.name != "level" {
            return;
        }

        let Some(callback) = &self.level_callback else {
            return;
        };
        if !self.monitoring_enabled {
            return;
        }

        let Some(device) = element.strip_prefix(LEVEL_ELEMENT_PREFIX) else {
            return;
        };
        let Some(rms) = structure.field("rms").and_then(Value::as_f64_list) else {
            return;
        };
        let Some(first_channel) = rms.first() else {
            return;
        };

        callback(LevelSample {
            device: device.to_string(),
            timestamp_ms: wall_clock_ms(),
            rms: *first_channel,
        });
    }
}

fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
