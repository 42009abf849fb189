//! CPAL-backed audio capture backend.
//!
//! [`AudioBackend`] implements the graph boundary for audio-only setups:
//! ALSA-style device branches capture through CPAL into a lock-free ring
//! buffer and append to a WAV file at the descriptor's output path, while
//! file-source branches stream-copy their source to the output. Video
//! producers are rejected at branch build, which the assembler treats as a
//! per-device degrade.
//!
//! CPAL streams are not `Send`, so every stream lives on a dedicated worker
//! thread per graph. The graph handle only exchanges commands and state with
//! that thread; the thread posts level and end-of-stream messages on the
//! bus.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;
use tokio::sync::{mpsc, watch};

use crate::device::{DeviceDescriptor, ProducerType};
use crate::error::CaptureError;
use crate::graph::{
    BusMessage, GraphBackend, GraphState, MediaGraph, Structure, Value, LEVEL_ELEMENT_PREFIX,
};

/// Symmetric i16 max for audio conversion (avoids asymmetric clipping).
const I16_MAX_SYMMETRIC: f32 = i16::MAX as f32;

/// How often the worker drains ring buffers and file sources.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bytes copied from a file source per worker tick.
const FILE_COPY_CHUNK: usize = 64 * 1024;

/// Ring buffer capacity in samples (30 seconds at 48kHz stereo).
const RING_CAPACITY: usize = 48_000 * 2 * 30;

/// Effective silence floor for 16-bit audio in dB.
const SILENCE_FLOOR_DB: f64 = -96.0;

/// Calculates RMS level in dB relative to `i16::MAX`.
fn calculate_rms_db(sum_squares: f64, sample_count: usize) -> f64 {
    if sample_count == 0 {
        return SILENCE_FLOOR_DB;
    }
    let rms = (sum_squares / sample_count as f64).sqrt();
    if rms > 0.0 {
        20.0 * (rms / f64::from(i16::MAX)).log10()
    } else {
        SILENCE_FLOOR_DB
    }
}

/// An audio-only graph backend built on CPAL.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use media_capture::graph::audio::AudioBackend;
/// use media_capture::graph::GraphBackend;
///
/// let backend = Arc::new(AudioBackend::new());
/// backend.init()?;
/// # Ok::<(), media_capture::CaptureError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct AudioBackend;

impl AudioBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl GraphBackend for AudioBackend {
    fn init(&self) -> Result<(), CaptureError> {
        // Enumerating input devices exercises the native audio library load
        // path without opening anything.
        cpal::default_host()
            .input_devices()
            .map(drop)
            .map_err(|e| CaptureError::NativeLibrary {
                reason: e.to_string(),
            })
    }

    fn create_graph(&self, name: &str) -> Result<Box<dyn MediaGraph>, CaptureError> {
        Ok(Box::new(AudioGraph::new(name)))
    }
}

/// Branch plans validated at build time, opened on the worker thread.
enum BranchPlan {
    Capture {
        name: String,
        device: String,
        output: Option<PathBuf>,
    },
    FileCopy {
        name: String,
        source: PathBuf,
        output: Option<PathBuf>,
    },
}

enum WorkerCommand {
    /// Drain cooperatively: finalize outputs, then post end-of-stream.
    Eos,
    /// Exit immediately, abandoning buffered data.
    ForceStop,
}

struct AudioGraph {
    name: String,
    plans: Vec<BranchPlan>,
    state_tx: Arc<watch::Sender<GraphState>>,
    state_rx: watch::Receiver<GraphState>,
    bus_tx: mpsc::UnboundedSender<BusMessage>,
    bus_rx: Option<mpsc::UnboundedReceiver<BusMessage>>,
    cmd_tx: Option<std_mpsc::Sender<WorkerCommand>>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl AudioGraph {
    fn new(name: &str) -> Self {
        let (state_tx, state_rx) = watch::channel(GraphState::Null);
        let (bus_tx, bus_rx) = mpsc::unbounded_channel();
        Self {
            name: name.to_string(),
            plans: Vec::new(),
            state_tx: Arc::new(state_tx),
            state_rx,
            bus_tx,
            bus_rx: Some(bus_rx),
            cmd_tx: None,
            worker: None,
        }
    }

    fn stop_worker(&mut self, force: bool) {
        if let Some(cmd_tx) = self.cmd_tx.take() {
            let _ = cmd_tx.send(if force {
                WorkerCommand::ForceStop
            } else {
                WorkerCommand::Eos
            });
        }
    }
}

impl MediaGraph for AudioGraph {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_branch(&mut self, descriptor: &DeviceDescriptor) -> Result<(), CaptureError> {
        let plan = match &descriptor.producer {
            ProducerType::Alsa => BranchPlan::Capture {
                name: descriptor.friendly_name.clone(),
                device: descriptor
                    .source
                    .clone()
                    .ok_or_else(|| CaptureError::MissingSource {
                        device: descriptor.friendly_name.clone(),
                    })?,
                output: descriptor.output.clone(),
            },
            ProducerType::FileSource => BranchPlan::FileCopy {
                name: descriptor.friendly_name.clone(),
                source: descriptor
                    .source
                    .clone()
                    .map(PathBuf::from)
                    .ok_or_else(|| CaptureError::MissingSource {
                        device: descriptor.friendly_name.clone(),
                    })?,
                output: descriptor.output.clone(),
            },
            other => {
                return Err(CaptureError::backend(format!(
                    "audio backend cannot capture '{other}' devices"
                )));
            }
        };

        self.plans.push(plan);
        Ok(())
    }

    fn branch_count(&self) -> usize {
        self.plans.len()
    }

    fn request_state(&mut self, target: GraphState) -> Result<(), CaptureError> {
        match target {
            GraphState::Playing => {
                if self.worker.is_some() {
                    return Ok(());
                }

                let (cmd_tx, cmd_rx) = std_mpsc::channel();
                let plans = std::mem::take(&mut self.plans);
                let bus_tx = self.bus_tx.clone();
                let state_tx = Arc::clone(&self.state_tx);

                self.cmd_tx = Some(cmd_tx);
                self.worker = Some(std::thread::spawn(move || {
                    run_worker(plans, cmd_rx, bus_tx, state_tx);
                }));
                Ok(())
            }
            GraphState::Null => {
                self.stop_worker(true);
                let _ = self.state_tx.send(GraphState::Null);
                Ok(())
            }
            other => {
                let _ = self.state_tx.send(other);
                Ok(())
            }
        }
    }

    fn state(&self) -> GraphState {
        *self.state_rx.borrow()
    }

    fn state_changes(&self) -> watch::Receiver<GraphState> {
        self.state_rx.clone()
    }

    fn send_eos(&mut self) {
        self.stop_worker(false);
    }

    fn take_bus(&mut self) -> Option<mpsc::UnboundedReceiver<BusMessage>> {
        self.bus_rx.take()
    }

    fn release(&mut self) {
        self.stop_worker(true);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        let _ = self.state_tx.send(GraphState::Null);
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.release();
    }
}

/// A capture branch running on the worker thread.
struct CaptureBranch {
    name: String,
    // RAII: capture runs while the stream is held.
    _stream: cpal::Stream,
    consumer: ringbuf::HeapCons<i16>,
    writer: Option<WavWriter>,
    drained: bool,
}

/// A file passthrough branch running on the worker thread.
struct FileCopyBranch {
    name: String,
    reader: BufReader<File>,
    writer: Option<BufWriter<File>>,
    drained: bool,
}

fn run_worker(
    plans: Vec<BranchPlan>,
    cmd_rx: std_mpsc::Receiver<WorkerCommand>,
    bus_tx: mpsc::UnboundedSender<BusMessage>,
    state_tx: Arc<watch::Sender<GraphState>>,
) {
    let _ = state_tx.send(GraphState::Ready);

    let mut captures = Vec::new();
    let mut copies = Vec::new();

    for plan in plans {
        match plan {
            BranchPlan::Capture {
                name,
                device,
                output,
            } => match open_capture_branch(&name, &device, output.as_deref()) {
                Ok(branch) => captures.push(branch),
                Err(reason) => {
                    tracing::warn!(device = %name, %reason, "capture branch failed to open");
                    let _ = bus_tx.send(BusMessage::Error {
                        source: name,
                        message: reason,
                    });
                }
            },
            BranchPlan::FileCopy {
                name,
                source,
                output,
            } => match open_file_branch(&name, &source, output.as_deref()) {
                Ok(branch) => copies.push(branch),
                Err(reason) => {
                    tracing::warn!(device = %name, %reason, "file branch failed to open");
                    let _ = bus_tx.send(BusMessage::Error {
                        source: name,
                        message: reason,
                    });
                }
            },
        }
    }

    if captures.is_empty() && copies.is_empty() {
        let _ = bus_tx.send(BusMessage::Error {
            source: "audio-backend".to_string(),
            message: "no branch could be opened".to_string(),
        });
        return;
    }

    let _ = state_tx.send(GraphState::Paused);
    let _ = state_tx.send(GraphState::Playing);

    let mut eos_requested = false;
    loop {
        match cmd_rx.recv_timeout(POLL_INTERVAL) {
            Ok(WorkerCommand::ForceStop) => return,
            Ok(WorkerCommand::Eos) => eos_requested = true,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {}
            Err(std_mpsc::RecvTimeoutError::Disconnected) => return,
        }

        for branch in &mut captures {
            branch.drain(&bus_tx);
        }
        for branch in &mut copies {
            branch.copy_chunk(&bus_tx);
        }

        if eos_requested {
            for branch in &mut captures {
                branch.finalize(&bus_tx);
            }
            for branch in &mut copies {
                branch.finalize();
            }
            let _ = bus_tx.send(BusMessage::EndOfStream);
            return;
        }

        // File-only graphs finish on their own once every copy drains.
        if captures.is_empty() && copies.iter().all(|c| c.drained) {
            for branch in &mut copies {
                branch.finalize();
            }
            let _ = bus_tx.send(BusMessage::EndOfStream);
            return;
        }
    }
}

fn open_capture_branch(
    name: &str,
    source: &str,
    output: Option<&std::path::Path>,
) -> Result<CaptureBranch, String> {
    let device = open_input_device(source)?;
    let supported = device
        .default_input_config()
        .map_err(|e| e.to_string())?;

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    let ring = HeapRb::<i16>::new(RING_CAPACITY);
    let (mut producer, consumer) = ring.split();

    let err_fn = |err| tracing::error!("audio stream error: {err}");
    let stream = match sample_format {
        SampleFormat::I16 => device
            .build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    // Non-blocking push; drops samples if the buffer is full.
                    let _ = producer.push_slice(data);
                },
                err_fn,
                None,
            )
            .map_err(|e| e.to_string())?,
        SampleFormat::F32 => device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for &sample in data {
                        let converted = (sample * I16_MAX_SYMMETRIC)
                            .clamp(-I16_MAX_SYMMETRIC, I16_MAX_SYMMETRIC)
                            as i16;
                        let _ = producer.try_push(converted);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| e.to_string())?,
        format => return Err(format!("unsupported sample format: {format:?}")),
    };

    stream.play().map_err(|e| e.to_string())?;

    let writer = output
        .map(|path| WavWriter::create(path, sample_rate, channels))
        .transpose()
        .map_err(|e| e.to_string())?;

    Ok(CaptureBranch {
        name: name.to_string(),
        _stream: stream,
        consumer,
        writer,
        drained: false,
    })
}

fn open_input_device(source: &str) -> Result<cpal::Device, String> {
    let host = cpal::default_host();

    if source == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| "no default input device".to_string());
    }

    let devices = host.input_devices().map_err(|e| e.to_string())?;
    for device in devices {
        if let Ok(name) = device.name() {
            if name == source || name.contains(source) {
                return Ok(device);
            }
        }
    }

    Err(format!("no input device matching '{source}'"))
}

fn open_file_branch(
    name: &str,
    source: &std::path::Path,
    output: Option<&std::path::Path>,
) -> Result<FileCopyBranch, String> {
    let reader = File::open(source).map_err(|e| e.to_string())?;
    let writer = output
        .map(|path| {
            OpenOptions::new()
                .write(true)
                .truncate(true)
                .open(path)
                .map(BufWriter::new)
        })
        .transpose()
        .map_err(|e| e.to_string())?;

    // Monitor-only file branches have nothing to stream; they drain at once.
    let drained = writer.is_none();

    Ok(FileCopyBranch {
        name: name.to_string(),
        reader: BufReader::new(reader),
        writer,
        drained,
    })
}

impl CaptureBranch {
    /// Drains buffered samples, writes them out, and posts a level message.
    fn drain(&mut self, bus_tx: &mpsc::UnboundedSender<BusMessage>) {
        let mut samples = Vec::new();
        while let Some(sample) = self.consumer.try_pop() {
            samples.push(sample);
        }
        if samples.is_empty() {
            return;
        }

        if let Some(writer) = &mut self.writer {
            if let Err(e) = writer.write_samples(&samples) {
                tracing::error!(device = %self.name, error = %e, "wav write failed");
            }
        }

        let sum_squares: f64 = samples.iter().map(|&s| f64::from(s).powi(2)).sum();
        let rms_db = calculate_rms_db(sum_squares, samples.len());
        let _ = bus_tx.send(BusMessage::Element {
            element: format!("{LEVEL_ELEMENT_PREFIX}{}", self.name),
            structure: Structure::new("level").with_field("rms", Value::F64List(vec![rms_db])),
        });
    }

    fn finalize(&mut self, bus_tx: &mpsc::UnboundedSender<BusMessage>) {
        if self.drained {
            return;
        }
        self.drain(bus_tx);
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                tracing::error!(device = %self.name, error = %e, "wav finalize failed");
            }
        }
        self.drained = true;
    }
}

impl FileCopyBranch {
    /// Copies one chunk from source to output; marks the branch drained at
    /// end of file.
    fn copy_chunk(&mut self, bus_tx: &mpsc::UnboundedSender<BusMessage>) {
        if self.drained {
            return;
        }
        let Some(writer) = &mut self.writer else {
            self.drained = true;
            return;
        };

        let mut buffer = [0u8; FILE_COPY_CHUNK];
        match self.reader.read(&mut buffer) {
            Ok(0) => self.drained = true,
            Ok(n) => {
                if let Err(e) = writer.write_all(&buffer[..n]) {
                    let _ = bus_tx.send(BusMessage::Error {
                        source: self.name.clone(),
                        message: e.to_string(),
                    });
                    self.drained = true;
                }
            }
            Err(e) => {
                let _ = bus_tx.send(BusMessage::Error {
                    source: self.name.clone(),
                    message: e.to_string(),
                });
                self.drained = true;
            }
        }
    }

    fn finalize(&mut self) {
        if let Some(writer) = &mut self.writer {
            if let Err(e) = writer.flush() {
                tracing::error!(device = %self.name, error = %e, "file flush failed");
            }
        }
        self.writer = None;
    }
}

// WAV file format constants.
// See: http://soundfile.sapp.org/doc/WaveFormat/

/// Byte offset of the file size field in the WAV header (RIFF chunk size).
const WAV_FILE_SIZE_OFFSET: u64 = 4;

/// Byte offset of the data chunk size field in the WAV header.
const WAV_DATA_SIZE_OFFSET: u64 = 40;

/// Size of the WAV header in bytes (RIFF + fmt + data chunk headers).
const WAV_HEADER_SIZE: u32 = 44;

/// Size of the fmt chunk data (16 bytes for PCM).
const WAV_FMT_CHUNK_SIZE: u32 = 16;

/// Audio format code for PCM (uncompressed).
const WAV_FORMAT_PCM: u16 = 1;

/// Bits per sample for 16-bit audio.
const WAV_BITS_PER_SAMPLE: u16 = 16;

/// Bytes per sample (16-bit = 2 bytes).
const BYTES_PER_SAMPLE: u64 = 2;

/// Incremental 16-bit PCM WAV writer.
///
/// Writes a placeholder header up front and patches the size fields on
/// finalize.
struct WavWriter {
    writer: BufWriter<File>,
    samples_written: u64,
}

impl WavWriter {
    fn create(
        path: &std::path::Path,
        sample_rate: u32,
        channels: u16,
    ) -> std::io::Result<Self> {
        // The resolver pre-created the file; open and truncate it.
        let file = OpenOptions::new().write(true).truncate(true).open(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_header(&mut writer, sample_rate, channels, 0)?;
        Ok(Self {
            writer,
            samples_written: 0,
        })
    }

    fn write_header(
        writer: &mut BufWriter<File>,
        sample_rate: u32,
        channels: u16,
        data_size: u32,
    ) -> std::io::Result<()> {
        // RIFF container header
        writer.write_all(b"RIFF")?;
        writer.write_all(&(WAV_HEADER_SIZE - 8 + data_size).to_le_bytes())?;
        writer.write_all(b"WAVE")?;

        // fmt subchunk
        writer.write_all(b"fmt ")?;
        writer.write_all(&WAV_FMT_CHUNK_SIZE.to_le_bytes())?;
        writer.write_all(&WAV_FORMAT_PCM.to_le_bytes())?;
        writer.write_all(&channels.to_le_bytes())?;
        writer.write_all(&sample_rate.to_le_bytes())?;

        let bytes_per_sample = WAV_BITS_PER_SAMPLE / 8;
        let byte_rate = sample_rate * u32::from(channels) * u32::from(bytes_per_sample);
        writer.write_all(&byte_rate.to_le_bytes())?;
        writer.write_all(&(channels * bytes_per_sample).to_le_bytes())?;
        writer.write_all(&WAV_BITS_PER_SAMPLE.to_le_bytes())?;

        // data subchunk header
        writer.write_all(b"data")?;
        writer.write_all(&data_size.to_le_bytes())?;

        Ok(())
    }

    fn write_samples(&mut self, samples: &[i16]) -> std::io::Result<()> {
        for sample in samples {
            self.writer.write_all(&sample.to_le_bytes())?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> std::io::Result<()> {
        let data_size = (self.samples_written * BYTES_PER_SAMPLE) as u32;

        self.writer.seek(SeekFrom::Start(WAV_FILE_SIZE_OFFSET))?;
        self.writer
            .write_all(&(WAV_HEADER_SIZE - 8 + data_size).to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(WAV_DATA_SIZE_OFFSET))?;
        self.writer.write_all(&data_size.to_le_bytes())?;

        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceProperties;

    fn file_descriptor(name: &str, source: PathBuf, output: Option<PathBuf>) -> DeviceDescriptor {
        DeviceDescriptor {
            friendly_name: name.to_string(),
            source: Some(source.display().to_string()),
            producer: ProducerType::FileSource,
            output,
            properties: DeviceProperties::default(),
        }
    }

    #[test]
    fn test_calculate_rms_db_full_scale() {
        let sum_squares = f64::from(i16::MAX).powi(2) * 100.0;
        let rms_db = calculate_rms_db(sum_squares, 100);
        assert!(rms_db.abs() < 0.1);
    }

    #[test]
    fn test_calculate_rms_db_silence() {
        assert_eq!(calculate_rms_db(0.0, 100), SILENCE_FLOOR_DB);
        assert_eq!(calculate_rms_db(0.0, 0), SILENCE_FLOOR_DB);
    }

    #[test]
    fn test_add_branch_rejects_video_producers() {
        let mut graph = AudioGraph::new("capture");
        let descriptor = DeviceDescriptor {
            friendly_name: "cam1".to_string(),
            source: Some("/dev/video0".to_string()),
            producer: ProducerType::V4l2,
            output: None,
            properties: DeviceProperties::default(),
        };

        assert!(graph.add_branch(&descriptor).is_err());
        assert_eq!(graph.branch_count(), 0);
    }

    #[test]
    fn test_add_branch_accepts_audio_and_file() {
        let mut graph = AudioGraph::new("capture");
        let alsa = DeviceDescriptor {
            friendly_name: "mic1".to_string(),
            source: Some("hw:0".to_string()),
            producer: ProducerType::Alsa,
            output: None,
            properties: DeviceProperties::default(),
        };
        let file = file_descriptor("vod", PathBuf::from("/tmp/in.mov"), None);

        graph.add_branch(&alsa).unwrap();
        graph.add_branch(&file).unwrap();
        assert_eq!(graph.branch_count(), 2);
    }

    #[tokio::test]
    async fn test_file_branch_copies_source_and_posts_eos() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("talk.mov");
        let output = dir.path().join("talk-copy.mov");
        let payload = vec![7u8; 150 * 1024];
        std::fs::write(&source, &payload).unwrap();
        std::fs::write(&output, b"").unwrap();

        let mut graph = AudioGraph::new("capture");
        graph
            .add_branch(&file_descriptor("vod", source, Some(output.clone())))
            .unwrap();

        let mut bus = graph.take_bus().unwrap();
        graph.request_state(GraphState::Playing).unwrap();

        // The copy finishes on its own and posts an aggregated end-of-stream.
        let message = tokio::time::timeout(Duration::from_secs(5), bus.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message, BusMessage::EndOfStream);

        graph.release();
        assert_eq!(std::fs::read(&output).unwrap(), payload);
        assert_eq!(graph.state(), GraphState::Null);
    }

    #[tokio::test]
    async fn test_unopenable_branch_posts_error() {
        let mut graph = AudioGraph::new("capture");
        graph
            .add_branch(&file_descriptor(
                "ghost",
                PathBuf::from("/nonexistent/input.mov"),
                Some(PathBuf::from("/nonexistent/output.mov")),
            ))
            .unwrap();

        let mut bus = graph.take_bus().unwrap();
        graph.request_state(GraphState::Playing).unwrap();

        let message = tokio::time::timeout(Duration::from_secs(5), bus.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(message, BusMessage::Error { .. }));

        graph.release();
    }

    #[test]
    fn test_wav_writer_header_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.wav");
        std::fs::write(&path, b"").unwrap();

        let mut writer = WavWriter::create(&path, 16000, 1).unwrap();
        writer.write_samples(&[0x1234i16, 0x5678i16]).unwrap();
        writer.finalize().unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
        assert_eq!(&data[12..16], b"fmt ");

        // Sample rate at offset 24 (u32 LE).
        let sample_rate = u32::from_le_bytes([data[24], data[25], data[26], data[27]]);
        assert_eq!(sample_rate, 16000);

        // Data size patched on finalize: 2 samples * 2 bytes.
        let data_size = u32::from_le_bytes([data[40], data[41], data[42], data[43]]);
        assert_eq!(data_size, 4);

        // Data section is little-endian samples.
        assert_eq!(data[44], 0x34);
        assert_eq!(data[45], 0x12);
    }

    #[test]
    fn test_graph_state_transitions_without_start() {
        let mut graph = AudioGraph::new("capture");
        assert_eq!(graph.state(), GraphState::Null);

        graph.request_state(GraphState::Null).unwrap();
        graph.release();
        assert_eq!(graph.state(), GraphState::Null);
    }
}
