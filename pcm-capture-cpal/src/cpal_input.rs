//! cpal input line.
//!
//! A `cpal::Stream` is not `Send` on every platform, so it lives on its own
//! worker thread and is driven through a command channel. The stream's data
//! callback converts native samples to 16-bit PCM bytes in the requested
//! byte order and queues them on a `LineBuffer`, which serves the blocking
//! reads of the capture thread.

use std::sync::Arc;
use std::thread;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, SampleRate, StreamConfig};
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use pcm_capture_core::processing::pcm;
use pcm_capture_core::{
    ByteOrder, CaptureError, DeviceEventSender, FormatDescriptor, InputDevice, InputLine, LineBuffer,
};

use crate::device_enumerator::{find_device, select_sample_format};

/// cpal-backed input device, either the host default or one chosen by name.
#[derive(Debug, Clone, Default)]
pub struct CpalInputDevice {
    device_name: Option<String>,
}

impl CpalInputDevice {
    /// Capture from the host's default input device.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Capture from the input device with this exact name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }
}

impl InputDevice for CpalInputDevice {
    fn supports_format(&self, format: &FormatDescriptor) -> bool {
        format.validate().is_ok()
            && find_device(self.device_name.as_deref())
                .ok()
                .and_then(|device| select_sample_format(&device, format))
                .is_some()
    }

    fn open(
        &mut self,
        format: &FormatDescriptor,
        buffer_bytes: usize,
    ) -> Result<Arc<dyn InputLine>, CaptureError> {
        let device = find_device(self.device_name.as_deref())?;
        let sample_format = select_sample_format(&device, format).ok_or_else(|| {
            CaptureError::UnsupportedFormat(format!(
                "{} has no i16/f32 input with {} channel(s) at {} Hz",
                self.name(),
                format.channels,
                format.sample_rate
            ))
        })?;
        drop(device);

        let buffer = Arc::new(LineBuffer::new(buffer_bytes.max(format.chunk_size_bytes())));
        let spec = StreamSpec {
            device_name: self.device_name.clone(),
            config: StreamConfig {
                channels: format.channels,
                sample_rate: SampleRate(format.sample_rate.round() as u32),
                buffer_size: BufferSize::Default,
            },
            sample_format,
            byte_order: format.byte_order,
        };
        let (commands, worker) = spawn_stream_worker(spec, Arc::clone(&buffer))?;

        log::info!(
            "cpal input '{}' opened as {:?}, {} ch @ {} Hz",
            self.name(),
            sample_format,
            format.channels,
            format.sample_rate
        );

        Ok(Arc::new(CpalLine {
            buffer,
            commands,
            worker: Mutex::new(Some(worker)),
        }))
    }

    fn name(&self) -> String {
        self.device_name
            .clone()
            .unwrap_or_else(|| "default input".into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamCommand {
    Play,
    Pause,
    Close,
}

struct StreamSpec {
    device_name: Option<String>,
    config: StreamConfig,
    sample_format: SampleFormat,
    byte_order: ByteOrder,
}

/// Line returned by `CpalInputDevice::open`.
pub struct CpalLine {
    buffer: Arc<LineBuffer>,
    commands: Sender<StreamCommand>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalLine {
    fn send(&self, command: StreamCommand) {
        if self.commands.send(command).is_err() {
            log::debug!("cpal stream worker already gone, dropping {:?}", command);
        }
    }
}

impl InputLine for CpalLine {
    fn start(&self) {
        if self.buffer.start() {
            self.send(StreamCommand::Play);
        }
    }

    fn stop(&self) {
        if self.buffer.stop() {
            self.send(StreamCommand::Pause);
        }
    }

    fn close(&self) {
        self.buffer.close();
        self.send(StreamCommand::Close);
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                log::error!("cpal stream worker panicked");
            }
        }
    }

    fn flush(&self) {
        self.buffer.flush();
    }

    fn read(&self, buf: &mut [u8]) -> usize {
        self.buffer.read(buf)
    }

    fn is_open(&self) -> bool {
        self.buffer.is_open()
    }

    fn is_running(&self) -> bool {
        self.buffer.is_running()
    }

    fn subscribe(&self, sink: DeviceEventSender) {
        self.buffer.subscribe(sink);
    }
}

impl Drop for CpalLine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build the stream on a dedicated thread and wait until it either exists
/// or failed to build.
fn spawn_stream_worker(
    spec: StreamSpec,
    buffer: Arc<LineBuffer>,
) -> Result<(Sender<StreamCommand>, thread::JoinHandle<()>), CaptureError> {
    let (command_tx, command_rx) = crossbeam_channel::unbounded::<StreamCommand>();
    let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), CaptureError>>(1);

    let handle = thread::Builder::new()
        .name("cpal-input-stream".into())
        .spawn(move || {
            let stream = match build_stream(&spec, Arc::clone(&buffer)) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            for command in command_rx.iter() {
                match command {
                    StreamCommand::Play => {
                        if let Err(e) = stream.play() {
                            log::error!("Failed to play input stream: {}", e);
                            buffer.stop();
                        }
                    }
                    StreamCommand::Pause => {
                        if let Err(e) = stream.pause() {
                            log::warn!("Failed to pause input stream: {}", e);
                        }
                    }
                    StreamCommand::Close => break,
                }
            }
            drop(stream);
            log::debug!("cpal input stream released");
        })
        .map_err(|e| CaptureError::StreamError(format!("failed to spawn stream thread: {}", e)))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok((command_tx, handle)),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(CaptureError::StreamError("stream thread exited before building".into()))
        }
    }
}

fn build_stream(spec: &StreamSpec, buffer: Arc<LineBuffer>) -> Result<cpal::Stream, CaptureError> {
    let device = find_device(spec.device_name.as_deref())?;
    let order = spec.byte_order;

    let error_buffer = Arc::clone(&buffer);
    let error_callback = move |err: cpal::StreamError| match err {
        cpal::StreamError::DeviceNotAvailable => {
            log::error!("Input device disappeared");
            error_buffer.stop();
            error_buffer.close();
        }
        other => log::warn!("Input stream error: {}", other),
    };

    let mut bytes: Vec<u8> = Vec::new();
    let stream = match spec.sample_format {
        SampleFormat::I16 => device.build_input_stream(
            &spec.config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if !buffer.is_running() {
                    return;
                }
                bytes.clear();
                pcm::extend_from_i16(&mut bytes, data, order);
                buffer.push(&bytes);
            },
            error_callback,
            None,
        ),
        SampleFormat::F32 => device.build_input_stream(
            &spec.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if !buffer.is_running() {
                    return;
                }
                bytes.clear();
                pcm::extend_from_f32(&mut bytes, data, order);
                buffer.push(&bytes);
            },
            error_callback,
            None,
        ),
        other => {
            return Err(CaptureError::UnsupportedFormat(format!(
                "sample format {:?}",
                other
            )))
        }
    };

    stream.map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceNotAvailable("input device disappeared while opening".into())
        }
        cpal::BuildStreamError::StreamConfigNotSupported => {
            CaptureError::UnsupportedFormat(format!("{:?} not supported", spec.config))
        }
        other => CaptureError::StreamError(other.to_string()),
    })
}
