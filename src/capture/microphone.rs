// Microphone capture backend using cpal.
//
// cpal streams are !Send, so the stream lives on a dedicated thread for the
// whole capture. The thread reports stream construction success or failure
// back through a oneshot before frames start flowing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::error::CaptureError;

/// Microphone capture backend (default input device)
pub struct MicrophoneBackend {
    config: CaptureConfig,
    capturing: bool,
    stop_flag: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            capturing: false,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::InvalidState("microphone already capturing"));
        }

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();

        let stop_flag = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_flag);
        let buffer_ms = self.config.buffer_duration_ms;

        let worker = std::thread::spawn(move || {
            run_capture(buffer_ms, frame_tx, ready_tx, thread_stop);
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CaptureError::DeviceUnavailable(
                    "capture thread exited before the stream opened".to_string(),
                ));
            }
        }

        self.stop_flag = stop_flag;
        self.worker = Some(worker);
        self.capturing = true;

        info!("Microphone capture started");

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }

        self.stop_flag.store(true, Ordering::SeqCst);

        if let Some(worker) = self.worker.take() {
            let joined = tokio::task::spawn_blocking(move || worker.join()).await;
            if !matches!(joined, Ok(Ok(()))) {
                warn!("Microphone capture thread did not shut down cleanly");
            }
        }

        self.capturing = false;

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

/// Runs on the dedicated capture thread: owns the cpal stream until stopped.
fn run_capture(
    buffer_ms: u64,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    stop_flag: Arc<AtomicBool>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(
                "no default input device".to_string(),
            )));
            return;
        }
    };

    let supported = match device.default_input_config() {
        Ok(supported) => supported,
        Err(e) => {
            let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
                "no usable input config: {e}"
            ))));
            return;
        }
    };

    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.config();

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, buffer_ms, frame_tx),
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, buffer_ms, frame_tx),
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, buffer_ms, frame_tx),
        other => Err(CaptureError::Unsupported(format!(
            "input sample format {other:?} is not supported"
        ))),
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::DeviceUnavailable(format!(
            "failed to start input stream: {e}"
        ))));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until stop; the stream delivers frames from its own callback.
    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }

    drop(stream);
}

/// Build an input stream that converts samples to i16 and forwards
/// `buffer_ms`-sized frames over the channel.
fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    buffer_ms: u64,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<Stream, CaptureError>
where
    T: cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let samples_per_frame =
        (sample_rate as u64 * channels as u64 * buffer_ms / 1000).max(1) as usize;

    let mut pending: Vec<i16> = Vec::with_capacity(samples_per_frame);
    let mut samples_sent: u64 = 0;

    // Stream errors (common with ALSA) are non-fatal; log the first and then
    // every thousandth occurrence.
    let error_count = Arc::new(AtomicU64::new(0));
    let err_fn = move |err| {
        let count = error_count.fetch_add(1, Ordering::Relaxed);
        if count == 0 || count % 1000 == 0 {
            warn!("Audio input stream error (non-fatal): {err}");
        }
    };

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    pending.push(cpal::Sample::from_sample(sample));
                }

                while pending.len() >= samples_per_frame {
                    let rest = pending.split_off(samples_per_frame);
                    let samples = std::mem::replace(&mut pending, rest);

                    let timestamp_ms =
                        samples_sent * 1000 / (sample_rate as u64 * channels as u64);
                    samples_sent += samples.len() as u64;

                    let frame = AudioFrame {
                        samples,
                        sample_rate,
                        channels,
                        timestamp_ms,
                    };

                    // try_send keeps the audio callback from blocking; a full
                    // channel drops the frame.
                    let _ = frame_tx.try_send(frame);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("input device disappeared".to_string())
            }
            cpal::BuildStreamError::StreamConfigNotSupported => {
                CaptureError::Unsupported("input stream config not supported".to_string())
            }
            other => CaptureError::DeviceUnavailable(format!("failed to open input stream: {other}")),
        })?;

    Ok(stream)
}
