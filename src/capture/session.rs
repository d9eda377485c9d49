use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{
    AudioChunk, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
};
use crate::error::CaptureError;
use crate::session::SessionState;

/// Opaque reference to an active capture, returned by `start` and required by
/// `stop`. A handle from an earlier capture is stale and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureHandle {
    id: u64,
}

/// Finalized recording: the chunk sequence encoded as one immutable blob.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// MIME type of the encoding
    pub mime_type: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// A capture session that owns one audio input stream and buffers its encoded
/// chunks until `stop` finalizes them into an [`AudioBlob`].
pub struct CaptureSession {
    /// Session identifier for logging
    session_id: String,

    /// Capture configuration (target rate/channels, buffer size)
    config: CaptureConfig,

    /// Lifecycle state
    state: SessionState,

    /// The platform stream, owned exclusively for the duration of a capture
    backend: Option<Box<dyn CaptureBackend>>,

    /// Accumulated chunks, append-only while recording
    chunks: Arc<Mutex<Vec<AudioChunk>>>,

    /// Gate for the collector task; frames arriving after stop are dropped
    active: Arc<AtomicBool>,

    /// Wakes the collector on stop even if the backend never closes its
    /// channel
    shutdown: Arc<Notify>,

    /// Handle for the chunk collector task
    collector: Option<JoinHandle<()>>,

    /// Optional listener that receives a copy of every chunk (e.g. a
    /// streaming recognition backend)
    chunk_listener: Option<mpsc::Sender<AudioChunk>>,

    /// Handle ids: monotonically increasing, one per start
    next_handle: u64,
    current_handle: Option<u64>,
}

impl CaptureSession {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            session_id: format!("capture-{}", uuid::Uuid::new_v4()),
            config,
            state: SessionState::Idle,
            backend: None,
            chunks: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            collector: None,
            chunk_listener: None,
            next_handle: 0,
            current_handle: None,
        }
    }

    /// Route a copy of every captured chunk to the given channel.
    ///
    /// Must be called before `start`; the sender is dropped when the capture
    /// ends, closing the listener's channel.
    pub fn route_chunks_to(&mut self, listener: mpsc::Sender<AudioChunk>) {
        self.chunk_listener = Some(listener);
    }

    /// Start capturing from the given source.
    pub async fn start(&mut self, source: CaptureSource) -> Result<CaptureHandle, CaptureError> {
        let backend = CaptureBackendFactory::create(source, self.config.clone())?;
        self.start_with_backend(backend).await
    }

    /// Start capturing with a caller-supplied backend.
    pub async fn start_with_backend(
        &mut self,
        mut backend: Box<dyn CaptureBackend>,
    ) -> Result<CaptureHandle, CaptureError> {
        if self.state.is_recording() {
            return Err(CaptureError::InvalidState("capture already recording"));
        }

        info!("Starting capture session {} ({})", self.session_id, backend.name());

        let mut frame_rx = backend.start().await?;

        let active = Arc::new(AtomicBool::new(true));
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(Notify::new());

        let collector_active = Arc::clone(&active);
        let collector_chunks = Arc::clone(&chunks);
        let collector_shutdown = Arc::clone(&shutdown);
        let listener = self.chunk_listener.take();
        let target_rate = self.config.target_sample_rate;
        let target_channels = self.config.target_channels;

        let collector = tokio::spawn(async move {
            loop {
                // The platform does not guarantee callbacks cease instantly
                // on stop, so the collector must be woken independently of
                // the frame channel.
                let frame = tokio::select! {
                    _ = collector_shutdown.notified() => break,
                    frame = frame_rx.recv() => match frame {
                        Some(frame) => frame,
                        None => break,
                    },
                };

                if !collector_active.load(Ordering::SeqCst) {
                    break;
                }

                let frame = Self::process_frame(frame, target_rate, target_channels);

                let data: Vec<u8> = frame
                    .samples
                    .iter()
                    .flat_map(|s| s.to_le_bytes())
                    .collect();

                let chunk = AudioChunk {
                    data,
                    sample_rate: frame.sample_rate,
                    channels: frame.channels,
                    timestamp_ms: frame.timestamp_ms,
                };

                if let Some(listener) = &listener {
                    let _ = listener.send(chunk.clone()).await;
                }

                collector_chunks.lock().await.push(chunk);
            }
        });

        let id = self.next_handle;
        self.next_handle += 1;

        self.backend = Some(backend);
        self.chunks = chunks;
        self.active = active;
        self.shutdown = shutdown;
        self.collector = Some(collector);
        self.current_handle = Some(id);
        self.state = SessionState::Recording;

        Ok(CaptureHandle { id })
    }

    /// Stop the capture identified by `handle` and finalize its chunks into a
    /// single WAV-encoded blob.
    ///
    /// The backend stream is released exactly once. Frames still in flight
    /// when stop is called are dropped, never appended.
    pub async fn stop(&mut self, handle: CaptureHandle) -> Result<AudioBlob, CaptureError> {
        if !self.state.is_recording() {
            return Err(CaptureError::InvalidState("capture is not recording"));
        }
        if self.current_handle != Some(handle.id) {
            return Err(CaptureError::InvalidState("stale capture handle"));
        }

        info!("Stopping capture session {}", self.session_id);

        // Gate first: anything delivered from here on is dropped.
        self.active.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();

        // The stream must be released exactly once even if it objects.
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.stop().await {
                warn!("Capture backend failed to release cleanly: {e}");
            }
        }

        if let Some(collector) = self.collector.take() {
            if let Err(e) = collector.await {
                error!("Chunk collector task panicked: {e}");
            }
        }

        let chunks = std::mem::take(&mut *self.chunks.lock().await);

        self.state = SessionState::Idle;
        self.current_handle = None;

        let blob = Self::finalize(chunks, &self.config)?;

        info!(
            "Capture session {} finalized: {} bytes ({})",
            self.session_id,
            blob.data.len(),
            blob.mime_type
        );

        Ok(blob)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of chunks buffered so far.
    pub async fn chunk_count(&self) -> usize {
        self.chunks.lock().await.len()
    }

    /// Whether the capture source has delivered everything it will (the
    /// collector task has finished). Always true when idle.
    pub fn is_drained(&self) -> bool {
        self.collector
            .as_ref()
            .map(|c| c.is_finished())
            .unwrap_or(true)
    }

    /// Encode the ordered chunk sequence into one WAV blob.
    fn finalize(chunks: Vec<AudioChunk>, config: &CaptureConfig) -> Result<AudioBlob, CaptureError> {
        let (sample_rate, channels) = chunks
            .first()
            .map(|c| (c.sample_rate, c.channels))
            .unwrap_or((config.target_sample_rate, config.target_channels));

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut data = Vec::new();
        {
            let cursor = Cursor::new(&mut data);
            let mut writer = hound::WavWriter::new(cursor, spec)?;

            for chunk in &chunks {
                for bytes in chunk.data.chunks_exact(2) {
                    writer.write_sample(i16::from_le_bytes([bytes[0], bytes[1]]))?;
                }
            }

            writer.finalize()?;
        }

        Ok(AudioBlob {
            data,
            mime_type: "audio/wav".to_string(),
            sample_rate,
            channels,
        })
    }

    /// Process audio frame: downsample and convert to target format
    fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
        let mut processed = frame;

        if processed.sample_rate != target_sample_rate {
            processed = Self::downsample_frame(processed, target_sample_rate);
        }

        if processed.channels != target_channels && target_channels == 1 {
            processed = Self::stereo_to_mono(processed);
        }

        processed
    }

    /// Downsample audio frame by decimation
    fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
        if frame.sample_rate == target_rate {
            return frame;
        }

        let ratio = frame.sample_rate / target_rate;
        if ratio <= 1 {
            return frame; // Can't upsample
        }

        let downsampled: Vec<i16> = frame
            .samples
            .iter()
            .step_by(ratio as usize)
            .copied()
            .collect();

        AudioFrame {
            samples: downsampled,
            sample_rate: target_rate,
            channels: frame.channels,
            timestamp_ms: frame.timestamp_ms,
        }
    }

    /// Convert stereo to mono by summing channels
    fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
        if frame.channels != 2 {
            return frame; // Only support stereo -> mono
        }

        let mut mono_samples = Vec::with_capacity(frame.samples.len() / 2);

        for chunk in frame.samples.chunks_exact(2) {
            let left = chunk[0] as i32;
            let right = chunk[1] as i32;
            let sum = left + right;
            mono_samples.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
        }

        AudioFrame {
            samples: mono_samples,
            sample_rate: frame.sample_rate,
            channels: 1,
            timestamp_ms: frame.timestamp_ms,
        }
    }
}
