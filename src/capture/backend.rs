use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// An encoded, order-significant fragment of captured audio.
///
/// Chunks are append-only within a session; `CaptureSession::stop` finalizes
/// the accumulated sequence into a single [`super::AudioBlob`].
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Little-endian 16-bit PCM bytes
    pub data: Vec<u8>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for capture backends
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (frames above it are decimated down)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            target_channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal default input device
/// - File: replay a WAV file (for testing/batch processing)
/// - SystemAudio: tab/display loopback, where the platform provides one
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing audio and release the underlying stream
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the requested source
    pub fn create(
        source: CaptureSource,
        config: CaptureConfig,
    ) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        match source {
            CaptureSource::Microphone => {
                let backend = super::microphone::MicrophoneBackend::new(config);
                Ok(Box::new(backend))
            }

            CaptureSource::SystemAudio => Err(CaptureError::Unsupported(
                "system/tab audio capture requires a platform loopback device".to_string(),
            )),

            CaptureSource::File(path) => {
                let backend = super::file::FileBackend::new(path, config);
                Ok(Box::new(backend))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Microphone input
    Microphone,
    /// System/tab audio (display-media analog)
    SystemAudio,
    /// File input (for testing/batch processing)
    File(PathBuf),
}
