use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hound::WavReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::error::CaptureError;

/// File-backed capture backend.
///
/// Replays a WAV file as a sequence of `buffer_duration_ms` frames, then
/// closes the channel. Used for tests and batch transcription.
pub struct FileBackend {
    path: PathBuf,
    config: CaptureConfig,
    capturing: bool,
    stop_flag: Arc<AtomicBool>,
    replay: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf, config: CaptureConfig) -> Self {
        Self {
            path,
            config,
            capturing: false,
            stop_flag: Arc::new(AtomicBool::new(false)),
            replay: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.capturing {
            return Err(CaptureError::InvalidState("file backend already capturing"));
        }

        let reader = WavReader::open(&self.path).map_err(|e| {
            CaptureError::DeviceUnavailable(format!(
                "cannot open audio file {}: {e}",
                self.path.display()
            ))
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                CaptureError::DeviceUnavailable(format!(
                    "cannot read audio file {}: {e}",
                    self.path.display()
                ))
            })?;

        info!(
            "File capture source loaded: {} ({} samples, {}Hz, {} channels)",
            self.path.display(),
            samples.len(),
            spec.sample_rate,
            spec.channels
        );

        let (tx, rx) = mpsc::channel(64);

        let stop_flag = Arc::new(AtomicBool::new(false));
        let task_stop = Arc::clone(&stop_flag);
        let samples_per_frame = (spec.sample_rate as u64
            * spec.channels as u64
            * self.config.buffer_duration_ms
            / 1000)
            .max(1) as usize;

        let replay = tokio::spawn(async move {
            let mut offset = 0usize;
            while offset < samples.len() {
                if task_stop.load(Ordering::SeqCst) {
                    break;
                }

                let end = (offset + samples_per_frame).min(samples.len());
                let frame = AudioFrame {
                    samples: samples[offset..end].to_vec(),
                    sample_rate: spec.sample_rate,
                    channels: spec.channels,
                    timestamp_ms: offset as u64 * 1000
                        / (spec.sample_rate as u64 * spec.channels as u64),
                };

                if tx.send(frame).await.is_err() {
                    break;
                }

                offset = end;
            }
            // Sender drops here, closing the channel at end-of-file.
        });

        self.stop_flag = stop_flag;
        self.replay = Some(replay);
        self.capturing = true;

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.capturing {
            return Ok(());
        }

        self.stop_flag.store(true, Ordering::SeqCst);

        if let Some(replay) = self.replay.take() {
            let _ = replay.await;
        }

        self.capturing = false;

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}
