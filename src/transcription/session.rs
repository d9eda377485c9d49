use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{
    AccumulationPolicy, RecognitionBackend, RecognitionEvent, TranscriptionConfig,
};
use crate::error::TranscriptionError;
use crate::session::SessionState;

/// Opaque reference to an active transcription, returned by `start` and
/// required by `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscriptionHandle {
    id: u64,
}

/// A single transcript segment as delivered by the recognition engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Transcribed text
    pub text: String,

    /// When this segment was received
    pub timestamp: DateTime<Utc>,

    /// Confidence score (0.0 to 1.0), if available
    pub confidence: Option<f32>,

    /// Whether this is a partial (interim) result
    pub partial: bool,
}

/// A recognition failure reported while the session kept running.
#[derive(Debug, Clone)]
pub struct RecognitionFailure {
    pub code: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Transcript accumulation shared with the collector task.
#[derive(Default)]
struct TranscriptBuffer {
    /// Latest full guess (replace policy)
    current: String,
    /// Finalized fragments in delivery order (append policy)
    fragments: Vec<String>,
    /// Every delivered segment, for inspection
    segments: Vec<TranscriptSegment>,
    /// Non-fatal recognition failures
    errors: Vec<RecognitionFailure>,
}

impl TranscriptBuffer {
    fn snapshot(&self, policy: AccumulationPolicy) -> String {
        match policy {
            AccumulationPolicy::Replace => self.current.clone(),
            AccumulationPolicy::Append => self.fragments.join("\n"),
        }
    }
}

/// A transcription session that owns one recognition channel and accumulates
/// its results under a fixed policy.
///
/// Runs independently of any capture session; the two are separately
/// startable and stoppable.
pub struct TranscriptionSession {
    /// Session identifier for logging
    session_id: String,

    /// Session configuration (language, mode, policy)
    config: TranscriptionConfig,

    /// Lifecycle state
    state: SessionState,

    /// The recognition channel, owned exclusively while recording
    backend: Option<Box<dyn RecognitionBackend>>,

    /// Accumulated transcript state
    buffer: Arc<Mutex<TranscriptBuffer>>,

    /// Gate for the collector task; events arriving after stop are dropped
    active: Arc<AtomicBool>,

    /// Wakes the collector on stop even if the engine never closes its
    /// channel
    shutdown: Arc<Notify>,

    /// Handle for the result collector task
    collector: Option<JoinHandle<()>>,

    /// Handle ids: monotonically increasing, one per start
    next_handle: u64,
    current_handle: Option<u64>,
}

impl TranscriptionSession {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self {
            session_id: format!("transcription-{}", uuid::Uuid::new_v4()),
            config,
            state: SessionState::Idle,
            backend: None,
            buffer: Arc::new(Mutex::new(TranscriptBuffer::default())),
            active: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            collector: None,
            next_handle: 0,
            current_handle: None,
        }
    }

    /// Open the recognition channel and start accumulating results.
    pub async fn start(
        &mut self,
        mut backend: Box<dyn RecognitionBackend>,
    ) -> Result<TranscriptionHandle, TranscriptionError> {
        if self.state.is_recording() {
            return Err(TranscriptionError::InvalidState(
                "transcription already recording",
            ));
        }

        info!(
            "Starting transcription session {} ({}, {:?} policy)",
            self.session_id,
            backend.name(),
            self.config.policy
        );

        let mut event_rx = backend.start(&self.config).await?;

        let active = Arc::new(AtomicBool::new(true));
        let buffer = Arc::new(Mutex::new(TranscriptBuffer::default()));
        let shutdown = Arc::new(Notify::new());

        let collector_active = Arc::clone(&active);
        let collector_buffer = Arc::clone(&buffer);
        let collector_shutdown = Arc::clone(&shutdown);
        let policy = self.config.policy;
        let session_id = self.session_id.clone();

        let collector = tokio::spawn(async move {
            loop {
                // The engine does not guarantee callbacks cease instantly on
                // stop, so the collector must be woken independently of the
                // event channel.
                let event = tokio::select! {
                    _ = collector_shutdown.notified() => break,
                    event = event_rx.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                if !collector_active.load(Ordering::SeqCst) {
                    break;
                }

                match event {
                    RecognitionEvent::Result {
                        transcript,
                        is_final,
                        confidence,
                    } => {
                        let mut buffer = collector_buffer.lock().await;

                        buffer.segments.push(TranscriptSegment {
                            text: transcript.clone(),
                            timestamp: Utc::now(),
                            confidence,
                            partial: !is_final,
                        });

                        match policy {
                            AccumulationPolicy::Replace => {
                                buffer.current = transcript;
                            }
                            AccumulationPolicy::Append => {
                                if is_final {
                                    buffer.fragments.push(transcript);
                                }
                            }
                        }
                    }
                    RecognitionEvent::Error { code, message } => {
                        warn!(
                            "Recognition error in session {session_id} ({code}): {message}"
                        );
                        collector_buffer.lock().await.errors.push(RecognitionFailure {
                            code,
                            message,
                            at: Utc::now(),
                        });
                    }
                }
            }
        });

        let id = self.next_handle;
        self.next_handle += 1;

        self.backend = Some(backend);
        self.buffer = buffer;
        self.active = active;
        self.shutdown = shutdown;
        self.collector = Some(collector);
        self.current_handle = Some(id);
        self.state = SessionState::Recording;

        Ok(TranscriptionHandle { id })
    }

    /// Close the recognition channel and return the final transcript
    /// snapshot.
    ///
    /// A session with zero delivered results yields an empty transcript, not
    /// an error. Events still in flight when stop is called are dropped.
    pub async fn stop(&mut self, handle: TranscriptionHandle) -> Result<String, TranscriptionError> {
        if !self.state.is_recording() {
            return Err(TranscriptionError::InvalidState(
                "transcription is not recording",
            ));
        }
        if self.current_handle != Some(handle.id) {
            return Err(TranscriptionError::InvalidState("stale transcription handle"));
        }

        info!("Stopping transcription session {}", self.session_id);

        // Gate first: anything delivered from here on is dropped.
        self.active.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();

        // Channel close failures must not make the session unstoppable.
        if let Some(mut backend) = self.backend.take() {
            if let Err(e) = backend.stop().await {
                warn!("Recognition backend failed to close cleanly: {e}");
            }
        }

        if let Some(collector) = self.collector.take() {
            if let Err(e) = collector.await {
                error!("Result collector task panicked: {e}");
            }
        }

        self.state = SessionState::Idle;
        self.current_handle = None;

        let transcript = self.buffer.lock().await.snapshot(self.config.policy);

        info!(
            "Transcription session {} finalized: {} chars",
            self.session_id,
            transcript.len()
        );

        Ok(transcript)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current transcript under this session's accumulation policy.
    pub async fn transcript(&self) -> String {
        self.buffer.lock().await.snapshot(self.config.policy)
    }

    /// Every segment delivered so far, in order.
    pub async fn segments(&self) -> Vec<TranscriptSegment> {
        self.buffer.lock().await.segments.clone()
    }

    /// Recognition failures reported while the session kept running.
    pub async fn recognition_errors(&self) -> Vec<RecognitionFailure> {
        self.buffer.lock().await.errors.clone()
    }
}
