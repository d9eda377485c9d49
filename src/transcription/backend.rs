use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::TranscriptionError;

/// Event delivered by a recognition channel.
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// A partial or final recognition result
    Result {
        transcript: String,
        is_final: bool,
        confidence: Option<f32>,
    },
    /// Engine-reported failure. Non-fatal: the session keeps running and
    /// stays stoppable.
    Error { code: String, message: String },
}

/// How delivered results accumulate into the transcript.
///
/// Fixed per session; mixing policies within one session is not possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccumulationPolicy {
    /// The transcript is always the engine's latest full guess.
    Replace,
    /// Each final result is appended, newline-separated, to prior text.
    Append,
}

/// Configuration for a transcription session
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// BCP-47 language code sent to the recognition engine
    pub language_code: String,
    /// Whether interim (provisional) results are requested
    pub interim_results: bool,
    /// Whether recognition continues across utterance boundaries
    pub continuous: bool,
    /// Accumulation policy for delivered results
    pub policy: AccumulationPolicy,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language_code: "pt-BR".to_string(),
            interim_results: true,
            continuous: true,
            policy: AccumulationPolicy::Append,
        }
    }
}

/// Streaming recognition backend trait
///
/// Implementations open a channel against a speech-recognition facility and
/// deliver [`RecognitionEvent`]s until stopped or exhausted.
#[async_trait::async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Open the recognition channel
    ///
    /// Returns a receiver of recognition events
    async fn start(
        &mut self,
        config: &TranscriptionConfig,
    ) -> Result<mpsc::Receiver<RecognitionEvent>, TranscriptionError>;

    /// Close the recognition channel
    async fn stop(&mut self) -> Result<(), TranscriptionError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
