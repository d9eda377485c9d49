// Remote speech-recognition client.
//
// Speaks the synchronous recognize wire format: a JSON body with the audio
// content base64-encoded, authorized by a bearer token fetched fresh from a
// `TokenProvider` on every call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{RecognitionBackend, RecognitionEvent, TranscriptionConfig};
use crate::capture::AudioChunk;
use crate::error::TranscriptionError;
use crate::token::TokenProvider;

/// Audio description sent with every recognize request.
#[derive(Debug, Clone)]
pub struct RecognizeConfig {
    /// Engine encoding name (e.g. "LINEAR16", "WEBM_OPUS")
    pub encoding: String,
    /// Sample rate of the submitted audio
    pub sample_rate_hertz: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    config: RequestConfig<'a>,
    audio: RequestAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Serialize)]
struct RequestAudio {
    content: String,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<SpeechResult>,
}

#[derive(Deserialize)]
struct SpeechResult {
    #[serde(default)]
    alternatives: Vec<SpeechAlternative>,
}

#[derive(Deserialize)]
struct SpeechAlternative {
    #[serde(default)]
    transcript: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// One-shot client for a remote recognize endpoint.
pub struct RemoteRecognizer {
    client: reqwest::Client,
    endpoint: String,
    tokens: Arc<dyn TokenProvider>,
    config: RecognizeConfig,
}

impl RemoteRecognizer {
    pub fn new(
        endpoint: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        config: RecognizeConfig,
    ) -> Result<Self, TranscriptionError> {
        let endpoint = endpoint.into();
        let trimmed = endpoint.trim();

        if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
            return Err(TranscriptionError::Unsupported(format!(
                "invalid speech endpoint (must start with http:// or https://): {trimmed}"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: trimmed.to_string(),
            tokens,
            config,
        })
    }

    /// Submit audio bytes and return the recognized transcripts, best
    /// alternative per result, in order.
    pub async fn recognize(
        &self,
        audio: &[u8],
        language_code: &str,
    ) -> Result<Vec<String>, TranscriptionError> {
        let token = self.tokens.access_token().await?;

        let body = RecognizeRequest {
            config: RequestConfig {
                encoding: &self.config.encoding,
                sample_rate_hertz: self.config.sample_rate_hertz,
                language_code,
            },
            audio: RequestAudio {
                content: base64::engine::general_purpose::STANDARD.encode(audio),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);

            return Err(TranscriptionError::Recognition {
                code: status.as_u16().to_string(),
                message,
            });
        }

        let parsed: RecognizeResponse = response.json().await?;

        Ok(parsed
            .results
            .into_iter()
            .filter_map(|result| result.alternatives.into_iter().next())
            .map(|alternative| alternative.transcript)
            .collect())
    }
}

/// Adapts the one-shot recognizer into a streaming recognition backend.
///
/// Consumes captured chunks and re-submits the accumulated audio on every
/// delivery, emitting each recognized transcript as a final result event.
/// Engine failures become error events; the stream keeps consuming.
pub struct RemoteStreamBackend {
    recognizer: Arc<RemoteRecognizer>,
    chunks: Option<mpsc::Receiver<AudioChunk>>,
    active: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    worker: Option<JoinHandle<()>>,
}

impl RemoteStreamBackend {
    pub fn new(recognizer: Arc<RemoteRecognizer>, chunks: mpsc::Receiver<AudioChunk>) -> Self {
        Self {
            recognizer,
            chunks: Some(chunks),
            active: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl RecognitionBackend for RemoteStreamBackend {
    async fn start(
        &mut self,
        config: &TranscriptionConfig,
    ) -> Result<mpsc::Receiver<RecognitionEvent>, TranscriptionError> {
        let mut chunk_rx = self.chunks.take().ok_or(TranscriptionError::InvalidState(
            "recognition stream already started",
        ))?;

        let (event_tx, event_rx) = mpsc::channel(64);

        let recognizer = Arc::clone(&self.recognizer);
        let active = Arc::clone(&self.active);
        let shutdown = Arc::clone(&self.shutdown);
        let language_code = config.language_code.clone();

        active.store(true, Ordering::SeqCst);

        let worker = tokio::spawn(async move {
            let mut accumulated: Vec<u8> = Vec::new();

            loop {
                let chunk = tokio::select! {
                    _ = shutdown.notified() => break,
                    chunk = chunk_rx.recv() => match chunk {
                        Some(chunk) => chunk,
                        None => break,
                    },
                };

                if !active.load(Ordering::SeqCst) {
                    break;
                }

                accumulated.extend_from_slice(&chunk.data);

                match recognizer.recognize(&accumulated, &language_code).await {
                    Ok(transcripts) => {
                        for transcript in transcripts {
                            let event = RecognitionEvent::Result {
                                transcript,
                                is_final: true,
                                confidence: None,
                            };
                            if event_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(TranscriptionError::Recognition { code, message }) => {
                        let event = RecognitionEvent::Error { code, message };
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("Recognize call failed: {e}");
                        let event = RecognitionEvent::Error {
                            code: "network".to_string(),
                            message: e.to_string(),
                        };
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }

            info!("Remote recognition stream ended");
        });

        self.worker = Some(worker);

        Ok(event_rx)
    }

    async fn stop(&mut self) -> Result<(), TranscriptionError> {
        self.active.store(false, Ordering::SeqCst);
        // notify_one stores a permit, so the worker breaks even if it is
        // mid-recognize rather than parked on the select.
        self.shutdown.notify_one();

        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "remote recognize stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognize_request_uses_camel_case_wire_names() {
        let request = RecognizeRequest {
            config: RequestConfig {
                encoding: "WEBM_OPUS",
                sample_rate_hertz: 48000,
                language_code: "pt-BR",
            },
            audio: RequestAudio {
                content: "AAEC".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["config"]["encoding"], "WEBM_OPUS");
        assert_eq!(json["config"]["sampleRateHertz"], 48000);
        assert_eq!(json["config"]["languageCode"], "pt-BR");
        assert_eq!(json["audio"]["content"], "AAEC");
    }

    #[test]
    fn recognize_response_parses_nested_alternatives() {
        let body = r#"{
            "results": [
                {"alternatives": [{"transcript": "olá mundo"}, {"transcript": "ola mundo"}]},
                {"alternatives": [{"transcript": "tudo bem"}]}
            ]
        }"#;

        let parsed: RecognizeResponse = serde_json::from_str(body).unwrap();
        let transcripts: Vec<String> = parsed
            .results
            .into_iter()
            .filter_map(|result| result.alternatives.into_iter().next())
            .map(|alternative| alternative.transcript)
            .collect();

        assert_eq!(transcripts, vec!["olá mundo", "tudo bem"]);
    }

    #[test]
    fn empty_recognize_response_yields_no_transcripts() {
        let parsed: RecognizeResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn api_error_body_exposes_engine_message() {
        let body = r#"{"error": {"code": 403, "message": "insufficient scope", "status": "PERMISSION_DENIED"}}"#;
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "insufficient scope");
    }
}
