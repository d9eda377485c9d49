//! Error types shared across the crate.
//!
//! Each component gets its own error enum so callers can match on exactly the
//! failures its contract can produce. Kept decoupled from `anyhow`, which is
//! only used at the binary boundary.

use thiserror::Error;

/// Errors produced by capture sessions and capture backends.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The platform refused access to the requested device or stream.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested device exists but cannot supply a stream right now.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The platform lacks the requested capture facility entirely.
    #[error("unsupported capture source: {0}")]
    Unsupported(String),

    /// Caller misuse: stop without start, double stop, stale handle.
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    /// Finalizing the chunk sequence into a WAV blob failed.
    #[error("audio encoding failed: {0}")]
    Encoding(#[from] hound::Error),
}

/// Errors produced by transcription sessions and recognition backends.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// The platform lacks a speech-recognition facility.
    #[error("speech recognition unsupported: {0}")]
    Unsupported(String),

    /// Microphone access was refused while opening the recognition channel.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Caller misuse: stop without start, double stop, stale handle.
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    /// Engine-reported recognition failure. Non-fatal to a running session.
    #[error("recognition error {code}: {message}")]
    Recognition { code: String, message: String },

    /// Fetching or exchanging the bearer token failed.
    #[error("authorization failed: {0}")]
    Auth(#[from] AuthError),

    /// Transport-level failure talking to the recognition endpoint.
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TranscriptionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Errors produced by token providers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The credentials file is absent, malformed, or was rejected by the
    /// identity provider.
    #[error("credentials invalid: {0}")]
    CredentialsInvalid(String),

    /// Transport-level failure talking to the identity provider.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

/// Errors produced while materializing exports on disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
