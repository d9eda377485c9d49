//! Transcription
//!
//! This module provides the `TranscriptionSession` abstraction that manages:
//! - A streaming recognition channel (trait-based backends)
//! - Result accumulation under a fixed replace/append policy
//! - Non-fatal recognition error collection
//! - Session lifecycle and handle validation
//!
//! `RemoteRecognizer` is the client for a remote recognize endpoint;
//! `RemoteStreamBackend` adapts it into a streaming backend fed by captured
//! audio chunks.

pub mod backend;
pub mod recognizer;
pub mod session;

pub use backend::{AccumulationPolicy, RecognitionBackend, RecognitionEvent, TranscriptionConfig};
pub use recognizer::{RecognizeConfig, RemoteRecognizer, RemoteStreamBackend};
pub use session::{
    RecognitionFailure, TranscriptSegment, TranscriptionHandle, TranscriptionSession,
};
