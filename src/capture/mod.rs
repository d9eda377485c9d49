//! Audio capture
//!
//! This module provides the `CaptureSession` abstraction that manages:
//! - Audio capture from microphone, system audio, or file sources
//! - Frame processing (downsampling, mono conversion)
//! - Chunk buffering and finalization into a single WAV blob
//! - Session lifecycle and handle validation

pub mod backend;
pub mod file;
pub mod microphone;
pub mod session;

pub use backend::{
    AudioChunk, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
};
pub use file::FileBackend;
pub use microphone::MicrophoneBackend;
pub use session::{AudioBlob, CaptureHandle, CaptureSession};
