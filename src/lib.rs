pub mod capture;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod session;
pub mod token;
pub mod transcription;

pub use capture::{
    AudioBlob, AudioChunk, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig,
    CaptureHandle, CaptureSession, CaptureSource,
};
pub use config::Config;
pub use error::{AuthError, CaptureError, ExportError, TranscriptionError};
pub use export::{export_document, write_document, AudioExporter, DocumentFormat, DownloadHandle};
pub use http::{create_router, AppState};
pub use session::SessionState;
pub use token::{RefreshTokenProvider, StaticTokenProvider, TokenProvider};
pub use transcription::{
    AccumulationPolicy, RecognitionBackend, RecognitionEvent, RecognizeConfig, RemoteRecognizer,
    RemoteStreamBackend, TranscriptSegment, TranscriptionConfig, TranscriptionHandle,
    TranscriptionSession,
};
