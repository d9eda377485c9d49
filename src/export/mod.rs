//! Transcript and audio export
//!
//! Document export packs the transcript into a PDF or DOCX container;
//! audio export materializes a finalized capture blob as a download.

pub mod audio;
pub mod document;

pub use audio::{AudioExporter, DownloadHandle};
pub use document::{export_document, write_document, DocumentFormat};
