// Tests for document and audio export
//
// Document export must preserve every character of the transcript, verified
// by round-tripping the produced container back to text.

use tabscribe::{export_document, write_document, AudioBlob, AudioExporter, DocumentFormat};
use tempfile::TempDir;

// ============================================================================
// Round-trip helpers
// ============================================================================

/// Extract the text from the minimal PDF: one literal string per line inside
/// the single content stream.
fn pdf_to_text(bytes: &[u8]) -> String {
    let pdf = String::from_utf8_lossy(bytes);
    let start = pdf.find("stream\n").expect("content stream") + "stream\n".len();
    let end = pdf[start..].find("endstream").expect("endstream") + start;
    let content = &pdf[start..end];

    let mut lines = Vec::new();
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '(' {
            continue;
        }
        let mut line = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('\\') => line.push('\\'),
                    Some('(') => line.push('('),
                    Some(')') => line.push(')'),
                    Some('r') => line.push('\r'),
                    Some(other) => line.push(other),
                    None => break,
                },
                ')' => break,
                other => line.push(other),
            }
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Extract the text from the DOCX: entries are stored, so the document part
/// appears verbatim in the archive bytes.
fn docx_to_text(bytes: &[u8]) -> String {
    let archive = String::from_utf8_lossy(bytes);
    let body_start = archive.find("<w:body>").expect("document body") + "<w:body>".len();
    let body_end = archive.find("</w:body>").expect("document body end");
    let body = &archive[body_start..body_end];

    let mut lines = Vec::new();
    for paragraph in body.split("<w:p>").skip(1) {
        let text_start = paragraph
            .find("<w:t xml:space=\"preserve\">")
            .expect("text run")
            + "<w:t xml:space=\"preserve\">".len();
        let text_end = paragraph.find("</w:t>").expect("text run end");
        let escaped = &paragraph[text_start..text_end];
        lines.push(
            escaped
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&amp;", "&"),
        );
    }

    lines.join("\n")
}

const SAMPLE_TEXT: &str = "olá mundo\nsegunda linha (com parênteses) e \\ barra\n\n<tags> & entidades";

// ============================================================================
// Document export
// ============================================================================

#[test]
fn test_pdf_round_trips_every_character() {
    let bytes = export_document(SAMPLE_TEXT, DocumentFormat::Pdf);

    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert_eq!(pdf_to_text(&bytes), SAMPLE_TEXT);
}

#[test]
fn test_docx_round_trips_every_character() {
    let bytes = export_document(SAMPLE_TEXT, DocumentFormat::Docx);

    // ZIP local file header magic
    assert_eq!(&bytes[..4], b"PK\x03\x04");
    assert_eq!(docx_to_text(&bytes), SAMPLE_TEXT);
}

#[test]
fn test_docx_has_central_directory() {
    let bytes = export_document("texto", DocumentFormat::Docx);

    // End-of-central-directory magic must be present for readers to open it.
    let eocd: &[u8] = &[0x50, 0x4b, 0x05, 0x06];
    assert!(bytes.windows(4).any(|w| w == eocd));
}

#[test]
fn test_export_is_deterministic() {
    for format in [DocumentFormat::Pdf, DocumentFormat::Docx] {
        let first = export_document(SAMPLE_TEXT, format);
        let second = export_document(SAMPLE_TEXT, format);
        assert_eq!(first, second);
    }
}

#[test]
fn test_empty_transcript_exports() {
    let bytes = export_document("", DocumentFormat::Pdf);
    assert_eq!(pdf_to_text(&bytes), "");

    let bytes = export_document("", DocumentFormat::Docx);
    assert_eq!(docx_to_text(&bytes), "");
}

#[test]
fn test_write_document_appends_extension() {
    let temp_dir = TempDir::new().unwrap();

    let written = write_document("olá", DocumentFormat::Docx, temp_dir.path().join("out")).unwrap();

    assert_eq!(written.extension().unwrap(), "docx");
    let bytes = std::fs::read(&written).unwrap();
    assert_eq!(docx_to_text(&bytes), "olá");
}

// ============================================================================
// Audio export
// ============================================================================

fn blob(data: Vec<u8>, mime_type: &str) -> AudioBlob {
    AudioBlob {
        data,
        mime_type: mime_type.to_string(),
        sample_rate: 16000,
        channels: 1,
    }
}

#[test]
fn test_audio_export_writes_blob_untransformed() {
    let temp_dir = TempDir::new().unwrap();
    let mut exporter = AudioExporter::new(temp_dir.path()).unwrap();

    let download = exporter
        .export(&blob(vec![1, 2, 3, 4], "audio/wav"), "gravacao")
        .unwrap();

    assert_eq!(download.path.extension().unwrap(), "wav");
    assert_eq!(std::fs::read(&download.path).unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_audio_export_releases_previous_download() {
    let temp_dir = TempDir::new().unwrap();
    let mut exporter = AudioExporter::new(temp_dir.path()).unwrap();

    let first = exporter
        .export(&blob(vec![1], "audio/wav"), "primeira")
        .unwrap();
    let second = exporter
        .export(&blob(vec![2], "audio/webm"), "segunda")
        .unwrap();

    // The stale reference is gone; only the latest download remains.
    assert!(!first.path.exists());
    assert!(second.path.exists());
    assert_eq!(second.path.extension().unwrap(), "webm");
}

#[test]
fn test_audio_reexport_same_name_keeps_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut exporter = AudioExporter::new(temp_dir.path()).unwrap();

    exporter
        .export(&blob(vec![1], "audio/wav"), "gravacao")
        .unwrap();
    let again = exporter
        .export(&blob(vec![9, 9], "audio/wav"), "gravacao")
        .unwrap();

    assert!(again.path.exists());
    assert_eq!(std::fs::read(&again.path).unwrap(), vec![9, 9]);
}
