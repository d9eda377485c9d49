// Transcript document encoders.
//
// Both encoders are pure functions of their input text: no timestamps, no
// randomness, so identical input yields identical bytes. Every character of
// the input, including newlines, survives into the document.

use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// Output document container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// Encode `text` into a document of the requested format.
pub fn export_document(text: &str, format: DocumentFormat) -> Vec<u8> {
    match format {
        DocumentFormat::Pdf => encode_pdf(text),
        DocumentFormat::Docx => encode_docx(text),
    }
}

/// Encode `text` and write it to `path`, appending the format extension when
/// missing. Returns the path written.
pub fn write_document(
    text: &str,
    format: DocumentFormat,
    path: impl AsRef<Path>,
) -> Result<PathBuf, ExportError> {
    let path = path.as_ref();
    let path = if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(format.extension())
    };

    std::fs::write(&path, export_document(text, format))?;

    Ok(path)
}

// ============================================================================
// PDF
// ============================================================================

/// Minimal single-page PDF: one Helvetica text block, one literal string per
/// input line.
fn encode_pdf(text: &str) -> Vec<u8> {
    let mut content = String::new();
    content.push_str("BT\n/F1 12 Tf\n14 TL\n72 720 Td\n");
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            content.push_str("T*\n");
        }
        content.push('(');
        content.push_str(&escape_pdf_string(line));
        content.push_str(") Tj\n");
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );

    out
}

fn escape_pdf_string(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '(' => escaped.push_str("\\("),
            ')' => escaped.push_str("\\)"),
            '\r' => escaped.push_str("\\r"),
            other => escaped.push(other),
        }
    }
    escaped
}

// ============================================================================
// DOCX
// ============================================================================

/// Fixed DOS date stamped on every ZIP entry (2024-01-01), keeping the
/// container byte-identical across runs.
const ZIP_DOS_DATE: u16 = ((2024 - 1980) << 9) | (1 << 5) | 1;

const CONTENT_TYPES_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
    "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
    "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
    "</Types>"
);

const RELS_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>",
    "</Relationships>"
);

/// Minimal WordprocessingML package: stored (uncompressed) ZIP entries, one
/// paragraph per input line.
fn encode_docx(text: &str) -> Vec<u8> {
    let mut document = String::new();
    document.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    document.push_str(
        "<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>",
    );
    for line in text.split('\n') {
        document.push_str("<w:p><w:r><w:t xml:space=\"preserve\">");
        document.push_str(&escape_xml_text(line));
        document.push_str("</w:t></w:r></w:p>");
    }
    document.push_str("</w:body></w:document>");

    let entries: [(&str, &[u8]); 3] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", RELS_XML.as_bytes()),
        ("word/document.xml", document.as_bytes()),
    ];

    let mut out: Vec<u8> = Vec::new();
    let mut records = Vec::with_capacity(entries.len());

    for (name, data) in entries {
        records.push(write_stored_entry(&mut out, name, data));
    }

    let central_offset = out.len() as u32;
    for record in &records {
        write_central_entry(&mut out, record);
    }
    let central_size = out.len() as u32 - central_offset;

    // End of central directory
    push_u32(&mut out, 0x0605_4b50);
    push_u16(&mut out, 0); // disk number
    push_u16(&mut out, 0); // central directory disk
    push_u16(&mut out, records.len() as u16);
    push_u16(&mut out, records.len() as u16);
    push_u32(&mut out, central_size);
    push_u32(&mut out, central_offset);
    push_u16(&mut out, 0); // comment length

    out
}

fn escape_xml_text(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

struct ZipRecord {
    name: &'static str,
    crc: u32,
    size: u32,
    offset: u32,
}

fn write_stored_entry(out: &mut Vec<u8>, name: &'static str, data: &[u8]) -> ZipRecord {
    let offset = out.len() as u32;

    let mut crc = flate2::Crc::new();
    crc.update(data);
    let crc = crc.sum();

    push_u32(out, 0x0403_4b50); // local file header
    push_u16(out, 20); // version needed
    push_u16(out, 0); // flags
    push_u16(out, 0); // method: stored
    push_u16(out, 0); // mod time
    push_u16(out, ZIP_DOS_DATE);
    push_u32(out, crc);
    push_u32(out, data.len() as u32); // compressed size
    push_u32(out, data.len() as u32); // uncompressed size
    push_u16(out, name.len() as u16);
    push_u16(out, 0); // extra length
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(data);

    ZipRecord {
        name,
        crc,
        size: data.len() as u32,
        offset,
    }
}

fn write_central_entry(out: &mut Vec<u8>, record: &ZipRecord) {
    push_u32(out, 0x0201_4b50); // central directory header
    push_u16(out, 20); // version made by
    push_u16(out, 20); // version needed
    push_u16(out, 0); // flags
    push_u16(out, 0); // method: stored
    push_u16(out, 0); // mod time
    push_u16(out, ZIP_DOS_DATE);
    push_u32(out, record.crc);
    push_u32(out, record.size);
    push_u32(out, record.size);
    push_u16(out, record.name.len() as u16);
    push_u16(out, 0); // extra length
    push_u16(out, 0); // comment length
    push_u16(out, 0); // disk number
    push_u16(out, 0); // internal attrs
    push_u32(out, 0); // external attrs
    push_u32(out, record.offset);
    out.extend_from_slice(record.name.as_bytes());
}

fn push_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
