//! Document decoder — turns an uploaded résumé into plain text.
//!
//! Exactly two formats are accepted: PDF and DOCX. Anything else (including
//! plain text masquerading as a document) is `DecodeError::Unsupported`, the
//! one fatal condition in the pipeline.

use thiserror::Error;
use tracing::debug;

/// DOCX files are ZIP containers; cheap sniff before handing to docx-rs.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported resume format: only PDF and DOCX are accepted")]
    Unsupported,
}

/// Decodes a document payload into plain text.
///
/// PDF is attempted first; a PDF that yields only whitespace is treated as a
/// failed decode rather than an empty success, so a scanned-image PDF cannot
/// silently produce an empty evaluation. DOCX is attempted only when the
/// payload carries the ZIP magic.
pub fn decode(bytes: &[u8]) -> Result<String, DecodeError> {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) if !text.trim().is_empty() => {
            debug!("decoded PDF document ({} bytes of text)", text.len());
            return Ok(text);
        }
        Ok(_) => debug!("PDF decode produced no text; trying DOCX"),
        Err(e) => debug!("not a readable PDF ({e}); trying DOCX"),
    }

    if bytes.starts_with(ZIP_MAGIC) {
        if let Ok(doc) = docx_rs::read_docx(bytes) {
            let text = docx_text(&doc);
            debug!("decoded DOCX document ({} bytes of text)", text.len());
            return Ok(text);
        }
    }

    Err(DecodeError::Unsupported)
}

/// Walks the DOCX body and collects visible run text, one line per paragraph.
fn docx_text(doc: &docx_rs::Docx) -> String {
    let mut text = String::new();
    for child in &doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(p) => {
                paragraph_text(p, &mut text);
                text.push('\n');
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(row) = row;
                    for cell in &row.cells {
                        let docx_rs::TableRowChild::TableCell(cell) = cell;
                        for content in &cell.children {
                            if let docx_rs::TableCellContent::Paragraph(p) = content {
                                paragraph_text(p, &mut text);
                                text.push(' ');
                            }
                        }
                    }
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    text
}

fn paragraph_text(p: &docx_rs::Paragraph, text: &mut String) {
    for child in &p.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => run_text(run, text),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        run_text(run, text);
                    }
                }
            }
            _ => {}
        }
    }
}

fn run_text(run: &docx_rs::Run, text: &mut String) {
    for child in &run.children {
        match child {
            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => text.push('\t'),
            docx_rs::RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}

/// Builds a real in-memory DOCX with one paragraph per line of input.
/// Shared fixture for decoder and pipeline tests.
#[cfg(test)]
pub(crate) fn docx_bytes(lines: &[&str]) -> Vec<u8> {
    let mut docx = docx_rs::Docx::new();
    for line in lines {
        docx = docx
            .add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*line)));
    }
    let mut cursor = std::io::Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).unwrap();
    cursor.into_inner()
}
