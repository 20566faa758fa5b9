//! Plain-text extraction for PDF, DOCX and TXT uploads.

use anyhow::{anyhow, bail, Context, Result};

use super::file_extension;

/// Extract text from an uploaded file, dispatching on its extension.
pub fn extract_text(filename: &str, data: &[u8]) -> Result<String> {
    let ext = file_extension(filename);
    let text = match ext.as_str() {
        "pdf" => extract_pdf(data)?,
        "docx" => extract_docx(data)?,
        "txt" => extract_txt(data),
        other => bail!("Unsupported file type: {other}"),
    };
    Ok(text.trim().to_string())
}

fn extract_pdf(data: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed files
    let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data))
        .map_err(|_| anyhow!("Error extracting PDF: malformed document"))?;
    let text = result.context("Error extracting PDF")?;
    Ok(text.replace('\0', ""))
}

fn extract_docx(data: &[u8]) -> Result<String> {
    let doc = docx_rs::read_docx(data).map_err(|e| anyhow!("Error extracting DOCX: {e}"))?;

    let mut paragraphs = Vec::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n"))
}

/// UTF-8 first; anything else is read as Latin-1, which maps every byte.
fn extract_txt(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(s) => s.to_string(),
        Err(_) => data.iter().map(|&b| char::from(b)).collect(),
    }
}
