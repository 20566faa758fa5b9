//! Document ingestion: text extraction from uploads and sliding-window chunking.

pub mod chunker;
pub mod extract;

use anyhow::Result;

use crate::config::RagConfig;

/// File extensions accepted by the upload endpoint.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt"];

/// Output of processing a single upload.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub filename: String,
    pub chunks: Vec<String>,
}

impl ProcessedDocument {
    pub fn total_chunks(&self) -> usize {
        self.chunks.len()
    }
}

/// Lower-cased text after the last `.` of a file name (the whole name when
/// there is no dot).
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

pub fn is_supported(filename: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&file_extension(filename).as_str())
}

/// Extract text from an upload and split it into retrieval chunks.
pub fn process_document(filename: &str, data: &[u8], rag: &RagConfig) -> Result<ProcessedDocument> {
    let text = extract::extract_text(filename, data)?;
    let chunks = chunker::chunk_text(&text, rag.chunk_size, rag.chunk_overlap);

    tracing::debug!(
        "Processed {filename}: {} chars -> {} chunks",
        text.chars().count(),
        chunks.len()
    );

    Ok(ProcessedDocument {
        filename: filename.to_string(),
        chunks,
    })
}
