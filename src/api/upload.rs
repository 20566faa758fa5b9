use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::ingest::{self, file_extension, process_document};
use crate::llm::embeddings::embed_batch;
use crate::models::{DocumentChunk, DocumentUploadResponse};
use crate::state::AppState;

struct UploadForm {
    filename: String,
    data: Vec<u8>,
    session_id: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, (StatusCode, String)> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        (StatusCode::BAD_REQUEST, format!("Invalid upload: {e}"))
    };

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut session_id = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(bad_form)?;
                file = Some((filename, data.to_vec()));
            }
            "session_id" => {
                let value = field.text().await.map_err(bad_form)?;
                if !value.trim().is_empty() {
                    session_id = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or((
        StatusCode::BAD_REQUEST,
        "A file field is required".to_string(),
    ))?;
    if filename.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Filename is required".to_string()));
    }

    Ok(UploadForm {
        filename,
        data,
        session_id,
    })
}

/// POST /upload - extract, chunk and embed a travel document into a session.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, (StatusCode, String)> {
    let form = read_form(multipart).await?;

    if !ingest::is_supported(&form.filename) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Unsupported file type: {}. Supported: PDF, DOCX, TXT",
                file_extension(&form.filename)
            ),
        ));
    }

    let max_bytes = state.config.max_upload_bytes();
    if form.data.len() > max_bytes {
        let size_mb = form.data.len() as f64 / (1024.0 * 1024.0);
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "File too large: {size_mb:.2}MB. Max: {}MB",
                state.config.max_upload_size_mb
            ),
        ));
    }

    let session_id = state.sessions.get_or_create(form.session_id.as_deref());
    tracing::info!(
        session = %session_id,
        "Upload received: {} ({} bytes)",
        form.filename,
        form.data.len()
    );

    // PDF and DOCX parsing is CPU-bound
    let rag = state.config.rag.clone();
    let filename = form.filename.clone();
    let processed = tokio::task::spawn_blocking(move || process_document(&filename, &form.data, &rag))
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error processing document: {e}"),
            )
        })?
        .map_err(|e| {
            tracing::warn!("Could not extract {}: {e:#}", form.filename);
            (
                StatusCode::BAD_REQUEST,
                format!("Error processing document: {e:#}"),
            )
        })?;

    let embeddings: Vec<Option<Vec<f32>>> = match embed_batch(
        &state.http_client,
        &state.config.embedding,
        &processed.chunks,
    )
    .await
    {
        Ok(vectors) => vectors.into_iter().map(Some).collect(),
        Err(e) => {
            tracing::warn!(
                "Embedding failed for {}, chunks will use keyword retrieval: {e:#}",
                processed.filename
            );
            vec![None; processed.chunks.len()]
        }
    };

    let total_chunks = processed.total_chunks();
    let chunks: Vec<DocumentChunk> = processed
        .chunks
        .into_iter()
        .zip(embeddings)
        .enumerate()
        .map(|(chunk_index, (content, embedding))| DocumentChunk {
            filename: processed.filename.clone(),
            chunk_index,
            total_chunks,
            content,
            embedding,
        })
        .collect();

    let added = state
        .sessions
        .add_chunks(&session_id, &processed.filename, chunks);
    tracing::info!(session = %session_id, "Stored {added} chunks from {}", processed.filename);

    Ok(Json(DocumentUploadResponse {
        filename: processed.filename,
        pages: added / 2,
        chunks: added,
        status: "success".to_string(),
        message: format!("Document processed successfully. Session ID: {session_id}"),
        session_id,
    }))
}
