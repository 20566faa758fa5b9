use super::RetrievedChunk;
use crate::models::DocumentChunk;

/// Rank chunks by cosine similarity against a query embedding.
/// Chunks without an embedding are skipped.
pub fn top_k_by_embedding(
    chunks: &[DocumentChunk],
    query_embedding: &[f32],
    k: usize,
) -> Vec<RetrievedChunk> {
    let mut scored: Vec<(f32, &DocumentChunk)> = chunks
        .iter()
        .filter_map(|c| {
            c.embedding
                .as_ref()
                .map(|e| (cosine_similarity(query_embedding, e), c))
        })
        .collect();

    // Sort descending by score
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(score, c)| RetrievedChunk::from_chunk(c, score))
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
