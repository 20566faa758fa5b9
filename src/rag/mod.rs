//! Retrieval over a session's uploaded document chunks.
//!
//! Chunks carry an embedding computed at upload time. A query is embedded
//! with the same model and matched by cosine similarity. When either side
//! has no embedding (the embedding service was unreachable), retrieval falls
//! back to keyword overlap so uploads stay useful.

pub mod keyword;
pub mod vector;

use serde::Serialize;

use crate::models::DocumentChunk;

/// A chunk selected for a prompt.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RetrievedChunk {
    pub content: String,
    pub filename: String,
    pub chunk_index: usize,
    pub score: f32,
    /// `1 - score`, reported to clients as the match distance
    pub distance: f32,
}

impl RetrievedChunk {
    fn from_chunk(chunk: &DocumentChunk, score: f32) -> Self {
        Self {
            content: chunk.content.clone(),
            filename: chunk.filename.clone(),
            chunk_index: chunk.chunk_index,
            score,
            distance: 1.0 - score,
        }
    }
}

/// Pick the `k` best chunks for a query, preferring embeddings.
///
/// Chunks stored while the embedding service was down have no embedding;
/// they are ranked by keyword overlap and compete with the vector hits.
pub fn retrieve(
    chunks: &[DocumentChunk],
    query: &str,
    query_embedding: Option<&[f32]>,
    k: usize,
) -> Vec<RetrievedChunk> {
    if chunks.is_empty() || k == 0 {
        return Vec::new();
    }

    let Some(embedding) = query_embedding else {
        return keyword::top_k_by_keywords(chunks, query, k);
    };

    let mut hits = vector::top_k_by_embedding(chunks, embedding, k);
    hits.extend(keyword::top_k_by_keywords(
        chunks.iter().filter(|c| c.embedding.is_none()),
        query,
        k,
    ));

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str, embedding: Option<Vec<f32>>) -> DocumentChunk {
        DocumentChunk {
            filename: "guide.txt".into(),
            chunk_index: 0,
            total_chunks: 1,
            content: content.into(),
            embedding,
        }
    }

    #[test]
    fn test_retrieve_prefers_embeddings() {
        let chunks = vec![
            chunk("visa rules", Some(vec![1.0, 0.0])),
            chunk("beach hotels", Some(vec![0.0, 1.0])),
        ];
        let hits = retrieve(&chunks, "hotels", Some(&[1.0, 0.0]), 1);
        assert_eq!(hits[0].content, "visa rules");
    }

    #[test]
    fn test_retrieve_falls_back_to_keywords_without_chunk_embeddings() {
        let chunks = vec![chunk("visa rules", None), chunk("beach hotels", None)];
        let hits = retrieve(&chunks, "hotels", Some(&[1.0, 0.0]), 3);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "beach hotels");
    }

    #[test]
    fn test_retrieve_mixes_unembedded_chunks_with_vector_hits() {
        let mut visa = chunk("japan visa rules for tourists", None);
        visa.filename = "visa.txt".into();
        let mut food = chunk("ramen and sushi spots", Some(vec![0.0, 1.0]));
        food.filename = "food.txt".into();

        let hits = retrieve(&[visa, food], "japan visa rules", Some(&[1.0, 0.0]), 3);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].filename, "visa.txt");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert_eq!(hits[1].filename, "food.txt");
    }

    #[test]
    fn test_retrieve_mixed_respects_k() {
        let chunks = vec![
            chunk("beach hotels", None),
            chunk("visa rules", Some(vec![1.0, 0.0])),
            chunk("night markets", Some(vec![0.0, 1.0])),
        ];
        let hits = retrieve(&chunks, "beach hotels", Some(&[0.8, 0.6]), 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "beach hotels");
        assert_eq!(hits[1].content, "visa rules");
    }

    #[test]
    fn test_retrieve_empty() {
        assert!(retrieve(&[], "anything", None, 3).is_empty());
        assert!(retrieve(&[chunk("visa", None)], "visa", None, 0).is_empty());
    }
}
