use std::collections::HashSet;

use super::RetrievedChunk;
use crate::models::DocumentChunk;

/// Rank chunks by the number of distinct query words they contain.
/// Chunks sharing no word with the query are dropped.
pub fn top_k_by_keywords<'a>(
    chunks: impl IntoIterator<Item = &'a DocumentChunk>,
    query: &str,
    k: usize,
) -> Vec<RetrievedChunk> {
    let query_words = tokenize(query);
    if query_words.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &DocumentChunk)> = chunks
        .into_iter()
        .map(|c| {
            let chunk_words = tokenize(&c.content);
            (query_words.intersection(&chunk_words).count(), c)
        })
        .filter(|(score, _)| *score > 0)
        .collect();

    // Stable sort keeps upload order among ties
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.truncate(k);

    let total = query_words.len() as f32;
    scored
        .into_iter()
        .map(|(score, c)| RetrievedChunk::from_chunk(c, score as f32 / total))
        .collect()
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}
