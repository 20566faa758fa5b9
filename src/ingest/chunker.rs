//! Sliding-window text chunker.
//!
//! Windows are measured in characters. A window that does not reach the end
//! of the text is shortened to the last sentence end (`.`) or line break
//! inside it, provided that break lies past the middle of the window. The
//! next window starts `overlap` characters before the previous cut.

/// Chunks with this many characters or fewer are discarded.
const MIN_CHUNK_CHARS: usize = 50;

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        if end < len {
            if let Some(break_point) = find_break_point(&chars[start..end]) {
                if break_point * 2 > chunk_size {
                    end = start + break_point + 1;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        chunks.push(chunk.trim().to_string());

        if end >= len {
            break;
        }

        // Step back by the overlap, but always move forward
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks
        .into_iter()
        .filter(|c| c.chars().count() > MIN_CHUNK_CHARS)
        .collect()
}

fn find_break_point(window: &[char]) -> Option<usize> {
    window.iter().rposition(|c| *c == '.' || *c == '\n')
}
