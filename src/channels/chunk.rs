//! Lossless text chunking for transport message limits.

/// Maximum characters per outbound text message.
pub const TEXT_CHUNK_LIMIT: usize = 4000;

/// Split `text` into chunks of at most `limit` characters.
///
/// Breaks after the last newline inside the window, then after the last
/// whitespace, and otherwise cuts at exactly `limit` characters. Nothing is
/// trimmed: concatenating the chunks in order yields `text`. Empty text
/// yields no chunks; `limit == 0` disables splitting.
pub fn chunk_text(text: &str, limit: usize) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    if limit == 0 {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        // Byte offset of the first character past the window.
        let hard = match remaining.char_indices().nth(limit) {
            Some((idx, _)) => idx,
            None => {
                chunks.push(remaining);
                break;
            }
        };

        let window = &remaining[..hard];
        let split_at = window
            .rfind('\n')
            .map(|p| p + 1)
            .or_else(|| {
                window
                    .char_indices()
                    .rev()
                    .find(|(_, c)| c.is_whitespace())
                    .map(|(p, c)| p + c.len_utf8())
            })
            .unwrap_or(hard);

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk);
        remaining = rest;
    }

    chunks
}
