//! Text splitting for platform message size limits.
//!
//! Limits are counted in characters (Unicode scalar values), which is how
//! chat platforms measure message length. Splits prefer paragraph breaks,
//! then line breaks, then a hard cut.

/// Split text into chunks of at most `max_chars` characters.
///
/// Tries to split at paragraph boundaries first (`\n\n`), then newlines
/// (`\n`), then hard-cuts. Newlines at the start of a following chunk are
/// dropped. Returns an empty vector for empty input.
///
/// # Panics
///
/// Never; a `max_chars` of `0` is treated as `1`.
#[must_use]
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let Some(hard_cut) = byte_offset_of_char(remaining, max_chars) else {
            chunks.push(remaining.to_owned());
            break;
        };

        let split_at = find_split_point(remaining, hard_cut, "\n\n")
            .or_else(|| find_split_point(remaining, hard_cut, "\n"))
            .filter(|&at| at > 0)
            .unwrap_or(hard_cut);

        let (chunk, rest) = remaining.split_at(split_at);
        let chunk = chunk.trim_end_matches('\n');
        if !chunk.is_empty() {
            chunks.push(chunk.to_owned());
        }
        remaining = rest.trim_start_matches('\n');
    }

    chunks
}

/// Byte offset of the `n`th character, or `None` if the text has at most
/// `n` characters.
fn byte_offset_of_char(text: &str, n: usize) -> Option<usize> {
    text.char_indices().nth(n).map(|(idx, _)| idx)
}

/// Find a split point by searching backwards from `boundary` for `delimiter`.
///
/// Returns the position just after the delimiter, or `None` if the delimiter
/// is not found in `text[..boundary]`. `boundary` must be a char boundary.
#[must_use]
pub fn find_split_point(text: &str, boundary: usize, delimiter: &str) -> Option<usize> {
    text[..boundary]
        .rfind(delimiter)
        .map(|pos| pos.saturating_add(delimiter.len()))
}
