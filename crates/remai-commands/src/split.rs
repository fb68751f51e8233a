/// Largest message body the transport accepts, in characters.
pub const MESSAGE_MAX_CHARS: usize = 2000;

/// Shown in place of a completion with no visible text.
pub const EMPTY_REPLY: &str = "*The model returned an empty answer.*";

/// Split `text` into chunks of at most `max_chars` characters, preferring
/// the last newline, then the last space, inside each window. Never cuts
/// through a UTF-8 character.
pub fn split_reply(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.trim().is_empty() {
        return vec![EMPTY_REPLY.to_string()];
    }
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.chars().count() > max_chars {
        // byte offset just past the `max_chars`-th character
        let window_end = remaining
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let window = &remaining[..window_end];

        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(window_end);

        chunks.push(remaining[..split_at].trim_end().to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}
