//! Text budget helpers shared by storage, prompting and rendering.

/// Maximum characters kept from any text before it is stored or prompted.
pub const MAX_CONTENT_CHARS: usize = 8000;

/// Cap `input` at [`MAX_CONTENT_CHARS`] characters, slicing from the start.
pub fn truncate_content(input: &str) -> String {
    truncate_chars(input, MAX_CONTENT_CHARS)
}

/// Keep the first `max` characters of `input`. Never splits a code point.
pub fn truncate_chars(input: &str, max: usize) -> String {
    match input.char_indices().nth(max) {
        Some((byte_idx, _)) => input[..byte_idx].to_string(),
        None => input.to_string(),
    }
}

/// Display name for a server, falling back when blank.
pub fn server_or_default(server_name: &str) -> &str {
    if server_name.trim().is_empty() {
        "this server"
    } else {
        server_name
    }
}
