//! Splits completions into platform-sized messages at word boundaries.

/// Greedily pack words into chunks of at most `max_len` characters.
///
/// Whitespace between words inside a chunk is kept as written; whitespace
/// where a chunk ends is dropped. A single word longer than `max_len`
/// becomes its own oversized chunk. Blank input yields no chunks.
pub fn split(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for (separator, word) in words_with_separators(text) {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
            continue;
        }

        let separator_len = separator.chars().count();
        if current_len + separator_len + word_len <= max_len {
            current.push_str(separator);
            current.push_str(word);
            current_len += separator_len + word_len;
        } else {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Footer appended to the last chunk of every reply.
pub fn footer(model: &str, system_prompt: &str) -> String {
    format!("\n\n`> Model: {model} · System: {system_prompt}`")
}

/// `(preceding whitespace, word)` pairs; the first separator is whatever
/// leads the text.
fn words_with_separators(text: &str) -> impl Iterator<Item = (&str, &str)> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let word_start = rest.find(|c: char| !c.is_whitespace())?;
        let (separator, tail) = rest.split_at(word_start);
        let word_end = tail.find(char::is_whitespace).unwrap_or(tail.len());
        let (word, remainder) = tail.split_at(word_end);
        rest = remainder;
        Some((separator, word))
    })
}
