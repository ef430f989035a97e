use once_cell::sync::Lazy;
use regex::Regex;

/// Sentence terminator followed by the whitespace run that separates it from
/// the next sentence.
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence boundary pattern is valid"));

/// Split text into sentences, keeping terminal punctuation attached and
/// dropping the separating whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for mat in SENTENCE_BOUNDARY.find_iter(text) {
        // Punctuation is a single ASCII byte
        let sentence_end = mat.start() + 1;
        sentences.push(&text[last_end..sentence_end]);
        last_end = mat.end();
    }

    if last_end < text.len() {
        sentences.push(&text[last_end..]);
    }

    sentences
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Split long text into chunks of at most `max_chars` characters at sentence
/// boundaries.
///
/// Sentences are accumulated greedily. A sentence that alone exceeds
/// `max_chars` is emitted as its own oversized chunk rather than being cut
/// mid-sentence. Chunks come back in source order.
pub fn chunk(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    // `current` always carries a trailing separator space once non-empty
    let mut current_len = 0usize;

    for sentence in split_sentences(text) {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len <= max_chars {
            current.push_str(sentence);
            current.push(' ');
            current_len += sentence_len + 1;
            continue;
        }

        if !current.is_empty() {
            chunks.push(current.trim().to_string());
        }
        current = format!("{} ", sentence);
        current_len = sentence_len + 1;
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}
