//! Reply sanitization
//!
//! Every reply that leaves the generator passes through [`sanitize_reply`],
//! whether it came from a completion provider or a fallback pool. The output
//! is always two lines separated by one blank line:
//!
//! - no links, hashtags or characters outside a conservative allow-list
//! - at most [`MAX_WORDS`] words in total
//! - lowercase with the first character capitalized
//! - never shorter than [`MIN_REPLY_CHARS`] (replaced by [`DEFAULT_REPLY`])

use crate::utils::normalize_whitespace;

/// Total word cap across both lines
pub const MAX_WORDS: usize = 18;

/// Replies shorter than this are replaced by [`DEFAULT_REPLY`]
pub const MIN_REPLY_CHARS: usize = 5;

/// Used when nothing usable survives sanitization
pub const DEFAULT_REPLY: &str = "Interesting point\n\nthanks for sharing";

/// Second line when the text cannot be split
pub const SECOND_LINE_PLACEHOLDER: &str = "just my two cents";

/// Punctuation kept in addition to alphanumerics and whitespace
const ALLOWED_PUNCTUATION: &[char] = &['-', '?', '.', ',', '\'', '"'];

const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

/// Normalize raw completion or fallback text into the two-line reply format
pub fn sanitize_reply(raw: &str) -> String {
    let lines: Vec<String> = raw
        .lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .collect();

    let (first, second) = split_two(&lines);
    let (first, second) = cap_words(&first, &second, MAX_WORDS);
    let (first, second) = ensure_second_line(first, second);

    if first.is_empty() {
        return DEFAULT_REPLY.to_string();
    }

    let reply = capitalize_first(&format!("{first}\n\n{second}").to_lowercase());
    if reply.chars().count() < MIN_REPLY_CHARS {
        return DEFAULT_REPLY.to_string();
    }

    reply
}

/// Strip links, hashtags and disallowed characters from one line
fn clean_line(line: &str) -> String {
    let dashes_normalized: String = line
        .chars()
        .map(|c| match c {
            '\u{2014}' | '\u{2013}' | '\u{2012}' | '\u{2212}' => '-',
            other => other,
        })
        .collect();

    let kept: Vec<&str> = dashes_normalized
        .split_whitespace()
        .filter(|token| !is_link_or_hashtag(token))
        .collect();

    let filtered: String = kept
        .join(" ")
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ALLOWED_PUNCTUATION.contains(c))
        .collect();

    // Character filtering can glue fragments back into a link-like token.
    // Bare punctuation tokens carry no words and are dropped too.
    let rejoined: Vec<&str> = filtered
        .split_whitespace()
        .filter(|token| !token.to_lowercase().contains("http") && has_text(token))
        .collect();

    normalize_whitespace(&rejoined.join(" "))
}

fn has_text(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

fn is_link_or_hashtag(token: &str) -> bool {
    let lower = token.to_lowercase();
    token.starts_with('#') || lower.contains("http") || lower.contains("www.") || lower.contains("://")
}

/// Derive a first and second line from the cleaned block
fn split_two(lines: &[String]) -> (String, String) {
    if lines.len() >= 2 {
        return (lines[0].clone(), lines[1].clone());
    }

    let Some(block) = lines.first() else {
        return (String::new(), String::new());
    };

    let sentences: Vec<&str> = block
        .split(|c| SENTENCE_TERMINATORS.contains(&c))
        .map(str::trim)
        .filter(|s| has_text(s))
        .collect();

    if sentences.len() >= 2 {
        return (sentences[0].to_string(), sentences[1].to_string());
    }

    bisect(block)
}

/// Split a block into two halves by word count
fn bisect(block: &str) -> (String, String) {
    let words: Vec<&str> = block.split_whitespace().collect();
    if words.len() < 2 {
        return (words.join(" "), String::new());
    }

    let mid = words.len() / 2;
    (words[..mid].join(" "), words[mid..].join(" "))
}

/// Drop trailing words so both lines together hold at most `max` words
fn cap_words(first: &str, second: &str, max: usize) -> (String, String) {
    let first_words: Vec<&str> = first.split_whitespace().collect();
    if first_words.len() >= max {
        return (first_words[..max].join(" "), String::new());
    }

    let budget = max - first_words.len();
    let second_words: Vec<&str> = second.split_whitespace().take(budget).collect();
    (first_words.join(" "), second_words.join(" "))
}

fn ensure_second_line(first: String, second: String) -> (String, String) {
    if !second.is_empty() {
        return (first, second);
    }

    let (head, tail) = bisect(&first);
    if tail.is_empty() {
        (head, SECOND_LINE_PLACEHOLDER.to_string())
    } else {
        (head, tail)
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
