use crate::types::Word;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::debug;

/// Raw Whisper token with timing in seconds
#[derive(Debug, Clone)]
pub struct TimedToken {
    pub text: String,
    pub start: f32,
    pub end: f32,
}

impl TimedToken {
    pub fn new(text: impl Into<String>, start: f32, end: f32) -> Self {
        Self {
            text: text.into(),
            start,
            end,
        }
    }
}

fn whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// Trim and collapse internal whitespace
pub fn normalize_text(text: &str) -> String {
    whitespace().replace_all(text.trim(), " ").into_owned()
}

/// Whether a segment is a decoding loop (one or two words repeated 10+ times)
pub fn is_repetitive(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();

    if words.len() < 10 {
        return false;
    }

    let unique: HashSet<String> = words
        .iter()
        .map(|w| {
            w.trim_matches(|c: char| c.is_ascii_punctuation())
                .to_lowercase()
        })
        .collect();

    if unique.len() <= 2 {
        debug!(
            "Discarding repetitive pattern: {} unique words in {} total",
            unique.len(),
            words.len()
        );
        return true;
    }

    false
}

/// Control tokens such as `[_BEG_]`, `[_TT_150]` or `<|endoftext|>`
pub fn is_special_token(text: &str) -> bool {
    let text = text.trim();
    (text.starts_with("[_") && text.ends_with(']')) || (text.starts_with("<|") && text.ends_with("|>"))
}

/// Group sub-word tokens into words
///
/// A token starting with whitespace opens a new word; others (punctuation,
/// word pieces) extend the current one. Special tokens are dropped.
pub fn group_words(tokens: &[TimedToken]) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();

    for token in tokens {
        if token.text.is_empty() || is_special_token(&token.text) {
            continue;
        }

        let starts_word = token.text.starts_with(char::is_whitespace);
        match words.last_mut() {
            Some(current) if !starts_word => {
                current.word.push_str(&token.text);
                current.end = current.end.max(token.end);
            }
            _ => {
                let text = token.text.trim_start();
                if text.is_empty() {
                    continue;
                }
                words.push(Word {
                    word: text.to_string(),
                    start: token.start,
                    end: token.end,
                });
            }
        }
    }

    for word in &mut words {
        let trimmed = word.word.trim_end();
        if trimmed.len() != word.word.len() {
            word.word = trimmed.to_string();
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  hello    world \n"), "hello world");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_is_repetitive() {
        assert!(is_repetitive("you you you you you you you you you you you"));
        assert!(is_repetitive("Thank you. Thank you. Thank you. Thank you. Thank you."));
        assert!(!is_repetitive("you you you"));
        assert!(!is_repetitive(
            "the quick brown fox jumps over the lazy dog and keeps running"
        ));
    }

    #[test]
    fn test_is_special_token() {
        assert!(is_special_token("[_BEG_]"));
        assert!(is_special_token("[_TT_150]"));
        assert!(is_special_token("<|endoftext|>"));
        assert!(!is_special_token(" hello"));
        assert!(!is_special_token("[music]x"));
    }

    #[test]
    fn test_group_words() {
        let tokens = vec![
            TimedToken::new("[_BEG_]", 0.0, 0.0),
            TimedToken::new(" Hel", 0.0, 0.2),
            TimedToken::new("lo", 0.2, 0.4),
            TimedToken::new(",", 0.4, 0.45),
            TimedToken::new(" world", 0.5, 0.9),
            TimedToken::new(".", 0.9, 1.0),
            TimedToken::new("[_TT_50]", 1.0, 1.0),
        ];

        let words = group_words(&tokens);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "Hello,");
        assert_eq!(words[0].start, 0.0);
        assert_eq!(words[0].end, 0.45);
        assert_eq!(words[1].word, "world.");
        assert_eq!(words[1].start, 0.5);
        assert_eq!(words[1].end, 1.0);
    }

    #[test]
    fn test_group_words_leading_piece_without_space() {
        // First token of a segment often lacks the leading space
        let tokens = vec![
            TimedToken::new("Yes", 0.0, 0.3),
            TimedToken::new(" indeed", 0.3, 0.8),
        ];
        let words = group_words(&tokens);
        let texts: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(texts, ["Yes", "indeed"]);
    }
}
