//! Lexical helpers shared by the analyzer, matcher, and fidelity scorer.

const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "could", "do", "does",
    "for", "from", "how", "i", "in", "into", "is", "it", "its", "me", "my", "of", "on", "or",
    "please", "should", "so", "that", "the", "this", "to", "was", "we", "what", "when", "where",
    "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Splits text into lowercase alphanumeric tokens.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Returns true for function words carrying no topical meaning.
#[must_use]
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Tokens with stopwords and single characters removed, order preserved.
#[must_use]
pub fn content_terms(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|token| token.chars().count() > 1 && !is_stopword(token))
        .collect()
}

/// Crude stem: the first five characters of a token.
#[must_use]
pub fn stem(token: &str) -> &str {
    match token.char_indices().nth(5) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn content_terms_drop_noise() {
        assert_eq!(
            content_terms("Explain how Photosynthesis works, please!"),
            vec!["explain", "photosynthesis", "works"]
        );
    }

    #[test]
    fn stems_truncate_long_tokens() {
        assert_eq!(stem("photosynthesis"), "photo");
        assert_eq!(stem("json"), "json");
    }
}
