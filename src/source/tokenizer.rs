//! Query tokenization.
//!
//! The pipeline only needs two operations from a tokenizer: the primary
//! tokenization of the query text, and a broader sub-tokenization used as a
//! fallback when the primary tokens match nothing.

use std::fmt::Debug;

use ahash::AHashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Turns query text into search tokens.
pub trait Tokenizer: Send + Sync + Debug {
    /// Tokenize the query text.
    fn tokenize(&self, text: &str) -> Vec<String>;

    /// Produce a broader token list from the primary tokens.
    fn subtokenize(&self, tokens: &[String]) -> Vec<String>;
}

/// A tokenizer that splits text on Unicode word boundaries (UAX #29).
///
/// Tokens are lowercased. Sub-tokenization breaks every token longer than two
/// characters into overlapping character bigrams, for indexes that also
/// store bigram postings.
///
/// ```
/// use rankflow::source::{Tokenizer, UnicodeWordTokenizer};
///
/// let tokenizer = UnicodeWordTokenizer::new();
/// let tokens = tokenizer.tokenize("Hello, World!");
/// assert_eq!(tokens, vec!["hello", "world"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct UnicodeWordTokenizer;

impl UnicodeWordTokenizer {
    /// Create a new Unicode word tokenizer.
    pub fn new() -> Self {
        UnicodeWordTokenizer
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words().map(|word| word.to_lowercase()).collect()
    }

    fn subtokenize(&self, tokens: &[String]) -> Vec<String> {
        let mut seen = AHashSet::new();
        let mut result = Vec::new();

        for token in tokens {
            let chars: Vec<char> = token.chars().collect();
            if chars.len() <= 2 {
                if seen.insert(token.clone()) {
                    result.push(token.clone());
                }
                continue;
            }

            for pair in chars.windows(2) {
                let bigram: String = pair.iter().collect();
                if seen.insert(bigram.clone()) {
                    result.push(bigram);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokenizer = UnicodeWordTokenizer::new();
        assert_eq!(
            tokenizer.tokenize("Café, Résumé & more"),
            vec!["café", "résumé", "more"]
        );
        assert!(tokenizer.tokenize("  ,;  ").is_empty());
    }

    #[test]
    fn test_subtokenize() {
        let tokenizer = UnicodeWordTokenizer::new();
        let tokens = vec!["abcb".to_string(), "ok".to_string(), "bc".to_string()];
        assert_eq!(tokenizer.subtokenize(&tokens), vec!["ab", "bc", "cb", "ok"]);
    }
}
