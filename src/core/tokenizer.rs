//! Word tokenizer, sentence splitter, and untokenizer.
//!
//! Generators treat tokenization as a collaborator behind the [`Tokenizer`]
//! trait; [`SimpleTokenizer`] is the whitespace-and-punctuation default.

/// Punctuation characters that end a sentence.
pub const SENTENCE_ENDERS: &[char] = &['.', '!', '?'];
/// Punctuation characters that are split off as their own tokens.
pub const PUNCTUATION: &[char] = &['.', '!', '?', ',', ';', ':', '"', '\''];

/// Splits text into tokens and sentences and joins tokens back into text.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
    fn untokenize(&self, tokens: &[String]) -> String;
    fn sentences(&self, text: &str) -> Vec<String>;
}

/// Splits on whitespace and separates punctuation into individual tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        for word in text.split_whitespace() {
            let mut remaining = word;
            while let Some(first) = remaining.chars().next() {
                if PUNCTUATION.contains(&first) {
                    tokens.push(first.to_string());
                    remaining = &remaining[first.len_utf8()..];
                    continue;
                }

                // Contractions keep their apostrophe: "don't", "it's"
                match remaining.find(|c: char| PUNCTUATION.contains(&c) && c != '\'') {
                    Some(pos) => {
                        let (word, rest) = remaining.split_at(pos);
                        push_word(&mut tokens, word);
                        remaining = rest;
                    }
                    None => {
                        push_word(&mut tokens, remaining);
                        break;
                    }
                }
            }
        }
        tokens
    }

    /// Joins tokens with single spaces, attaching punctuation to the
    /// preceding word.
    fn untokenize(&self, tokens: &[String]) -> String {
        let mut result = String::new();
        for (i, tok) in tokens.iter().enumerate() {
            if i > 0 && !is_punctuation(tok) {
                result.push(' ');
            }
            result.push_str(tok);
        }
        result
    }

    fn sentences(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        split_into_sentences(&tokens)
            .iter()
            .map(|sentence| self.untokenize(sentence))
            .collect()
    }
}

/// Pushes a word, splitting a trailing apostrophe off as its own token.
fn push_word(tokens: &mut Vec<String>, word: &str) {
    if word.is_empty() {
        return;
    }
    match word.strip_suffix('\'') {
        Some(stem) if !stem.is_empty() => {
            tokens.push(stem.to_string());
            tokens.push("'".to_string());
        }
        _ => tokens.push(word.to_string()),
    }
}

/// True for a single-character punctuation token.
pub fn is_punctuation(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if PUNCTUATION.contains(&c))
}

/// True for a single-character sentence-ending token.
pub fn is_sentence_end(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if SENTENCE_ENDERS.contains(&c))
}

/// Split a token sequence into sentences at sentence-ending punctuation.
pub fn split_into_sentences(tokens: &[String]) -> Vec<Vec<String>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for tok in tokens {
        current.push(tok.clone());
        if is_sentence_end(tok) {
            sentences.push(std::mem::take(&mut current));
        }
    }

    // Don't discard trailing tokens without sentence ender
    if !current.is_empty() {
        sentences.push(current);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn tokenize_basic() {
        let tokens = SimpleTokenizer.tokenize("Hello, world.");
        assert_eq!(tokens, vec!["Hello", ",", "world", "."]);
    }

    #[test]
    fn tokenize_keeps_contractions() {
        let tokens = SimpleTokenizer.tokenize("I don't know!");
        assert_eq!(tokens, vec!["I", "don't", "know", "!"]);
    }

    #[test]
    fn tokenize_quotes() {
        let tokens = SimpleTokenizer.tokenize("She said, \"What?\" He replied.");
        assert_eq!(
            tokens,
            vec!["She", "said", ",", "\"", "What", "?", "\"", "He", "replied", "."]
        );
    }

    #[test]
    fn untokenize_attaches_punctuation() {
        let tokens = strings(&["Hello", ",", "world", "."]);
        assert_eq!(SimpleTokenizer.untokenize(&tokens), "Hello, world.");
    }

    #[test]
    fn sentences_split_at_enders() {
        let sentences = SimpleTokenizer.sentences("The cat sat. Did it? Yes! trailing words");
        assert_eq!(
            sentences,
            vec!["The cat sat.", "Did it?", "Yes!", "trailing words"]
        );
    }

    #[test]
    fn sentence_end_detection() {
        assert!(is_sentence_end("."));
        assert!(is_sentence_end("?"));
        assert!(!is_sentence_end(","));
        assert!(!is_sentence_end(".."));
        assert!(is_punctuation(";"));
        assert!(!is_punctuation("a"));
    }
}
