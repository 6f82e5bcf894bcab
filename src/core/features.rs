//! Word-feature oracle: inflection and syllabification.
//!
//! The lexicon and the script transforms consume these features through
//! [`WordFeatures`]. [`BasicFeatures`] covers regular English morphology and
//! defers pluralization to `Inflector`; callers with a full linguistic
//! dictionary plug in their own implementation.

use inflector::string::pluralize::to_plural;
use serde::{Deserialize, Serialize};

/// Separates syllables in a syllabification, e.g. `"wa/ter"`.
pub const SYLLABLE_BOUNDARY: &str = "/";
/// Separates phonemes within a syllable, e.g. `"w-ao1"`.
pub const PHONEME_BOUNDARY: &str = "-";
/// Marks a stressed syllable in a pronunciation.
pub const STRESSED: char = '1';
/// Marks an unstressed syllable in a stress pattern.
pub const UNSTRESSED: char = '0';
/// Orthographic vowels.
pub const VOWELS: &str = "aeiou";

/// True when `c` is an orthographic vowel.
pub fn is_vowel(c: char) -> bool {
    VOWELS.contains(c.to_ascii_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Number {
    #[default]
    Singular,
    Plural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Person {
    #[default]
    First,
    Second,
    Third,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tense {
    Past,
    #[default]
    Present,
    Future,
}

/// Grammatical target for [`WordFeatures::conjugate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conjugation {
    pub number: Number,
    pub person: Person,
    pub tense: Tense,
}

/// Black-box word features used by the lexicon and transforms.
pub trait WordFeatures {
    fn pluralize(&self, word: &str) -> String;
    fn conjugate(&self, verb: &str, conjugation: &Conjugation) -> String;
    fn present_participle(&self, verb: &str) -> String;
    fn past_participle(&self, verb: &str) -> String;
    /// Syllables joined by [`SYLLABLE_BOUNDARY`].
    fn syllables(&self, word: &str) -> String;
}

/// Rule-based English features: regular verbs only, vowel-group syllables.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicFeatures;

impl WordFeatures for BasicFeatures {
    fn pluralize(&self, word: &str) -> String {
        to_plural(word)
    }

    fn conjugate(&self, verb: &str, conjugation: &Conjugation) -> String {
        if verb.is_empty() {
            return String::new();
        }
        match conjugation.tense {
            Tense::Past => self.past_participle(verb),
            Tense::Future => format!("will {}", verb),
            Tense::Present => {
                if conjugation.number == Number::Singular && conjugation.person == Person::Third {
                    third_person(verb)
                } else {
                    verb.to_string()
                }
            }
        }
    }

    fn present_participle(&self, verb: &str) -> String {
        if let Some(stem) = verb.strip_suffix("ie") {
            return format!("{}ying", stem);
        }
        if verb.ends_with("ee") || verb.ends_with("ye") || verb.ends_with("oe") {
            return format!("{}ing", verb);
        }
        if let Some(stem) = verb.strip_suffix('e') {
            if !stem.is_empty() {
                return format!("{}ing", stem);
            }
        }
        if doubles_final_consonant(verb) {
            if let Some(last) = verb.chars().last() {
                return format!("{}{}ing", verb, last);
            }
        }
        format!("{}ing", verb)
    }

    fn past_participle(&self, verb: &str) -> String {
        let mut chars = verb.chars().rev();
        match (chars.next(), chars.next()) {
            (Some('e'), _) => format!("{}d", verb),
            (Some('y'), Some(prev)) if !is_vowel(prev) => {
                format!("{}ied", &verb[..verb.len() - 1])
            }
            (Some(last), _) if doubles_final_consonant(verb) => format!("{}{}ed", verb, last),
            (Some(_), _) => format!("{}ed", verb),
            (None, _) => String::new(),
        }
    }

    fn syllables(&self, word: &str) -> String {
        let mut syllables: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut seen_vowel = false;
        let chars: Vec<char> = word.chars().collect();

        for (i, &c) in chars.iter().enumerate() {
            let vowel = is_vowel(c) || (c == 'y' && i > 0);
            // A consonant after a vowel group opens a new syllable when
            // another vowel follows it.
            if !vowel && seen_vowel {
                let next_is_vowel = chars.get(i + 1).map(|&n| is_vowel(n) || n == 'y').unwrap_or(false);
                if next_is_vowel {
                    syllables.push(std::mem::take(&mut current));
                    seen_vowel = false;
                }
            }
            current.push(c);
            seen_vowel |= vowel;
        }

        // Silent final 'e' belongs to the previous syllable
        if !current.is_empty() {
            let vowels = current.chars().filter(|&c| is_vowel(c) || c == 'y').count();
            let silent_e = current.ends_with('e') && !current.ends_with("le") && vowels == 1;
            match syllables.last_mut() {
                Some(last) if silent_e || vowels == 0 => last.push_str(&current),
                _ => syllables.push(current),
            }
        }
        syllables.join(SYLLABLE_BOUNDARY)
    }
}

fn third_person(verb: &str) -> String {
    match verb {
        "be" => return "is".to_string(),
        "have" => return "has".to_string(),
        _ => {}
    }
    let mut chars = verb.chars().rev();
    match (chars.next(), chars.next()) {
        (Some('y'), Some(prev)) if !is_vowel(prev) => format!("{}ies", &verb[..verb.len() - 1]),
        (Some('s' | 'x' | 'z' | 'o'), _) => format!("{}es", verb),
        (Some('h'), Some('c' | 's')) => format!("{}es", verb),
        _ => format!("{}s", verb),
    }
}

/// Consonant-vowel-consonant endings on short verbs double the final
/// consonant: "stop" → "stopped", "run" → "running".
fn doubles_final_consonant(verb: &str) -> bool {
    let chars: Vec<char> = verb.chars().collect();
    let n = chars.len();
    if !(3..=4).contains(&n) {
        return false;
    }
    let (a, b, c) = (chars[n - 3], chars[n - 2], chars[n - 1]);
    !is_vowel(a) && is_vowel(b) && !is_vowel(c) && !matches!(c, 'w' | 'x' | 'y')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralize_uses_inflector() {
        assert_eq!(BasicFeatures.pluralize("apple"), "apples");
        assert_eq!(BasicFeatures.pluralize("box"), "boxes");
    }

    #[test]
    fn past_participles() {
        assert_eq!(BasicFeatures.past_participle("walk"), "walked");
        assert_eq!(BasicFeatures.past_participle("love"), "loved");
        assert_eq!(BasicFeatures.past_participle("cry"), "cried");
        assert_eq!(BasicFeatures.past_participle("play"), "played");
        assert_eq!(BasicFeatures.past_participle("stop"), "stopped");
    }

    #[test]
    fn present_participles() {
        assert_eq!(BasicFeatures.present_participle("walk"), "walking");
        assert_eq!(BasicFeatures.present_participle("make"), "making");
        assert_eq!(BasicFeatures.present_participle("lie"), "lying");
        assert_eq!(BasicFeatures.present_participle("run"), "running");
        assert_eq!(BasicFeatures.present_participle("see"), "seeing");
    }

    #[test]
    fn conjugate_third_person_singular() {
        let third = Conjugation {
            number: Number::Singular,
            person: Person::Third,
            tense: Tense::Present,
        };
        assert_eq!(BasicFeatures.conjugate("walk", &third), "walks");
        assert_eq!(BasicFeatures.conjugate("watch", &third), "watches");
        assert_eq!(BasicFeatures.conjugate("carry", &third), "carries");
        assert_eq!(BasicFeatures.conjugate("be", &third), "is");
        assert_eq!(BasicFeatures.conjugate("walk", &Conjugation::default()), "walk");
    }

    #[test]
    fn syllables_by_vowel_group() {
        assert_eq!(BasicFeatures.syllables("cat"), "cat");
        assert_eq!(BasicFeatures.syllables("water"), "wa/ter");
        assert_eq!(BasicFeatures.syllables("make"), "make");
    }
}
