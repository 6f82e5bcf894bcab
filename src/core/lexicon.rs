//! Constraint-filtered word search over a pronunciation lexicon.
//!
//! The table maps each word to its pronunciation and part-of-speech tags.
//! Pronunciations separate phonemes with `-` and syllables with a space,
//! and mark stressed vowels with `1`, e.g. `"w-ao1 t-er"`.

use std::cell::Cell;
use std::collections::BTreeMap;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::features::{
    is_vowel, BasicFeatures, Conjugation, Number, Person, Tense, WordFeatures, PHONEME_BOUNDARY,
    STRESSED, SYLLABLE_BOUNDARY,
};
use crate::core::random::RandomSource;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("this operation requires a lexicon; load one with Lexicon::from_json()")]
    NoLexicon,
    #[error("invalid lexicon data: {0}")]
    InvalidLexicon(#[from] serde_json::Error),
    #[error("no random word with specified options: {0}")]
    NoRandomWord(String),
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Nouns left out when a plural noun is requested.
const MASS_NOUNS: &[&str] = &[
    "abalone", "advice", "air", "anger", "applause", "asbestos", "bacon", "baggage", "barracks",
    "beef", "blood", "bravery", "chaos", "chess", "clay", "clothing", "coal", "corps", "cosmos",
    "deer", "dust", "education", "equipment", "evidence", "feedback", "fish", "fun", "furniture",
    "garbage", "gold", "gossip", "gravel", "guilt", "hardware", "health", "heat", "help",
    "homework", "honesty", "ice", "information", "jewelry", "justice", "knowledge", "luck",
    "luggage", "mail", "means", "milk", "money", "mud", "music", "news", "oxygen", "peace",
    "physics", "poetry", "police", "pride", "rice", "salmon", "series", "sheep", "software",
    "species", "steam", "steel", "stuff", "thunder", "traffic", "trash", "trousers", "tuna",
    "warmth", "weather", "wheat", "wisdom", "work",
];

static EMPTY: BTreeMap<String, LexEntry> = BTreeMap::new();

/// Pronunciation and part-of-speech tags for one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct LexEntry {
    pub phones: String,
    /// Space-separated tags, most likely first.
    pub pos: String,
}

impl From<(String, String)> for LexEntry {
    fn from((phones, pos): (String, String)) -> Self {
        Self { phones, pos }
    }
}

impl From<LexEntry> for (String, String) {
    fn from(entry: LexEntry) -> Self {
        (entry.phones, entry.pos)
    }
}

impl LexEntry {
    pub fn syllable_count(&self) -> usize {
        self.phones.split(' ').count()
    }

    /// Phonemes with stress marks removed, e.g. `"w-ao-t-er"`.
    pub fn phones(&self) -> String {
        self.phones.replace(['0', '1'], "").replace(' ', PHONEME_BOUNDARY)
    }

    /// One `1`/`0` per syllable, e.g. `"1/0"`.
    pub fn stresses(&self) -> String {
        self.phones
            .split(' ')
            .map(|syl| if syl.contains(STRESSED) { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(SYLLABLE_BOUNDARY)
    }

    fn first_pos(&self) -> &str {
        self.pos.split(' ').next().unwrap_or("")
    }
}

/// What [`Lexicon::search`] matches its pattern against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchType {
    #[default]
    Word,
    Phones,
    Stresses,
}

/// Filters shared by every lexicon query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Shortest word accepted; 3 when unset (4 for `random_word`).
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub num_syllables: Option<usize>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Smallest edit distance counted as similar.
    pub min_distance: usize,
    /// Penn tag such as `nns` or `vbz`; `n`, `v`, `r` and `a` are shorthands.
    pub pos: Option<String>,
    pub search_type: SearchType,
    /// `sounds_like` also requires spelling similarity.
    pub match_spelling: bool,
    pub silent: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            min_length: None,
            max_length: None,
            num_syllables: None,
            limit: None,
            min_distance: 1,
            pos: None,
            search_type: SearchType::Word,
            match_spelling: false,
            silent: false,
        }
    }
}

/// Options resolved against their defaults.
#[derive(Debug)]
struct Criteria {
    min_length: usize,
    max_length: usize,
    num_syllables: Option<usize>,
    limit: usize,
    min_distance: usize,
    target_pos: Option<String>,
    pluralize: bool,
    conjugate: bool,
}

impl Criteria {
    fn parse(opts: &SearchOptions, default_min_length: usize) -> Self {
        let mut criteria = Criteria {
            min_length: opts.min_length.unwrap_or(default_min_length),
            max_length: opts.max_length.unwrap_or(usize::MAX),
            num_syllables: opts.num_syllables.filter(|&n| n > 0),
            limit: opts.limit.unwrap_or(usize::MAX),
            min_distance: opts.min_distance.max(1),
            target_pos: None,
            pluralize: false,
            conjugate: false,
        };

        if let Some(pos) = opts.pos.as_deref().filter(|p| !p.is_empty()) {
            criteria.pluralize = pos == "nns";
            criteria.conjugate = pos.starts_with('v') && pos.len() > 2;
            let target = match pos {
                p if p.starts_with('n') => "nn",
                p if p.starts_with('v') => "vb",
                "r" => "rb",
                "a" => "jj",
                p => p,
            };
            criteria.target_pos = Some(target.to_string());
        }
        criteria
    }

    fn accepts(&self, word: &str, entry: &LexEntry) -> bool {
        let len = word.chars().count();
        if len < self.min_length || len > self.max_length {
            return false;
        }
        match self.num_syllables {
            Some(n) => entry.syllable_count() == n,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Similarity {
    Letter,
    Sound,
}

/// A word table with rhyme, alliteration, similarity and pattern queries.
pub struct Lexicon {
    data: Option<BTreeMap<String, LexEntry>>,
    features: Box<dyn WordFeatures>,
    fatal: bool,
    warned: Cell<bool>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexicon {
    /// A lexicon with no table loaded. Queries fail with
    /// [`LexiconError::NoLexicon`] until data is provided, unless
    /// [`Lexicon::fatal`] is turned off.
    pub fn new() -> Self {
        Self {
            data: None,
            features: Box::new(BasicFeatures),
            fatal: true,
            warned: Cell::new(false),
        }
    }

    /// Parse a JSON object of `word: [phones, pos]`.
    pub fn from_json(input: &str) -> Result<Self, LexiconError> {
        let data: BTreeMap<String, LexEntry> = serde_json::from_str(input)?;
        Ok(Self::new().with_data(data))
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, LexEntry)>,
        K: Into<String>,
    {
        Self::new().with_data(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn with_data(mut self, data: BTreeMap<String, LexEntry>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_features<F: WordFeatures + 'static>(mut self, features: F) -> Self {
        self.features = Box::new(features);
        self
    }

    /// Whether queries on a lexicon without data are errors (the default)
    /// or empty results with a one-time warning.
    pub fn fatal(mut self, fatal: bool) -> Self {
        self.fatal = fatal;
        self
    }

    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, BTreeMap::len)
    }

    pub fn has_word(&self, word: &str) -> bool {
        !word.is_empty() && self.dict(false).map_or(false, |d| d.contains_key(&word.to_lowercase()))
    }

    pub fn lookup(&self, word: &str) -> Option<&LexEntry> {
        self.data.as_ref()?.get(&word.to_lowercase())
    }

    /// Words whose pronunciation ends like `word`'s from its last stressed
    /// vowel on.
    pub fn rhymes(&self, word: &str, opts: &SearchOptions) -> Result<Vec<String>, LexiconError> {
        let dict = self.dict(self.fatal)?;
        let criteria = Criteria::parse(opts, 3);
        let word = word.to_lowercase();
        let phone = match self.last_stressed_phone_to_end(&word) {
            Some(phone) => phone,
            None => return Ok(Vec::new()),
        };

        let mut result = Vec::new();
        for (candidate, entry) in dict {
            if *candidate == word || !criteria.accepts(candidate, entry) {
                continue;
            }
            if entry.phones.ends_with(phone) {
                result.push(candidate.clone());
            }
            if result.len() == criteria.limit {
                break;
            }
        }
        Ok(result)
    }

    /// Words sharing the first consonant phoneme of `word`'s first stressed
    /// syllable. Words starting with a vowel have no alliterations.
    pub fn alliterations(&self, word: &str, opts: &SearchOptions) -> Result<Vec<String>, LexiconError> {
        let dict = self.dict(self.fatal)?;
        let criteria = Criteria::parse(opts, 3);
        let word = word.to_lowercase();

        if word.chars().next().map_or(true, is_vowel) {
            if !opts.silent {
                log::warn!("expects a word starting with a consonant, got: '{}'", word);
            }
            return Ok(Vec::new());
        }

        let phone = match self.first_stressed_syl(&word).and_then(first_phone) {
            Some(phone) => phone,
            None => {
                if !opts.silent {
                    log::warn!("failed parsing first phone in '{}'", word);
                }
                return Ok(Vec::new());
            }
        };

        let mut result = Vec::new();
        for (candidate, entry) in dict {
            if *candidate == word || !criteria.accepts(candidate, entry) {
                continue;
            }
            if first_stressed_syl_of(&entry.phones).and_then(first_phone) == Some(phone) {
                result.push(candidate.clone());
            }
            if result.len() == criteria.limit {
                break;
            }
        }
        Ok(result)
    }

    /// Words at the smallest phoneme edit distance from `word`.
    pub fn sounds_like(&self, word: &str, opts: &SearchOptions) -> Result<Vec<String>, LexiconError> {
        if word.is_empty() {
            return Ok(Vec::new());
        }
        if !opts.match_spelling {
            return self.similar_by_type(word, opts, Similarity::Sound);
        }

        let unlimited = SearchOptions {
            limit: None,
            ..opts.clone()
        };
        let by_letter = self.similar_by_type(word, &unlimited, Similarity::Letter)?;
        if by_letter.is_empty() {
            return Ok(by_letter);
        }
        let by_sound = self.similar_by_type(word, &unlimited, Similarity::Sound)?;
        Ok(by_sound
            .into_iter()
            .filter(|w| by_letter.contains(w))
            .take(opts.limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// Words at the smallest letter edit distance from `word`.
    pub fn spells_like(&self, word: &str, opts: &SearchOptions) -> Result<Vec<String>, LexiconError> {
        if word.is_empty() {
            return Ok(Vec::new());
        }
        self.similar_by_type(word, opts, Similarity::Letter)
    }

    /// Words (or their phones or stresses, per `search_type`) matching a
    /// regular expression. A bare stress string such as `"010"` is expanded
    /// to `"0/1/0"`.
    pub fn search(&self, pattern: &str, opts: &SearchOptions) -> Result<Vec<String>, LexiconError> {
        let dict = self.dict(self.fatal)?;
        let criteria = Criteria::parse(opts, 3);

        let pattern = if opts.search_type == SearchType::Stresses
            && !pattern.is_empty()
            && pattern.chars().all(|c| c == '0' || c == '1')
        {
            pattern.chars().map(String::from).collect::<Vec<_>>().join(SYLLABLE_BOUNDARY)
        } else {
            pattern.to_string()
        };
        let regex = Regex::new(&pattern)?;

        let mut result = Vec::new();
        for (word, entry) in dict {
            if !criteria.accepts(word, entry) {
                continue;
            }
            let matched = match opts.search_type {
                SearchType::Word => regex.is_match(word),
                SearchType::Phones => regex.is_match(&entry.phones()),
                SearchType::Stresses => regex.is_match(&entry.stresses()),
            };
            if matched {
                result.push(word.clone());
            }
            if result.len() == criteria.limit {
                break;
            }
        }
        Ok(result)
    }

    /// A random word meeting the criteria. With `pos`, the word's primary
    /// tag must match; `nns` pluralizes and verb tags conjugate the result.
    pub fn random_word<R: Rng + ?Sized>(&self, opts: &SearchOptions, rng: &mut R) -> Result<String, LexiconError> {
        let dict = self.dict(self.fatal)?;
        let criteria = Criteria::parse(opts, 4);
        let words: Vec<(&String, &LexEntry)> = dict.iter().collect();
        let start = rng.rand_int(words.len());

        for k in 0..words.len() {
            let (word, entry) = words[(start + k) % words.len()];
            if !criteria.accepts(word, entry) {
                continue;
            }
            let target = match criteria.target_pos.as_deref() {
                Some(target) => target,
                None => return Ok(word.clone()),
            };
            if entry.first_pos() != target {
                continue;
            }

            let mut result = word.clone();
            if criteria.pluralize {
                if is_mass_noun(word, &entry.pos) {
                    continue;
                }
                result = self.features.pluralize(word);
            }
            if criteria.conjugate {
                result = self.reconjugate(word, opts.pos.as_deref().unwrap_or_default());
            }

            // Inflection must not change the syllable count
            if let Some(n) = criteria.num_syllables {
                if result != *word && self.features.syllables(&result).split(SYLLABLE_BOUNDARY).count() != n {
                    continue;
                }
            }
            return Ok(result);
        }

        Err(LexiconError::NoRandomWord(format!("{:?}", opts)))
    }

    pub fn is_rhyme(&self, word1: &str, word2: &str) -> Result<bool, LexiconError> {
        if word1.is_empty() || word2.is_empty() || word1.eq_ignore_ascii_case(word2) {
            return Ok(false);
        }
        self.dict(self.fatal)?;
        if self.raw_phones(word1) == self.raw_phones(word2) {
            return Ok(false);
        }
        let p1 = self.last_stressed_vowel_phoneme_to_end(word1);
        let p2 = self.last_stressed_vowel_phoneme_to_end(word2);
        Ok(matches!((p1, p2), (Some(a), Some(b)) if a == b))
    }

    pub fn is_alliteration(&self, word1: &str, word2: &str) -> Result<bool, LexiconError> {
        self.dict(self.fatal)?;
        if word1.is_empty() || word2.is_empty() {
            return Ok(false);
        }
        let c1 = self.first_stressed_syl(word1).and_then(first_phone);
        let c2 = self.first_stressed_syl(word2).and_then(first_phone);
        Ok(match (c1, c2) {
            (Some(a), Some(b)) => !starts_with_vowel(a) && !starts_with_vowel(b) && a == b,
            _ => false,
        })
    }

    fn dict(&self, fatal: bool) -> Result<&BTreeMap<String, LexEntry>, LexiconError> {
        match &self.data {
            Some(data) => Ok(data),
            None if fatal => Err(LexiconError::NoLexicon),
            None => {
                if !self.warned.replace(true) {
                    log::warn!("no lexicon appears to be loaded; word queries will return no results");
                }
                Ok(&EMPTY)
            }
        }
    }

    fn similar_by_type(&self, word: &str, opts: &SearchOptions, kind: Similarity) -> Result<Vec<String>, LexiconError> {
        let dict = self.dict(self.fatal)?;
        let criteria = Criteria::parse(opts, 3);
        let input = word.to_lowercase();
        let variations = [input.clone(), format!("{}s", input), format!("{}es", input)];

        let source: Vec<String> = match kind {
            Similarity::Sound => match self.raw_phones(&input) {
                Some(raw) => to_phone_array(raw),
                None => return Ok(Vec::new()),
            },
            Similarity::Letter => input.chars().map(String::from).collect(),
        };

        let mut result: Vec<String> = Vec::new();
        let mut min_val = usize::MAX;
        for (candidate, entry) in dict {
            if !criteria.accepts(candidate, entry) || variations.contains(candidate) {
                continue;
            }
            let target: Vec<String> = match kind {
                Similarity::Sound => to_phone_array(&entry.phones),
                Similarity::Letter => candidate.chars().map(String::from).collect(),
            };
            let med = min_edit_dist(&source, &target);

            if med >= criteria.min_distance && med < min_val {
                min_val = med;
                result = vec![candidate.clone()];
            } else if med == min_val {
                result.push(candidate.clone());
            }
            if result.len() == criteria.limit {
                break;
            }
        }
        Ok(result)
    }

    fn reconjugate(&self, word: &str, pos: &str) -> String {
        match pos {
            "vbd" => self.features.conjugate(
                word,
                &Conjugation {
                    number: Number::Singular,
                    person: Person::First,
                    tense: Tense::Past,
                },
            ),
            "vbg" => self.features.present_participle(word),
            "vbn" => self.features.past_participle(word),
            "vbz" => self.features.conjugate(
                word,
                &Conjugation {
                    number: Number::Singular,
                    person: Person::Third,
                    tense: Tense::Present,
                },
            ),
            _ => self.features.conjugate(word, &Conjugation::default()),
        }
    }

    fn raw_phones(&self, word: &str) -> Option<&str> {
        self.lookup(word).map(|e| e.phones.as_str())
    }

    /// From the start of the phoneme holding the last stress to the end.
    fn last_stressed_phone_to_end(&self, word: &str) -> Option<&str> {
        let raw = self.raw_phones(word)?;
        let start = match raw.rfind(STRESSED) {
            Some(idx) => raw[..idx].rfind(['-', ' ']).map_or(0, |b| b + 1),
            None => 0,
        };
        Some(&raw[start..])
    }

    /// Last syllable of the stressed tail, from its first vowel on.
    fn last_stressed_vowel_phoneme_to_end<'a>(&'a self, word: &str) -> Option<&'a str> {
        let tail = self.last_stressed_phone_to_end(word)?;
        let last = tail.rsplit(' ').next()?;
        let start = last.find(is_vowel).unwrap_or(0);
        Some(&last[start..])
    }

    fn first_stressed_syl(&self, word: &str) -> Option<&str> {
        first_stressed_syl_of(self.raw_phones(word)?)
    }
}

fn first_stressed_syl_of(raw: &str) -> Option<&str> {
    let idx = raw.find(STRESSED)?;
    let start = raw[..idx].rfind(' ').map_or(0, |b| b + 1);
    let rest = &raw[start..];
    Some(rest.split(' ').next().unwrap_or(rest))
}

fn first_phone(syllable: &str) -> Option<&str> {
    syllable.split(PHONEME_BOUNDARY).next().filter(|p| !p.is_empty())
}

fn starts_with_vowel(phone: &str) -> bool {
    phone.chars().next().map_or(false, is_vowel)
}

fn to_phone_array(raw: &str) -> Vec<String> {
    raw.replace(['0', '1'], "")
        .replace(' ', PHONEME_BOUNDARY)
        .split(PHONEME_BOUNDARY)
        .map(str::to_string)
        .collect()
}

fn is_mass_noun(word: &str, pos: &str) -> bool {
    word.ends_with("ness")
        || word.ends_with("ism")
        || pos.find("vbg").map_or(false, |i| i > 0)
        || MASS_NOUNS.contains(&word)
}

/// Levenshtein distance over any comparable sequence: letters of a word or
/// phonemes of a pronunciation.
pub fn min_edit_dist<T: PartialEq>(source: &[T], target: &[T]) -> usize {
    let mut prev: Vec<usize> = (0..=target.len()).collect();
    let mut curr = vec![0; target.len() + 1];

    for (i, s) in source.iter().enumerate() {
        curr[0] = i + 1;
        for (j, t) in target.iter().enumerate() {
            let cost = if s == t { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[target.len()]
}
