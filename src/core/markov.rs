//! N-gram Markov model over a token trie: training, probability queries, and generation.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::random::RandomSource;
use crate::core::tokenizer::{is_sentence_end, SimpleTokenizer, Tokenizer};

#[derive(Debug, Error)]
pub enum MarkovError {
    #[error("n-gram order must be at least 1, got {0}")]
    InvalidOrder(usize),
    #[error("no sentence start found; load text with load_sentences() or load_text() before generating sentences")]
    NoSentenceStart,
    #[error("cannot find start token(s): {0:?}")]
    StartTokensNotFound(Vec<String>),
    #[error("{0}")]
    Constraint(String),
    #[error("failed after {attempts} tries; you may need to {hint}")]
    Exhausted { attempts: usize, hint: String },
}

/// Special token marking a sentence start in the trie.
pub const SENTENCE_START: &str = "<s/>";
/// Restarts allowed before a generator gives up.
pub const MAX_GENERATION_ATTEMPTS: usize = 999;

const ROOT: usize = 0;

/// Generation constraints shared by the token and sentence generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Minimum tokens in a sentence (or before `generate_until` starts matching).
    pub min_length: usize,
    /// Maximum tokens in a sentence (or in a `generate_until` result).
    pub max_length: usize,
    /// Tokens the output must begin with.
    pub start_tokens: Option<Vec<String>>,
    /// When set, no `max_length_match + 1` consecutive output tokens may
    /// appear verbatim in the training input.
    pub max_length_match: Option<usize>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            min_length: 5,
            max_length: 35,
            start_tokens: None,
            max_length_match: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    token: String,
    parent: Option<usize>,
    /// Child ids in insertion order.
    children: Vec<usize>,
    index: FxHashMap<String, usize>,
    count: u32,
}

impl Node {
    fn new(token: &str, parent: Option<usize>) -> Self {
        Self {
            token: token.to_string(),
            parent,
            children: Vec::new(),
            index: FxHashMap::default(),
            count: 0,
        }
    }
}

/// An order-`n` Markov model storing every token window of length `n` or less
/// in a counted prefix trie.
pub struct Markov {
    n: usize,
    nodes: Vec<Node>,
    input: Vec<String>,
    tokenizer: Box<dyn Tokenizer>,
}

impl Markov {
    pub fn new(n: usize) -> Result<Markov, MarkovError> {
        if n < 1 {
            return Err(MarkovError::InvalidOrder(n));
        }
        Ok(Markov {
            n,
            nodes: vec![Node::new("ROOT", None)],
            input: Vec::new(),
            tokenizer: Box::new(SimpleTokenizer),
        })
    }

    /// Replace the tokenizer used by `load_sentences`, `load_text` and
    /// sentence output.
    pub fn with_tokenizer<T: Tokenizer + 'static>(mut self, tokenizer: T) -> Self {
        self.tokenizer = Box::new(tokenizer);
        self
    }

    pub fn n(&self) -> usize {
        self.n
    }

    /// Training tokens in load order, without sentence markers.
    pub fn input(&self) -> &[String] {
        &self.input
    }

    /// Total count of root-level tokens.
    pub fn size(&self) -> usize {
        self.child_count(ROOT) as usize
    }

    pub fn load_tokens(&mut self, tokens: &[String]) -> &mut Self {
        self.treeify(tokens);
        self.input.extend_from_slice(tokens);
        self
    }

    /// Load pre-split sentences, marking the start of each one.
    pub fn load_sentences<S: AsRef<str>>(&mut self, sentences: &[S]) -> &mut Self {
        let mut tokens = Vec::new();
        for sentence in sentences {
            let normalized = sentence.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
            let words = self.tokenizer.tokenize(&normalized);
            if words.is_empty() {
                continue;
            }
            tokens.push(SENTENCE_START.to_string());
            tokens.extend(words);
        }

        self.treeify(&tokens);
        self.input.extend(tokens.into_iter().filter(|t| t != SENTENCE_START));
        self
    }

    /// Split raw text into sentences, then load them.
    pub fn load_text(&mut self, text: &str) -> &mut Self {
        let sentences = self.tokenizer.sentences(text);
        self.load_sentences(&sentences)
    }

    /// Next-token probabilities after `path`. Only the last `n - 1` tokens
    /// are consulted; unknown contexts give an empty map.
    pub fn probabilities<S: AsRef<str>>(&self, path: &[S]) -> BTreeMap<String, f64> {
        let mut probs = BTreeMap::new();
        if let Some(node) = self.search(path) {
            for &child in &self.nodes[node].children {
                if self.nodes[child].token != SENTENCE_START {
                    probs.insert(self.nodes[child].token.clone(), self.node_prob(child));
                }
            }
        }
        probs
    }

    /// Probability of the last token of `path` given the tokens before it
    /// (at most `n` tokens are used). A single token gives its root-level
    /// frequency; an unseen path gives 0.
    pub fn probability<S: AsRef<str>>(&self, path: &[S]) -> f64 {
        let start = path.len().saturating_sub(self.n);
        self.walk(&path[start..])
            .map(|node| self.node_prob(node))
            .unwrap_or(0.0)
    }

    /// Candidate next tokens after `pre`.
    ///
    /// Without `post`, every known continuation ordered by descending
    /// probability. With `post`, the tokens `c` for which `pre + c + post`
    /// is a path in the model; `pre.len() + post.len()` must be below `n`.
    pub fn completions<S: AsRef<str>>(&self, pre: &[S], post: Option<&[S]>) -> Result<Vec<String>, MarkovError> {
        let post = match post {
            Some(post) => post,
            None => {
                let mut ranked: Vec<(String, f64)> = self.probabilities(pre).into_iter().collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
                return Ok(ranked.into_iter().map(|(token, _)| token).collect());
            }
        };

        if pre.len() + post.len() >= self.n {
            return Err(MarkovError::Constraint(format!(
                "sum of pre.len() and post.len() must be < n ({}), was {}",
                self.n,
                pre.len() + post.len()
            )));
        }

        let parent = match self.walk(pre) {
            Some(node) => node,
            None => return Ok(Vec::new()),
        };

        let mut result = Vec::new();
        for &child in &self.nodes[parent].children {
            let token = &self.nodes[child].token;
            if token == SENTENCE_START {
                continue;
            }
            let mut test: Vec<&str> = pre.iter().map(AsRef::as_ref).collect();
            test.push(token);
            test.extend(post.iter().map(AsRef::as_ref));
            if self.walk(&test).is_some() {
                result.push(token.clone());
            }
        }
        Ok(result)
    }

    /// Generate exactly `num` tokens.
    ///
    /// Any dead end discards the sequence and restarts it; after
    /// [`MAX_GENERATION_ATTEMPTS`] restarts this fails with
    /// [`MarkovError::Exhausted`].
    pub fn generate_tokens<R: Rng + ?Sized>(
        &self,
        num: usize,
        options: &GenerateOptions,
        rng: &mut R,
    ) -> Result<Vec<String>, MarkovError> {
        if num == 0 {
            return Ok(Vec::new());
        }
        if let Some(start) = &options.start_tokens {
            if start.len() > num {
                return Err(MarkovError::Constraint(format!(
                    "{} start tokens cannot fit in {} generated tokens",
                    start.len(),
                    num
                )));
            }
        }

        let mlm = options.max_length_match;
        let mut tokens: Vec<String> = Vec::new();
        let mut tries = 0;

        while tries < MAX_GENERATION_ATTEMPTS {
            if tokens.is_empty() {
                tokens = self.init_tokens(options.start_tokens.as_deref(), rng)?;
            }
            if tokens.len() >= num {
                return Ok(tokens);
            }

            match self.extend(&tokens, mlm, rng) {
                Some(next) => tokens.push(next),
                None => {
                    tokens.clear();
                    tries += 1;
                }
            }
        }

        Err(self.exhausted(tries, mlm))
    }

    /// Generate `num` distinct well-formed sentences.
    ///
    /// A sentence must start with an uppercase letter, end in `.`, `!` or
    /// `?`, and fall within `min_length..=max_length` tokens. Failed
    /// candidates restart only the sentence being built; the attempt budget
    /// covers the whole call.
    pub fn generate_sentences<R: Rng + ?Sized>(
        &self,
        num: usize,
        options: &GenerateOptions,
        rng: &mut R,
    ) -> Result<Vec<String>, MarkovError> {
        let sentinel = self.child(ROOT, SENTENCE_START).ok_or(MarkovError::NoSentenceStart)?;
        let mlm = options.max_length_match;

        let mut result: Vec<String> = Vec::new();
        let mut tries = 0;

        while result.len() < num {
            let mut tokens = self.init_sentence(sentinel, options.start_tokens.as_deref(), rng)?;
            let mut accepted = false;

            while tokens.len() < options.max_length {
                let next = match self.extend(&tokens, mlm, rng) {
                    Some(next) => next,
                    None => break,
                };
                let ends = is_sentence_end(&next);
                tokens.push(next);
                if ends {
                    if tokens.len() >= options.min_length {
                        if let Some(sentence) = self.validate_sentence(&result, &tokens) {
                            result.push(sentence);
                            accepted = true;
                        }
                    }
                    break;
                }
            }

            if !accepted {
                tries += 1;
                if tries >= MAX_GENERATION_ATTEMPTS {
                    log::debug!("gave up with {} of {} sentences", result.len(), num);
                    return Err(self.exhausted(tries, mlm));
                }
            }
        }
        Ok(result)
    }

    pub fn generate_sentence<R: Rng + ?Sized>(&self, options: &GenerateOptions, rng: &mut R) -> Result<String, MarkovError> {
        let mut sentences = self.generate_sentences(1, options, rng)?;
        sentences
            .pop()
            .ok_or_else(|| self.exhausted(MAX_GENERATION_ATTEMPTS, options.max_length_match))
    }

    /// Generate `min_length` tokens, then extend one token at a time until
    /// a new token matches `pattern`. Passing `max_length` restarts.
    pub fn generate_until<R: Rng + ?Sized>(
        &self,
        pattern: &Regex,
        options: &GenerateOptions,
        rng: &mut R,
    ) -> Result<Vec<String>, MarkovError> {
        let seed = GenerateOptions {
            start_tokens: options.start_tokens.clone(),
            max_length_match: None,
            ..GenerateOptions::default()
        };
        let mlm = options.max_length_match;
        let seed_len = options
            .min_length
            .max(1)
            .max(options.start_tokens.as_ref().map_or(0, Vec::len));
        let mut tries = 0;

        'attempt: while tries < MAX_GENERATION_ATTEMPTS {
            tries += 1;
            let mut tokens = self.generate_tokens(seed_len, &seed, rng)?;

            while tokens.len() < options.max_length {
                let next = match self.extend(&tokens, mlm, rng) {
                    Some(next) => next,
                    None => continue 'attempt,
                };
                let matched = pattern.is_match(&next);
                tokens.push(next);
                if matched {
                    return Ok(tokens);
                }
            }
        }

        Err(self.exhausted(tries, mlm))
    }

    /// Trie node for the last `n - 1` tokens of `path`; the root for an
    /// empty path or a unigram model.
    fn search<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        if path.is_empty() || self.n < 2 {
            return Some(ROOT);
        }
        let start = path.len().saturating_sub(self.n - 1);
        self.walk(&path[start..])
    }

    /// Follow `path` from the root.
    fn walk<S: AsRef<str>>(&self, path: &[S]) -> Option<usize> {
        path.iter()
            .try_fold(ROOT, |node, token| self.child(node, token.as_ref()))
    }

    fn child(&self, node: usize, token: &str) -> Option<usize> {
        self.nodes[node].index.get(token).copied()
    }

    fn add_child(&mut self, parent: usize, token: &str) -> usize {
        let id = match self.child(parent, token) {
            Some(id) => id,
            None => {
                let id = self.nodes.len();
                self.nodes.push(Node::new(token, Some(parent)));
                let node = &mut self.nodes[parent];
                node.children.push(id);
                node.index.insert(token.to_string(), id);
                id
            }
        };
        self.nodes[id].count += 1;
        id
    }

    fn treeify(&mut self, tokens: &[String]) {
        for i in 0..tokens.len() {
            let end = (i + self.n).min(tokens.len());
            let mut node = ROOT;
            for token in &tokens[i..end] {
                node = self.add_child(node, token);
            }
        }
    }

    /// Sum of child counts, ignoring sentence markers.
    fn child_count(&self, node: usize) -> u32 {
        self.nodes[node]
            .children
            .iter()
            .map(|&c| &self.nodes[c])
            .filter(|c| c.token != SENTENCE_START)
            .map(|c| c.count)
            .sum()
    }

    fn node_prob(&self, node: usize) -> f64 {
        match self.nodes[node].parent {
            Some(parent) => {
                let total = self.child_count(parent);
                if total == 0 {
                    0.0
                } else {
                    self.nodes[node].count as f64 / total as f64
                }
            }
            None => 0.0,
        }
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.nodes[node].children.is_empty()
    }

    /// Weighted pick among the children of `node`; a sentence marker is
    /// replaced by a pick among its own children.
    fn weighted_child<R: Rng + ?Sized>(&self, candidates: &[usize], rng: &mut R) -> Option<usize> {
        let weights: Vec<f64> = candidates.iter().map(|&c| self.nodes[c].count as f64).collect();
        let pick = candidates[rng.weighted_index(&weights)?];
        if self.nodes[pick].token == SENTENCE_START {
            self.weighted_child(&self.nodes[pick].children, rng)
        } else {
            Some(pick)
        }
    }

    /// Choose the token following `parent`, rejecting candidates that
    /// would copy more than `max_length_match` tokens from the input.
    fn select_next<R: Rng + ?Sized>(
        &self,
        parent: usize,
        history: &[String],
        max_length_match: Option<usize>,
        rng: &mut R,
    ) -> Option<String> {
        let mut remaining = self.nodes[parent].children.clone();

        while !remaining.is_empty() {
            let pick = match self.weighted_child(&remaining, rng) {
                Some(pick) => pick,
                None => return None,
            };
            let token = &self.nodes[pick].token;

            match max_length_match {
                Some(mlm) if history.len() >= mlm => {
                    let mut window: Vec<&str> = history[history.len() - mlm..].iter().map(String::as_str).collect();
                    window.push(token);
                    if !contains_run(&self.input, &window) {
                        return Some(token.clone());
                    }
                    log::trace!("rejecting '{}': copies {:?} from input", token, window);
                    // a marker's pick is not in `remaining`; drop the marker itself
                    let reached = self.nodes[pick].parent.filter(|&p| p != parent).unwrap_or(pick);
                    remaining.retain(|&c| c != reached && c != pick);
                }
                _ => return Some(token.clone()),
            }
        }
        None
    }

    fn extend<R: Rng + ?Sized>(&self, tokens: &[String], mlm: Option<usize>, rng: &mut R) -> Option<String> {
        let parent = self.search(tokens)?;
        if self.is_leaf(parent) {
            return None;
        }
        self.select_next(parent, tokens, mlm, rng)
    }

    fn init_tokens<R: Rng + ?Sized>(&self, start: Option<&[String]>, rng: &mut R) -> Result<Vec<String>, MarkovError> {
        match start {
            Some(start) if !start.is_empty() => {
                if self.search(start).is_none() {
                    return Err(MarkovError::StartTokensNotFound(start.to_vec()));
                }
                Ok(start.to_vec())
            }
            _ => Ok(self
                .weighted_child(&self.nodes[ROOT].children, rng)
                .map(|node| vec![self.nodes[node].token.clone()])
                .unwrap_or_default()),
        }
    }

    fn init_sentence<R: Rng + ?Sized>(
        &self,
        sentinel: usize,
        start: Option<&[String]>,
        rng: &mut R,
    ) -> Result<Vec<String>, MarkovError> {
        match start {
            Some(start) if !start.is_empty() => self.init_tokens(Some(start), rng),
            _ => self
                .weighted_child(&self.nodes[sentinel].children, rng)
                .map(|node| vec![self.nodes[node].token.clone()])
                .ok_or(MarkovError::NoSentenceStart),
        }
    }

    fn validate_sentence(&self, result: &[String], tokens: &[String]) -> Option<String> {
        let sentence = self.tokenizer.untokenize(tokens);
        let first = sentence.chars().next()?;
        if !first.is_uppercase() {
            log::trace!("skipping: bad first char in '{}'", sentence);
            return None;
        }
        if !sentence.ends_with(['.', '!', '?']) {
            return None;
        }
        if result.contains(&sentence) {
            log::debug!("skipping: duplicate sentence '{}'", sentence);
            return None;
        }
        Some(sentence)
    }

    fn exhausted(&self, attempts: usize, mlm: Option<usize>) -> MarkovError {
        let hint = if mlm.is_some() {
            "add more text to the model or increase the max_length_match parameter"
        } else {
            "add more text to the model or adjust options"
        };
        MarkovError::Exhausted {
            attempts,
            hint: hint.to_string(),
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, node: usize, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for &child in &self.nodes[node].children {
            let c = &self.nodes[child];
            write!(f, "\n{}'{}' [{},p={:.3}]", indent, c.token.escape_debug(), c.count, self.node_prob(child))?;
            if !c.children.is_empty() {
                write!(f, " {{")?;
                self.write_tree(f, child, depth + 1)?;
                write!(f, "\n{}}}", indent)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Markov {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root {{")?;
        self.write_tree(f, ROOT, 1)?;
        write!(f, "\n}}")
    }
}

impl fmt::Debug for Markov {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Markov")
            .field("n", &self.n)
            .field("nodes", &self.nodes.len())
            .field("input", &self.input.len())
            .finish()
    }
}

/// True when `find` occurs as a contiguous run in `haystack`.
fn contains_run(haystack: &[String], find: &[&str]) -> bool {
    !find.is_empty()
        && haystack
            .windows(find.len())
            .any(|w| w.iter().zip(find).all(|(a, b)| a == b))
}
