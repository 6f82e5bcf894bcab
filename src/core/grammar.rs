//! Weighted context-free grammar expander.
//!
//! Rules map a name to weighted alternative productions. A production refers
//! to another rule simply by containing its name; expansion repeatedly
//! rewrites the first rule name found in the working text.

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::core::random::RandomSource;

/// Rule expanded by [`Grammar::expand`].
pub const START_RULE: &str = "<start>";
/// Rewrite steps before expansion gives up and returns the text as-is.
pub const MAX_ITERATIONS: usize = 1000;
/// Weight of a production without a `[w]` suffix.
pub const DEFAULT_WEIGHT: f64 = 1.0;

lazy_static! {
    static ref OR_PATT: Regex = Regex::new(r"\s*\|\s*").unwrap();
    static ref PROB_PATT: Regex = Regex::new(r"^(.*[^\s])\s*\[([0-9.]+)\](.*)$").unwrap();
    static ref DEC_ENTITY: Regex = Regex::new(r"&#(\d+);").unwrap();
    static ref HEX_ENTITY: Regex = Regex::new(r"(?i)&#x([0-9a-f]+);").unwrap();
}

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("grammar appears to be invalid JSON, please validate it (e.g. at https://jsonlint.com): {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("grammar must be an object mapping rule names to a string or an array of strings ({0})")]
    InvalidRuleSet(String),
    #[error("invalid weight '{weight}' in production '{production}'")]
    InvalidWeight { production: String, weight: String },
    #[error("no grammar rules found")]
    NoRules,
    #[error("rule not found: {0}")]
    RuleNotFound(String),
}

/// Expansion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarOptions {
    pub start_rule: String,
    pub max_iterations: usize,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            start_rule: START_RULE.to_string(),
            max_iterations: MAX_ITERATIONS,
        }
    }
}

/// A weighted alternative within a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub text: String,
    pub weight: f64,
}

/// A named rule with its alternatives in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarRule {
    pub name: String,
    pub productions: Vec<Production>,
}

/// A set of named rules, scanned in insertion order during expansion.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: Vec<GrammarRule>,
    index: FxHashMap<String, usize>,
    options: GrammarOptions,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: GrammarOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse a grammar from a JSON object of `name: string | [string]`.
    pub fn from_json(input: &str) -> Result<Grammar, GrammarError> {
        let mut grammar = Grammar::new();
        grammar.load_json(input)?;
        Ok(grammar)
    }

    /// Build a grammar from `(name, rule)` pairs, where each rule is
    /// `|`-delimited text as accepted by [`Grammar::add_rule`].
    pub fn from_map<I, K, V>(iter: I) -> Result<Grammar, GrammarError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut grammar = Grammar::new();
        for (name, rule) in iter {
            grammar.add_rule(name, rule.as_ref())?;
        }
        Ok(grammar)
    }

    /// Add every rule in a JSON object, keeping the key order of the source.
    pub fn load_json(&mut self, input: &str) -> Result<&mut Self, GrammarError> {
        let parsed: JsonValue = serde_json::from_str(input)?;
        let object = match parsed {
            JsonValue::Object(object) => object,
            other => return Err(GrammarError::InvalidRuleSet(format!("found {}", json_kind(&other)))),
        };

        for (name, value) in object {
            match value {
                JsonValue::String(rule) => {
                    self.add_rule(name, &rule)?;
                }
                JsonValue::Array(items) => {
                    let mut productions = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            JsonValue::String(s) => productions.push(s),
                            other => {
                                return Err(GrammarError::InvalidRuleSet(format!(
                                    "rule '{}' contains {}",
                                    name,
                                    json_kind(&other)
                                )))
                            }
                        }
                    }
                    self.add_productions(name, &productions, DEFAULT_WEIGHT)?;
                }
                other => {
                    return Err(GrammarError::InvalidRuleSet(format!(
                        "rule '{}' is {}",
                        name,
                        json_kind(&other)
                    )))
                }
            }
        }
        Ok(self)
    }

    /// Add `|`-delimited alternatives to a rule with the default weight.
    ///
    /// A trailing `[w]` on an alternative overrides its weight. Adding to an
    /// existing rule accumulates alternatives.
    pub fn add_rule<S: Into<String>>(&mut self, name: S, rule: &str) -> Result<&mut Self, GrammarError> {
        self.add_rule_weighted(name, rule, DEFAULT_WEIGHT)
    }

    /// Like [`Grammar::add_rule`], with an explicit default weight.
    pub fn add_rule_weighted<S: Into<String>>(
        &mut self,
        name: S,
        rule: &str,
        weight: f64,
    ) -> Result<&mut Self, GrammarError> {
        let alternatives: Vec<String> = OR_PATT.split(rule).map(str::to_string).collect();
        self.add_productions(name, &alternatives, weight)
    }

    /// Add already-split alternatives; each may still carry a `[w]` suffix.
    pub fn add_productions<S: Into<String>>(
        &mut self,
        name: S,
        alternatives: &[String],
        weight: f64,
    ) -> Result<&mut Self, GrammarError> {
        let name = name.into();
        check_weight(weight, &name, &weight.to_string())?;

        let mut parsed = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            parsed.push(parse_production(alternative, weight)?);
        }

        let slot = match self.index.get(&name) {
            Some(&slot) => slot,
            None => {
                self.rules.push(GrammarRule {
                    name: name.clone(),
                    productions: Vec::new(),
                });
                self.index.insert(name, self.rules.len() - 1);
                self.rules.len() - 1
            }
        };

        let productions = &mut self.rules[slot].productions;
        for production in parsed {
            // Re-adding identical text updates its weight in place
            match productions.iter_mut().find(|p| p.text == production.text) {
                Some(existing) => existing.weight = production.weight,
                None => productions.push(production),
            }
        }
        Ok(self)
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get_rule(&self, name: &str) -> Option<&GrammarRule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> impl Iterator<Item = &GrammarRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn remove_rule(&mut self, name: &str) -> &mut Self {
        if let Some(slot) = self.index.remove(name) {
            self.rules.remove(slot);
            for i in self.index.values_mut() {
                if *i > slot {
                    *i -= 1;
                }
            }
        }
        self
    }

    pub fn reset(&mut self) -> &mut Self {
        self.rules.clear();
        self.index.clear();
        self
    }

    /// Expand the configured start rule (`<start>` by default).
    pub fn expand<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, GrammarError> {
        self.expand_from(&self.options.start_rule, rng)
    }

    /// Expand from a named rule until no rule name remains in the text.
    ///
    /// Rule names are matched as plain substrings, first match in insertion
    /// order wins. Hitting the iteration cap returns the partial text with a
    /// warning rather than an error.
    pub fn expand_from<R: Rng + ?Sized>(&self, rule: &str, rng: &mut R) -> Result<String, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::NoRules);
        }
        if !self.has_rule(rule) {
            return Err(GrammarError::RuleNotFound(rule.to_string()));
        }

        let mut text = rule.to_string();
        for _ in 0..self.options.max_iterations {
            match self.expand_once(&text, rng) {
                Some(next) => text = next,
                None => return Ok(unescape_html(&text)),
            }
        }

        log::warn!(
            "max number of iterations reached ({}) expanding '{}'",
            self.options.max_iterations,
            rule
        );
        Ok(unescape_html(&text))
    }

    /// Rewrite the first rule-name occurrence, or `None` if nothing matched.
    fn expand_once<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Option<String> {
        self.rules.iter().find_map(|rule| {
            let idx = text.find(&rule.name)?;
            let expanded = self.do_rule(rule, rng);
            let mut next = String::with_capacity(text.len() + expanded.len());
            next.push_str(&text[..idx]);
            next.push_str(expanded);
            next.push_str(&text[idx + rule.name.len()..]);
            Some(next)
        })
    }

    /// Pick one production of a rule: the only one, or by weight.
    fn do_rule<'a, R: Rng + ?Sized>(&self, rule: &'a GrammarRule, rng: &mut R) -> &'a str {
        match rule.productions.as_slice() {
            [] => "",
            [only] => &only.text,
            productions => {
                let weights: Vec<f64> = productions.iter().map(|p| p.weight).collect();
                let pick = rng.weighted_index(&weights).unwrap_or(0);
                &productions[pick].text
            }
        }
    }
}

fn parse_production(alternative: &str, default_weight: f64) -> Result<Production, GrammarError> {
    match PROB_PATT.captures(alternative) {
        Some(caps) => {
            let raw = &caps[2];
            let text = format!("{}{}", &caps[1], &caps[3]);
            let weight: f64 = raw.parse().map_err(|_| GrammarError::InvalidWeight {
                production: alternative.to_string(),
                weight: raw.to_string(),
            })?;
            check_weight(weight, alternative, raw)?;
            Ok(Production { text, weight })
        }
        None => Ok(Production {
            text: alternative.to_string(),
            weight: default_weight,
        }),
    }
}

fn check_weight(weight: f64, production: &str, raw: &str) -> Result<(), GrammarError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(GrammarError::InvalidWeight {
            production: production.to_string(),
            weight: raw.to_string(),
        })
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

/// Decode the basic named entities and numeric character references.
pub fn unescape_html(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let named = input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace("&quot;", "\"");

    let decimal = DEC_ENTITY.replace_all(&named, |caps: &regex::Captures| {
        decode_code_point(&caps[1], 10).unwrap_or_else(|| caps[0].to_string())
    });
    HEX_ENTITY
        .replace_all(&decimal, |caps: &regex::Captures| {
            decode_code_point(&caps[1], 16).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_code_point(digits: &str, radix: u32) -> Option<String> {
    let code = u32::from_str_radix(digits, radix).ok()?;
    char::from_u32(code).map(|c| c.to_string())
}
